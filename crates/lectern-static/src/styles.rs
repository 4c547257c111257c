//! Stylesheet pipeline: Sass compilation, vendor prefixing and minification.
//!
//! The core stylesheet goes through compile -> prefix -> minify and is
//! written once at the end. Theme stylesheets are compiled only.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use grass::{Options, OutputStyle};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use rayon::prelude::*;
use regex::Regex;

use crate::fsutil::{expand_globs, write_atomic, GlobError};

static SASS_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+):\d+\s+root stylesheet").expect("valid regex"));
static SASS_GUTTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(\d+) │").expect("valid regex"));

/// Configuration for the stylesheet pipeline.
#[derive(Debug, Clone)]
pub struct StyleConfig {
    /// Project root; every other path is relative to it
    pub root: PathBuf,

    /// Core stylesheet source
    pub core: PathBuf,

    /// Glob patterns selecting theme sources
    pub themes: Vec<String>,

    /// Extra directories searched by `@use` and `@import`
    pub load_paths: Vec<PathBuf>,

    /// Where the compiled core stylesheet goes
    pub output_dir: PathBuf,

    /// Where compiled themes go
    pub theme_output_dir: PathBuf,

    /// Browserslist queries used for vendor prefixing
    pub prefix_targets: Vec<String>,

    /// Oldest browser baseline the minified output must support
    pub compatibility: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            core: PathBuf::from("css/reveal.scss"),
            themes: vec!["css/theme/source/*.scss".to_string()],
            load_paths: vec![PathBuf::from("css/theme/template")],
            output_dir: PathBuf::from("dist"),
            theme_output_dir: PathBuf::from("dist/theme"),
            prefix_targets: vec!["defaults".to_string()],
            compatibility: Some("ie 9".to_string()),
        }
    }
}

/// A stylesheet written by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStyle {
    pub source: PathBuf,
    pub output: PathBuf,
    pub bytes: usize,
}

/// Errors that can occur in the stylesheet pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("Stylesheet not found: {0}")]
    NotFound(String),

    #[error("Syntax error in {path}{}: {message}", .line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Syntax {
        path: String,
        line: Option<usize>,
        message: String,
    },

    #[error("Invalid browser targets '{query}': {message}")]
    Targets { query: String, message: String },

    #[error("Failed to {stage} {path}: {message}")]
    Process {
        stage: &'static str,
        path: String,
        message: String,
    },

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error("Failed to write {path}: {message}")]
    WriteError { path: String, message: String },
}

/// Compiles the core stylesheet and the theme set.
pub struct StylePipeline {
    config: StyleConfig,
}

impl StylePipeline {
    pub fn new(config: StyleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    /// Compile, prefix and minify the core stylesheet.
    pub fn compile_core(&self) -> Result<CompiledStyle, StyleError> {
        let source = self.config.root.join(&self.config.core);
        let name = source.display().to_string();

        let css = self.compile_sass(&source)?;
        let prefixed = self.prefix(&css, &name)?;
        let minified = self.minify(&prefixed, &name)?;

        let output = self
            .config
            .root
            .join(&self.config.output_dir)
            .join(css_file_name(&source));
        write_output(&output, &minified)?;

        tracing::info!("Compiled {} -> {}", name, output.display());

        Ok(CompiledStyle {
            source,
            output,
            bytes: minified.len(),
        })
    }

    /// Compile every theme source. Nothing is written unless all succeed.
    pub fn compile_themes(&self) -> Result<Vec<CompiledStyle>, StyleError> {
        let sources: Vec<PathBuf> = expand_globs(&self.config.root, &self.config.themes)?
            .into_iter()
            .filter(|p| !is_partial(p))
            .collect();

        if sources.is_empty() {
            tracing::warn!("No theme stylesheets matched {:?}", self.config.themes);
            return Ok(Vec::new());
        }

        let compiled: Vec<(PathBuf, String)> = sources
            .par_iter()
            .map(|source| self.compile_sass(source).map(|css| (source.clone(), css)))
            .collect::<Result<_, _>>()?;

        let out_dir = self.config.root.join(&self.config.theme_output_dir);
        let mut written = Vec::with_capacity(compiled.len());

        for (source, css) in compiled {
            let output = out_dir.join(css_file_name(&source));
            write_output(&output, &css)?;
            written.push(CompiledStyle {
                source,
                output,
                bytes: css.len(),
            });
        }

        tracing::info!("Compiled {} themes into {}", written.len(), out_dir.display());

        Ok(written)
    }

    /// Compile one Sass source to expanded CSS.
    fn compile_sass(&self, source: &Path) -> Result<String, StyleError> {
        if !source.is_file() {
            return Err(StyleError::NotFound(source.display().to_string()));
        }

        let load_paths: Vec<PathBuf> = self
            .config
            .load_paths
            .iter()
            .map(|p| self.config.root.join(p))
            .collect();

        let options = Options::default()
            .load_paths(&load_paths)
            .style(OutputStyle::Expanded);

        grass::from_path(source, &options).map_err(|e| {
            let message = e.to_string();
            StyleError::Syntax {
                path: source.display().to_string(),
                line: sass_error_line(&message),
                message,
            }
        })
    }

    /// Add vendor prefixes for the prefix targets, keeping readable output.
    fn prefix(&self, css: &str, name: &str) -> Result<String, StyleError> {
        let targets = browser_targets(&self.config.prefix_targets)?;
        transform_css(css, name, targets, false).map_err(|message| StyleError::Process {
            stage: "prefix",
            path: name.to_string(),
            message,
        })
    }

    /// Minify for the prefix targets widened by the compatibility baseline.
    fn minify(&self, css: &str, name: &str) -> Result<String, StyleError> {
        let mut queries = self.config.prefix_targets.clone();
        queries.extend(self.config.compatibility.iter().cloned());
        let targets = browser_targets(&queries)?;

        transform_css(css, name, targets, true).map_err(|message| StyleError::Process {
            stage: "minify",
            path: name.to_string(),
            message,
        })
    }
}

/// Resolve browserslist queries into lightningcss targets.
pub fn browser_targets(queries: &[String]) -> Result<Targets, StyleError> {
    if queries.is_empty() {
        return Ok(Targets::default());
    }

    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str)).map_err(|e| {
        StyleError::Targets {
            query: queries.join(", "),
            message: e.to_string(),
        }
    })?;

    Ok(browsers.map(Targets::from).unwrap_or_default())
}

/// Parse, run lightningcss transforms for `targets` and print.
fn transform_css(css: &str, name: &str, targets: Targets, minify: bool) -> Result<String, String> {
    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: name.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| format!("CSS parse error: {}", e))?;

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| format!("CSS transform error: {}", e))?;

    let output = stylesheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| format!("CSS print error: {}", e))?;

    Ok(output.code)
}

fn write_output(output: &Path, css: &str) -> Result<(), StyleError> {
    write_atomic(output, css.as_bytes()).map_err(|e| StyleError::WriteError {
        path: output.display().to_string(),
        message: e.to_string(),
    })
}

/// `css/theme/source/night.scss` -> `night.css`
fn css_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("style");
    format!("{}.css", stem)
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Best-effort line number from a grass error message.
fn sass_error_line(message: &str) -> Option<usize> {
    SASS_LOCATION
        .captures(message)
        .or_else(|| SASS_GUTTER.captures(message))
        .and_then(|caps| caps[1].parse().ok())
}
