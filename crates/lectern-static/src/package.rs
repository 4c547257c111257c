//! Zip packaging of the built bundle.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::fsutil::{expand_globs, relative_path, temp_sibling, GlobError};

/// Configuration for packaging.
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// Project root; patterns and entry names are relative to it
    pub root: PathBuf,

    /// Archive path
    pub output: PathBuf,

    /// Allow-list of glob patterns to archive
    pub include: Vec<String>,

    /// Patterns that must match at least one file
    pub required: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output: PathBuf::from("presentation.zip"),
            include: [
                "index.html",
                "dist/**/*",
                "js/**/*",
                "lib/**/*",
                "images/**/*",
                "plugin/**/*",
                "*.md",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            required: vec!["index.html".to_string(), "dist/**/*.css".to_string()],
        }
    }
}

/// Result of packaging.
#[derive(Debug)]
pub struct PackageResult {
    pub output: PathBuf,
    pub files: usize,
    pub bytes: u64,
}

/// Errors that can occur while packaging.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Missing required path '{pattern}' - run `lectern build` first")]
    MissingPath { pattern: String },

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error("Failed to write archive {path}: {message}")]
    Archive { path: String, message: String },
}

/// Collects the bundle into one zip archive.
pub struct Packager {
    config: PackageConfig,
}

impl Packager {
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }

    fn output_path(&self) -> PathBuf {
        self.config.root.join(&self.config.output)
    }

    /// Files that would be archived, sorted by path.
    ///
    /// Fails if any required pattern matches nothing.
    pub fn collect(&self) -> Result<Vec<PathBuf>, PackageError> {
        for pattern in &self.config.required {
            if expand_globs(&self.config.root, std::slice::from_ref(pattern))?.is_empty() {
                return Err(PackageError::MissingPath {
                    pattern: pattern.clone(),
                });
            }
        }

        let output = self.output_path();
        let tmp = temp_sibling(&output);
        let files = expand_globs(&self.config.root, &self.config.include)?
            .into_iter()
            .filter(|p| *p != output && *p != tmp)
            .collect();

        Ok(files)
    }

    /// Write the archive. Nothing is written if collection fails.
    pub fn package(&self) -> Result<PackageResult, PackageError> {
        let files = self.collect()?;
        let output = self.output_path();

        self.write_archive(&output, &files)
            .map_err(|e| PackageError::Archive {
                path: output.display().to_string(),
                message: e.to_string(),
            })?;

        let bytes = fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
        tracing::info!(
            "Packaged {} files into {} ({} bytes)",
            files.len(),
            output.display(),
            bytes
        );

        Ok(PackageResult {
            output,
            files: files.len(),
            bytes,
        })
    }

    fn write_archive(&self, output: &Path, files: &[PathBuf]) -> io::Result<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        // Fixed timestamp and mode keep archives reproducible.
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let tmp = temp_sibling(output);
        let result = (|| -> io::Result<()> {
            let mut zip = ZipWriter::new(File::create(&tmp)?);
            for path in files {
                let name = relative_path(&self.config.root, path);
                zip.start_file(name, options).map_err(io::Error::other)?;
                let mut file = File::open(path)?;
                io::copy(&mut file, &mut zip)?;
            }
            zip.finish().map_err(io::Error::other)?;
            fs::rename(&tmp, output)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}
