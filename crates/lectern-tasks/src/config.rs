//! Project configuration (`lectern.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Deserialize;

use lectern_audit::AuditConfig;
use lectern_doc::{AttributeSet, SafeMode};
use lectern_server::{DevServerConfig, ServerError, WatchRule, WatchRules};
use lectern_static::{ConvertConfig, PackageConfig, StyleConfig};

/// Config file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "lectern.toml";

/// Errors loading or interpreting the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error(transparent)]
    Watch(#[from] ServerError),
}

/// Configuration file structure. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Directory relative paths resolve against: the config file's directory
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub document: DocumentSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub server: ServerSection,

    /// Watch rules; the built-in set when absent
    #[serde(default)]
    pub watch: Option<Vec<WatchRuleSection>>,

    #[serde(default)]
    pub package: PackageSection,

    #[serde(default)]
    pub audit: AuditSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSection {
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub safe_mode: SafeMode,
    /// Overrides applied on top of front-matter
    #[serde(default)]
    pub attributes: AttributeSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    #[serde(default = "default_core")]
    pub core: PathBuf,
    #[serde(default = "default_themes")]
    pub themes: Vec<String>,
    #[serde(default = "default_load_paths")]
    pub load_paths: Vec<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_theme_output_dir")]
    pub theme_output_dir: PathBuf,
    #[serde(default = "default_prefix_targets")]
    pub prefix_targets: Vec<String>,
    /// Browserslist baseline for minification; empty disables it
    #[serde(default = "default_compatibility")]
    pub compatibility: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_port_attempts")]
    pub port_attempts: u16,
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,
    #[serde(default = "default_true")]
    pub livereload: bool,
    #[serde(default = "default_true")]
    pub open: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchRuleSection {
    pub patterns: Vec<String>,
    /// Task to run; omitted means reload only
    #[serde(default)]
    pub task: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageSection {
    #[serde(default = "default_archive")]
    pub output: PathBuf,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_required")]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditSection {
    #[serde(default = "default_scripts")]
    pub scripts: Vec<String>,
    #[serde(default = "default_manifest")]
    pub manifest: Option<PathBuf>,
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub strict: bool,
}

fn default_source() -> PathBuf {
    ConvertConfig::default().source
}
fn default_output() -> PathBuf {
    ConvertConfig::default().output
}
fn default_core() -> PathBuf {
    StyleConfig::default().core
}
fn default_themes() -> Vec<String> {
    StyleConfig::default().themes
}
fn default_load_paths() -> Vec<PathBuf> {
    StyleConfig::default().load_paths
}
fn default_output_dir() -> PathBuf {
    StyleConfig::default().output_dir
}
fn default_theme_output_dir() -> PathBuf {
    StyleConfig::default().theme_output_dir
}
fn default_prefix_targets() -> Vec<String> {
    StyleConfig::default().prefix_targets
}
fn default_compatibility() -> String {
    StyleConfig::default().compatibility.unwrap_or_default()
}
fn default_host() -> String {
    DevServerConfig::default().host
}
fn default_port() -> u16 {
    DevServerConfig::default().port
}
fn default_port_attempts() -> u16 {
    DevServerConfig::default().port_attempts
}
fn default_roots() -> Vec<PathBuf> {
    DevServerConfig::default().roots
}
fn default_true() -> bool {
    true
}
fn default_archive() -> PathBuf {
    PackageConfig::default().output
}
fn default_include() -> Vec<String> {
    PackageConfig::default().include
}
fn default_required() -> Vec<String> {
    PackageConfig::default().required
}
fn default_scripts() -> Vec<String> {
    AuditConfig::default().scripts
}
fn default_manifest() -> Option<PathBuf> {
    AuditConfig::default().manifest
}

impl Default for DocumentSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            backend: None,
            safe_mode: SafeMode::default(),
            attributes: AttributeSet::new(),
        }
    }
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            core: default_core(),
            themes: default_themes(),
            load_paths: default_load_paths(),
            output_dir: default_output_dir(),
            theme_output_dir: default_theme_output_dir(),
            prefix_targets: default_prefix_targets(),
            compatibility: default_compatibility(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_attempts: default_port_attempts(),
            roots: default_roots(),
            livereload: true,
            open: true,
        }
    }
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            output: default_archive(),
            include: default_include(),
            required: default_required(),
        }
    }
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            scripts: default_scripts(),
            manifest: default_manifest(),
            database: None,
            strict: false,
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            document: DocumentSection::default(),
            styles: StylesSection::default(),
            server: ServerSection::default(),
            watch: None,
            package: PackageSection::default(),
            audit: AuditSection::default(),
        }
    }
}

impl ProjectConfig {
    /// Load configuration from `path` if it exists.
    ///
    /// A missing file yields defaults rooted at the file's directory; a
    /// file that exists but is malformed is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self {
                root,
                ..Self::default()
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })?;
        config.root = root;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration text, rooted at the current directory.
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.root = PathBuf::from(".");
        Ok(config)
    }

    pub fn convert_config(&self) -> ConvertConfig {
        ConvertConfig {
            source: self.root.join(&self.document.source),
            output: self.root.join(&self.document.output),
            backend: self.document.backend.clone(),
            safe_mode: self.document.safe_mode,
            attributes: self.document.attributes.clone(),
        }
    }

    pub fn style_config(&self) -> StyleConfig {
        let compatibility = self.styles.compatibility.trim();
        StyleConfig {
            root: self.root.clone(),
            core: self.styles.core.clone(),
            themes: self.styles.themes.clone(),
            load_paths: self.styles.load_paths.clone(),
            output_dir: self.styles.output_dir.clone(),
            theme_output_dir: self.styles.theme_output_dir.clone(),
            prefix_targets: self.styles.prefix_targets.clone(),
            compatibility: (!compatibility.is_empty()).then(|| compatibility.to_string()),
        }
    }

    pub fn package_config(&self) -> PackageConfig {
        PackageConfig {
            root: self.root.clone(),
            output: self.package.output.clone(),
            include: self.package.include.clone(),
            required: self.package.required.clone(),
        }
    }

    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig {
            root: self.root.clone(),
            scripts: self.audit.scripts.clone(),
            manifest: self.audit.manifest.clone(),
            database: self.audit.database.clone(),
            strict: self.audit.strict,
        }
    }

    pub fn server_config(&self) -> DevServerConfig {
        DevServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            port_attempts: self.server.port_attempts,
            roots: self
                .server
                .roots
                .iter()
                .map(|root| self.root.join(root))
                .collect(),
            livereload: self.server.livereload,
            open: self.server.open,
        }
    }

    /// Configured watch rules, or the built-in set.
    pub fn watch_rules(&self) -> Result<WatchRules, ConfigError> {
        let rules = match &self.watch {
            Some(rules) => rules
                .iter()
                .map(|rule| WatchRule::new(&rule.patterns, rule.task.as_deref()))
                .collect::<Result<Vec<_>, _>>()?,
            None => self.default_watch_rules()?,
        };
        Ok(WatchRules::new(rules))
    }

    fn default_watch_rules(&self) -> Result<Vec<WatchRule>, ServerError> {
        let source = self
            .document
            .source
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Ok(vec![
            WatchRule::new(&["*.html", "*.md"], None)?,
            WatchRule::new(&[Pattern::escape(&source)], Some("prebuild"))?,
            WatchRule::new(&["js/**/*"], Some("js"))?,
            WatchRule::new(
                &["css/theme/source/*.scss", "css/theme/template/*.scss"],
                Some("css-themes"),
            )?,
            WatchRule::new(&["css/*.scss"], Some("css-core"))?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = tempdir().unwrap();

        let config = ProjectConfig::load(&temp.path().join("lectern.toml")).unwrap();

        assert_eq!(config.root, temp.path());
        assert_eq!(config.document.source, PathBuf::from("slides.md"));
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.styles.compatibility, "ie 9");
        assert!(!config.audit.strict);
        assert_eq!(config.convert_config().source, temp.path().join("slides.md"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = ProjectConfig::parse(
            r#"
[document]
source = "talk.md"
safe_mode = "secure"

[document.attributes]
revealjs_theme = "moon"
revealjs_slidenumber = true

[server]
port = 9000

[audit]
strict = true
"#,
        )
        .unwrap();

        assert_eq!(config.document.source, PathBuf::from("talk.md"));
        assert_eq!(config.document.safe_mode, SafeMode::Secure);
        assert_eq!(
            config.document.attributes.text("revealjs_theme").as_deref(),
            Some("moon")
        );
        assert!(config.document.attributes.flag("revealjs_slidenumber"));
        assert_eq!(config.document.output, PathBuf::from("index.html"));
        assert_eq!(config.server.port, 9000);
        assert!(config.server.livereload);
        assert!(config.audit.strict);
        assert_eq!(config.package.output, PathBuf::from("presentation.zip"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("lectern.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        let result = ProjectConfig::load(&path);

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn empty_compatibility_disables_baseline() {
        let config = ProjectConfig::parse("[styles]\ncompatibility = \"\"\n").unwrap();

        assert_eq!(config.style_config().compatibility, None);
    }

    #[test]
    fn default_watch_rules_follow_document_source() {
        let config = ProjectConfig::parse("[document]\nsource = \"talk/deck.md\"\n").unwrap();

        let rules = config.watch_rules().unwrap();

        assert_eq!(rules.len(), 5);
        assert_eq!(rules.tasks_for("talk/deck.md"), Some(vec!["prebuild"]));
        assert_eq!(rules.tasks_for("index.html"), Some(vec![]));
        assert_eq!(rules.tasks_for("css/theme/template/mixins.scss"), Some(vec!["css-themes"]));
    }

    #[test]
    fn configured_watch_rules_replace_defaults() {
        let config = ProjectConfig::parse(
            r#"
[[watch]]
patterns = ["styles/*.scss"]
task = "css"

[[watch]]
patterns = ["*.html"]
"#,
        )
        .unwrap();

        let rules = config.watch_rules().unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.tasks_for("styles/main.scss"), Some(vec!["css"]));
        assert_eq!(rules.tasks_for("slides.md"), None);
    }

    #[test]
    fn server_roots_resolve_against_project() {
        let mut config = ProjectConfig::parse("[server]\nroots = [\".\", \"assets\"]\n").unwrap();
        config.root = PathBuf::from("talk");

        let server = config.server_config();

        assert_eq!(
            server.roots,
            vec![PathBuf::from("talk/."), PathBuf::from("talk/assets")]
        );
    }
}
