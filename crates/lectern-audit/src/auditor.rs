//! Audit runs and reports.

use std::path::PathBuf;

use lectern_static::{expand_globs, fsutil::relative_path, GlobError};

use crate::advisory::{Advisory, AdvisoryDb, Severity};
use crate::detect::{detect_script, Component, Origin};
use crate::manifest::manifest_components;

/// Configuration for an audit.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Project root; script patterns are relative to it
    pub root: PathBuf,

    /// Script patterns to inspect
    pub scripts: Vec<String>,

    /// Package manifest, relative to the root
    pub manifest: Option<PathBuf>,

    /// Advisory database file; the built-in one when unset
    pub database: Option<PathBuf>,

    /// Fail when anything vulnerable is found
    pub strict: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            scripts: vec![
                "js/**/*.js".to_string(),
                "lib/**/*.js".to_string(),
                "plugin/**/*.js".to_string(),
            ],
            manifest: Some(PathBuf::from("package.json")),
            database: None,
            strict: false,
        }
    }
}

/// A component matched by an advisory.
#[derive(Debug, Clone)]
pub struct Finding {
    pub component: Component,
    pub advisory: Advisory,
}

/// Outcome of an audit.
#[derive(Debug, Default)]
pub struct AuditReport {
    /// Everything detected, vulnerable or not
    pub components: Vec<Component>,

    /// Advisory matches, most severe first
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.advisory.severity).max()
    }
}

/// Errors that can occur during an audit.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Invalid advisory database {path}: {message}")]
    Database { path: String, message: String },

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error("{count} vulnerable dependencies found (strict audit)")]
    VulnerableDependencies { count: usize },
}

/// Scans a project for vulnerable third-party code.
pub struct Auditor {
    config: AuditConfig,
    db: AdvisoryDb,
}

impl Auditor {
    /// Create an auditor, loading the configured advisory database.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        let db = match &config.database {
            Some(path) => AdvisoryDb::load(&config.root.join(path))?,
            None => AdvisoryDb::builtin(),
        };
        Ok(Self::with_database(config, db))
    }

    pub fn with_database(config: AuditConfig, db: AdvisoryDb) -> Self {
        Self { config, db }
    }

    /// Detect components and match them against advisories.
    pub fn scan(&self) -> Result<AuditReport, AuditError> {
        let mut components = Vec::new();

        for path in expand_globs(&self.config.root, &self.config.scripts)? {
            match detect_script(&path) {
                Ok(Some(mut component)) => {
                    component.origin =
                        Origin::Script(PathBuf::from(relative_path(&self.config.root, &path)));
                    components.push(component);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Could not read {}: {}", path.display(), e),
            }
        }

        if let Some(manifest) = &self.config.manifest {
            components.extend(manifest_components(&self.config.root.join(manifest)));
        }

        let mut findings: Vec<Finding> = components
            .iter()
            .flat_map(|component| {
                self.db
                    .matching(&component.package, &component.version)
                    .into_iter()
                    .map(|advisory| Finding {
                        component: component.clone(),
                        advisory: advisory.clone(),
                    })
            })
            .collect();
        findings.sort_by(|a, b| {
            b.advisory
                .severity
                .cmp(&a.advisory.severity)
                .then_with(|| a.advisory.id.cmp(&b.advisory.id))
        });

        Ok(AuditReport {
            components,
            findings,
        })
    }

    /// Scan, log every finding, and fail in strict mode.
    pub fn run(&self) -> Result<AuditReport, AuditError> {
        let report = self.scan()?;

        for finding in &report.findings {
            tracing::warn!(
                "{} {}@{} in {}: {} ({})",
                finding.advisory.severity,
                finding.component.package,
                finding.component.version,
                finding.component.origin,
                finding.advisory.summary,
                finding.advisory.id
            );
        }

        if report.is_clean() {
            tracing::info!(
                "Audited {} components, no known vulnerabilities",
                report.components.len()
            );
            return Ok(report);
        }

        if self.config.strict {
            return Err(AuditError::VulnerableDependencies {
                count: report.findings.len(),
            });
        }

        tracing::info!(
            "{} advisories found (not failing; enable strict audit to enforce)",
            report.findings.len()
        );
        Ok(report)
    }
}
