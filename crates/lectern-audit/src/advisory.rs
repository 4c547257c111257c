//! Advisory database.

use std::fmt;
use std::fs;
use std::path::Path;

use semver::{Version, VersionReq};
use serde::Deserialize;

use crate::auditor::AuditError;

const BUILTIN: &str = include_str!("advisories.toml");

/// How bad an advisory is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        })
    }
}

/// One known vulnerability affecting a range of package versions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Advisory {
    pub id: String,
    pub package: String,

    /// Semver requirement matching affected versions
    pub vulnerable: String,
    pub severity: Severity,
    pub summary: String,

    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct AdvisoryFile {
    #[serde(default)]
    advisory: Vec<Advisory>,
}

/// Advisories indexed by package with parsed version ranges.
#[derive(Debug, Clone)]
pub struct AdvisoryDb {
    entries: Vec<(Advisory, VersionReq)>,
}

impl AdvisoryDb {
    /// The database compiled into the binary.
    pub fn builtin() -> Self {
        Self::from_toml(BUILTIN, "<builtin>").expect("built-in advisory database is valid")
    }

    /// Load a database from a TOML file.
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let content = fs::read_to_string(path).map_err(|e| AuditError::Database {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    /// Parse a database; `origin` names the source in errors.
    pub fn from_toml(content: &str, origin: &str) -> Result<Self, AuditError> {
        let file: AdvisoryFile = toml::from_str(content).map_err(|e| AuditError::Database {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

        let entries = file
            .advisory
            .into_iter()
            .map(|advisory| {
                let req = VersionReq::parse(&advisory.vulnerable).map_err(|e| {
                    AuditError::Database {
                        path: origin.to_string(),
                        message: format!("{}: bad range '{}': {}", advisory.id, advisory.vulnerable, e),
                    }
                })?;
                Ok((normalize(advisory), req))
            })
            .collect::<Result<_, AuditError>>()?;

        Ok(Self { entries })
    }

    /// Advisories affecting `package` at `version`.
    pub fn matching(&self, package: &str, version: &Version) -> Vec<&Advisory> {
        let package = package.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|(advisory, req)| advisory.package == package && req.matches(version))
            .map(|(advisory, _)| advisory)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(mut advisory: Advisory) -> Advisory {
    advisory.package = advisory.package.to_ascii_lowercase();
    advisory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_database_parses() {
        let db = AdvisoryDb::builtin();

        assert!(db.len() >= 5);
    }

    #[test]
    fn matches_version_ranges() {
        let db = AdvisoryDb::builtin();

        let old = db.matching("jQuery", &Version::new(3, 4, 1));
        let fixed = db.matching("jquery", &Version::new(3, 5, 0));

        assert_eq!(old.len(), 1);
        assert_eq!(old[0].id, "CVE-2020-11022");
        assert!(fixed.is_empty());
        assert_eq!(db.matching("jquery", &Version::new(1, 12, 4)).len(), 2);
    }

    #[test]
    fn rejects_bad_ranges() {
        let toml = r#"
[[advisory]]
id = "X-1"
package = "thing"
vulnerable = "not a range"
severity = "low"
summary = "broken"
"#;

        let result = AdvisoryDb::from_toml(toml, "custom.toml");

        assert!(matches!(result, Err(AuditError::Database { .. })));
    }

    #[test]
    fn severities_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low < Severity::Medium);
    }
}
