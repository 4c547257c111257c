//! `package.json` dependency declarations.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use semver::Version;
use serde::Deserialize;

use crate::detect::{Component, Origin};

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,

    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, String>,
}

/// Components declared in a package manifest.
///
/// A missing manifest declares nothing. Unparseable manifests and
/// version specs that are not plain versions (git URLs, tags, `*`)
/// are skipped with a warning.
pub fn manifest_components(path: &Path) -> Vec<Component> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            tracing::debug!("No manifest at {}", path.display());
            return Vec::new();
        }
    };

    let manifest: PackageJson = match serde_json::from_str(&content) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::warn!("Skipping malformed {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let declared = manifest
        .dependencies
        .iter()
        .map(|entry| (entry, false))
        .chain(manifest.dev_dependencies.iter().map(|entry| (entry, true)));

    let mut components = Vec::new();
    for ((name, spec), dev) in declared {
        match base_version(spec) {
            Some(version) => components.push(Component {
                package: name.to_ascii_lowercase(),
                version,
                origin: Origin::Manifest {
                    file: path.to_path_buf(),
                    dev,
                },
            }),
            None => tracing::debug!("Skipping {}@{}: not a plain version", name, spec),
        }
    }
    components
}

/// The lowest version a range spec like `^3.4.1` or `~1.2` admits.
fn base_version(spec: &str) -> Option<Version> {
    let spec = spec
        .trim()
        .trim_start_matches(['^', '~', '>', '=', 'v', ' '])
        .split_whitespace()
        .next()?;

    let parts = spec.split('.').count();
    let padded = match parts {
        1 => format!("{}.0.0", spec),
        2 => format!("{}.0", spec),
        _ => spec.to_string(),
    };
    Version::parse(&padded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn strips_range_operators() {
        assert_eq!(base_version("^3.4.1"), Some(Version::new(3, 4, 1)));
        assert_eq!(base_version("~4.17"), Some(Version::new(4, 17, 0)));
        assert_eq!(base_version(">=10.1.0 <11"), Some(Version::new(10, 1, 0)));
        assert_eq!(base_version("v2"), Some(Version::new(2, 0, 0)));
        assert_eq!(base_version("latest"), None);
        assert_eq!(base_version("github:hakimel/reveal.js"), None);
    }

    #[test]
    fn reads_both_dependency_tables() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("package.json");
        fs::write(
            &path,
            r#"{
  "name": "talk",
  "dependencies": { "reveal.js": "^4.1.0", "jquery": "3.4.1" },
  "devDependencies": { "node-sass": "latest", "lodash": "~4.17.15" }
}"#,
        )
        .unwrap();

        let components = manifest_components(&path);

        let names: Vec<_> = components.iter().map(|c| c.package.as_str()).collect();
        assert_eq!(names, vec!["jquery", "reveal.js", "lodash"]);
        assert_eq!(
            components[2].origin,
            Origin::Manifest {
                file: path.clone(),
                dev: true
            }
        );
    }

    #[test]
    fn missing_or_malformed_manifest_declares_nothing() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("package.json");

        assert!(manifest_components(&path).is_empty());

        fs::write(&path, "{ not json").unwrap();
        assert!(manifest_components(&path).is_empty());
    }
}
