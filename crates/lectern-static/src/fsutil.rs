//! Filesystem helpers shared by the build steps.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

/// Glob expansion failure.
#[derive(Debug, thiserror::Error)]
pub enum GlobError {
    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },
}

/// Options used for every glob in the project: `*` never crosses `/`.
pub fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Expand patterns relative to `root` into a sorted, de-duplicated list of files.
pub fn expand_globs(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, GlobError> {
    let prefix = Pattern::escape(&root.to_string_lossy());
    let mut files = BTreeSet::new();

    for pattern in patterns {
        let full = format!("{}/{}", prefix.trim_end_matches('/'), pattern);
        let paths = glob::glob_with(&full, match_options()).map_err(|e| GlobError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for entry in paths {
            let path = entry.map_err(|e| GlobError::Read {
                path: e.path().display().to_string(),
                message: e.error().to_string(),
            })?;
            if path.is_file() {
                files.insert(path);
            }
        }
    }

    Ok(files.into_iter().collect())
}

/// Path of `path` relative to `root`, with forward slashes.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Write a file via a sibling temp file and rename, so readers never see a
/// partial file and a failed write leaves the previous contents in place.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_sibling(path);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

/// `<name>.tmp` next to `path`.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn expands_sorted_unique_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("css/theme")).unwrap();
        fs::write(temp.path().join("css/b.scss"), "").unwrap();
        fs::write(temp.path().join("css/a.scss"), "").unwrap();
        fs::write(temp.path().join("css/theme/c.scss"), "").unwrap();

        let files = expand_globs(
            temp.path(),
            &["css/*.scss".to_string(), "css/a.scss".to_string()],
        )
        .unwrap();

        let names: Vec<_> = files.iter().map(|p| relative_path(temp.path(), p)).collect();
        assert_eq!(names, vec!["css/a.scss", "css/b.scss"]);
    }

    #[test]
    fn recursive_pattern_finds_nested_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("dist/theme")).unwrap();
        fs::write(temp.path().join("dist/reveal.css"), "").unwrap();
        fs::write(temp.path().join("dist/theme/black.css"), "").unwrap();

        let files = expand_globs(temp.path(), &["dist/**/*".to_string()]).unwrap();

        assert_eq!(files.len(), 2);
    }

    #[test]
    fn rejects_bad_patterns() {
        let temp = tempdir().unwrap();

        let result = expand_globs(temp.path(), &["css/***".to_string()]);

        assert!(matches!(result, Err(GlobError::Pattern { .. })));
    }

    #[test]
    fn atomic_write_replaces_contents() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("out/site.css");

        write_atomic(&path, b"a{}").unwrap();
        write_atomic(&path, b"b{}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "b{}");
        assert!(!temp_sibling(&path).exists());
    }
}
