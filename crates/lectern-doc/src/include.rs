//! `include::` directive resolution under a safe-mode sandbox.
//!
//! A directive occupies a whole line, `include::path/to/file.md[]`, and is
//! replaced by the contents of the referenced file. Paths are relative to the
//! directory of the file containing the directive. Directives inside code
//! blocks are left untouched.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::blocks::BlockMap;

/// Maximum nesting of includes before resolution is aborted.
pub const MAX_INCLUDE_DEPTH: usize = 64;

static INCLUDE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^include::(\S+)\[\]\s*$").expect("valid regex"));

/// Filesystem sandbox applied while converting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeMode {
    /// Includes may read any file
    Unsafe,
    /// Includes must stay inside the document's base directory
    #[default]
    Safe,
    /// Includes are refused
    Secure,
}

impl FromStr for SafeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unsafe" => Ok(Self::Unsafe),
            "safe" => Ok(Self::Safe),
            "secure" => Ok(Self::Secure),
            other => Err(format!("unknown safe mode '{}'", other)),
        }
    }
}

impl fmt::Display for SafeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unsafe => "unsafe",
            Self::Safe => "safe",
            Self::Secure => "secure",
        })
    }
}

/// Errors raised while resolving includes.
#[derive(Debug, thiserror::Error)]
pub enum IncludeError {
    #[error("Include of {target} is not allowed in secure mode")]
    Disallowed { target: String },

    #[error("Include {target} resolves outside the base directory {base}")]
    OutsideBaseDir { target: String, base: String },

    #[error("Include file not found: {0}")]
    NotFound(String),

    #[error("Failed to read include {path}: {message}")]
    Read { path: String, message: String },

    #[error("Include nesting exceeds {max} levels at {target}")]
    TooDeep { target: String, max: usize },
}

/// Expands include directives relative to a jailed base directory.
#[derive(Debug, Clone)]
pub struct IncludeResolver {
    base_dir: PathBuf,
    mode: SafeMode,
}

impl IncludeResolver {
    /// Create a resolver rooted at `base_dir`.
    pub fn new(base_dir: &Path, mode: SafeMode) -> Result<Self, IncludeError> {
        let base_dir = base_dir
            .canonicalize()
            .map_err(|_| IncludeError::NotFound(base_dir.display().to_string()))?;
        Ok(Self { base_dir, mode })
    }

    /// Expand every include directive in `source`, whose own file lives in
    /// `current_dir`.
    pub fn resolve(&self, source: &str, current_dir: &Path) -> Result<String, IncludeError> {
        self.resolve_at_depth(source, current_dir, 0)
    }

    fn resolve_at_depth(
        &self,
        source: &str,
        current_dir: &Path,
        depth: usize,
    ) -> Result<String, IncludeError> {
        let blocks = BlockMap::new(source);
        let mut out = String::with_capacity(source.len());
        let mut offset = 0;

        for line in source.split_inclusive('\n') {
            let start = offset;
            offset += line.len();
            let bare = line.trim_end_matches(['\n', '\r']);
            if blocks.in_code(start..offset) {
                out.push_str(line);
                continue;
            }

            let Some(caps) = INCLUDE_DIRECTIVE.captures(bare.trim_start()) else {
                out.push_str(line);
                continue;
            };
            let target = &caps[1];

            if depth >= MAX_INCLUDE_DEPTH {
                return Err(IncludeError::TooDeep {
                    target: target.to_string(),
                    max: MAX_INCLUDE_DEPTH,
                });
            }

            let path = self.check(target, current_dir)?;
            tracing::debug!("Including {}", path.display());

            let content = fs::read_to_string(&path).map_err(|e| IncludeError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let parent = path.parent().unwrap_or(&self.base_dir).to_path_buf();
            let expanded = self.resolve_at_depth(&content, &parent, depth + 1)?;

            out.push_str(&expanded);
            if !expanded.ends_with('\n') {
                out.push('\n');
            }
        }

        Ok(out)
    }

    /// Apply the sandbox to an include target and return its canonical path.
    fn check(&self, target: &str, current_dir: &Path) -> Result<PathBuf, IncludeError> {
        if self.mode == SafeMode::Secure {
            return Err(IncludeError::Disallowed {
                target: target.to_string(),
            });
        }

        let path = current_dir
            .join(target)
            .canonicalize()
            .map_err(|_| IncludeError::NotFound(target.to_string()))?;

        if self.mode == SafeMode::Safe && !path.starts_with(&self.base_dir) {
            return Err(IncludeError::OutsideBaseDir {
                target: target.to_string(),
                base: self.base_dir.display().to_string(),
            });
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn expands_nested_includes() {
        let temp = tempdir().unwrap();
        let parts = temp.path().join("parts");
        fs::create_dir_all(&parts).unwrap();
        fs::write(parts.join("intro.md"), "## Intro\ninclude::detail.md[]").unwrap();
        fs::write(parts.join("detail.md"), "Details here\n").unwrap();

        let resolver = IncludeResolver::new(temp.path(), SafeMode::Safe).unwrap();
        let out = resolver
            .resolve("Before\ninclude::parts/intro.md[]\nAfter\n", temp.path())
            .unwrap();

        assert_eq!(out, "Before\n## Intro\nDetails here\nAfter\n");
    }

    #[test]
    fn leaves_directives_in_code_alone() {
        let temp = tempdir().unwrap();
        let resolver = IncludeResolver::new(temp.path(), SafeMode::Secure).unwrap();
        let source = "```\ninclude::missing.md[]\n```\n";

        assert_eq!(resolver.resolve(source, temp.path()).unwrap(), source);
    }

    #[test]
    fn safe_mode_rejects_escaping_paths() {
        let temp = tempdir().unwrap();
        let deck = temp.path().join("deck");
        fs::create_dir_all(&deck).unwrap();
        fs::write(temp.path().join("secret.md"), "secret").unwrap();

        let resolver = IncludeResolver::new(&deck, SafeMode::Safe).unwrap();
        let result = resolver.resolve("include::../secret.md[]\n", &deck);

        assert!(matches!(result, Err(IncludeError::OutsideBaseDir { .. })));
    }

    #[test]
    fn unsafe_mode_allows_escaping_paths() {
        let temp = tempdir().unwrap();
        let deck = temp.path().join("deck");
        fs::create_dir_all(&deck).unwrap();
        fs::write(temp.path().join("shared.md"), "shared").unwrap();

        let resolver = IncludeResolver::new(&deck, SafeMode::Unsafe).unwrap();
        let out = resolver.resolve("include::../shared.md[]\n", &deck).unwrap();

        assert_eq!(out, "shared\n");
    }

    #[test]
    fn secure_mode_rejects_all_includes() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("local.md"), "local").unwrap();

        let resolver = IncludeResolver::new(temp.path(), SafeMode::Secure).unwrap();
        let result = resolver.resolve("include::local.md[]\n", temp.path());

        assert!(matches!(result, Err(IncludeError::Disallowed { .. })));
    }

    #[test]
    fn detects_include_cycles() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("loop.md"), "include::loop.md[]\n").unwrap();

        let resolver = IncludeResolver::new(temp.path(), SafeMode::Safe).unwrap();
        let result = resolver.resolve("include::loop.md[]\n", temp.path());

        assert!(matches!(result, Err(IncludeError::TooDeep { .. })));
    }

    #[test]
    fn missing_include_is_an_error() {
        let temp = tempdir().unwrap();
        let resolver = IncludeResolver::new(temp.path(), SafeMode::Safe).unwrap();

        let result = resolver.resolve("include::nope.md[]\n", temp.path());

        assert!(matches!(result, Err(IncludeError::NotFound(_))));
    }

    #[test]
    fn parses_safe_mode_names() {
        assert_eq!("SECURE".parse::<SafeMode>(), Ok(SafeMode::Secure));
        assert!("paranoid".parse::<SafeMode>().is_err());
    }
}
