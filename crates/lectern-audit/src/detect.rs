//! Library detection in bundled scripts.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

/// Bytes of a script inspected for a license banner.
const BANNER_WINDOW: u64 = 4096;

/// Where a component was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A script in the bundle
    Script(PathBuf),

    /// A declaration in a package manifest
    Manifest { file: PathBuf, dev: bool },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script(path) => write!(f, "{}", path.display()),
            Self::Manifest { file, dev: true } => write!(f, "{} (devDependencies)", file.display()),
            Self::Manifest { file, dev: false } => write!(f, "{} (dependencies)", file.display()),
        }
    }
}

/// A library at a known version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub package: String,
    pub version: Version,
    pub origin: Origin,
}

static FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z][\w.]*?)[-@.]v?(?P<version>\d+\.\d+\.\d+)(?:\.min)?\.js$")
        .expect("valid file name regex")
});

static BANNERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("jquery", r"jQuery(?: JavaScript Library)? v(\d+\.\d+\.\d+)"),
        ("highlight.js", r"(?i)highlight\.js v?(\d+\.\d+\.\d+)"),
        ("handlebars", r"(?i)handlebars v(\d+\.\d+\.\d+)"),
        ("marked", r"marked v(\d+\.\d+\.\d+)"),
        ("lodash", r"(?i)lodash(?:\.js)? v?(\d+\.\d+\.\d+)"),
        ("reveal.js", r"reveal\.js v?(\d+\.\d+\.\d+)"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid banner regex")))
    .collect()
});

/// Detect the library a script bundles.
///
/// The file name (`jquery-3.4.1.min.js`) wins over the banner in the
/// first few kilobytes of the file.
pub fn detect_script(path: &Path) -> io::Result<Option<Component>> {
    if let Some((package, version)) = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(from_file_name)
    {
        return Ok(Some(Component {
            package,
            version,
            origin: Origin::Script(path.to_path_buf()),
        }));
    }

    let mut head = Vec::new();
    File::open(path)?
        .take(BANNER_WINDOW)
        .read_to_end(&mut head)?;
    let head = String::from_utf8_lossy(&head);

    Ok(from_banner(&head).map(|(package, version)| Component {
        package,
        version,
        origin: Origin::Script(path.to_path_buf()),
    }))
}

fn from_file_name(name: &str) -> Option<(String, Version)> {
    let caps = FILE_NAME.captures(name)?;
    let version = Version::parse(&caps["version"]).ok()?;
    Some((caps["name"].to_ascii_lowercase(), version))
}

fn from_banner(head: &str) -> Option<(String, Version)> {
    BANNERS.iter().find_map(|(package, re)| {
        let caps = re.captures(head)?;
        let version = Version::parse(&caps[1]).ok()?;
        Some((package.to_string(), version))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn detects_versioned_file_names() {
        assert_eq!(
            from_file_name("jquery-3.4.1.min.js"),
            Some(("jquery".to_string(), Version::new(3, 4, 1)))
        );
        assert_eq!(
            from_file_name("highlight.js-10.1.0.js"),
            Some(("highlight.js".to_string(), Version::new(10, 1, 0)))
        );
        assert_eq!(
            from_file_name("lodash@4.17.15.js"),
            Some(("lodash".to_string(), Version::new(4, 17, 15)))
        );
        assert_eq!(from_file_name("reveal.js"), None);
        assert_eq!(from_file_name("notes.js"), None);
    }

    #[test]
    fn detects_banners() {
        let head = "/*! jQuery v3.3.1 | (c) JS Foundation and other contributors */\n!function(e){}";

        assert_eq!(
            from_banner(head),
            Some(("jquery".to_string(), Version::new(3, 3, 1)))
        );
        assert_eq!(from_banner("console.log('hi')"), None);
    }

    #[test]
    fn banner_outside_window_is_ignored() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("vendor.js");
        let mut content = " ".repeat(5000);
        content.push_str("/*! jQuery v3.3.1 */");
        std::fs::write(&path, content).unwrap();

        assert_eq!(detect_script(&path).unwrap(), None);
    }

    #[test]
    fn detects_script_from_disk() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("vendor.js");
        std::fs::write(&path, "/*! handlebars v4.5.3 */\nvar Handlebars = {};").unwrap();

        let component = detect_script(&path).unwrap().unwrap();

        assert_eq!(component.package, "handlebars");
        assert_eq!(component.version, Version::new(4, 5, 3));
        assert_eq!(component.origin, Origin::Script(path));
    }
}
