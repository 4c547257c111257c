//! Front-matter extraction and parsing.

use serde::Deserialize;

use crate::attributes::AttributeSet;

/// Parsed front-matter of a source document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Frontmatter {
    /// Deck title, shown on the title slide
    #[serde(default)]
    pub title: Option<String>,

    /// Subtitle shown under the title
    #[serde(default)]
    pub subtitle: Option<String>,

    /// Speaker name(s)
    #[serde(default)]
    pub author: Option<String>,

    /// Rendering backend override (e.g. "revealjs")
    #[serde(default)]
    pub backend: Option<String>,

    /// Every other key becomes a conversion attribute
    #[serde(flatten)]
    pub attributes: AttributeSet,
}

/// Extract front-matter from a source document.
///
/// Returns the parsed front-matter and the remaining content after the block.
pub fn extract_frontmatter(source: &str) -> Result<(Option<Frontmatter>, &str), FrontmatterError> {
    let trimmed = source.trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, source));
    }

    // Find the closing ---
    let after_open = &trimmed[3..];
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(FrontmatterError::Unclosed);
    };

    let yaml_content = after_open[..close_pos].trim();
    let remaining = after_open[close_pos + 4..].trim_start_matches('-');

    let frontmatter: Frontmatter = if yaml_content.is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?
    };

    Ok((Some(frontmatter), remaining.trim_start()))
}

/// Errors that can occur when parsing front-matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed front-matter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in front-matter: {0}")]
    InvalidYaml(String),
}
