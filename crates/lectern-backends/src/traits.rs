//! Trait definitions for rendering backends.

use std::collections::BTreeMap;

use serde::Serialize;

use lectern_doc::{AttributeSet, Deck, Slide};

use crate::markdown::{render_inline, render_markdown};

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Unknown backend '{name}' (available: {available})")]
    Unknown { name: String, available: String },

    #[error("Template error: {0}")]
    Template(String),
}

impl From<minijinja::Error> for BackendError {
    fn from(e: minijinja::Error) -> Self {
        Self::Template(e.to_string())
    }
}

/// Trait for named rendering backends.
pub trait Backend: Send + Sync {
    /// Backend identifier (e.g., "revealjs")
    fn name(&self) -> &'static str;

    /// Alternative names accepted on lookup
    fn aliases(&self) -> &[&'static str] {
        &[]
    }

    /// Attribute defaults, overlaid by front-matter and project overrides
    fn default_attributes(&self) -> AttributeSet;

    /// Render a deck to a complete markup page.
    ///
    /// # Arguments
    /// * `deck` - The segmented deck
    /// * `attributes` - The fully merged attribute set
    fn render(&self, deck: &Deck, attributes: &AttributeSet) -> Result<String, BackendError>;
}

/// A slide with its Markdown already rendered to HTML.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedSlide {
    pub id: String,
    pub title: String,
    pub classes: String,
    pub data: BTreeMap<String, String>,
    pub html: String,
    pub notes: Option<String>,
    pub children: Vec<RenderedSlide>,
}

impl RenderedSlide {
    /// Render a slide tree, resolving images against `imagesdir`.
    pub fn from_slide(slide: &Slide, imagesdir: &str) -> Self {
        Self {
            id: slide.id.clone(),
            title: render_inline(&slide.title),
            classes: slide.classes.join(" "),
            data: slide.data.clone(),
            html: render_markdown(&slide.body, imagesdir),
            notes: slide
                .notes
                .as_deref()
                .map(|notes| render_markdown(notes, imagesdir)),
            children: slide
                .children
                .iter()
                .map(|child| Self::from_slide(child, imagesdir))
                .collect(),
        }
    }
}
