//! Plain HTML5 backend, one article with a section per slide.
//!
//! Useful for handouts and printing; speaker notes are rendered inline.

use minijinja::{context, Environment};

use lectern_doc::{AttributeSet, Deck};

use crate::markdown::render_markdown;
use crate::traits::{Backend, BackendError, RenderedSlide};

pub struct Html5Backend {
    env: Environment<'static>,
}

impl Html5Backend {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("html5.html", PAGE_TEMPLATE)
            .expect("Failed to add html5 page template");
        Self { env }
    }
}

impl Default for Html5Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for Html5Backend {
    fn name(&self) -> &'static str {
        "html5"
    }

    fn aliases(&self) -> &[&'static str] {
        &["html"]
    }

    fn default_attributes(&self) -> AttributeSet {
        AttributeSet::new()
            .with("imagesdir", "images")
            .with("lang", "en")
    }

    fn render(&self, deck: &Deck, attributes: &AttributeSet) -> Result<String, BackendError> {
        let imagesdir = attributes.text_or("imagesdir", "");
        let slides: Vec<RenderedSlide> = deck
            .slides
            .iter()
            .map(|slide| RenderedSlide::from_slide(slide, &imagesdir))
            .collect();

        let tmpl = self.env.get_template("html5.html")?;
        let html = tmpl.render(context! {
            lang => attributes.text_or("lang", "en"),
            title => deck.title.clone().unwrap_or_else(|| "Untitled".to_string()),
            subtitle => &deck.subtitle,
            author => &deck.author,
            preamble => render_markdown(&deck.preamble.body, &imagesdir),
            slides => slides,
            customcss => attributes.text("customcss"),
        })?;

        Ok(html)
    }
}

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="{{ lang }}">
<head>
  <meta charset="utf-8">
  <title>{{ title }}</title>
  {% if customcss %}<link rel="stylesheet" href="{{ customcss }}">
  {% endif %}</head>
<body>
<article>
  <header>
    <h1>{{ title }}</h1>
    {% if subtitle %}<p class="subtitle">{{ subtitle }}</p>
    {% endif %}{% if author %}<p class="author">{{ author }}</p>
    {% endif %}{{ preamble | safe }}
  </header>
{% for slide in slides %}  <section id="{{ slide.id }}">
    <h2>{{ slide.title | safe }}</h2>
    {{ slide.html | safe }}{% if slide.notes %}<div class="notes">{{ slide.notes | safe }}</div>
    {% endif %}{% for child in slide.children %}<section id="{{ child.id }}">
      <h3>{{ child.title | safe }}</h3>
      {{ child.html | safe }}{% if child.notes %}<div class="notes">{{ child.notes | safe }}</div>
      {% endif %}</section>
    {% endfor %}</section>
{% endfor %}</article>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_doc::segment;

    #[test]
    fn renders_sections_with_inline_notes() {
        let (preamble, slides) = segment("Intro\n\n## One\n\nBody\n\n::: notes\nSay it\n:::\n\n### Deeper\n\nMore\n");
        let deck = Deck {
            title: Some("Talk".to_string()),
            preamble,
            slides,
            ..Deck::default()
        };
        let backend = Html5Backend::new();

        let html = backend.render(&deck, &backend.default_attributes()).unwrap();

        assert!(html.contains("<h1>Talk</h1>"));
        assert!(html.contains("<p>Intro</p>"));
        assert!(html.contains(r#"<section id="one">"#));
        assert!(html.contains(r#"<div class="notes"><p>Say it</p>"#));
        assert!(html.contains("<h3>Deeper</h3>"));
        assert!(!html.contains("Reveal.initialize"));
    }
}
