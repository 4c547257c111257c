//! reveal.js presentation backend.

use minijinja::{context, Environment};
use serde_json::json;

use lectern_doc::{AttributeSet, Deck};

use crate::markdown::render_markdown;
use crate::traits::{Backend, BackendError, RenderedSlide};

/// Renders a deck as a reveal.js presentation page.
///
/// Recognised attributes:
/// - `revealjsdir`: where reveal.js lives relative to the page
/// - `revealjs_theme`: theme stylesheet name under `dist/theme/`
/// - `revealjs_controls`, `revealjs_progress`, `revealjs_slidenumber`,
///   `revealjs_hash`, `revealjs_center`: feature toggles
/// - `revealjs_transition`: default slide transition
/// - `source-highlighter`, `highlightjs-theme`: code highlighting
/// - `customcss`: extra stylesheet linked after the theme
/// - `imagesdir`: prefix for relative image URLs
pub struct RevealJsBackend {
    env: Environment<'static>,
}

impl RevealJsBackend {
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_template("revealjs.html", PAGE_TEMPLATE)
            .expect("Failed to add revealjs page template");
        env.add_template("slide.html", SLIDE_TEMPLATE)
            .expect("Failed to add revealjs slide template");

        Self { env }
    }

    /// The `Reveal.initialize` options object as inline script text.
    fn reveal_config(attributes: &AttributeSet, highlight: bool) -> String {
        let options = [
            ("controls", json!(attributes.flag("revealjs_controls"))),
            ("progress", json!(attributes.flag("revealjs_progress"))),
            ("slideNumber", json!(attributes.flag("revealjs_slidenumber"))),
            ("hash", json!(attributes.flag("revealjs_hash"))),
            ("center", json!(attributes.flag("revealjs_center"))),
            (
                "transition",
                json!(attributes.text_or("revealjs_transition", "slide")),
            ),
        ];

        let mut plugins = vec!["RevealNotes"];
        if highlight {
            plugins.push("RevealHighlight");
        }

        let mut out = String::from("{");
        for (key, value) in options {
            out.push_str(&format!("\"{}\":{},", key, escape_script(&value.to_string())));
        }
        // plugins are globals defined by the plugin scripts
        out.push_str(&format!("\"plugins\":[{}]}}", plugins.join(",")));
        out
    }
}

/// Keep JSON text from closing the surrounding `<script>` element.
fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/")
}

impl Default for RevealJsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RevealJsBackend {
    fn name(&self) -> &'static str {
        "revealjs"
    }

    fn aliases(&self) -> &[&'static str] {
        &["reveal.js", "reveal"]
    }

    fn default_attributes(&self) -> AttributeSet {
        AttributeSet::new()
            .with("revealjsdir", ".")
            .with("revealjs_theme", "black")
            .with("revealjs_controls", true)
            .with("revealjs_progress", true)
            .with("revealjs_slidenumber", false)
            .with("revealjs_hash", false)
            .with("revealjs_center", true)
            .with("revealjs_transition", "slide")
            .with("source-highlighter", "highlightjs")
            .with("highlightjs-theme", "monokai")
            .with("imagesdir", "images")
            .with("lang", "en")
    }

    fn render(&self, deck: &Deck, attributes: &AttributeSet) -> Result<String, BackendError> {
        let imagesdir = attributes.text_or("imagesdir", "");
        let revealjsdir = attributes.text_or("revealjsdir", ".");
        let revealjsdir = revealjsdir.trim_end_matches('/');
        let highlight = attributes.text("source-highlighter").as_deref() == Some("highlightjs");

        let slides: Vec<RenderedSlide> = deck
            .slides
            .iter()
            .map(|slide| RenderedSlide::from_slide(slide, &imagesdir))
            .collect();

        let preamble = render_markdown(&deck.preamble.body, &imagesdir);
        let preamble_notes = deck
            .preamble
            .notes
            .as_deref()
            .map(|notes| render_markdown(notes, &imagesdir));
        let has_title_slide =
            deck.title.is_some() || !deck.preamble.body.is_empty() || preamble_notes.is_some();

        let tmpl = self.env.get_template("revealjs.html")?;
        let html = tmpl.render(context! {
            lang => attributes.text_or("lang", "en"),
            title => deck.title.clone().unwrap_or_else(|| "Untitled".to_string()),
            subtitle => &deck.subtitle,
            author => &deck.author,
            has_title_slide => has_title_slide,
            preamble => preamble,
            preamble_notes => preamble_notes,
            slides => slides,
            revealjsdir => revealjsdir,
            theme => attributes.text_or("revealjs_theme", "black"),
            customcss => attributes.text("customcss"),
            highlight => highlight,
            highlight_theme => attributes.text_or("highlightjs-theme", "monokai"),
            reveal_config => Self::reveal_config(attributes, highlight),
        })?;

        Ok(html)
    }
}

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="{{ lang }}">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no">
  <title>{{ title }}</title>
  {% if author %}<meta name="author" content="{{ author }}">
  {% endif %}<link rel="stylesheet" href="{{ revealjsdir }}/dist/reset.css">
  <link rel="stylesheet" href="{{ revealjsdir }}/dist/reveal.css">
  <link rel="stylesheet" href="{{ revealjsdir }}/dist/theme/{{ theme }}.css" id="theme">
  {% if highlight %}<link rel="stylesheet" href="{{ revealjsdir }}/plugin/highlight/{{ highlight_theme }}.css">
  {% endif %}{% if customcss %}<link rel="stylesheet" href="{{ customcss }}">
  {% endif %}</head>
<body>
  <div class="reveal">
    <div class="slides">
{% if has_title_slide %}      <section class="title" data-state="title">
        <h1>{{ title }}</h1>
        {% if subtitle %}<h2>{{ subtitle }}</h2>
        {% endif %}{% if author %}<p class="author"><small>{{ author }}</small></p>
        {% endif %}{{ preamble | safe }}{% if preamble_notes %}<aside class="notes">{{ preamble_notes | safe }}</aside>
        {% endif %}</section>
{% endif %}{% for slide in slides %}{% if slide.children %}      <section>
{% include "slide.html" %}{% for slide in slide.children %}{% include "slide.html" %}{% endfor %}      </section>
{% else %}{% include "slide.html" %}{% endif %}{% endfor %}    </div>
  </div>
  <script src="{{ revealjsdir }}/dist/reveal.js"></script>
  <script src="{{ revealjsdir }}/plugin/notes/notes.js"></script>
  {% if highlight %}<script src="{{ revealjsdir }}/plugin/highlight/highlight.js"></script>
  {% endif %}<script>
    Reveal.initialize({{ reveal_config | safe }});
  </script>
</body>
</html>
"##;

const SLIDE_TEMPLATE: &str = r##"      <section id="{{ slide.id }}"{% if slide.classes %} class="{{ slide.classes }}"{% endif %}{% for key, value in slide.data | items %} {{ key }}="{{ value }}"{% endfor %}>
        <h2>{{ slide.title | safe }}</h2>
        {{ slide.html | safe }}{% if slide.notes %}<aside class="notes">{{ slide.notes | safe }}</aside>
        {% endif %}</section>
"##;
