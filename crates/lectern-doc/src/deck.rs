//! Slide segmentation.
//!
//! Text before the first level-two heading is the title-slide preamble. Every
//! level-two heading starts a horizontal slide and every level-three heading
//! below it a vertical child slide. Headings are found by the Markdown parser,
//! so those inside code, HTML blocks, lists or quotes never split. A heading may end in an attribute block such as
//! `{.center #intro data-background-color=#222}`. Speaker notes live between
//! `::: notes` and `:::`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::blocks::{BlockKind, BlockMap};

/// A segmented slide deck.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Deck {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,

    /// Content shown on the title slide
    pub preamble: Slide,

    /// Horizontal slides in order
    pub slides: Vec<Slide>,
}

impl Deck {
    /// Total number of slides, title slide and vertical slides included.
    pub fn slide_count(&self) -> usize {
        1 + self
            .slides
            .iter()
            .map(|s| 1 + s.children.len())
            .sum::<usize>()
    }
}

/// One slide and, for horizontal slides, its vertical children.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Slide {
    pub title: String,
    pub id: String,
    pub classes: Vec<String>,

    /// `data-*` attributes, keys include the `data-` prefix
    pub data: BTreeMap<String, String>,

    /// Markdown body, heading excluded
    pub body: String,

    /// Speaker notes in Markdown
    pub notes: Option<String>,

    pub children: Vec<Slide>,
}

impl Slide {
    fn from_heading(heading: Heading, ids: &mut SlideIds) -> Self {
        let id = ids.assign(heading.id, &heading.title);
        Self {
            title: heading.title,
            id,
            classes: heading.classes,
            data: heading.data,
            ..Self::default()
        }
    }

    fn push_body(&mut self, line: &str) {
        self.body.push_str(line);
        self.body.push('\n');
    }

    fn push_note(&mut self, line: &str) {
        let notes = self.notes.get_or_insert_with(String::new);
        notes.push_str(line);
        notes.push('\n');
    }

    fn finish(&mut self) {
        self.body = self.body.trim_matches('\n').to_string();
        if let Some(notes) = self.notes.take() {
            let notes = notes.trim_matches('\n');
            if !notes.is_empty() {
                self.notes = Some(notes.to_string());
            }
        }
    }
}

/// Hands out slide ids that are unique within a deck.
///
/// Explicit ids are kept as written. Derived ids get a numeric suffix when
/// taken and fall back to `slide-N` when the title has no usable characters.
#[derive(Debug, Default)]
struct SlideIds {
    used: BTreeSet<String>,
    count: usize,
}

impl SlideIds {
    fn assign(&mut self, explicit: Option<String>, title: &str) -> String {
        self.count += 1;
        if let Some(id) = explicit {
            self.used.insert(id.clone());
            return id;
        }

        let base = match slugify(title) {
            slug if slug.is_empty() => format!("slide-{}", self.count),
            slug => slug,
        };
        let mut id = base.clone();
        let mut n = 1;
        while self.used.contains(&id) {
            n += 1;
            id = format!("{}-{}", base, n);
        }
        self.used.insert(id.clone());
        id
    }
}

/// Split a document body into a title preamble and slides.
pub fn segment(body: &str) -> (Slide, Vec<Slide>) {
    let blocks = BlockMap::new(body);
    let mut ids = SlideIds::default();
    let mut preamble = Slide::default();
    let mut flat: Vec<(u8, Slide)> = Vec::new();
    let mut in_notes = false;
    let mut offset = 0;

    for raw in body.split_inclusive('\n') {
        let span = offset..offset + raw.len();
        offset = span.end;
        let line = raw.trim_end_matches(['\n', '\r']);
        let block = blocks.at(span);
        let in_code = matches!(block, Some((BlockKind::Code, _)));

        let has_slides = !flat.is_empty();
        let current = match flat.last_mut() {
            Some((_, slide)) => slide,
            None => &mut preamble,
        };

        if in_notes {
            if !in_code && line.trim() == ":::" {
                in_notes = false;
            } else {
                current.push_note(line);
            }
            continue;
        }

        match block {
            Some((BlockKind::Heading(level @ (2 | 3)), starts_here))
                if level == 2 || has_slides =>
            {
                if starts_here {
                    flat.push((level, Slide::from_heading(parse_heading(line), &mut ids)));
                }
                // the underline of a setext heading is dropped
            }
            Some((BlockKind::Code | BlockKind::Html, _)) => current.push_body(line),
            _ if is_notes_open(line) => in_notes = true,
            _ => current.push_body(line),
        }
    }

    preamble.finish();

    let mut slides: Vec<Slide> = Vec::new();
    for (level, mut slide) in flat {
        slide.finish();
        match (level, slides.last_mut()) {
            (3, Some(parent)) => parent.children.push(slide),
            _ => slides.push(slide),
        }
    }

    (preamble, slides)
}

fn is_notes_open(line: &str) -> bool {
    line.trim()
        .strip_prefix(":::")
        .is_some_and(|rest| rest.trim() == "notes")
}

/// A parsed slide heading.
#[derive(Debug, Default, PartialEq)]
struct Heading {
    title: String,
    id: Option<String>,
    classes: Vec<String>,
    data: BTreeMap<String, String>,
}

/// Parse the first line of a heading, ATX or setext.
fn parse_heading(line: &str) -> Heading {
    let line = line.trim();
    let mut text = match line.strip_prefix('#') {
        Some(_) => line
            .trim_start_matches('#')
            .trim()
            .trim_end_matches('#')
            .trim_end()
            .to_string(),
        None => line.to_string(),
    };
    let mut heading = Heading::default();

    if text.ends_with('}') {
        if let Some(open) = text.rfind('{') {
            let block = text[open + 1..text.len() - 1].to_string();
            text.truncate(open);
            apply_attribute_block(&mut heading, &block);
        }
    }

    heading.title = text.trim().to_string();
    heading
}

fn apply_attribute_block(heading: &mut Heading, block: &str) {
    for token in block.split_whitespace() {
        if let Some(class) = token.strip_prefix('.') {
            heading.classes.push(class.to_string());
        } else if let Some(id) = token.strip_prefix('#') {
            heading.id = Some(id.to_string());
        } else if let Some((key, value)) = token.split_once('=') {
            let key = if key.starts_with("data-") {
                key.to_string()
            } else {
                format!("data-{}", key)
            };
            heading
                .data
                .insert(key, value.trim_matches('"').to_string());
        }
    }
}

/// Convert a heading to a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn segments_horizontal_and_vertical_slides() {
        let body = r#"Welcome to the talk.

## Sealed hierarchies

Closed sets of cases.

### Exhaustive matching

The compiler checks every branch.

## Records

Data carriers.
"#;

        let (preamble, slides) = segment(body);

        assert_eq!(preamble.body, "Welcome to the talk.");
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].title, "Sealed hierarchies");
        assert_eq!(slides[0].id, "sealed-hierarchies");
        assert_eq!(slides[0].body, "Closed sets of cases.");
        assert_eq!(slides[0].children.len(), 1);
        assert_eq!(slides[0].children[0].title, "Exhaustive matching");
        assert_eq!(slides[1].title, "Records");
        assert!(slides[1].children.is_empty());
    }

    #[test]
    fn headings_in_code_do_not_split() {
        let body = "## Code\n\n```python\n## comment\n### another\n```\n";

        let (_, slides) = segment(body);

        assert_eq!(slides.len(), 1);
        assert!(slides[0].body.contains("## comment"));
        assert!(slides[0].children.is_empty());
    }

    #[test]
    fn extracts_speaker_notes() {
        let body = "## Intro\n\nVisible\n\n::: notes\nRemember to breathe.\n:::\n\nAlso visible\n";

        let (_, slides) = segment(body);

        assert_eq!(slides[0].notes.as_deref(), Some("Remember to breathe."));
        assert!(slides[0].body.contains("Visible"));
        assert!(slides[0].body.contains("Also visible"));
        assert!(!slides[0].body.contains("breathe"));
    }

    #[test]
    fn parses_heading_attribute_blocks() {
        let body = "## Big Idea {.center #idea background-color=#222 data-transition=\"zoom\"}\n";

        let (_, slides) = segment(body);
        let slide = &slides[0];

        assert_eq!(slide.title, "Big Idea");
        assert_eq!(slide.id, "idea");
        assert_eq!(slide.classes, vec!["center".to_string()]);
        assert_eq!(
            slide.data.get("data-background-color").map(String::as_str),
            Some("#222")
        );
        assert_eq!(
            slide.data.get("data-transition").map(String::as_str),
            Some("zoom")
        );
    }

    #[test]
    fn level_three_before_any_slide_stays_in_preamble() {
        let (preamble, slides) = segment("### Orphan\ntext\n");

        assert!(slides.is_empty());
        assert_eq!(preamble.body, "### Orphan\ntext");
    }

    #[test]
    fn commented_out_slides_stay_in_the_comment() {
        let body = "## Real\n\nShown\n\n<!--\n## Draft slide\n\nnot ready\n-->\n\n## Next\n";

        let (_, slides) = segment(body);

        let titles: Vec<_> = slides.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Real", "Next"]);
        assert_eq!(
            slides[0].body,
            "Shown\n\n<!--\n## Draft slide\n\nnot ready\n-->"
        );
    }

    #[test]
    fn indented_headings_split() {
        let (_, slides) = segment("## One\n\n   ## Two\n");

        let titles: Vec<_> = slides.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[test]
    fn setext_headings_split() {
        let (_, slides) = segment("Intro\n\nSecond\n------\n\nbody\n");

        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, "Second");
        assert_eq!(slides[0].body, "body");
    }

    #[test]
    fn headings_in_lists_do_not_split() {
        let (_, slides) = segment("## Agenda\n\n- ## not a slide\n");

        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].body, "- ## not a slide");
    }

    #[test]
    fn slide_ids_are_unique() {
        let body = "## Named {#example-2}\n\n## Example\n\n## Example\n\n### ???\n";

        let (_, slides) = segment(body);

        assert_eq!(slides[0].id, "example-2");
        assert_eq!(slides[1].id, "example");
        assert_eq!(slides[2].id, "example-3");
        assert_eq!(slides[2].children[0].id, "slide-4");
    }

    #[test]
    fn slugify_works() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Sealed (Closed) Types"), "sealed-closed-types");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
    }
}
