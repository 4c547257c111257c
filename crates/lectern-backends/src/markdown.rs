//! Markdown rendering shared by the backends.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Render Markdown to HTML, prefixing relative image URLs with `imagesdir`.
pub fn render_markdown(content: &str, imagesdir: &str) -> String {
    let parser = Parser::new_ext(content, options()).map(|event| match event {
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: resolve_image(dest_url, imagesdir),
            title,
            id,
        }),
        other => other,
    });

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}

/// Render a single line of inline Markdown without the paragraph wrapper.
pub fn render_inline(text: &str) -> String {
    let rendered = render_markdown(text, "");
    let trimmed = rendered.trim_end();
    trimmed
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
        .unwrap_or(trimmed)
        .to_string()
}

fn resolve_image<'a>(url: CowStr<'a>, imagesdir: &str) -> CowStr<'a> {
    let dir = imagesdir.trim_end_matches('/');
    if dir.is_empty() || !is_relative_url(&url) {
        return url;
    }
    CowStr::from(format!("{}/{}", dir, url))
}

fn is_relative_url(url: &str) -> bool {
    !(url.starts_with('/') || url.starts_with('#') || url.starts_with("data:") || url.contains("://"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_markdown() {
        let html = render_markdown("Hello **world**\n\n```java\nrecord Point(int x) {}\n```", "");

        assert!(html.contains("<p>Hello <strong>world</strong></p>"));
        assert!(html.contains(r#"<code class="language-java">"#));
    }

    #[test]
    fn prefixes_relative_images() {
        let html = render_markdown("![diagram](arch.png) ![logo](https://x.org/l.png)", "images/");

        assert!(html.contains(r#"src="images/arch.png""#));
        assert!(html.contains(r#"src="https://x.org/l.png""#));
    }

    #[test]
    fn renders_inline_titles() {
        assert_eq!(render_inline("Using `sealed`"), "Using <code>sealed</code>");
        assert_eq!(render_inline("A & B"), "A &amp; B");
    }
}
