//! Markdown block positions for line-oriented passes.

use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    /// Top-level heading, level 1-6
    Heading(u8),
    Code,
    Html,
}

/// Source ranges of the blocks line passes must respect.
///
/// Headings are only recorded outside containers such as lists and block
/// quotes. Code and HTML blocks are recorded at any depth. Ranges never
/// overlap and are sorted by start offset.
#[derive(Debug)]
pub(crate) struct BlockMap {
    blocks: Vec<(Range<usize>, BlockKind)>,
}

impl BlockMap {
    pub(crate) fn new(source: &str) -> Self {
        let mut blocks = Vec::new();
        let mut depth = 0usize;

        for (event, range) in Parser::new_ext(source, options()).into_offset_iter() {
            match event {
                Event::Start(tag) => {
                    let kind = match tag {
                        Tag::Heading { level, .. } if depth == 0 => {
                            Some(BlockKind::Heading(heading_level(level)))
                        }
                        Tag::CodeBlock(_) => Some(BlockKind::Code),
                        Tag::HtmlBlock => Some(BlockKind::Html),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        blocks.push((range, kind));
                    }
                    depth += 1;
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        Self { blocks }
    }

    /// The block overlapping `line`, and whether it starts on that line.
    pub(crate) fn at(&self, line: Range<usize>) -> Option<(BlockKind, bool)> {
        let index = self.blocks.partition_point(|(range, _)| range.end <= line.start);
        let (range, kind) = self.blocks.get(index)?;
        (range.start < line.end).then(|| (*kind, range.start >= line.start))
    }

    /// Whether `line` is part of a code block, fences included.
    pub(crate) fn in_code(&self, line: Range<usize>) -> bool {
        matches!(self.at(line), Some((BlockKind::Code, _)))
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
