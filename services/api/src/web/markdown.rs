//! services/api/src/web/markdown.rs
//!
//! Fallback parser for legacy articles whose outline or body predates
//! the structured editor and is stored as raw markdown. Produces a
//! best-effort structured rendering; it is lossy-tolerant and never
//! fails the request.

use pulldown_cmark::{Event, HeadingLevel as MdHeading, Parser, Tag, TagEnd};
use review_portal_core::domain::{Block, BlockKind, HeadingLevel, Section};

/// Renders a legacy markdown outline as ordered sections. Headings
/// become sections; the first paragraph after a heading becomes its
/// description. Anything deeper than H3 is clamped to H3.
pub fn sections_from_markdown(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut buffer = String::new();
    let mut in_heading: Option<HeadingLevel> = None;
    let mut in_paragraph = false;

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                in_heading = Some(clamp_level(level));
                buffer.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(level) = in_heading.take() {
                    sections.push(Section {
                        id: format!("md-h-{}", sections.len() + 1),
                        level,
                        title: buffer.trim().to_string(),
                        description: None,
                        estimated_words: None,
                    });
                    buffer.clear();
                }
            }
            Event::Start(Tag::Paragraph) => {
                in_paragraph = true;
                buffer.clear();
            }
            Event::End(TagEnd::Paragraph) => {
                in_paragraph = false;
                if let Some(last) = sections.last_mut() {
                    if last.description.is_none() {
                        let text = buffer.trim();
                        if !text.is_empty() {
                            last.description = Some(text.to_string());
                        }
                    }
                }
                buffer.clear();
            }
            Event::Text(t) | Event::Code(t) => {
                if in_heading.is_some() || in_paragraph {
                    buffer.push_str(&t);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if in_heading.is_some() || in_paragraph {
                    buffer.push(' ');
                }
            }
            _ => {}
        }
    }
    sections
}

/// Renders a legacy markdown body as ordered content blocks.
pub fn blocks_from_markdown(text: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut buffer = String::new();
    let mut in_heading = false;
    let mut in_paragraph = false;
    let mut in_image = false;
    let mut quote_depth = 0usize;

    let mut push_block = |blocks: &mut Vec<Block>, kind: BlockKind, text: &str| {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        blocks.push(Block {
            id: format!("md-b-{}", blocks.len() + 1),
            kind,
            text: text.to_string(),
        });
    };

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                in_heading = true;
                buffer.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                in_heading = false;
                push_block(&mut blocks, BlockKind::Header, &buffer);
                buffer.clear();
            }
            Event::Start(Tag::BlockQuote(_)) => {
                quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                quote_depth = quote_depth.saturating_sub(1);
            }
            Event::Start(Tag::Paragraph) => {
                in_paragraph = true;
                buffer.clear();
            }
            Event::End(TagEnd::Paragraph) => {
                in_paragraph = false;
                let kind = if quote_depth > 0 {
                    BlockKind::Quote
                } else {
                    BlockKind::Paragraph
                };
                push_block(&mut blocks, kind, &buffer);
                buffer.clear();
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                // The alt text that follows is swallowed; the block
                // carries the image URL.
                in_image = true;
                push_block(&mut blocks, BlockKind::Image, &dest_url);
            }
            Event::End(TagEnd::Image) => {
                in_image = false;
            }
            Event::Text(t) | Event::Code(t) => {
                if (in_heading || in_paragraph) && !in_image {
                    buffer.push_str(&t);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if (in_heading || in_paragraph) && !in_image {
                    buffer.push(' ');
                }
            }
            _ => {}
        }
    }
    blocks
}

fn clamp_level(level: MdHeading) -> HeadingLevel {
    match level {
        MdHeading::H1 => HeadingLevel::H1,
        MdHeading::H2 => HeadingLevel::H2,
        _ => HeadingLevel::H3,
    }
}
