//! Structural parse of a document into typed line nodes and record blocks.
//!
//! Lets callers target a record by its identifier instead of an exact-text
//! needle, so formatting drift on disk does not break updates.

use super::section::{heading_level, is_fence, lines, locate_section};
use regex_lite::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[-*+]\s+(.*)$").expect("valid list item regex"));
static METADATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*):(?:\s(.*))?$").expect("valid metadata regex")
});
static BACKTICK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\s]+)`").expect("valid backtick regex"));

/// Kind of a single line node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Heading { level: usize, text: String },
    ListItem { indent: usize, text: String },
    Metadata { key: String, value: String },
    Fence,
    Blank,
    Text,
}

/// One typed line of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Byte range of the line text, without terminator.
    pub range: Range<usize>,
    /// Byte range including the line terminator.
    pub line_range: Range<usize>,
}

/// Parse `content` into line nodes. Lines inside code fences are `Text`.
pub fn parse_nodes(content: &str) -> Vec<Node> {
    let mut in_fence = false;
    lines(content)
        .map(|line| {
            let kind = if is_fence(line.text) {
                in_fence = !in_fence;
                NodeKind::Fence
            } else if in_fence {
                NodeKind::Text
            } else if line.text.trim().is_empty() {
                NodeKind::Blank
            } else if let Some(level) = heading_level(line.text) {
                NodeKind::Heading {
                    level,
                    text: line.text.to_string(),
                }
            } else if let Some(caps) = LIST_ITEM.captures(line.text) {
                NodeKind::ListItem {
                    indent: caps[1].len(),
                    text: caps[2].to_string(),
                }
            } else if line.text.starts_with(char::is_whitespace)
                && let Some(caps) = METADATA.captures(line.text)
            {
                NodeKind::Metadata {
                    key: caps[1].to_string(),
                    value: caps.get(2).map_or("", |m| m.as_str()).to_string(),
                }
            } else {
                NodeKind::Text
            };
            Node {
                kind,
                range: line.start..line.text_end(),
                line_range: line.start..line.end,
            }
        })
        .collect()
}

/// A top-level list item plus its indented continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBlock {
    /// Byte range of the block text, without the final line terminator.
    pub range: Range<usize>,
    /// Byte range including the final line terminator.
    pub line_range: Range<usize>,
    /// Text after the list marker on the first line.
    pub bullet: String,
    /// `key: value` pairs from the bullet line and continuation lines, in order.
    pub fields: Vec<(String, String)>,
    /// Identifier from an `id:` field, or the first backticked token on the bullet line.
    pub id: Option<String>,
}

impl RecordBlock {
    pub fn text<'a>(&self, content: &'a str) -> &'a str {
        &content[self.range.clone()]
    }

    /// First value recorded for `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Group the record blocks found within `range` of `content`.
///
/// A block begins at a list item with no indentation and extends over the
/// following indented lines; a blank line, heading or unindented line ends it.
pub fn record_blocks(content: &str, range: Range<usize>) -> Vec<RecordBlock> {
    let nodes = parse_nodes(&content[range.clone()]);
    let base = range.start;
    let mut blocks = Vec::new();
    let mut current: Option<RecordBlock> = None;

    for node in nodes {
        let indented = content[base + node.range.start..].starts_with(char::is_whitespace);
        match &node.kind {
            NodeKind::ListItem { indent: 0, text } => {
                if let Some(done) = current.take() {
                    blocks.push(finish_block(done));
                }
                let mut block = RecordBlock {
                    range: base + node.range.start..base + node.range.end,
                    line_range: base + node.line_range.start..base + node.line_range.end,
                    bullet: text.clone(),
                    fields: Vec::new(),
                    id: None,
                };
                if let Some(caps) = METADATA.captures(text) {
                    block.fields.push((
                        caps[1].to_string(),
                        caps.get(2).map_or("", |m| m.as_str()).to_string(),
                    ));
                }
                current = Some(block);
            }
            NodeKind::Metadata { key, value } if current.is_some() => {
                if let Some(block) = current.as_mut() {
                    block.fields.push((key.clone(), value.clone()));
                    extend_block(block, base, &node);
                }
            }
            // A whitespace-only line indented as deep as a continuation keeps the block open.
            NodeKind::Blank if indented && node.range.len() >= 4 && current.is_some() => {
                if let Some(block) = current.as_mut() {
                    extend_block(block, base, &node);
                }
            }
            NodeKind::ListItem { .. } | NodeKind::Text if indented && current.is_some() => {
                if let Some(block) = current.as_mut() {
                    extend_block(block, base, &node);
                }
            }
            _ => {
                if let Some(done) = current.take() {
                    blocks.push(finish_block(done));
                }
            }
        }
    }
    if let Some(done) = current.take() {
        blocks.push(finish_block(done));
    }
    blocks
}

fn extend_block(block: &mut RecordBlock, base: usize, node: &Node) {
    block.range.end = base + node.range.end;
    block.line_range.end = base + node.line_range.end;
}

fn finish_block(mut block: RecordBlock) -> RecordBlock {
    block.id = block
        .field("id")
        .map(str::to_string)
        .or_else(|| {
            BACKTICK_ID
                .captures(&block.bullet)
                .map(|caps| caps[1].to_string())
        });
    block
}

/// Record blocks of the section under `header`, or `None` if the header is absent.
pub fn section_records(content: &str, header: &str) -> Option<Vec<RecordBlock>> {
    locate_section(content, header).map(|section| record_blocks(content, section.body_range()))
}

/// The record with identifier `id` under `header`.
///
/// A block carrying an `id:` field wins over an earlier bullet that only
/// mentions the id in backticks.
pub fn find_record(content: &str, header: &str, id: &str) -> Option<RecordBlock> {
    let blocks = section_records(content, header)?;
    let index = blocks
        .iter()
        .position(|block| block.field("id") == Some(id))
        .or_else(|| {
            blocks
                .iter()
                .position(|block| block.id.as_deref() == Some(id))
        })?;
    blocks.into_iter().nth(index)
}
