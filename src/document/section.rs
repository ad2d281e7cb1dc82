//! Section and record location over raw document text.
//!
//! A section starts at a line exactly equal to its header and runs until the
//! next heading of equal or higher level (fewer or equal `#`), or EOF.
//! Records are located by literal substring match inside a section body.

use std::ops::Range;

/// One line of a document with its byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Offset of the first byte of the line.
    pub start: usize,
    /// Offset just past the line terminator (or EOF).
    pub end: usize,
    /// Line text without `\n` / `\r\n`.
    pub text: &'a str,
}

impl Line<'_> {
    /// Offset just past the last byte of `text`.
    pub fn text_end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Iterate the lines of `content` with byte offsets.
pub fn lines(content: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    content.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let text = raw.strip_suffix('\n').unwrap_or(raw);
        let text = text.strip_suffix('\r').unwrap_or(text);
        Line {
            start,
            end: offset,
            text,
        }
    })
}

/// Heading level of a markdown ATX heading line (`#` .. `######`).
pub fn heading_level(line: &str) -> Option<usize> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    match line.as_bytes().get(hashes) {
        None | Some(b' ') | Some(b'\t') => Some(hashes),
        _ => None,
    }
}

/// Whether a line opens or closes a fenced code block.
pub fn is_fence(line: &str) -> bool {
    let indent = line.bytes().take_while(|b| *b == b' ').count();
    if indent > 3 {
        return false;
    }
    let rest = &line[indent..];
    rest.starts_with("```") || rest.starts_with("~~~")
}

/// Byte layout of a located section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange {
    /// Offset of the header line.
    pub header_start: usize,
    /// Offset just past the header line terminator.
    pub body_start: usize,
    /// Offset of the next terminating heading, or EOF.
    pub body_end: usize,
    /// Level of the header itself; `None` when the header is not a heading.
    pub level: Option<usize>,
}

impl SectionRange {
    pub fn body_range(&self) -> Range<usize> {
        self.body_start..self.body_end
    }

    pub fn body<'a>(&self, content: &'a str) -> &'a str {
        &content[self.body_range()]
    }

    /// Whether `level` terminates this section.
    fn ends_at(&self, level: usize) -> bool {
        self.level.is_none_or(|own| level <= own)
    }
}

/// Locate the first line exactly equal to `header` and the extent of its section.
///
/// Heading-like lines inside fenced code blocks are ignored.
pub fn locate_section(content: &str, header: &str) -> Option<SectionRange> {
    let mut in_fence = false;
    let mut found: Option<SectionRange> = None;

    for line in lines(content) {
        if is_fence(line.text) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        match found {
            None => {
                if line.text == header {
                    found = Some(SectionRange {
                        header_start: line.start,
                        body_start: line.end,
                        body_end: content.len(),
                        level: heading_level(header),
                    });
                }
            }
            Some(mut section) => {
                if let Some(level) = heading_level(line.text)
                    && section.ends_at(level)
                {
                    section.body_end = line.start;
                    return Some(section);
                }
            }
        }
    }

    found
}

/// Whether `header` appears as a line anywhere outside code fences.
pub fn has_header(content: &str, header: &str) -> bool {
    locate_section(content, header).is_some()
}

/// First literal occurrence of `exact_text` inside `section_body`.
///
/// Matching is whitespace- and formatting-sensitive. An empty needle never matches.
pub fn locate_record(section_body: &str, exact_text: &str) -> Option<Range<usize>> {
    if exact_text.is_empty() {
        return None;
    }
    section_body
        .find(exact_text)
        .map(|start| start..start + exact_text.len())
}

/// Insert `text` at the end of a section's content.
///
/// The text goes on its own line(s) directly after the last non-blank line of
/// the body, or directly under the header when the body is blank. Trailing
/// blank lines of the section and everything outside it are left untouched.
pub fn append_within(content: &str, section: &SectionRange, text: &str) -> String {
    let text = text.trim_end_matches(['\n', '\r']);
    let body = section.body(content);

    let last_text_end = lines(body)
        .filter(|line| !line.text.trim().is_empty())
        .last()
        .map(|line| section.body_start + line.text_end());

    let mut out = String::with_capacity(content.len() + text.len() + 2);
    match last_text_end {
        Some(at) => {
            out.push_str(&content[..at]);
            out.push('\n');
            out.push_str(text);
            out.push_str(&content[at..]);
        }
        None => {
            let at = section.body_start;
            out.push_str(&content[..at]);
            if !content[..at].ends_with('\n') {
                out.push('\n');
            }
            out.push_str(text);
            out.push('\n');
            out.push_str(&content[at..]);
        }
    }
    out
}

/// Replace `range` (absolute offsets) of `content` with `replacement`.
pub fn splice(content: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(content.len() + replacement.len());
    out.push_str(&content[..range.start]);
    out.push_str(replacement);
    out.push_str(&content[range.end..]);
    out
}
