//! Chat message blocks.

use crate::document::{RecordBlock, locate_section, record_blocks};
use crate::types::{Actor, CHAT_HEADER, ChatMessage};
use chrono::{DateTime, FixedOffset};

const CONTINUATION_INDENT: &str = "    ";

/// Render a chat message block (no trailing newline).
///
/// Extra message lines are indented under the `message:` field.
pub fn encode_chat(message: &ChatMessage) -> String {
    let mut lines = message.message.split('\n');
    let first = lines.next().unwrap_or_default();
    let mut out = format!(
        "- timestamp: {}\n  speaker: {}\n  message: {}",
        message.timestamp,
        message.speaker.as_str(),
        first
    );
    for line in lines {
        out.push('\n');
        out.push_str(CONTINUATION_INDENT);
        out.push_str(line);
    }
    out
}

fn decode_chat_block(content: &str, block: &RecordBlock) -> Option<ChatMessage> {
    let timestamp = block.field("timestamp")?.to_string();
    let speaker = block.field("speaker").and_then(Actor::from_str)?;

    let mut message: Option<String> = None;
    for line in block.text(content).lines() {
        match message.as_mut() {
            None => {
                if let Some(first) = line.trim_start().strip_prefix("message:") {
                    message = Some(first.strip_prefix(' ').unwrap_or(first).to_string());
                }
            }
            Some(text) => match line.strip_prefix(CONTINUATION_INDENT) {
                Some(rest) => {
                    text.push('\n');
                    text.push_str(rest);
                }
                None => break,
            },
        }
    }

    Some(ChatMessage {
        timestamp,
        speaker,
        message: message.unwrap_or_default(),
    })
}

fn parse_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(ts).ok()
}

/// Parsed instants first, then unparseable stamps ordered as text.
fn sort_key(message: &ChatMessage) -> (bool, Option<DateTime<FixedOffset>>, String) {
    match parse_timestamp(&message.timestamp) {
        Some(at) => (false, Some(at), String::new()),
        None => (true, None, message.timestamp.clone()),
    }
}

/// Sort messages ascending by timestamp. Ties keep their on-disk order.
pub fn sort_messages(messages: &mut [ChatMessage]) {
    messages.sort_by_cached_key(sort_key);
}

/// Decode the chat messages of a document, sorted ascending by timestamp.
///
/// Documents with a chat section are read from that section only; documents
/// without one (raw-appended threads) are scanned whole.
pub fn decode_chat(content: &str) -> Vec<ChatMessage> {
    let range = locate_section(content, CHAT_HEADER)
        .map(|section| section.body_range())
        .unwrap_or(0..content.len());

    let mut messages: Vec<ChatMessage> = record_blocks(content, range)
        .iter()
        .filter_map(|block| decode_chat_block(content, block))
        .collect();
    sort_messages(&mut messages);
    messages
}
