//! Chat on loop and thread documents.

use crate::codec::{decode_chat, encode_chat};
use crate::error::{EngineError, EngineResult};
use crate::types::{Actor, CHAT_HEADER, ChatMessage};
use crate::workspace::Workspace;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Where a chat message goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ChatTarget {
    /// The `## 💬 Chat` section of a loop document.
    Loop(String),
    /// A free-form thread document, appended raw.
    Thread(String),
}

impl ChatTarget {
    fn path(&self, ws: &Workspace) -> EngineResult<PathBuf> {
        match self {
            ChatTarget::Loop(id) => ws.loop_path(id),
            ChatTarget::Thread(id) => ws.thread_path(id),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ChatTarget::Loop(id) | ChatTarget::Thread(id) => id,
        }
    }
}

fn append_message(ws: &Workspace, target: &ChatTarget, message: &ChatMessage) -> EngineResult<()> {
    let path = target.path(ws)?;
    let block = encode_chat(message);
    match target {
        // Loops are created by promotion; chat never creates one.
        ChatTarget::Loop(_) => ws.engine().append_to_section(&path, CHAT_HEADER, &block, None),
        ChatTarget::Thread(_) => ws.engine().append_raw(&path, &block),
    }
}

/// Append a message from `speaker`, stamped with the current time.
pub fn post_chat(
    ws: &Workspace,
    target: &ChatTarget,
    speaker: Actor,
    message: &str,
) -> EngineResult<ChatMessage> {
    let result = if message.trim().is_empty() {
        Err(EngineError::MissingRequiredField("message".into()))
    } else {
        let entry = ChatMessage {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            speaker,
            message: message.trim_end().replace("\r\n", "\n"),
        };
        append_message(ws, target, &entry).map(|()| entry)
    };
    if result.is_ok() {
        info!(chat = ?target, speaker = speaker.as_str(), "Posted chat message");
    }
    ws.record("post_chat", target.id(), speaker.as_str(), &result, None);
    result
}

/// Messages of `target` in timestamp order. A missing document has none.
pub fn list_chat(ws: &Workspace, target: &ChatTarget) -> EngineResult<Vec<ChatMessage>> {
    let path = target.path(ws)?;
    match ws.engine().read(&path) {
        Ok(doc) => Ok(decode_chat(&doc.content)),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GuardConfig, StorageConfig};
    use crate::ops::promote::loop_template;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Workspace) {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::from_storage(StorageConfig::rooted_at(temp.path()), GuardConfig::default());
        (temp, ws)
    }

    fn write_loop(ws: &Workspace, id: &str, content: &str) {
        let path = ws.loop_path(id).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn loop_chat_lands_in_chat_section() {
        let (_temp, ws) = workspace();
        write_loop(&ws, "loop-7", &loop_template("loop-7"));
        let target = ChatTarget::Loop("loop-7".into());
        post_chat(&ws, &target, Actor::User, "hello").unwrap();

        let content = std::fs::read_to_string(ws.loop_path("loop-7").unwrap()).unwrap();
        assert!(content.starts_with("# loop-7\n"));
        assert!(content.contains("## 💬 Chat\n- timestamp: "));

        let messages = list_chat(&ws, &target).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "hello");
    }

    #[test]
    fn missing_loop_is_not_created() {
        let (_temp, ws) = workspace();
        let err = post_chat(&ws, &ChatTarget::Loop("ghost".into()), Actor::User, "hi").unwrap_err();
        assert!(err.is_not_found());
        assert!(!ws.loop_path("ghost").unwrap().exists());
    }

    #[test]
    fn loop_without_chat_header_is_section_not_found() {
        let (_temp, ws) = workspace();
        let bare = "# bare\n\n## 🔧 Tasks\n";
        write_loop(&ws, "bare", bare);
        let err = post_chat(&ws, &ChatTarget::Loop("bare".into()), Actor::User, "hi").unwrap_err();
        assert!(matches!(err, EngineError::SectionNotFound { .. }));
        assert_eq!(std::fs::read_to_string(ws.loop_path("bare").unwrap()).unwrap(), bare);
    }

    #[test]
    fn thread_chat_preserves_multiline_messages() {
        let (_temp, ws) = workspace();
        let target = ChatTarget::Thread("t1".into());
        post_chat(&ws, &target, Actor::Agent, "line one\n\nline three").unwrap();
        post_chat(&ws, &target, Actor::User, "reply").unwrap();

        let messages = list_chat(&ws, &target).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message, "line one\n\nline three");
        assert_eq!(messages[1].speaker, Actor::User);
    }

    #[test]
    fn empty_messages_and_missing_documents() {
        let (_temp, ws) = workspace();
        let target = ChatTarget::Thread("quiet".into());
        assert!(list_chat(&ws, &target).unwrap().is_empty());

        let err = post_chat(&ws, &target, Actor::User, "   ").unwrap_err();
        assert!(matches!(err, EngineError::MissingRequiredField(_)));
        assert!(!ws.thread_path("quiet").unwrap().exists());
    }
}
