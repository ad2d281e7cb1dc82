//! Core types for plan, loop and chat documents.

use serde::{Deserialize, Serialize};

/// Section headers shared between callers and the engine. Byte-for-byte contract.
pub const USER_TASKS_HEADER: &str = "### User-Defined Tasks";
pub const ORA_TASKS_HEADER: &str = "### Ora-Suggested Tasks";
pub const LOOP_TASKS_HEADER: &str = "## 🔧 Tasks";
pub const EXECUTION_LOG_HEADER: &str = "## 🧾 Execution Log";
pub const CHAT_HEADER: &str = "## 💬 Chat";

/// Headers every loop document must carry.
pub const LOOP_REQUIRED_HEADERS: &[&str] = &[LOOP_TASKS_HEADER, EXECUTION_LOG_HEADER, CHAT_HEADER];

/// Who created a task or spoke a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    User,
    Agent,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::User => "user",
            Actor::Agent => "agent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Actor::User),
            "agent" => Some(Actor::Agent),
            _ => None,
        }
    }
}

/// Lifecycle status of a plan task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Done,
    Rejected,
    Promoted,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Done => "done",
            TaskStatus::Rejected => "rejected",
            TaskStatus::Promoted => "promoted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "done" => Some(TaskStatus::Done),
            "rejected" => Some(TaskStatus::Rejected),
            "promoted" => Some(TaskStatus::Promoted),
            _ => None,
        }
    }
}

/// Which of the two fixed plan sections a task lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSection {
    UserDefined,
    OraSuggested,
}

impl PlanSection {
    pub const ALL: [PlanSection; 2] = [PlanSection::UserDefined, PlanSection::OraSuggested];

    pub fn header(&self) -> &'static str {
        match self {
            PlanSection::UserDefined => USER_TASKS_HEADER,
            PlanSection::OraSuggested => ORA_TASKS_HEADER,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSection::UserDefined => "user_defined",
            PlanSection::OraSuggested => "ora_suggested",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user_defined" => Some(PlanSection::UserDefined),
            "ora_suggested" => Some(PlanSection::OraSuggested),
            _ => None,
        }
    }

    /// Default section for a task created by `actor`.
    pub fn for_actor(actor: Actor) -> Self {
        match actor {
            Actor::User => PlanSection::UserDefined,
            Actor::Agent => PlanSection::OraSuggested,
        }
    }
}

/// A task record in the plan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub added_by: Actor,
    #[serde(default)]
    pub status: TaskStatus,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub section: PlanSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_to: Option<String>,
}

/// A single chat message inside a loop or thread document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub speaker: Actor,
    pub message: String,
}

/// Result of validating a document against its required headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub valid: bool,
    /// Every required header absent from the document.
    pub errors: Vec<String>,
}

/// Summary of a completed promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionSummary {
    pub task_id: String,
    pub destination: String,
    pub destination_path: String,
}

/// Summary of a bulk task rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteSummary {
    pub previous_count: usize,
    pub written_count: usize,
    pub backup_path: String,
}
