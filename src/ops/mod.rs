//! Caller-level operations over a [`Workspace`](crate::workspace::Workspace).
//!
//! Each operation validates its input, drives the mutation engine and records
//! the outcome in the interaction log.

pub mod chat;
pub mod promote;
pub mod tasks;

pub use chat::{ChatTarget, list_chat, post_chat};
pub use promote::{RecoveryReport, loop_template, promote_task, recover_intents};
pub use tasks::{
    NewTask, TaskPatch, create_task, delete_task, get_task, list_tasks, rewrite_tasks, update_task,
};
