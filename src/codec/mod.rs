//! Record codec: converts tasks and chat messages to and from their
//! canonical textual blocks inside document sections.

pub mod chat;
pub mod task;

pub use chat::{decode_chat, encode_chat, sort_messages};
pub use task::{
    PLAN_TEMPLATE, decode_plan, decode_section, decode_task_block, encode, encode_task,
    render_plan,
};
