//! plandoc library
//!
//! Section-targeted mutation of markdown plan, loop and chat documents,
//! plus the task, promotion and chat operations built on top of it.

pub mod api;
pub mod cli;
pub mod codec;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod logging;
pub mod ops;
pub mod types;
pub mod workspace;
