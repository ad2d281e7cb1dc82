//! HTTP console API.
//!
//! A thin JSON surface over [`crate::ops`]. Handlers call the synchronous
//! engine directly; each request is a short burst of file I/O.

mod error;
mod server;

pub use error::status_for;
pub use server::{ApiServer, build_router, serve, start_server};
