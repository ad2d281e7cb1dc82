//! Chat subcommands.

use super::parse_actor;
use crate::ops::ChatTarget;
use crate::types::Actor;
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum ChatCommand {
    /// Append a message
    Post {
        #[command(flatten)]
        target: TargetArgs,

        /// Speaker (default: the global --actor)
        #[arg(long, value_parser = parse_actor)]
        speaker: Option<Actor>,

        /// Message text; may span lines
        #[arg(short, long)]
        message: String,
    },

    /// Print messages in timestamp order
    List {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Exactly one of `--loop` or `--thread`.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Loop document id
    #[arg(long = "loop", value_name = "LOOP_ID")]
    pub loop_id: Option<String>,

    /// Thread document id
    #[arg(long = "thread", value_name = "THREAD_ID")]
    pub thread_id: Option<String>,
}

impl TargetArgs {
    pub fn target(&self) -> ChatTarget {
        match (&self.loop_id, &self.thread_id) {
            (Some(id), _) => ChatTarget::Loop(id.clone()),
            (None, Some(id)) => ChatTarget::Thread(id.clone()),
            // clap's group enforces one of the two
            (None, None) => ChatTarget::Thread(String::new()),
        }
    }
}
