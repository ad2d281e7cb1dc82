//! CLI command definitions for plandoc.
//!
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod chat;
pub mod document;
pub mod tasks;

use crate::types::{Actor, PlanSection, TaskStatus};
use chat::ChatCommand;
use clap::{Parser, Subcommand};
use document::{AppendArgs, ReplaceArgs, ValidateArgs};
use std::path::PathBuf;
use tasks::TasksCommand;

/// Markdown plan, loop and chat document engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Document root directory (overrides config)
    #[arg(short, long, global = true)]
    pub docs_root: Option<PathBuf>,

    /// Who is making the change
    #[arg(long, global = true, default_value = "user", value_parser = parse_actor)]
    pub actor: Actor,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the console API server (default if no subcommand given)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Skip replaying incomplete promotions at startup
        #[arg(long)]
        no_recover: bool,
    },

    /// Append text to a section of a document
    Append(AppendArgs),

    /// Replace a block or record inside a section
    Replace(ReplaceArgs),

    /// Check a document for required headers
    Validate(ValidateArgs),

    /// Manage plan tasks
    #[command(subcommand)]
    Tasks(TasksCommand),

    /// Promote a plan task into a loop document
    Promote {
        /// Task to promote
        task_id: String,

        /// Destination loop id
        #[arg(long = "to", value_name = "LOOP_ID")]
        destination: String,
    },

    /// Post or list chat messages
    #[command(subcommand)]
    Chat(ChatCommand),

    /// Finish promotions left incomplete by a crash
    Recover,
}

pub fn parse_actor(s: &str) -> Result<Actor, String> {
    Actor::from_str(s).ok_or_else(|| format!("expected 'user' or 'agent', got '{s}'"))
}

pub fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::from_str(s)
        .ok_or_else(|| format!("expected pending, done, rejected or promoted, got '{s}'"))
}

pub fn parse_section(s: &str) -> Result<PlanSection, String> {
    PlanSection::from_str(s)
        .ok_or_else(|| format!("expected 'user_defined' or 'ora_suggested', got '{s}'"))
}
