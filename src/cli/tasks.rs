//! Task subcommands.

use super::{parse_section, parse_status};
use crate::ops::{NewTask, TaskPatch};
use crate::types::{Actor, PlanSection, TaskStatus};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum TasksCommand {
    /// List every task in the plan
    List,

    /// Show one task
    Get {
        /// Task id
        id: String,
    },

    /// Add a task
    Add(AddTaskArgs),

    /// Change fields of a task
    Update(UpdateTaskArgs),

    /// Remove a task
    Delete {
        /// Task id
        id: String,
    },

    /// Replace the whole task list from a JSON array of tasks
    Rewrite {
        /// JSON file with the new task list
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

/// Arguments for `tasks add`
#[derive(Args, Debug)]
pub struct AddTaskArgs {
    /// Task description (single line)
    pub description: String,

    /// Explicit id (default: generated)
    #[arg(long)]
    pub id: Option<String>,

    /// Where the task came from
    #[arg(long)]
    pub source: Option<String>,

    /// Extra context (single line)
    #[arg(long)]
    pub context: Option<String>,

    /// Plan section (default: by actor)
    #[arg(long, value_parser = parse_section)]
    pub section: Option<PlanSection>,
}

impl AddTaskArgs {
    pub fn into_new_task(self, added_by: Actor) -> NewTask {
        NewTask {
            id: self.id,
            source: self.source,
            context: self.context,
            section: self.section,
            ..NewTask::new(self.description, added_by)
        }
    }
}

/// Arguments for `tasks update`
#[derive(Args, Debug)]
pub struct UpdateTaskArgs {
    /// Task id
    pub id: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,

    /// New context; an empty value clears it
    #[arg(long)]
    pub context: Option<String>,

    #[arg(long)]
    pub source: Option<String>,

    #[arg(long, value_parser = parse_section)]
    pub section: Option<PlanSection>,
}

impl UpdateTaskArgs {
    pub fn patch(&self) -> TaskPatch {
        TaskPatch {
            description: self.description.clone(),
            status: self.status,
            context: self.context.clone(),
            source: self.source.clone(),
            section: self.section,
        }
    }
}
