//! Raw document subcommands: append, replace, validate.

use clap::Args;
use std::path::PathBuf;

/// Arguments for the append subcommand
#[derive(Args, Debug)]
pub struct AppendArgs {
    /// Document to modify
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// Exact header line of the target section
    #[arg(long)]
    pub header: String,

    /// Text to append
    #[arg(short, long)]
    pub text: String,

    /// Record id, for log correlation
    #[arg(long)]
    pub id: Option<String>,
}

/// Arguments for the replace subcommand
///
/// With `--old` the first exact occurrence inside the section is replaced.
/// With `--record` the record whose id matches is replaced structurally.
/// An empty `--new` deletes.
#[derive(Args, Debug)]
pub struct ReplaceArgs {
    /// Document to modify
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// Exact header line of the target section
    #[arg(long)]
    pub header: String,

    /// Exact text to replace (empty appends)
    #[arg(long, conflicts_with = "record")]
    pub old: Option<String>,

    /// Id of the record to replace
    #[arg(long)]
    pub record: Option<String>,

    /// Replacement text
    #[arg(long, default_value = "")]
    pub new: String,
}

/// Arguments for the validate subcommand
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Document to check
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// Required header line (repeatable)
    #[arg(long = "header", required = true)]
    pub headers: Vec<String>,

    /// Template file used to create the document when it is missing
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,
}
