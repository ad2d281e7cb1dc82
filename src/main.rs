//! plandoc
//!
//! Command line and console API over the markdown document engine.

use anyhow::{Context, Result, bail};
use clap::Parser;
use plandoc::api;
use plandoc::cli::chat::ChatCommand;
use plandoc::cli::document::{AppendArgs, ReplaceArgs, ValidateArgs};
use plandoc::cli::tasks::TasksCommand;
use plandoc::cli::{Cli, Command};
use plandoc::config::{Config, ConfigLoader};
use plandoc::ops;
use plandoc::types::{Actor, Task};
use plandoc::workspace::Workspace;
use serde::Serialize;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {}
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("Failed to open log file {filename}"))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    // SAFETY: called at startup before the runtime spawns any worker threads.
    if let Some(config_path) = &cli.config {
        unsafe {
            std::env::set_var("PLANDOC_CONFIG_PATH", config_path);
        }
    }
    let loader = ConfigLoader::load()?;
    if let Some(path) = loader.config_path() {
        info!(path = %path.display(), "Loaded configuration");
    }

    let mut config = loader.into_config();
    if let Some(root) = &cli.docs_root {
        config.storage.docs_root = root.clone();
    }
    Ok(config)
}

fn run_append(ws: &Workspace, args: AppendArgs) -> Result<()> {
    ws.engine()
        .append_to_section(&args.file, &args.header, &args.text, args.id.as_deref())?;
    Ok(())
}

fn run_replace(ws: &Workspace, args: ReplaceArgs) -> Result<()> {
    match &args.record {
        Some(id) => {
            let previous = ws
                .engine()
                .replace_record(&args.file, &args.header, id, &args.new)?;
            println!("{previous}");
        }
        None => ws.engine().replace_in_section(
            &args.file,
            &args.header,
            args.old.as_deref().unwrap_or_default(),
            &args.new,
            None,
        )?,
    }
    Ok(())
}

fn run_validate(ws: &Workspace, args: ValidateArgs) -> Result<()> {
    let template = args
        .template
        .as_ref()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template {}", path.display()))
        })
        .transpose()?;
    let headers: Vec<&str> = args.headers.iter().map(String::as_str).collect();

    let report = ws
        .engine()
        .validate_markdown_schema(&args.file, &headers, template.as_deref())?;
    print_json(&report)?;
    if !report.valid {
        bail!("{} is missing {} required header(s)", args.file.display(), report.errors.len());
    }
    Ok(())
}

fn run_tasks(ws: &Workspace, command: TasksCommand, actor: Actor) -> Result<()> {
    match command {
        TasksCommand::List => print_json(&ops::list_tasks(ws)?),
        TasksCommand::Get { id } => print_json(&ops::get_task(ws, &id)?),
        TasksCommand::Add(args) => print_json(&ops::create_task(ws, args.into_new_task(actor))?),
        TasksCommand::Update(args) => {
            print_json(&ops::update_task(ws, &args.id, args.patch(), actor)?)
        }
        TasksCommand::Delete { id } => print_json(&ops::delete_task(ws, &id, actor)?),
        TasksCommand::Rewrite { input } => {
            let json = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let tasks: Vec<Task> = serde_json::from_str(&json)
                .with_context(|| format!("Invalid task list in {}", input.display()))?;
            print_json(&ops::rewrite_tasks(ws, &tasks, actor)?)
        }
    }
}

fn run_chat(ws: &Workspace, command: ChatCommand, actor: Actor) -> Result<()> {
    match command {
        ChatCommand::Post {
            target,
            speaker,
            message,
        } => print_json(&ops::post_chat(
            ws,
            &target.target(),
            speaker.unwrap_or(actor),
            &message,
        )?),
        ChatCommand::List { target } => print_json(&ops::list_chat(ws, &target.target())?),
    }
}

fn run_recover(ws: &Workspace) -> Result<()> {
    let report = ops::recover_intents(ws)?;
    if !report.failed.is_empty() {
        warn!(failed = report.failed.len(), "Some promotions are still incomplete");
    }
    print_json(&report)
}

async fn run_server(config: Config, ws: Workspace, port: Option<u16>, no_recover: bool) -> Result<()> {
    if config.server.recover_on_start && !no_recover {
        let report = ops::recover_intents(&ws)?;
        if !report.recovered.is_empty() || !report.failed.is_empty() {
            info!(
                recovered = report.recovered.len(),
                failed = report.failed.len(),
                "Replayed pending promotions"
            );
        }
    }
    api::serve(Arc::new(ws), port.unwrap_or(config.server.port)).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = load_config(&cli)?;
    let ws = Workspace::new(&config);
    let actor = cli.actor;

    match cli.command {
        Some(Command::Append(args)) => run_append(&ws, args)?,
        Some(Command::Replace(args)) => run_replace(&ws, args)?,
        Some(Command::Validate(args)) => run_validate(&ws, args)?,
        Some(Command::Tasks(command)) => run_tasks(&ws, command, actor)?,
        Some(Command::Promote {
            task_id,
            destination,
        }) => print_json(&ops::promote_task(&ws, &task_id, &destination, actor)?)?,
        Some(Command::Chat(command)) => run_chat(&ws, command, actor)?,
        Some(Command::Recover) => run_recover(&ws)?,
        Some(Command::Serve { port, no_recover }) => {
            run_server(config, ws, port, no_recover).await?
        }
        None => run_server(config, ws, None, false).await?,
    }

    Ok(())
}
