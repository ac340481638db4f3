//! # todo - File-backed To-Do Manager
//!
//! A small command-line to-do list with categories, priorities, due dates,
//! subtasks and attachment metadata, persisted as JSON files under a
//! per-user data directory.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! todo add "Buy groceries" --category Shopping --priority medium --due tomorrow
//!
//! # List pending tasks sorted by priority
//! todo list --tab active --sort priority
//!
//! # What needs attention today
//! todo today
//!
//! # Mark done / reopen
//! todo toggle "Buy groceries"
//!
//! # Statistics with the productivity score
//! todo stats
//! ```
//!
//! Data is stored in `~/.todo/` as one JSON file per storage key
//! (`tasks.json`, `categories.json`, `color_theme.json`). A fresh
//! directory is seeded with a small demo collection.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod attachments;
pub mod cli;
pub mod cmd;
pub mod fields;
pub mod storage;
pub mod store;
pub mod task;
pub mod views;

use cli::Cli;
use cmd::Commands;
use storage::Storage;
use store::Store;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Completions need no data directory at all.
    if let Commands::Completions { shell } = &cli.command {
        cmd::cmd_completions(*shell);
        return;
    }

    let data_dir = cli.data_dir.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".todo")
    });
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("Failed to create data directory {}: {}", data_dir.display(), e);
        std::process::exit(1);
    }

    let storage = Storage::new(&data_dir);

    // Theme lives beside the store but is not part of it.
    if let Commands::Theme { value } = &cli.command {
        cmd::cmd_theme(&storage, value.clone());
        return;
    }

    let mut store = match Store::open(storage.clone()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open store: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Completions { .. } => unreachable!("handled above"),
        Commands::Theme { .. } => unreachable!("handled above"),

        Commands::Add {
            title, desc, due, time, category, priority, project, subtasks, attachments,
        } => cmd::cmd_add(
            &mut store, title, desc, due, time, category, priority, project, subtasks,
            attachments,
        ),

        Commands::List { category, tab, search, sort, limit } =>
            cmd::cmd_list(&store, category, tab, search, sort, limit),

        Commands::Today => cmd::cmd_today(&store),

        Commands::View { id } => cmd::cmd_view(&store, id),

        Commands::Update {
            id, title, desc, due, time, clear_time, category, priority, project,
            clear_project, attachments,
        } => cmd::cmd_update(
            &mut store, id, title, desc, due, time, clear_time, category, priority,
            project, clear_project, attachments,
        ),

        Commands::Toggle { id } => cmd::cmd_toggle(&mut store, id),

        Commands::Delete { id } => cmd::cmd_delete(&mut store, id),

        Commands::Subtask { action } => cmd::cmd_subtask(&mut store, action),

        Commands::Category { action } => cmd::cmd_category(&mut store, action),

        Commands::Stats => cmd::cmd_stats(&store),
    }
}
