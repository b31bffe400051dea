use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tasklanes", version, about = "Terminal kanban board with colored columns")]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Key/value store file holding the board
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every column and its tasks
    List,
    /// Append a column to the board
    AddColumn {
        /// Column name (defaults to "New Column")
        name: Option<String>,
    },
    /// Append a task to a column
    AddTask {
        /// Column id as shown by `list`
        column_id: u64,
        /// Task text
        text: String,
    },
    /// Move a task to another column
    Move {
        /// Task id to move
        task_id: u64,
        /// Destination column id
        column_id: u64,
    },
    /// Flip a task's done flag
    Toggle {
        /// Task id
        task_id: u64,
    },
    /// Remove a task
    Remove {
        /// Task id
        task_id: u64,
    },
    /// Print the stored board text
    Export,
    /// Launch the interactive TUI
    Tui,
}
