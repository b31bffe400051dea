use anyhow::Result;
use clap::Parser;
use tasklanes::cli::{Cli, Command};
use tasklanes::config::Config;
use tasklanes::{commands, logging};

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = Config::load(args.config.as_deref(), args.store)?;
    if let Err(err) = logging::init(&config.log_file) {
        eprintln!("logging disabled: {:#}", err);
    }
    let repo = commands::open_repository(&config);
    let command = args.command.unwrap_or(Command::Tui);
    match command {
        Command::List => commands::list(&repo),
        Command::AddColumn { name } => commands::add_column(&repo, name),
        Command::AddTask { column_id, text } => commands::add_task(&repo, column_id, text),
        Command::Move { task_id, column_id } => commands::move_task(&repo, task_id, column_id),
        Command::Toggle { task_id } => commands::toggle(&repo, task_id),
        Command::Remove { task_id } => commands::remove(&repo, task_id),
        Command::Export => commands::export(&repo),
        Command::Tui => commands::tui(&config, repo),
    }
}
