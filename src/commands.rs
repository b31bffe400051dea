use crate::color::PackedColor;
use crate::config::Config;
use crate::model::{Board, ColumnId, TaskId};
use crate::storage::{BoardRepository, FileStore};
use crate::store::BoardStore;
use crate::ui;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub fn open_repository(config: &Config) -> BoardRepository {
    BoardRepository::new(Arc::new(FileStore::new(config.store_path.clone())))
}

pub fn list(repo: &BoardRepository) -> Result<()> {
    let board = load(repo)?;
    println!("Board ({})", repo.describe());
    print!("{}", format_board(&board));
    Ok(())
}

pub fn add_column(repo: &BoardRepository, name: Option<String>) -> Result<()> {
    let mut store = BoardStore::new(load(repo)?);
    let id = match name {
        Some(name) => store.add_column_named(&name),
        None => store.add_column(),
    };
    save(repo, &store)?;
    info!(column = id, "column added from cli");
    println!("Added column {}", id);
    Ok(())
}

pub fn add_task(repo: &BoardRepository, column_id: ColumnId, text: String) -> Result<()> {
    let mut store = BoardStore::new(load(repo)?);
    let id = store
        .add_task(column_id, &text)
        .with_context(|| format!("adding task to column {}", column_id))?;
    save(repo, &store)?;
    info!(task = id, column = column_id, "task added from cli");
    println!("Added task {} to column {}", id, column_id);
    Ok(())
}

/// Goes through the same drag/drop path the board uses.
pub fn move_task(repo: &BoardRepository, task_id: TaskId, column_id: ColumnId) -> Result<()> {
    let mut store = BoardStore::new(load(repo)?);
    let source = store
        .board()
        .find_task(task_id)
        .map(|(c_idx, _)| store.board().columns[c_idx].id)
        .with_context(|| format!("task {} not found", task_id))?;
    store.start_drag(task_id, source)?;
    let moved = store
        .drop_on(column_id)
        .with_context(|| format!("moving task {} to column {}", task_id, column_id))?;
    info!(task = task_id, column = column_id, moved, "task moved from cli");
    if moved {
        save(repo, &store)?;
        println!("Moved task {} to column {}", task_id, column_id);
    } else {
        println!("Task {} is already in column {}", task_id, column_id);
    }
    Ok(())
}

pub fn toggle(repo: &BoardRepository, task_id: TaskId) -> Result<()> {
    let mut store = BoardStore::new(load(repo)?);
    let done = store
        .toggle_task(task_id)
        .with_context(|| format!("toggling task {}", task_id))?;
    save(repo, &store)?;
    info!(task = task_id, done, "task toggled from cli");
    println!(
        "Task {} marked {}",
        task_id,
        if done { "done" } else { "not done" }
    );
    Ok(())
}

pub fn remove(repo: &BoardRepository, task_id: TaskId) -> Result<()> {
    let mut store = BoardStore::new(load(repo)?);
    store
        .remove_task(task_id)
        .with_context(|| format!("removing task {}", task_id))?;
    save(repo, &store)?;
    info!(task = task_id, "task removed from cli");
    println!("Removed task {}", task_id);
    Ok(())
}

pub fn export(repo: &BoardRepository) -> Result<()> {
    match repo.raw()? {
        Some(text) => println!("{}", text),
        None => println!("[]"),
    }
    Ok(())
}

pub fn tui(config: &Config, repo: BoardRepository) -> Result<()> {
    ui::run(repo, config)
}

fn load(repo: &BoardRepository) -> Result<Board> {
    repo.load()
        .with_context(|| format!("loading board from {}", repo.describe()))
}

fn save(repo: &BoardRepository, store: &BoardStore) -> Result<()> {
    repo.save(store.board())
        .with_context(|| format!("saving board to {}", repo.describe()))
}

pub fn format_board(board: &Board) -> String {
    if board.columns.is_empty() {
        return "(no columns)\n".to_string();
    }
    let mut out = String::new();
    for column in &board.columns {
        out.push_str(&format!(
            "[{}] {} ({})\n",
            column.id,
            column.name,
            column.color.name()
        ));
        if column.tasks.is_empty() {
            out.push_str("  (empty)\n");
        }
        for task in &column.tasks {
            out.push_str(&format!(
                "  - {} [{}] {}",
                task.id,
                if task.is_done { "x" } else { " " },
                task.text
            ));
            if task.color != PackedColor::WHITE {
                out.push_str(&format!(" ({})", task.color.name()));
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn format_lists_columns_and_tasks() {
        let mut board = Board::new();
        let todo = board.add_column_named("To Do");
        board.add_column_named("Done");
        let t = board.add_task(todo, "Buy milk").unwrap();
        board.toggle_task(t).unwrap();
        board.set_task_color(t, PackedColor::CYAN).unwrap();
        let text = format_board(&board);
        assert_eq!(
            text,
            "[0] To Do (light gray)\n  - 0 [x] Buy milk (cyan)\n[1] Done (light gray)\n  (empty)\n"
        );
    }

    #[test]
    fn move_command_round_trips_through_store() {
        let repo = BoardRepository::new(Arc::new(MemoryStore::new()));
        add_column(&repo, Some("A".into())).unwrap();
        add_column(&repo, Some("B".into())).unwrap();
        add_task(&repo, 0, "t1".into()).unwrap();
        move_task(&repo, 0, 1).unwrap();
        let board = repo.load().unwrap();
        assert!(board.columns[0].tasks.is_empty());
        assert_eq!(board.columns[1].tasks[0].text, "t1");
    }

    #[test]
    fn commands_report_missing_ids() {
        let repo = BoardRepository::new(Arc::new(MemoryStore::new()));
        assert!(add_task(&repo, 5, "x".into()).is_err());
        assert!(toggle(&repo, 1).is_err());
        assert!(remove(&repo, 1).is_err());
        assert!(move_task(&repo, 1, 0).is_err());
    }

    #[test]
    fn toggle_and_remove_persist() {
        let repo = BoardRepository::new(Arc::new(MemoryStore::new()));
        add_column(&repo, None).unwrap();
        add_task(&repo, 0, "t1".into()).unwrap();
        toggle(&repo, 0).unwrap();
        assert!(repo.load().unwrap().columns[0].tasks[0].is_done);
        remove(&repo, 0).unwrap();
        assert!(repo.load().unwrap().columns[0].tasks.is_empty());
    }
}
