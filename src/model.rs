use crate::color::PackedColor;
use std::collections::HashSet;

pub type TaskId = u64;
pub type ColumnId = u64;

pub const DEFAULT_COLUMN_NAME: &str = "New Column";

/// Largest id kept as-is when a board is decoded. The counters start above
/// every kept id, so they cannot wrap.
pub const MAX_ID: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Default)]
pub struct Board {
    pub columns: Vec<Column>,
    next_column_id: ColumnId,
    next_task_id: TaskId,
}

// Id counters are bookkeeping; two boards are equal when their content is.
impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Board {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub color: PackedColor,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub is_done: bool,
    pub color: PackedColor,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BoardError {
    #[error("column not found: {0}")]
    ColumnNotFound(ColumnId),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("text must not be blank")]
    BlankText,
}

impl Board {
    pub fn new() -> Self {
        Board::default()
    }

    /// Builds a board from decoded columns, re-numbering any id that is
    /// missing, already taken or above [`MAX_ID`] so that ids are unique
    /// across the board.
    pub fn from_columns(columns: Vec<(Option<ColumnId>, Column)>) -> Self {
        let next_column_id = next_free_id(columns.iter().filter_map(|(id, _)| *id));
        let next_task_id =
            next_free_id(columns.iter().flat_map(|(_, c)| c.tasks.iter().map(|t| t.id)));
        let mut board = Board {
            columns: Vec::with_capacity(columns.len()),
            next_column_id,
            next_task_id,
        };
        let mut seen_columns = HashSet::new();
        let mut seen_tasks = HashSet::new();
        for (id, mut column) in columns {
            column.id = match id {
                Some(id) if id <= MAX_ID && seen_columns.insert(id) => id,
                _ => {
                    let fresh = board.alloc_column_id();
                    seen_columns.insert(fresh);
                    fresh
                }
            };
            for task in &mut column.tasks {
                if task.id > MAX_ID || !seen_tasks.insert(task.id) {
                    task.id = board.alloc_task_id();
                    seen_tasks.insert(task.id);
                }
            }
            board.columns.push(column);
        }
        board
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_index(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    /// Column index and task index of a task.
    pub fn find_task(&self, task_id: TaskId) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(c_idx, column)| {
            column
                .tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|t_idx| (c_idx, t_idx))
        })
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.find_task(task_id)
            .map(|(c_idx, t_idx)| &self.columns[c_idx].tasks[t_idx])
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    pub fn add_column(&mut self) -> ColumnId {
        self.push_column(DEFAULT_COLUMN_NAME.to_string())
    }

    pub fn add_column_named(&mut self, name: &str) -> ColumnId {
        let name = name.trim();
        if name.is_empty() {
            self.add_column()
        } else {
            self.push_column(name.to_string())
        }
    }

    pub fn rename_column(&mut self, column_id: ColumnId, name: &str) -> Result<(), BoardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BoardError::BlankText);
        }
        self.column_mut(column_id)?.name = name.to_string();
        Ok(())
    }

    pub fn set_column_color(
        &mut self,
        column_id: ColumnId,
        color: PackedColor,
    ) -> Result<(), BoardError> {
        self.column_mut(column_id)?.color = color;
        Ok(())
    }

    pub fn remove_column(&mut self, column_id: ColumnId) -> Result<Column, BoardError> {
        let idx = self
            .column_index(column_id)
            .ok_or(BoardError::ColumnNotFound(column_id))?;
        Ok(self.columns.remove(idx))
    }

    pub fn add_task(&mut self, column_id: ColumnId, text: &str) -> Result<TaskId, BoardError> {
        if text.trim().is_empty() {
            return Err(BoardError::BlankText);
        }
        let idx = self
            .column_index(column_id)
            .ok_or(BoardError::ColumnNotFound(column_id))?;
        let id = self.alloc_task_id();
        self.columns[idx].tasks.push(Task::new(id, text.to_string()));
        Ok(id)
    }

    pub fn remove_task(&mut self, task_id: TaskId) -> Result<Task, BoardError> {
        let (c_idx, t_idx) = self
            .find_task(task_id)
            .ok_or(BoardError::TaskNotFound(task_id))?;
        Ok(self.columns[c_idx].tasks.remove(t_idx))
    }

    pub fn toggle_task(&mut self, task_id: TaskId) -> Result<bool, BoardError> {
        self.update_task(task_id, |task| task.is_done = !task.is_done)?;
        Ok(self.task(task_id).map_or(false, |t| t.is_done))
    }

    pub fn set_task_color(&mut self, task_id: TaskId, color: PackedColor) -> Result<(), BoardError> {
        self.update_task(task_id, |task| task.color = color)
    }

    /// Appends the task to `dest` and drops it from its current column.
    /// Returns false when the task already lives in `dest`.
    pub fn move_task(&mut self, task_id: TaskId, dest: ColumnId) -> Result<bool, BoardError> {
        let dest_idx = self
            .column_index(dest)
            .ok_or(BoardError::ColumnNotFound(dest))?;
        let (src_idx, t_idx) = self
            .find_task(task_id)
            .ok_or(BoardError::TaskNotFound(task_id))?;
        if src_idx == dest_idx {
            return Ok(false);
        }
        let task = self.columns[src_idx].tasks.remove(t_idx);
        self.columns[dest_idx].tasks.push(task);
        Ok(true)
    }

    pub fn update_task<F>(&mut self, task_id: TaskId, f: F) -> Result<(), BoardError>
    where
        F: FnOnce(&mut Task),
    {
        let (c_idx, t_idx) = self
            .find_task(task_id)
            .ok_or(BoardError::TaskNotFound(task_id))?;
        f(&mut self.columns[c_idx].tasks[t_idx]);
        Ok(())
    }

    fn column_mut(&mut self, column_id: ColumnId) -> Result<&mut Column, BoardError> {
        self.columns
            .iter_mut()
            .find(|c| c.id == column_id)
            .ok_or(BoardError::ColumnNotFound(column_id))
    }

    fn push_column(&mut self, name: String) -> ColumnId {
        let id = self.alloc_column_id();
        self.columns.push(Column {
            id,
            name,
            color: PackedColor::LIGHT_GRAY,
            tasks: Vec::new(),
        });
        id
    }

    fn alloc_column_id(&mut self) -> ColumnId {
        let id = self.next_column_id;
        self.next_column_id += 1;
        id
    }

    fn alloc_task_id(&mut self) -> TaskId {
        let id = self.next_task_id;
        self.next_task_id += 1;
        id
    }
}

fn next_free_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.filter(|id| *id <= MAX_ID)
        .max()
        .and_then(|id| id.checked_add(1))
        .unwrap_or(0)
}

impl Task {
    pub fn new(id: TaskId, text: String) -> Self {
        Task {
            id,
            text,
            is_done: false,
            color: PackedColor::WHITE,
        }
    }
}
