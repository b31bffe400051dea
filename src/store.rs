use crate::color::PackedColor;
use crate::model::{Board, BoardError, ColumnId, TaskId};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragState {
    pub task: TaskId,
    pub source: ColumnId,
}

#[derive(Debug, Default)]
pub struct BoardStore {
    board: Board,
    drag: Option<DragState>,
    revision: u64,
}

impl BoardStore {
    pub fn new(board: Board) -> Self {
        BoardStore {
            board,
            drag: None,
            revision: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn drag(&self) -> Option<DragState> {
        self.drag
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn replace(&mut self, board: Board, mark_dirty: bool) {
        self.board = board;
        self.drag = None;
        if mark_dirty {
            self.bump();
        }
    }

    pub fn add_column(&mut self) -> ColumnId {
        let id = self.board.add_column();
        self.bump();
        id
    }

    pub fn add_column_named(&mut self, name: &str) -> ColumnId {
        let id = self.board.add_column_named(name);
        self.bump();
        id
    }

    pub fn rename_column(&mut self, column: ColumnId, name: &str) -> Result<(), BoardError> {
        self.board.rename_column(column, name)?;
        self.bump();
        Ok(())
    }

    pub fn set_column_color(&mut self, column: ColumnId, color: PackedColor) -> Result<(), BoardError> {
        let current = self
            .board
            .column(column)
            .ok_or(BoardError::ColumnNotFound(column))?
            .color;
        if current != color {
            self.board.set_column_color(column, color)?;
            self.bump();
        }
        Ok(())
    }

    pub fn remove_column(&mut self, column: ColumnId) -> Result<usize, BoardError> {
        let removed = self.board.remove_column(column)?;
        if self.drag.map_or(false, |d| d.source == column) {
            self.drag = None;
        }
        self.bump();
        Ok(removed.tasks.len())
    }

    pub fn add_task(&mut self, column: ColumnId, text: &str) -> Result<TaskId, BoardError> {
        let id = self.board.add_task(column, text)?;
        self.bump();
        Ok(id)
    }

    pub fn remove_task(&mut self, task: TaskId) -> Result<(), BoardError> {
        self.board.remove_task(task)?;
        if self.drag.map_or(false, |d| d.task == task) {
            self.drag = None;
        }
        self.bump();
        Ok(())
    }

    pub fn toggle_task(&mut self, task: TaskId) -> Result<bool, BoardError> {
        let done = self.board.toggle_task(task)?;
        self.bump();
        Ok(done)
    }

    pub fn set_task_color(&mut self, task: TaskId, color: PackedColor) -> Result<(), BoardError> {
        let current = self
            .board
            .task(task)
            .ok_or(BoardError::TaskNotFound(task))?
            .color;
        if current != color {
            self.board.set_task_color(task, color)?;
            self.bump();
        }
        Ok(())
    }

    pub fn move_task(&mut self, task: TaskId, dest: ColumnId) -> Result<bool, BoardError> {
        let moved = self.board.move_task(task, dest)?;
        if moved {
            if self.drag.map_or(false, |d| d.task == task) {
                self.drag = None;
            }
            self.bump();
        }
        Ok(moved)
    }

    pub fn start_drag(&mut self, task: TaskId, source: ColumnId) -> Result<(), BoardError> {
        let column = self
            .board
            .column(source)
            .ok_or(BoardError::ColumnNotFound(source))?;
        if !column.tasks.iter().any(|t| t.id == task) {
            return Err(BoardError::TaskNotFound(task));
        }
        debug!(task, source, "drag started");
        self.drag = Some(DragState { task, source });
        Ok(())
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Returns true when the task changed columns. Clears the drag either way.
    pub fn drop_on(&mut self, target: ColumnId) -> Result<bool, BoardError> {
        let Some(drag) = self.drag.take() else {
            return Ok(false);
        };
        if drag.source == target {
            debug!(task = drag.task, target, "dropped on source column");
            return Ok(false);
        }
        let moved = self.move_task(drag.task, target)?;
        debug!(task = drag.task, from = drag.source, to = target, moved, "dropped");
        Ok(moved)
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(columns: &[&str]) -> (BoardStore, Vec<ColumnId>) {
        let mut store = BoardStore::default();
        let ids = columns.iter().map(|n| store.add_column_named(n)).collect();
        (store, ids)
    }

    #[test]
    fn scenario_add_column_then_task() {
        let mut store = BoardStore::default();
        let col = store.add_column();
        store.rename_column(col, "To Do").unwrap();
        store.add_task(col, "Buy milk").unwrap();

        let board = store.board();
        assert_eq!(board.columns.len(), 1);
        assert_eq!(board.columns[0].name, "To Do");
        let task = &board.columns[0].tasks[0];
        assert_eq!(task.text, "Buy milk");
        assert!(!task.is_done);
        assert_eq!(task.color, PackedColor::WHITE);
    }

    #[test]
    fn drop_on_other_column_moves_task() {
        let (mut store, cols) = store_with(&["A", "B"]);
        let t1 = store.add_task(cols[0], "t1").unwrap();
        let before = store.board().task(t1).cloned().unwrap();

        store.start_drag(t1, cols[0]).unwrap();
        assert!(store.drop_on(cols[1]).unwrap());

        assert!(store.board().column(cols[0]).unwrap().tasks.is_empty());
        assert_eq!(store.board().column(cols[1]).unwrap().tasks, vec![before]);
        assert_eq!(store.board().task_count(), 1);
        assert!(store.drag().is_none());
    }

    #[test]
    fn drop_on_source_column_keeps_order() {
        let (mut store, cols) = store_with(&["A", "B"]);
        let t1 = store.add_task(cols[0], "t1").unwrap();
        let t2 = store.add_task(cols[0], "t2").unwrap();
        let rev = store.revision();

        store.start_drag(t1, cols[0]).unwrap();
        assert!(!store.drop_on(cols[0]).unwrap());

        let ids: Vec<_> = store.board().columns[0].tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![t1, t2]);
        assert_eq!(store.revision(), rev);
        assert!(store.drag().is_none());
    }

    #[test]
    fn drop_without_drag_does_nothing() {
        let (mut store, cols) = store_with(&["A"]);
        assert!(!store.drop_on(cols[0]).unwrap());
    }

    #[test]
    fn drop_on_unknown_column_clears_drag() {
        let (mut store, cols) = store_with(&["A"]);
        let t = store.add_task(cols[0], "t").unwrap();
        store.start_drag(t, cols[0]).unwrap();
        assert_eq!(store.drop_on(42), Err(BoardError::ColumnNotFound(42)));
        assert!(store.drag().is_none());
        assert_eq!(store.board().columns[0].tasks.len(), 1);
    }

    #[test]
    fn start_drag_checks_source_column() {
        let (mut store, cols) = store_with(&["A", "B"]);
        let t = store.add_task(cols[0], "t").unwrap();
        assert_eq!(store.start_drag(t, cols[1]), Err(BoardError::TaskNotFound(t)));
        assert!(store.drag().is_none());
    }

    #[test]
    fn removing_dragged_task_clears_drag() {
        let (mut store, cols) = store_with(&["A", "B"]);
        let t = store.add_task(cols[0], "t").unwrap();
        store.start_drag(t, cols[0]).unwrap();
        store.remove_task(t).unwrap();
        assert!(store.drag().is_none());
        assert!(!store.drop_on(cols[1]).unwrap());
    }

    #[test]
    fn only_real_changes_bump_revision() {
        let (mut store, cols) = store_with(&["A"]);
        let rev = store.revision();
        assert!(store.add_task(cols[0], "").is_err());
        assert!(store.toggle_task(7).is_err());
        assert_eq!(store.revision(), rev);
        let t = store.add_task(cols[0], "x").unwrap();
        store.toggle_task(t).unwrap();
        assert_eq!(store.revision(), rev + 2);
    }

    #[test]
    fn replace_without_marking_dirty_keeps_revision() {
        let (mut store, _) = store_with(&["A"]);
        let rev = store.revision();
        store.replace(Board::new(), false);
        assert_eq!(store.revision(), rev);
        assert!(store.board().columns.is_empty());
    }

    #[test]
    fn same_color_does_not_bump_revision() {
        let (mut store, cols) = store_with(&["A"]);
        let t = store.add_task(cols[0], "t").unwrap();
        let rev = store.revision();
        store.set_task_color(t, PackedColor::WHITE).unwrap();
        store.set_column_color(cols[0], PackedColor::LIGHT_GRAY).unwrap();
        assert_eq!(store.revision(), rev);
        store.set_task_color(t, PackedColor::RED).unwrap();
        store.set_column_color(cols[0], PackedColor::BLUE).unwrap();
        assert_eq!(store.revision(), rev + 2);
        assert_eq!(store.set_task_color(99, PackedColor::RED), Err(BoardError::TaskNotFound(99)));
    }

    #[test]
    fn moving_dragged_task_clears_drag() {
        let (mut store, cols) = store_with(&["A", "B"]);
        let t = store.add_task(cols[0], "t").unwrap();
        store.start_drag(t, cols[0]).unwrap();
        assert!(store.move_task(t, cols[1]).unwrap());
        assert!(store.drag().is_none());
        assert!(!store.drop_on(cols[0]).unwrap());
        assert_eq!(store.board().column(cols[1]).unwrap().tasks.len(), 1);
    }
}
