mod field;
mod render;

use crate::autosave::AutoSaver;
use crate::color::{palette_index, PALETTE};
use crate::config::Config;
use crate::model::{Board, BoardError, ColumnId, TaskId};
use crate::storage::{BoardRepository, StorageError};
use crate::store::BoardStore;
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use field::FieldValue;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::Rect;
use ratatui::Terminal;
use std::collections::HashMap;
use std::io::{stdout, Stdout};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};
use tracing::{error, info};

pub fn run(repo: BoardRepository, config: &Config) -> Result<()> {
    let mut terminal = setup_terminal(config.mouse)?;
    let mut app = App::new(repo, config.save_debounce);
    app.begin_load();
    let result = app.event_loop(&mut terminal);
    let flushed = app.flush();
    teardown_terminal(&mut terminal, config.mouse)?;
    result.and(flushed)
}

enum LoadState {
    Loading(Receiver<Result<Board, StorageError>>),
    Ready,
}

enum Mode {
    Normal,
    EditingTitle { column: ColumnId, field: FieldValue },
    NewTask { column: ColumnId, field: FieldValue },
    ColorPicker { target: ColorTarget, cursor: usize },
    ConfirmDeleteColumn { column: ColumnId },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ColorTarget {
    Task(TaskId),
    Column(ColumnId),
}

/// Screen regions from the last frame, used to resolve mouse events.
#[derive(Default, Debug)]
struct HitMap {
    columns: Vec<(ColumnId, Rect)>,
    tasks: Vec<(ColumnId, TaskId, Rect)>,
    add_column: Option<Rect>,
}

impl HitMap {
    fn clear(&mut self) {
        self.columns.clear();
        self.tasks.clear();
        self.add_column = None;
    }

    fn task_at(&self, x: u16, y: u16) -> Option<(ColumnId, TaskId)> {
        self.tasks
            .iter()
            .find(|(_, _, r)| contains(*r, x, y))
            .map(|(c, t, _)| (*c, *t))
    }

    fn column_at(&self, x: u16, y: u16) -> Option<ColumnId> {
        self.columns
            .iter()
            .find(|(_, r)| contains(*r, x, y))
            .map(|(c, _)| *c)
    }

    fn on_add_column(&self, x: u16, y: u16) -> bool {
        self.add_column.map_or(false, |r| contains(r, x, y))
    }
}

struct App {
    store: BoardStore,
    repo: BoardRepository,
    saver: AutoSaver,
    load: LoadState,
    selected_column: usize,
    selected_task: usize,
    column_offset: usize,
    scroll_offsets: HashMap<ColumnId, usize>,
    status: String,
    mode: Mode,
    hits: HitMap,
}

impl App {
    fn new(repo: BoardRepository, save_debounce: Duration) -> Self {
        let store = BoardStore::default();
        let saver = AutoSaver::new(save_debounce, store.revision());
        App {
            store,
            repo,
            saver,
            load: LoadState::Ready,
            selected_column: 0,
            selected_task: 0,
            column_offset: 0,
            scroll_offsets: HashMap::new(),
            status: String::new(),
            mode: Mode::Normal,
            hits: HitMap::default(),
        }
    }

    fn begin_load(&mut self) {
        self.status = format!("Loading board from {}", self.repo.describe());
        self.load = LoadState::Loading(self.repo.spawn_load());
    }

    fn is_loading(&self) -> bool {
        matches!(self.load, LoadState::Loading(_))
    }

    fn poll_load(&mut self) {
        let outcome = match &self.load {
            LoadState::Loading(rx) => match rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => Err(StorageError::LoaderGone),
            },
            LoadState::Ready => return,
        };
        self.load = LoadState::Ready;
        self.finish_load(outcome);
    }

    fn finish_load(&mut self, outcome: Result<Board, StorageError>) {
        match outcome {
            Ok(board) => {
                self.status = format!(
                    "Loaded {} columns, {} tasks",
                    board.columns.len(),
                    board.task_count()
                );
                self.store.replace(board, false);
            }
            Err(err) => {
                error!(error = %err, "loading board failed");
                self.status = match err {
                    StorageError::Decode(_) => format!(
                        "Stored board was unreadable ({}); starting empty, old data kept under board.corrupt",
                        err
                    ),
                    other => {
                        self.saver.disable();
                        format!(
                            "Could not load board: {}; saving is off so stored data stays untouched",
                            other
                        )
                    }
                };
            }
        }
        self.saver.reset(self.store.revision());
        self.clamp_selection();
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.poll_load();
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                let quit = match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Mouse(mouse) => {
                        self.handle_mouse(mouse);
                        false
                    }
                    _ => false,
                };
                if quit {
                    break;
                }
            }
            self.autosave(Instant::now());
        }
        Ok(())
    }

    fn autosave(&mut self, now: Instant) {
        self.saver.observe(self.store.revision(), now);
        if let Err(err) = self.saver.tick(now, self.store.board(), &self.repo) {
            self.status = format!("Save failed, will retry: {}", err);
        }
    }

    fn flush(&mut self) -> Result<()> {
        if self.is_loading() {
            return Ok(());
        }
        self.saver.observe(self.store.revision(), Instant::now());
        self.saver.flush(self.store.board(), &self.repo)?;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.is_loading() {
            if key.code == KeyCode::Char('q') {
                return true;
            }
            self.status = "Still loading the board...".into();
            return false;
        }
        match self.mode {
            Mode::Normal if self.store.drag().is_some() => self.handle_drag_key(key),
            Mode::Normal => return self.handle_normal_key(key),
            Mode::EditingTitle { .. } | Mode::NewTask { .. } => self.handle_text_key(key),
            Mode::ColorPicker { .. } => self.handle_picker_key(key),
            Mode::ConfirmDeleteColumn { .. } => self.handle_confirm_key(key),
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Left | KeyCode::Char('h') => self.prev_column(),
            KeyCode::Right | KeyCode::Char('l') => self.next_column(),
            KeyCode::Up | KeyCode::Char('k') => self.prev_task(),
            KeyCode::Down | KeyCode::Char('j') => self.next_task(),
            KeyCode::Char('c') => self.add_column(),
            KeyCode::Char('r') => self.begin_title_edit(),
            KeyCode::Char('n') => self.begin_new_task(),
            KeyCode::Char(' ') | KeyCode::Char('x') => self.toggle_selected(),
            KeyCode::Char('d') => self.remove_selected(),
            KeyCode::Char('p') => self.open_task_picker(),
            KeyCode::Char('P') => self.open_column_picker(),
            KeyCode::Char('g') => self.grab_selected(),
            KeyCode::Char('m') | KeyCode::Char('>') => self.shift_selected(1),
            KeyCode::Char('b') | KeyCode::Char('<') => self.shift_selected(-1),
            KeyCode::Char('D') => self.confirm_delete_column(),
            _ => {}
        }
        false
    }

    fn handle_drag_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.prev_column(),
            KeyCode::Right | KeyCode::Char('l') => self.next_column(),
            KeyCode::Char('g') | KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(column) = self.current_column_id() {
                    self.drop_on(column);
                }
            }
            KeyCode::Esc => {
                self.store.cancel_drag();
                self.status = "Drag canceled".into();
            }
            _ => self.status = "Dragging: ←/→ pick a column, g/Enter drop, Esc cancel".into(),
        }
    }

    fn handle_text_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let keep_open = match &mut mode {
            Mode::EditingTitle { column, field } => {
                let column = *column;
                self.process_field_key(field, key, |app, text| app.commit_title(column, text))
            }
            Mode::NewTask { column, field } => {
                let column = *column;
                self.process_field_key(field, key, |app, text| app.commit_new_task(column, text))
            }
            _ => false,
        };
        if keep_open {
            self.mode = mode;
        }
    }

    /// Returns whether the input stays open. `submit` returns the same.
    fn process_field_key<F>(&mut self, field: &mut FieldValue, key: KeyEvent, submit: F) -> bool
    where
        F: FnOnce(&mut Self, &mut FieldValue) -> bool,
    {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return false;
            }
            KeyCode::Enter => return submit(self, field),
            KeyCode::Left => field.move_left(),
            KeyCode::Right => field.move_right(),
            KeyCode::Home => field.home(),
            KeyCode::End => field.end(),
            KeyCode::Backspace => field.backspace(),
            KeyCode::Delete => field.delete(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    field.insert_char(c);
                }
            }
            _ => {}
        }
        true
    }

    fn commit_title(&mut self, column: ColumnId, field: &mut FieldValue) -> bool {
        match self.store.rename_column(column, &field.value) {
            Ok(()) => self.status = format!("Renamed column to {}", field.value.trim()),
            Err(BoardError::BlankText) => {
                self.status = "Column name cannot be blank; kept the old one".into()
            }
            Err(err) => self.status = format!("Rename failed: {}", err),
        }
        false
    }

    fn commit_new_task(&mut self, column: ColumnId, field: &mut FieldValue) -> bool {
        match self.store.add_task(column, &field.value) {
            Ok(_) => {
                self.status = format!("Added \"{}\"", field.value);
                field.clear();
                if let Some(idx) = self.store.board().column_index(column) {
                    self.selected_column = idx;
                    self.selected_task = self.store.board().columns[idx].tasks.len() - 1;
                }
                true
            }
            Err(BoardError::BlankText) => {
                self.status = "Task text is empty".into();
                true
            }
            Err(err) => {
                self.status = format!("Could not add task: {}", err);
                false
            }
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let Mode::ColorPicker { target, cursor } = &mut self.mode else {
            return;
        };
        let target = *target;
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Color unchanged".into();
            }
            KeyCode::Left | KeyCode::Char('h') => *cursor = cursor.saturating_sub(1),
            KeyCode::Right | KeyCode::Char('l') => *cursor = (*cursor + 1).min(PALETTE.len() - 1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                let idx = *cursor;
                self.apply_color(target, idx);
            }
            KeyCode::Char(c @ '1'..='8') => {
                let idx = c as usize - '1' as usize;
                self.apply_color(target, idx);
            }
            _ => {}
        }
    }

    fn apply_color(&mut self, target: ColorTarget, idx: usize) {
        let (color, name) = PALETTE[idx];
        let result = match target {
            ColorTarget::Task(task) => self.store.set_task_color(task, color),
            ColorTarget::Column(column) => self.store.set_column_color(column, color),
        };
        self.status = match result {
            Ok(()) => format!("Color set to {}", name),
            Err(err) => format!("Could not set color: {}", err),
        };
        self.mode = Mode::Normal;
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let Mode::ConfirmDeleteColumn { column } = self.mode else {
            return;
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.status = match self.store.remove_column(column) {
                    Ok(tasks) => format!("Deleted column and {} tasks", tasks),
                    Err(err) => format!("Delete failed: {}", err),
                };
                self.scroll_offsets.remove(&column);
                self.mode = Mode::Normal;
                self.clamp_selection();
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.is_loading() || !matches!(self.mode, Mode::Normal) {
            return;
        }
        let (x, y) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.hits.on_add_column(x, y) {
                    self.add_column();
                } else if let Some((column, task)) = self.hits.task_at(x, y) {
                    self.select_task(task);
                    self.start_drag(task, column);
                } else if let Some(column) = self.hits.column_at(x, y) {
                    self.select_column(column);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.store.drag().is_some() {
                    if let Some(column) = self.hits.column_at(x, y) {
                        self.select_column(column);
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.store.drag().is_none() {
                    return;
                }
                match self.hits.column_at(x, y) {
                    Some(column) => self.drop_on(column),
                    None => {
                        self.store.cancel_drag();
                        self.status = "Drag canceled".into();
                    }
                }
            }
            _ => {}
        }
    }

    fn prev_column(&mut self) {
        if self.selected_column > 0 {
            self.selected_column -= 1;
            self.selected_task = 0;
        }
    }

    fn next_column(&mut self) {
        if self.selected_column + 1 < self.store.board().columns.len() {
            self.selected_column += 1;
            self.selected_task = 0;
        }
    }

    fn prev_task(&mut self) {
        self.selected_task = self.selected_task.saturating_sub(1);
    }

    fn next_task(&mut self) {
        let len = self.current_column_len();
        if self.selected_task + 1 < len {
            self.selected_task += 1;
        }
    }

    fn add_column(&mut self) {
        self.store.add_column();
        self.selected_column = self.store.board().columns.len() - 1;
        self.selected_task = 0;
        self.status = "Added column (r to rename)".into();
    }

    fn begin_title_edit(&mut self) {
        let Some(column) = self.store.board().columns.get(self.selected_column) else {
            self.status = "No column to rename".into();
            return;
        };
        self.mode = Mode::EditingTitle {
            column: column.id,
            field: FieldValue::new(&column.name),
        };
        self.status = "Renaming column (Enter save, Esc cancel)".into();
    }

    fn begin_new_task(&mut self) {
        let Some(column) = self.current_column_id() else {
            self.status = "Add a column first (c)".into();
            return;
        };
        self.mode = Mode::NewTask {
            column,
            field: FieldValue::default(),
        };
        self.status = "New task (Enter add, Esc close)".into();
    }

    fn toggle_selected(&mut self) {
        let Some(task) = self.current_task_id() else {
            self.status = "No task selected".into();
            return;
        };
        self.status = match self.store.toggle_task(task) {
            Ok(true) => "Marked done".into(),
            Ok(false) => "Marked not done".into(),
            Err(err) => format!("Toggle failed: {}", err),
        };
    }

    fn remove_selected(&mut self) {
        let Some(task) = self.current_task_id() else {
            self.status = "No task selected to remove".into();
            return;
        };
        self.status = match self.store.remove_task(task) {
            Ok(()) => "Task removed".into(),
            Err(err) => format!("Remove failed: {}", err),
        };
        self.clamp_selection();
    }

    fn open_task_picker(&mut self) {
        let Some(task) = self
            .current_task_id()
            .and_then(|id| self.store.board().task(id))
        else {
            self.status = "No task selected".into();
            return;
        };
        self.mode = Mode::ColorPicker {
            target: ColorTarget::Task(task.id),
            cursor: palette_index(task.color).unwrap_or(0),
        };
    }

    fn open_column_picker(&mut self) {
        let Some(column) = self.store.board().columns.get(self.selected_column) else {
            self.status = "No column selected".into();
            return;
        };
        self.mode = Mode::ColorPicker {
            target: ColorTarget::Column(column.id),
            cursor: palette_index(column.color).unwrap_or(0),
        };
    }

    fn grab_selected(&mut self) {
        match (self.current_task_id(), self.current_column_id()) {
            (Some(task), Some(column)) => self.start_drag(task, column),
            _ => self.status = "No task selected to drag".into(),
        }
    }

    fn start_drag(&mut self, task: TaskId, column: ColumnId) {
        self.status = match self.store.start_drag(task, column) {
            Ok(()) => {
                let text = self
                    .store
                    .board()
                    .task(task)
                    .map(|t| t.text.clone())
                    .unwrap_or_default();
                format!("Dragging \"{}\": release over a column to drop", text)
            }
            Err(err) => format!("Cannot drag: {}", err),
        };
    }

    fn drop_on(&mut self, target: ColumnId) {
        let task = self.store.drag().map(|d| d.task);
        let name = self
            .store
            .board()
            .column(target)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        self.status = match self.store.drop_on(target) {
            Ok(true) => format!("Moved to {}", name),
            Ok(false) => "Dropped in place".into(),
            Err(err) => format!("Move failed: {}", err),
        };
        match task {
            Some(task) if self.store.board().task(task).is_some() => self.select_task(task),
            _ => self.clamp_selection(),
        }
    }

    /// Keyboard shortcut for a drag to the neighbouring column.
    fn shift_selected(&mut self, delta: isize) {
        let (Some(task), Some(column)) = (self.current_task_id(), self.current_column_id()) else {
            self.status = "No task selected to move".into();
            return;
        };
        let max = self.store.board().columns.len() as isize - 1;
        let target_idx = (self.selected_column as isize + delta).clamp(0, max) as usize;
        if target_idx == self.selected_column {
            return;
        }
        let target = self.store.board().columns[target_idx].id;
        self.start_drag(task, column);
        self.drop_on(target);
    }

    fn confirm_delete_column(&mut self) {
        match self.current_column_id() {
            Some(column) => {
                self.mode = Mode::ConfirmDeleteColumn { column };
                self.status = "Delete column? (y to confirm, n/Esc to cancel)".into();
            }
            None => self.status = "No column selected".into(),
        }
    }

    fn select_task(&mut self, task: TaskId) {
        if let Some((c_idx, t_idx)) = self.store.board().find_task(task) {
            self.selected_column = c_idx;
            self.selected_task = t_idx;
        }
    }

    fn select_column(&mut self, column: ColumnId) {
        if let Some(idx) = self.store.board().column_index(column) {
            if idx != self.selected_column {
                self.selected_column = idx;
                self.selected_task = 0;
            }
        }
    }

    fn current_column_id(&self) -> Option<ColumnId> {
        self.store
            .board()
            .columns
            .get(self.selected_column)
            .map(|c| c.id)
    }

    fn current_task_id(&self) -> Option<TaskId> {
        self.store
            .board()
            .columns
            .get(self.selected_column)
            .and_then(|c| c.tasks.get(self.selected_task))
            .map(|t| t.id)
    }

    fn current_column_len(&self) -> usize {
        self.store
            .board()
            .columns
            .get(self.selected_column)
            .map_or(0, |c| c.tasks.len())
    }

    fn clamp_selection(&mut self) {
        let columns = self.store.board().columns.len();
        self.selected_column = self.selected_column.min(columns.saturating_sub(1));
        self.selected_task = self
            .selected_task
            .min(self.current_column_len().saturating_sub(1));
    }
}

fn contains(r: Rect, x: u16, y: u16) -> bool {
    x >= r.x && x < r.x.saturating_add(r.width) && y >= r.y && y < r.y.saturating_add(r.height)
}

fn setup_terminal(mouse: bool) -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if mouse {
        execute!(stdout, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    info!(mouse, "terminal ready");
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>, mouse: bool) -> Result<()> {
    disable_raw_mode()?;
    if mouse {
        execute!(terminal.backend_mut(), DisableMouseCapture)?;
    }
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PackedColor;
    use crate::storage::{KeyValueStore, MemoryStore, BOARD_KEY, CORRUPT_BOARD_KEY};
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        }
    }

    fn app_with(board: Board) -> (App, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut app = App::new(
            BoardRepository::new(store.clone()),
            Duration::from_millis(10),
        );
        app.finish_load(Ok(board));
        (app, store)
    }

    fn two_columns_one_task() -> Board {
        let mut board = Board::new();
        let a = board.add_column_named("A");
        board.add_column_named("B");
        board.add_task(a, "t1").unwrap();
        board
    }

    fn render(app: &mut App) {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
    }

    fn wait_for_load(app: &mut App) {
        for _ in 0..200 {
            app.poll_load();
            if !app.is_loading() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("board never finished loading");
    }

    #[test]
    fn keys_build_a_column_with_a_task() {
        let (mut app, _) = app_with(Board::new());
        type_text(&mut app, "cr");
        for _ in 0.."New Column".len() {
            app.handle_key(key(KeyCode::Backspace));
        }
        type_text(&mut app, "To Do");
        app.handle_key(key(KeyCode::Enter));
        type_text(&mut app, "n");
        type_text(&mut app, "Buy milk");
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Esc));

        let board = app.store.board();
        assert_eq!(board.columns.len(), 1);
        assert_eq!(board.columns[0].name, "To Do");
        let task = &board.columns[0].tasks[0];
        assert_eq!(task.text, "Buy milk");
        assert!(!task.is_done);
        assert_eq!(task.color, PackedColor::WHITE);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn blank_task_keeps_input_open() {
        let (mut app, _) = app_with(two_columns_one_task());
        type_text(&mut app, "n  ");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.status, "Task text is empty");
        assert!(matches!(app.mode, Mode::NewTask { .. }));
        assert_eq!(app.store.board().task_count(), 1);
    }

    #[test]
    fn escape_leaves_title_untouched() {
        let (mut app, _) = app_with(two_columns_one_task());
        type_text(&mut app, "rxyz");
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.store.board().columns[0].name, "A");
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn keyboard_drag_moves_task_and_selection() {
        let (mut app, _) = app_with(two_columns_one_task());
        type_text(&mut app, "gl");
        assert!(app.store.drag().is_some());
        app.handle_key(key(KeyCode::Enter));
        let board = app.store.board();
        assert!(board.columns[0].tasks.is_empty());
        assert_eq!(board.columns[1].tasks[0].text, "t1");
        assert_eq!(app.selected_column, 1);
        assert!(app.store.drag().is_none());
    }

    #[test]
    fn drop_on_source_column_leaves_board_alone() {
        let (mut app, _) = app_with(two_columns_one_task());
        let rev = app.store.revision();
        type_text(&mut app, "g");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.store.revision(), rev);
        assert_eq!(app.status, "Dropped in place");
    }

    #[test]
    fn move_shortcuts_step_between_columns() {
        let (mut app, _) = app_with(two_columns_one_task());
        type_text(&mut app, "m");
        assert_eq!(app.store.board().columns[1].tasks.len(), 1);
        type_text(&mut app, "b");
        assert_eq!(app.store.board().columns[0].tasks.len(), 1);
        type_text(&mut app, "b");
        assert_eq!(app.store.board().columns[0].tasks.len(), 1);
    }

    #[test]
    fn picker_sets_color_and_closes() {
        let (mut app, _) = app_with(two_columns_one_task());
        type_text(&mut app, "p3");
        assert_eq!(app.store.board().columns[0].tasks[0].color, PackedColor::YELLOW);
        assert!(matches!(app.mode, Mode::Normal));

        type_text(&mut app, "P");
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.store.board().columns[0].color, PackedColor::CYAN);
    }

    #[test]
    fn toggle_and_remove_selected_task() {
        let (mut app, _) = app_with(two_columns_one_task());
        type_text(&mut app, "x");
        assert!(app.store.board().columns[0].tasks[0].is_done);
        type_text(&mut app, "x");
        assert!(!app.store.board().columns[0].tasks[0].is_done);
        type_text(&mut app, "d");
        assert_eq!(app.store.board().task_count(), 0);
    }

    #[test]
    fn delete_column_needs_confirmation() {
        let (mut app, _) = app_with(two_columns_one_task());
        type_text(&mut app, "Dn");
        assert_eq!(app.store.board().columns.len(), 2);
        type_text(&mut app, "Dy");
        assert_eq!(app.store.board().columns.len(), 1);
        assert_eq!(app.store.board().columns[0].name, "B");
    }

    #[test]
    fn mouse_drag_drops_on_column_under_pointer() {
        let (mut app, _) = app_with(two_columns_one_task());
        render(&mut app);
        let (_, _, task_rect) = app.hits.tasks[0];
        let target = app.hits.columns[1].1;

        app.handle_mouse(mouse(
            MouseEventKind::Down(MouseButton::Left),
            task_rect.x + 1,
            task_rect.y,
        ));
        assert!(app.store.drag().is_some());
        app.handle_mouse(mouse(
            MouseEventKind::Up(MouseButton::Left),
            target.x + 2,
            target.y + 4,
        ));
        assert!(app.store.board().columns[0].tasks.is_empty());
        assert_eq!(app.store.board().columns[1].tasks.len(), 1);
    }

    #[test]
    fn mouse_release_outside_columns_cancels() {
        let (mut app, _) = app_with(two_columns_one_task());
        render(&mut app);
        let (_, _, task_rect) = app.hits.tasks[0];
        app.handle_mouse(mouse(
            MouseEventKind::Down(MouseButton::Left),
            task_rect.x,
            task_rect.y,
        ));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 0, 0));
        assert!(app.store.drag().is_none());
        assert_eq!(app.store.board().columns[0].tasks.len(), 1);
    }

    #[test]
    fn clicking_add_tile_adds_column() {
        let (mut app, _) = app_with(two_columns_one_task());
        render(&mut app);
        let tile = app.hits.add_column.unwrap();
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), tile.x + 1, tile.y + 1));
        assert_eq!(app.store.board().columns.len(), 3);
        assert_eq!(app.selected_column, 2);
    }

    #[test]
    fn keys_are_ignored_while_loading() {
        let store = Arc::new(MemoryStore::new());
        let mut app = App::new(BoardRepository::new(store), Duration::from_millis(10));
        app.begin_load();
        type_text(&mut app, "c");
        assert!(app.store.board().columns.is_empty());
        assert_eq!(app.status, "Still loading the board...");
        wait_for_load(&mut app);
        type_text(&mut app, "c");
        assert_eq!(app.store.board().columns.len(), 1);
    }

    #[test]
    fn corrupt_store_starts_empty_and_keeps_old_text() {
        let store = Arc::new(MemoryStore::with_value(BOARD_KEY, "not a board"));
        let mut app = App::new(
            BoardRepository::new(store.clone()),
            Duration::from_millis(10),
        );
        app.begin_load();
        wait_for_load(&mut app);
        assert!(app.status.contains("unreadable"));
        assert!(app.store.board().columns.is_empty());

        type_text(&mut app, "c");
        app.flush().unwrap();
        assert_eq!(
            store.get(CORRUPT_BOARD_KEY).unwrap().as_deref(),
            Some("not a board")
        );
        assert!(store.get(BOARD_KEY).unwrap().unwrap().contains("New Column"));
    }

    #[test]
    fn failed_load_turns_saving_off() {
        let stored = r#"[{"id":0,"name":"A","color":0,"tasks":[]}]"#;
        let store = Arc::new(MemoryStore::with_value(BOARD_KEY, stored));
        let mut app = App::new(
            BoardRepository::new(store.clone()),
            Duration::from_millis(10),
        );
        app.finish_load(Err(StorageError::LoaderGone));
        assert!(app.status.contains("saving is off"));
        assert!(app.saver.is_disabled());

        type_text(&mut app, "c");
        assert_eq!(app.store.board().columns.len(), 1);
        app.autosave(Instant::now() + Duration::from_secs(1));
        app.flush().unwrap();
        assert_eq!(store.get(BOARD_KEY).unwrap().as_deref(), Some(stored));
        render(&mut app);
    }

    #[test]
    fn autosave_waits_for_quiet_period() {
        let (mut app, store) = app_with(two_columns_one_task());
        let start = Instant::now();
        type_text(&mut app, "x");
        app.autosave(start);
        assert!(store.get(BOARD_KEY).unwrap().is_none());
        app.autosave(start + Duration::from_millis(50));
        let saved = store.get(BOARD_KEY).unwrap().unwrap();
        assert!(saved.contains("\"isDone\":true"));
    }
}
