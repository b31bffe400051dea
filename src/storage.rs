use crate::color::PackedColor;
use crate::model::{Board, Column, ColumnId, Task, TaskId};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{error, info, warn};

pub const BOARD_KEY: &str = "board";
pub const CORRUPT_BOARD_KEY: &str = "board.corrupt";

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("reading {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("writing {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store file {path:?} is not a valid key/value map: {source}")]
    Index {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("stored board is not valid: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("encoding board: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("no data directory available")]
    NoDataDir,
    #[error("background load ended without a result")]
    LoaderGone,
}

/// String values under string keys, like a platform preference store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn describe(&self) -> String;
}

/// All keys live in one YAML mapping on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read_to_string(&self.path).map_err(|source| StorageError::Read {
            path: self.path.clone(),
            source,
        })?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_yaml::from_str(&data).map_err(|source| StorageError::Index {
            path: self.path.clone(),
            source,
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_err = |source: std::io::Error| StorageError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let serialized = serde_yaml::to_string(map).map_err(|source| StorageError::Index {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("yml.tmp");
        fs::write(&tmp, serialized).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = MemoryStore::new();
        store.insert(key, value);
        store
    }

    fn insert(&self, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

pub fn default_store_path() -> Result<PathBuf, StorageError> {
    let dirs = ProjectDirs::from("", "", "tasklanes").ok_or(StorageError::NoDataDir)?;
    Ok(dirs.data_dir().join("prefs.yml"))
}

#[derive(Serialize, Deserialize)]
struct StoredColumn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ColumnId>,
    name: String,
    color: u64,
    #[serde(default)]
    tasks: Vec<StoredTask>,
}

#[derive(Serialize, Deserialize)]
struct StoredTask {
    id: TaskId,
    text: String,
    #[serde(rename = "isDone", default)]
    is_done: bool,
    color: u64,
}

pub fn encode_board(board: &Board) -> Result<String, StorageError> {
    let columns: Vec<StoredColumn> = board
        .columns
        .iter()
        .map(|column| StoredColumn {
            id: Some(column.id),
            name: column.name.clone(),
            color: column.color.to_wide(),
            tasks: column
                .tasks
                .iter()
                .map(|task| StoredTask {
                    id: task.id,
                    text: task.text.clone(),
                    is_done: task.is_done,
                    color: task.color.to_wide(),
                })
                .collect(),
        })
        .collect();
    serde_json::to_string(&columns).map_err(StorageError::Encode)
}

/// Blank text decodes to an empty board.
pub fn decode_board(text: &str) -> Result<Board, StorageError> {
    if text.trim().is_empty() {
        return Ok(Board::new());
    }
    let stored: Vec<StoredColumn> = serde_json::from_str(text).map_err(StorageError::Decode)?;
    let columns = stored
        .into_iter()
        .map(|column| {
            let tasks = column
                .tasks
                .into_iter()
                .map(|task| Task {
                    id: task.id,
                    text: task.text,
                    is_done: task.is_done,
                    color: PackedColor::from_wide(task.color),
                })
                .collect();
            (
                column.id,
                Column {
                    id: 0,
                    name: column.name,
                    color: PackedColor::from_wide(column.color),
                    tasks,
                },
            )
        })
        .collect();
    Ok(Board::from_columns(columns))
}

/// Loads and saves the board under [`BOARD_KEY`].
#[derive(Clone)]
pub struct BoardRepository {
    store: Arc<dyn KeyValueStore>,
}

impl BoardRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        BoardRepository { store }
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    pub fn load(&self) -> Result<Board, StorageError> {
        match self.store.get(BOARD_KEY)? {
            Some(text) => decode_board(&text),
            None => Ok(Board::new()),
        }
    }

    /// Like [`load`](Self::load), but stashes undecodable text under
    /// [`CORRUPT_BOARD_KEY`] so a later save cannot overwrite the only copy.
    pub fn load_or_recover(&self) -> Result<Board, StorageError> {
        let Some(text) = self.store.get(BOARD_KEY)? else {
            info!(store = %self.describe(), "no stored board, starting empty");
            return Ok(Board::new());
        };
        match decode_board(&text) {
            Ok(board) => {
                info!(
                    store = %self.describe(),
                    columns = board.columns.len(),
                    tasks = board.task_count(),
                    "board loaded"
                );
                Ok(board)
            }
            Err(err) => {
                warn!(error = %err, "stored board is corrupt, keeping a copy");
                self.store.set(CORRUPT_BOARD_KEY, &text)?;
                Err(err)
            }
        }
    }

    pub fn save(&self, board: &Board) -> Result<(), StorageError> {
        let text = encode_board(board)?;
        self.store.set(BOARD_KEY, &text)
    }

    pub fn raw(&self) -> Result<Option<String>, StorageError> {
        self.store.get(BOARD_KEY)
    }

    /// Runs [`load_or_recover`](Self::load_or_recover) off the calling thread.
    /// A panicking load still delivers [`StorageError::LoaderGone`].
    pub fn spawn_load(&self) -> Receiver<Result<Board, StorageError>> {
        let (tx, rx) = mpsc::channel();
        let repo = self.clone();
        thread::spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| repo.load_or_recover()))
                .unwrap_or_else(|_| {
                    error!(store = %repo.describe(), "board loader panicked");
                    Err(StorageError::LoaderGone)
                });
            // The receiver may already be gone if the app quit while loading.
            let _ = tx.send(outcome);
        });
        rx
    }
}
