use std::sync::Arc;

use tasklanes::color::PackedColor;
use tasklanes::model::Board;
use tasklanes::storage::{
    BoardRepository, FileStore, KeyValueStore, StorageError, BOARD_KEY, CORRUPT_BOARD_KEY,
};
use tasklanes::store::BoardStore;
use tempfile::TempDir;

fn repo_in(dir: &TempDir) -> (BoardRepository, Arc<FileStore>) {
    let store = Arc::new(FileStore::new(dir.path().join("nested").join("prefs.yml")));
    (BoardRepository::new(store.clone()), store)
}

#[test]
fn missing_file_loads_empty_board() {
    let dir = TempDir::new().unwrap();
    let (repo, _) = repo_in(&dir);
    assert!(repo.load().unwrap().columns.is_empty());
}

#[test]
fn board_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let (repo, _) = repo_in(&dir);

    let mut store = BoardStore::default();
    let todo = store.add_column_named("To Do");
    let done = store.add_column_named("Done");
    let milk = store.add_task(todo, "Buy milk").unwrap();
    let bread = store.add_task(todo, "Bake bread").unwrap();
    store.set_task_color(bread, PackedColor::MAGENTA).unwrap();
    store.start_drag(milk, todo).unwrap();
    store.drop_on(done).unwrap();
    store.toggle_task(milk).unwrap();
    repo.save(store.board()).unwrap();

    let (reopened, _) = repo_in(&dir);
    let loaded = reopened.load().unwrap();
    assert_eq!(&loaded, store.board());

    // New ids keep counting past what was stored.
    let mut loaded = loaded;
    let next = loaded.add_task(todo, "Sweep").unwrap();
    assert!(next > milk && next > bread);
}

#[test]
fn other_keys_are_preserved_on_save() {
    let dir = TempDir::new().unwrap();
    let (repo, store) = repo_in(&dir);
    store.set("theme", "dark").unwrap();
    repo.save(&Board::new()).unwrap();
    assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    assert_eq!(store.get(BOARD_KEY).unwrap().as_deref(), Some("[]"));
}

#[test]
fn corrupt_board_is_reported_and_kept() {
    let dir = TempDir::new().unwrap();
    let (repo, store) = repo_in(&dir);
    store.set(BOARD_KEY, "[{\"name\": 5}]").unwrap();

    let err = repo.load_or_recover().unwrap_err();
    assert!(matches!(err, StorageError::Decode(_)));
    assert_eq!(
        store.get(CORRUPT_BOARD_KEY).unwrap().as_deref(),
        Some("[{\"name\": 5}]")
    );
}

#[test]
fn unreadable_store_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prefs.yml");
    std::fs::write(&path, "- just\n- a list\n").unwrap();
    let repo = BoardRepository::new(Arc::new(FileStore::new(path)));
    assert!(matches!(repo.load(), Err(StorageError::Index { .. })));
}
