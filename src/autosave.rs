use crate::model::Board;
use crate::storage::{BoardRepository, StorageError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Debounced writer: waits until the board has been quiet for `delay`
/// before saving the newest revision.
#[derive(Debug)]
pub struct AutoSaver {
    delay: Duration,
    saved_revision: u64,
    pending: Option<(u64, Instant)>,
    last_saved_at: Option<Instant>,
    disabled: bool,
}

impl AutoSaver {
    pub fn new(delay: Duration, current_revision: u64) -> Self {
        AutoSaver {
            delay,
            saved_revision: current_revision,
            pending: None,
            last_saved_at: None,
            disabled: false,
        }
    }

    /// Records the store's current revision. A newer revision restarts the
    /// quiet period.
    pub fn observe(&mut self, revision: u64, now: Instant) {
        if self.disabled {
            return;
        }
        let latest = self.pending.map_or(self.saved_revision, |(rev, _)| rev);
        if revision > latest {
            self.pending = Some((revision, now + self.delay));
        }
    }

    /// Forgets pending work, e.g. after a freshly loaded board was installed.
    pub fn reset(&mut self, revision: u64) {
        self.saved_revision = revision;
        self.pending = None;
    }

    /// Stops all further writes for this session.
    pub fn disable(&mut self) {
        warn!("autosave disabled");
        self.disabled = true;
        self.pending = None;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    pub fn due(&self, now: Instant) -> bool {
        matches!(self.pending, Some((_, deadline)) if now >= deadline)
    }

    pub fn last_saved_at(&self) -> Option<Instant> {
        self.last_saved_at
    }

    /// Saves when the quiet period has passed. Returns true when a write
    /// happened. A failed write stays pending and is retried after another
    /// quiet period.
    pub fn tick(
        &mut self,
        now: Instant,
        board: &Board,
        repo: &BoardRepository,
    ) -> Result<bool, StorageError> {
        if !self.due(now) {
            return Ok(false);
        }
        self.write(now, board, repo).map(|_| true)
    }

    pub fn flush(&mut self, board: &Board, repo: &BoardRepository) -> Result<bool, StorageError> {
        if self.pending.is_none() {
            return Ok(false);
        }
        self.write(Instant::now(), board, repo).map(|_| true)
    }

    fn write(
        &mut self,
        now: Instant,
        board: &Board,
        repo: &BoardRepository,
    ) -> Result<(), StorageError> {
        let Some((revision, _)) = self.pending else {
            return Ok(());
        };
        match repo.save(board) {
            Ok(()) => {
                debug!(revision, "board saved");
                self.saved_revision = revision;
                self.pending = None;
                self.last_saved_at = Some(now);
                Ok(())
            }
            Err(err) => {
                warn!(revision, error = %err, "saving board failed");
                self.pending = Some((revision, now + self.delay));
                Err(err)
            }
        }
    }
}
