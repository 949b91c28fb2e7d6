//! Bounded linear undo/redo log of deck snapshots.
//!
//! Entries are created only at explicit checkpoints (before/after an
//! operation, on field blur), never per keystroke, so one undo step equals
//! one meaningful user action. New pushes prune the redo branch; the log
//! holds at most [`HISTORY_LIMIT`] entries and drops the oldest on overflow.

use deckgen_common::{Deck, DeckSnapshot};

/// Maximum number of retained snapshots.
pub const HISTORY_LIMIT: usize = 30;

#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Vec<DeckSnapshot>,
    /// Points at the entry matching the live deck; `None` while empty.
    index: Option<usize>,
    /// Set while a snapshot is being written back into the live deck so the
    /// restoration itself is never recorded as a new edit.
    restoring: bool,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot after the current index, discarding any entries
    /// beyond it. On overflow the oldest entry is dropped and the index
    /// clamped to the last entry.
    pub fn push(&mut self, snapshot: DeckSnapshot) {
        if self.restoring {
            tracing::debug!("push suppressed: restore in progress");
            return;
        }

        match self.index {
            Some(i) => self.entries.truncate(i + 1),
            None => self.entries.clear(),
        }
        self.entries.push(snapshot);

        while self.entries.len() > HISTORY_LIMIT {
            self.entries.remove(0);
            tracing::debug!("history overflow, oldest entry dropped");
        }
        self.index = Some(self.entries.len() - 1);

        tracing::debug!(depth = self.entries.len(), "history entry pushed");
    }

    /// Record the deck only when it differs from the entry at the current
    /// index; back-to-back calls with no intervening change add nothing.
    pub fn save_snapshot(&mut self, deck: &Deck) {
        if self.restoring {
            return;
        }
        let snapshot = DeckSnapshot::capture(deck);
        if let Some(i) = self.index {
            if self.entries[i] == snapshot {
                return;
            }
        }
        self.push(snapshot);
    }

    /// Step back one entry. `None` when already at the earliest entry or the
    /// log is empty. The caller restores the returned snapshot into the live
    /// deck inside [`begin_restore`](Self::begin_restore)/
    /// [`end_restore`](Self::end_restore).
    pub fn undo(&mut self) -> Option<DeckSnapshot> {
        let i = self.index?;
        if i == 0 {
            return None;
        }
        self.index = Some(i - 1);
        tracing::debug!(index = i - 1, "undo");
        Some(self.entries[i - 1].clone())
    }

    /// Step forward one entry; mirror of [`undo`](Self::undo).
    pub fn redo(&mut self) -> Option<DeckSnapshot> {
        let i = self.index?;
        if i + 1 >= self.entries.len() {
            return None;
        }
        self.index = Some(i + 1);
        tracing::debug!(index = i + 1, "redo");
        Some(self.entries[i + 1].clone())
    }

    pub fn begin_restore(&mut self) {
        self.restoring = true;
    }

    pub fn end_restore(&mut self) {
        self.restoring = false;
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.index, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.index, Some(i) if i + 1 < self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = None;
        self.restoring = false;
        tracing::debug!("history cleared");
    }
}
