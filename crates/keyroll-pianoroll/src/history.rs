use std::cell::RefCell;
use std::rc::Rc;

use keyroll_reactive::{Observable, Store};
use smallvec::SmallVec;
use tracing::debug;

use crate::piano_roll::{PianoRollSnapshot, PianoRollStore};
use crate::song::Song;

/// State captured before an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub song: Song,
    pub piano_roll: PianoRollSnapshot,
}

/// Bounded undo/redo stacks of whole-state snapshots.
///
/// Songs share their tracks, so an entry only copies the tracks edited after
/// it was taken.
#[derive(Debug, Clone)]
pub struct History {
    undo: SmallVec<[HistoryEntry; 8]>,
    redo: SmallVec<[HistoryEntry; 8]>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: SmallVec::new(),
            redo: SmallVec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Records the state before an edit and forgets the redo stack.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.undo.len() >= self.capacity {
            self.undo.remove(0);
        }
        self.undo.push(entry);
        self.redo.clear();
    }

    /// Swaps `current` for the latest recorded state.
    pub fn undo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        let entry = self.undo.pop()?;
        self.redo.push(current);
        Some(entry)
    }

    pub fn redo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        let entry = self.redo.pop()?;
        self.undo.push(current);
        Some(entry)
    }

    pub fn has_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn has_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }
}

/// History bound to the song and piano roll of a session.
#[derive(Clone)]
pub struct HistoryStore {
    store: Store,
    song: Observable<Song>,
    piano_roll: PianoRollStore,
    history: Rc<RefCell<History>>,
}

impl HistoryStore {
    pub fn new(
        store: &Store,
        song: &Observable<Song>,
        piano_roll: &PianoRollStore,
        capacity: usize,
    ) -> Self {
        Self {
            store: store.clone(),
            song: song.clone(),
            piano_roll: piano_roll.clone(),
            history: Rc::new(RefCell::new(History::new(capacity))),
        }
    }

    fn capture(&self) -> HistoryEntry {
        HistoryEntry {
            song: self.store.untracked(|| self.song.get()),
            piano_roll: self.store.untracked(|| self.piano_roll.serialize()),
        }
    }

    fn apply(&self, entry: HistoryEntry) {
        self.store.batch(|| {
            self.song.replace(entry.song);
            self.piano_roll.restore(entry.piano_roll);
        });
    }

    /// Records the current state; call before an edit.
    pub fn push_history(&self) {
        let entry = self.capture();
        self.history.borrow_mut().push(entry);
    }

    pub fn undo(&self) -> bool {
        let current = self.capture();
        let Some(entry) = self.history.borrow_mut().undo(current) else {
            return false;
        };
        debug!("undo");
        self.apply(entry);
        true
    }

    pub fn redo(&self) -> bool {
        let current = self.capture();
        let Some(entry) = self.history.borrow_mut().redo(current) else {
            return false;
        };
        debug!("redo");
        self.apply(entry);
        true
    }

    pub fn has_undo(&self) -> bool {
        self.history.borrow().has_undo()
    }

    pub fn has_redo(&self) -> bool {
        self.history.borrow().has_redo()
    }

    pub fn clear(&self) {
        self.history.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(timebase: u32) -> HistoryEntry {
        HistoryEntry {
            song: Song::new(timebase),
            piano_roll: PianoRollSnapshot::default(),
        }
    }

    #[test]
    fn undo_and_redo_swap_states() {
        let mut history = History::new(10);
        assert_eq!(history.undo(entry(1)), None);
        history.push(entry(1));
        history.push(entry(2));

        assert_eq!(history.undo(entry(3)), Some(entry(2)));
        assert_eq!(history.undo(entry(2)), Some(entry(1)));
        assert!(!history.has_undo());
        assert_eq!(history.redo(entry(1)), Some(entry(2)));
        assert_eq!(history.redo(entry(2)), Some(entry(3)));
        assert!(!history.has_redo());
    }

    #[test]
    fn push_drops_redo_and_oldest_entries() {
        let mut history = History::new(2);
        history.push(entry(1));
        history.push(entry(2));
        history.push(entry(3));
        assert_eq!(history.undo_len(), 2);

        assert_eq!(history.undo(entry(4)), Some(entry(3)));
        history.push(entry(5));
        assert!(!history.has_redo());
        assert_eq!(history.undo(entry(6)), Some(entry(5)));
        assert_eq!(history.undo(entry(5)), Some(entry(2)));
    }
}
