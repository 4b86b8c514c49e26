//! Operation log — the authoritative drawing record for one room.
//!
//! DESIGN
//! ======
//! The log is append-only: entries are ordered by arrival at the server and
//! are never reordered or removed. Undo and redo are global per room and
//! blind to authorship; they only ever flip an entry's `undone` flag. Both
//! scan backward from the tail, so they always act on the most recent state
//! transition rather than on a per-author stack. A consequence worth
//! spelling out: appending a new operation after an undo does not invalidate
//! the undone entry, and a later redo still restores exactly that entry.

use protocol::Operation;

pub struct OperationLog {
    entries: Vec<Operation>,
}

impl OperationLog {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append an operation at the tail. Never fails; no validation beyond
    /// the structural shape the codec already enforced.
    pub fn append(&mut self, op: Operation) {
        self.entries.push(op);
    }

    /// Mark the most recent not-yet-undone entry as undone and return it.
    /// Returns `None` (and changes nothing) when the log is empty or every
    /// entry is already undone.
    pub fn undo(&mut self) -> Option<Operation> {
        let entry = self.entries.iter_mut().rev().find(|op| !op.undone)?;
        entry.undone = true;
        Some(entry.clone())
    }

    /// Restore the most recently undone entry and return it. Returns `None`
    /// when no entry is undone.
    pub fn redo(&mut self) -> Option<Operation> {
        let entry = self.entries.iter_mut().rev().find(|op| op.undone)?;
        entry.undone = false;
        Some(entry.clone())
    }

    /// The full entry list in insertion order, undone entries included and
    /// tagged. A receiver reconstructs visual state by replaying every
    /// entry with `undone == false`.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Operation> {
        self.entries.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "oplog_test.rs"]
mod tests;
