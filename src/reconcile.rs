//! Ordered sibling reconciliation
//!
//! Computes the edit script that turns the current (sorted) children of a
//! node into the target (sorted) listing in a single forward pass. Both
//! slices must be sorted by the same total order, which is passed in.

use std::cmp::Ordering;

use crate::entry::Entry;

/// One step of the edit script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingEdit {
    /// `current[current]` already shows `target[target]`
    Keep { target: usize, current: usize },
    /// `target[target]` needs a new view-node at this point
    Insert { target: usize },
    /// `current[current]` is no longer in the listing
    Remove { current: usize },
}

/// Counts of an applied edit script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditSummary {
    pub kept: usize,
    pub inserted: usize,
    pub removed: usize,
}

impl EditSummary {
    pub fn of(edits: &[SiblingEdit]) -> Self {
        let mut summary = Self::default();
        for edit in edits {
            match edit {
                SiblingEdit::Keep { .. } => summary.kept += 1,
                SiblingEdit::Insert { .. } => summary.inserted += 1,
                SiblingEdit::Remove { .. } => summary.removed += 1,
            }
        }
        summary
    }

    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.removed == 0
    }
}

/// Plan the edits turning `current` into `target`.
///
/// Edits come out in application order: kept and inserted entries appear in
/// target order, so collecting them yields the new child list.
pub fn plan<F>(target: &[Entry], current: &[&Entry], order: F) -> Vec<SiblingEdit>
where
    F: Fn(&Entry, &Entry) -> Ordering,
{
    let mut edits = Vec::with_capacity(target.len().max(current.len()));
    let (mut i, mut j) = (0, 0);

    while i < target.len() {
        if j >= current.len() {
            edits.push(SiblingEdit::Insert { target: i });
            i += 1;
        } else if &target[i] == current[j] {
            edits.push(SiblingEdit::Keep {
                target: i,
                current: j,
            });
            i += 1;
            j += 1;
        } else if order(&target[i], current[j]) == Ordering::Less {
            edits.push(SiblingEdit::Insert { target: i });
            i += 1;
        } else {
            edits.push(SiblingEdit::Remove { current: j });
            j += 1;
        }
    }

    while j < current.len() {
        edits.push(SiblingEdit::Remove { current: j });
        j += 1;
    }

    edits
}
