//! Change accumulation and batched notification.
//!
//! Every engine marks the row indices it touches; a flush at the end of
//! each public call coalesces the dirty set into minimal contiguous
//! ranges and reports them, together with row-count and cursor changes.
//! `suspend`/`resume` bracket a batch so several sub-writes (say,
//! clear-then-rewrite a prompt) surface as one externally visible
//! change.

use std::collections::BTreeSet;
use std::fmt;

use crate::console::ConsoleBuffer;
use crate::row::Row;

/// One contiguous range of changed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentChange {
    /// First changed row index.
    pub first_row: usize,
    /// Last changed row index, inclusive.
    pub last_row: usize,
    /// Whether every row changed (eviction, clear, reflow).
    pub all_changed: bool,
}

/// A pending notification produced by a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Notification {
    RowCount(usize),
    Content(ContentChange),
    Cursor { row: usize, column: usize },
}

/// Accumulates dirty rows between flushes.
///
/// Not a pub/sub stream: an explicit accumulator plus a suspend flag
/// checked at flush time keeps event ordering deterministic and easy to
/// test.
#[derive(Debug, Default)]
pub(crate) struct ChangeTracker {
    dirty: BTreeSet<usize>,
    all_changed: bool,
    suspended: bool,
    last_row_count: Option<usize>,
    last_cursor: Option<(usize, usize)>,
}

impl ChangeTracker {
    /// Mark a single row index dirty.
    pub(crate) fn mark(&mut self, index: usize) {
        if !self.all_changed {
            self.dirty.insert(index);
        }
    }

    /// Mark every row from `index` to `len` dirty.
    pub(crate) fn mark_from(&mut self, index: usize, len: usize) {
        for i in index..len {
            self.mark(i);
        }
    }

    /// Mark the whole buffer dirty, superseding individual marks.
    pub(crate) fn mark_all(&mut self) {
        self.all_changed = true;
        self.dirty.clear();
    }

    /// Stop flushes until [`resume`](Self::resume). Idempotent, not
    /// nestable.
    pub(crate) fn suspend(&mut self) {
        self.suspended = true;
    }

    pub(crate) fn resume(&mut self) {
        self.suspended = false;
    }

    pub(crate) fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Drain accumulated changes into an ordered notification list.
    ///
    /// Returns nothing while suspended. Row count comes first so a
    /// renderer can size its surface before content arrives; the cursor
    /// comes last with only the final net position.
    pub(crate) fn drain(
        &mut self,
        row_count: usize,
        cursor: (usize, usize),
    ) -> Vec<Notification> {
        if self.suspended {
            return Vec::new();
        }
        let mut out = Vec::new();

        if self.last_row_count != Some(row_count) {
            out.push(Notification::RowCount(row_count));
            self.last_row_count = Some(row_count);
        }

        if self.all_changed {
            if row_count > 0 {
                out.push(Notification::Content(ContentChange {
                    first_row: 0,
                    last_row: row_count - 1,
                    all_changed: true,
                }));
            }
            self.all_changed = false;
            self.dirty.clear();
        } else if !self.dirty.is_empty() {
            // Partition the sorted indices into maximal contiguous runs.
            // Rows can be marked and then removed within one batch, so
            // stale indices clamp to the current last row.
            let mut run: Option<(usize, usize)> = None;
            for &index in &self.dirty {
                let index = index.min(row_count.saturating_sub(1));
                run = match run {
                    None => Some((index, index)),
                    Some((first, last)) if index <= last + 1 => Some((first, index.max(last))),
                    Some((first, last)) => {
                        out.push(Notification::Content(ContentChange {
                            first_row: first,
                            last_row: last,
                            all_changed: false,
                        }));
                        Some((index, index))
                    }
                };
            }
            if let Some((first, last)) = run {
                out.push(Notification::Content(ContentChange {
                    first_row: first,
                    last_row: last,
                    all_changed: false,
                }));
            }
            self.dirty.clear();
        }

        if self.last_cursor != Some(cursor) {
            out.push(Notification::Cursor {
                row: cursor.0,
                column: cursor.1,
            });
            self.last_cursor = Some(cursor);
        }

        out
    }
}

/// Hook invoked with a coalesced content change.
pub type ContentHook = Box<dyn FnMut(&ConsoleBuffer, ContentChange)>;
/// Hook invoked with the cursor's final row and column.
pub type CursorHook = Box<dyn FnMut(&ConsoleBuffer, usize, usize)>;
/// Hook invoked with the new row count.
pub type RowCountHook = Box<dyn FnMut(&ConsoleBuffer, usize)>;
/// Hook invoked synchronously with the former index and content of a row
/// evicted from bounded history. Fires even while notifications are
/// suspended; must not call back into the buffer.
pub type DiscardHook = Box<dyn FnMut(usize, &Row)>;

/// Registered notification hooks.
///
/// Kept apart from [`ChangeTracker`] so dispatch can hand the buffer
/// itself to each hook (for `row_text` lookups) without aliasing.
#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) content: Vec<ContentHook>,
    pub(crate) cursor: Vec<CursorHook>,
    pub(crate) row_count: Vec<RowCountHook>,
    pub(crate) discard: Vec<DiscardHook>,
}

impl Hooks {
    /// Move hooks registered during dispatch into `self`, preserving the
    /// original registration order.
    pub(crate) fn absorb(&mut self, added: Hooks) {
        self.content.extend(added.content);
        self.cursor.extend(added.cursor);
        self.row_count.extend(added.row_count);
        self.discard.extend(added.discard);
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("content", &self.content.len())
            .field("cursor", &self.cursor.len())
            .field("row_count", &self.row_count.len())
            .field("discard", &self.discard.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(first: usize, last: usize) -> Notification {
        Notification::Content(ContentChange {
            first_row: first,
            last_row: last,
            all_changed: false,
        })
    }

    #[test]
    fn test_single_range_coalescing() {
        let mut tracker = ChangeTracker::default();
        tracker.mark(5);
        tracker.mark(7);
        tracker.mark(6);
        let out = tracker.drain(10, (0, 0));
        assert!(out.contains(&content(5, 7)));
        assert_eq!(
            out.iter()
                .filter(|n| matches!(n, Notification::Content(_)))
                .count(),
            1
        );
    }

    #[test]
    fn test_disjoint_ranges_stay_separate() {
        let mut tracker = ChangeTracker::default();
        tracker.drain(10, (0, 0));
        tracker.mark(1);
        tracker.mark(2);
        tracker.mark(6);
        let out = tracker.drain(10, (0, 0));
        assert_eq!(out, vec![content(1, 2), content(6, 6)]);
    }

    #[test]
    fn test_all_changed_supersedes_marks() {
        let mut tracker = ChangeTracker::default();
        tracker.mark(3);
        tracker.mark_all();
        tracker.mark(8);
        let out = tracker.drain(4, (0, 0));
        assert!(out.contains(&Notification::Content(ContentChange {
            first_row: 0,
            last_row: 3,
            all_changed: true,
        })));
    }

    #[test]
    fn test_suspend_accumulates() {
        let mut tracker = ChangeTracker::default();
        tracker.suspend();
        tracker.mark(2);
        assert!(tracker.drain(5, (0, 0)).is_empty());
        tracker.mark(3);
        tracker.resume();
        let out = tracker.drain(5, (0, 0));
        assert!(out.contains(&content(2, 3)));
    }

    #[test]
    fn test_row_count_reported_once() {
        let mut tracker = ChangeTracker::default();
        tracker.mark(0);
        let out = tracker.drain(3, (0, 0));
        assert!(out.contains(&Notification::RowCount(3)));
        tracker.mark(0);
        let out = tracker.drain(3, (0, 0));
        assert!(!out.iter().any(|n| matches!(n, Notification::RowCount(_))));
    }

    #[test]
    fn test_cursor_reported_on_change_only() {
        let mut tracker = ChangeTracker::default();
        let out = tracker.drain(1, (0, 4));
        assert!(out.contains(&Notification::Cursor { row: 0, column: 4 }));
        let out = tracker.drain(1, (0, 4));
        assert!(!out.iter().any(|n| matches!(n, Notification::Cursor { .. })));
    }

    #[test]
    fn test_stale_indices_clamp_to_last_row() {
        let mut tracker = ChangeTracker::default();
        tracker.drain(10, (0, 0));
        tracker.mark(8);
        tracker.mark(9);
        // Rows were removed after being marked.
        let out = tracker.drain(4, (0, 0));
        assert_eq!(out, vec![Notification::RowCount(4), content(3, 3)]);
    }
}
