//! The virtual console surface.
//!
//! A height-bounded, width-wrapping text buffer that a command shell
//! writes to character-by-character. Rows past the configured width wrap
//! into continuation rows of the same logical line; rows past the
//! configured height scroll out of bounded history. The cursor is
//! tracked both physically (row index, column) and logically (line id,
//! offset) so restructuring operations can keep it attached to the same
//! content. Every mutation marks the rows it touches; changes flush as
//! coalesced notifications at the end of each public call.

use std::fmt;

use crate::cursor::{LogicalCursor, PhysicalCursor};
use crate::error::{ConsoleError, MIN_DIMENSION};
use crate::events::{
    ChangeTracker, ContentChange, Hooks, Notification,
};
use crate::row::{LineId, Row};
use crate::store::RowStore;

/// How a write treats existing content at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Replace characters in place, falling back to insertion past the
    /// end of the row.
    Overwrite,
    /// Insert, pushing trailing content forward and re-wrapping.
    #[default]
    Shift,
}

/// Which side of the cursor a delete removes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDirection {
    Left,
    Right,
}

/// The console text buffer.
///
/// Not internally thread-safe: public operations are compound multi-row
/// mutations and must be serialized by the caller. All work is CPU-bound
/// and runs to completion; there is no partial-failure state.
#[derive(Debug)]
pub struct ConsoleBuffer {
    store: RowStore,
    /// Width currently applied to the rows.
    width: usize,
    /// Width most recently asked for; applied by the next mutation so
    /// rapid consecutive resizes batch into one reflow.
    requested_width: usize,
    height: usize,
    cursor: PhysicalCursor,
    next_line_id: u64,
    /// A `\n` right after a `\r` collapses into one break.
    saw_carriage_return: bool,
    tracker: ChangeTracker,
    hooks: Hooks,
}

impl ConsoleBuffer {
    /// Create a buffer of the given width and height, holding one empty
    /// row with the cursor at the origin.
    pub fn new(width: usize, height: usize) -> Result<Self, ConsoleError> {
        if width < MIN_DIMENSION {
            return Err(ConsoleError::DimensionTooSmall {
                dimension: "width",
                value: width,
            });
        }
        if height < MIN_DIMENSION {
            return Err(ConsoleError::DimensionTooSmall {
                dimension: "height",
                value: height,
            });
        }
        let mut console = Self {
            store: RowStore::new(height),
            width,
            requested_width: width,
            height,
            cursor: PhysicalCursor::default(),
            next_line_id: 0,
            saw_carriage_return: false,
            tracker: ChangeTracker::default(),
            hooks: Hooks::default(),
        };
        let line = console.alloc_line_id();
        console.store.push(Row::new(line, 0, String::new()));
        console.tracker.mark(0);
        Ok(console)
    }

    // === Properties ===

    /// Number of rows currently held, always `1..=height`.
    pub fn row_count(&self) -> usize {
        self.store.len()
    }

    /// Width currently applied to the rows. A pending [`resize`]
    /// request takes effect at the next mutation or [`refresh`].
    ///
    /// [`resize`]: Self::resize
    /// [`refresh`]: Self::refresh
    pub fn width(&self) -> usize {
        self.width
    }

    /// Width most recently requested through [`resize`](Self::resize).
    pub fn requested_width(&self) -> usize {
        self.requested_width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor.row
    }

    pub fn cursor_column(&self) -> usize {
        self.cursor.column
    }

    /// Whether history holds as many rows as the height allows, so the
    /// next new row evicts the oldest.
    pub fn is_buffer_full(&self) -> bool {
        self.store.len() >= self.height
    }

    /// Whether the cursor sits at the very start of its logical line.
    pub fn is_start_of_line(&self) -> bool {
        self.cursor.column == 0 && self.current_row().ordinal() == 0
    }

    /// Whether the cursor sits at the very end of its logical line.
    pub fn is_end_of_line(&self) -> bool {
        self.cursor.column == self.current_row().len() && self.is_line_end_row(self.cursor.row)
    }

    pub fn is_start_of_buffer(&self) -> bool {
        self.cursor.row == 0 && self.cursor.column == 0
    }

    pub fn is_end_of_buffer(&self) -> bool {
        self.cursor.row + 1 == self.store.len() && self.cursor.column == self.current_row().len()
    }

    /// Text of the row at `index`, if it exists.
    pub fn row_text(&self, index: usize) -> Option<&str> {
        self.store.get(index).map(Row::text)
    }

    /// Text of every row in store order.
    pub fn row_texts(&self) -> impl Iterator<Item = &str> {
        self.store.iter().map(Row::text)
    }

    /// Full text of the cursor's logical line, spliced back together
    /// across its wrapped rows.
    pub fn current_row_text(&self) -> String {
        let current = self.current_row();
        let line = current.line();
        let start = self.cursor.row - current.ordinal();
        let mut text = String::new();
        let mut index = start;
        while let Some(row) = self.store.get(index) {
            if row.line() != line {
                break;
            }
            text.push_str(row.text());
            index += 1;
        }
        text
    }

    /// The cursor's character offset from the start of its logical line.
    pub fn logical_cursor_column(&self) -> usize {
        self.to_logical().column
    }

    /// Store index of the first row of the cursor's logical line.
    pub fn logical_line_start(&self) -> usize {
        self.cursor.row - self.current_row().ordinal()
    }

    // === Hooks ===

    /// Register a hook for coalesced content changes.
    pub fn on_content_changed(
        &mut self,
        hook: impl FnMut(&ConsoleBuffer, ContentChange) + 'static,
    ) {
        self.hooks.content.push(Box::new(hook));
    }

    /// Register a hook for cursor moves; fired once per flush with the
    /// final net position.
    pub fn on_cursor_moved(&mut self, hook: impl FnMut(&ConsoleBuffer, usize, usize) + 'static) {
        self.hooks.cursor.push(Box::new(hook));
    }

    /// Register a hook for row-count changes.
    pub fn on_row_count_changed(&mut self, hook: impl FnMut(&ConsoleBuffer, usize) + 'static) {
        self.hooks.row_count.push(Box::new(hook));
    }

    /// Register a hook for rows evicted from bounded history. Fires
    /// synchronously during the mutation, before notifications flush,
    /// with the row's former index and content. Must not call back into
    /// the buffer.
    pub fn on_row_discarded(&mut self, hook: impl FnMut(usize, &Row) + 'static) {
        self.hooks.discard.push(Box::new(hook));
    }

    /// Stop notifications until [`resume_events`](Self::resume_events);
    /// changes keep accumulating. Idempotent, not nestable.
    pub fn suspend_events(&mut self) {
        self.tracker.suspend();
    }

    /// Resume notifications and flush everything accumulated while
    /// suspended.
    pub fn resume_events(&mut self) {
        self.tracker.resume();
        self.flush_events();
    }

    pub fn events_suspended(&self) -> bool {
        self.tracker.is_suspended()
    }

    /// Apply any pending width change and flush deferred notifications.
    pub fn refresh(&mut self) {
        self.reflow_if_needed();
        self.flush_events();
    }

    // === Facade operations ===

    /// Write text at the cursor. `\n` and `\r` become line breaks, with
    /// `\r\n` collapsing into one.
    pub fn write(&mut self, text: &str, mode: WriteMode) {
        self.reflow_if_needed();
        self.write_text(text, mode);
        self.flush_events();
    }

    /// Write text at the cursor followed by a line break.
    pub fn write_line(&mut self, text: &str, mode: WriteMode) {
        self.reflow_if_needed();
        self.write_text(text, mode);
        self.write_break('\n', mode);
        self.flush_events();
    }

    /// Delete up to `count` characters on the given side of the cursor.
    /// Runs out of characters without error at the buffer ends.
    pub fn delete(&mut self, count: usize, direction: DeleteDirection) {
        if count == 0 {
            return;
        }
        self.reflow_if_needed();
        match direction {
            DeleteDirection::Left => self.delete_left(count),
            DeleteDirection::Right => self.delete_right(count),
        }
        self.flush_events();
    }

    /// Place the cursor. The column may sit anywhere within the target
    /// row's content, including one past its last character.
    pub fn set_cursor(&mut self, row: usize, column: usize) -> Result<(), ConsoleError> {
        self.reflow_if_needed();
        let rows = self.store.len();
        if row >= rows {
            return Err(ConsoleError::RowOutOfRange { row, rows });
        }
        let row_len = self.store.row(row).len();
        if column > row_len {
            return Err(ConsoleError::ColumnOutOfRange { column, row_len });
        }
        self.cursor = PhysicalCursor::new(row, column);
        self.flush_events();
        Ok(())
    }

    /// Move the cursor by `delta` positions over the width-granular
    /// grid, clamped to the buffer ends.
    pub fn move_cursor_by(&mut self, delta: isize) {
        self.reflow_if_needed();
        let width = self.width as isize;
        let position = self.cursor.row as isize * width + self.cursor.column as isize;
        let last_row = self.store.len() - 1;
        let max = last_row as isize * width + self.store.row(last_row).len() as isize;
        let target = (position + delta).clamp(0, max);
        let row = ((target / width) as usize).min(last_row);
        let column = ((target % width) as usize).min(self.store.row(row).len());
        self.cursor = PhysicalCursor::new(row, column);
        self.flush_events();
    }

    /// Collapse the buffer to one empty row with the cursor at the
    /// origin. Older rows leave through the normal discard path.
    pub fn clear(&mut self) {
        self.tracker.mark_all();
        while self.store.len() > 1 {
            if let Some(evicted) = self.store.pop_oldest() {
                self.notify_discard(&evicted);
            }
        }
        if let Some(row) = self.store.get_mut(0) {
            row.clear();
            row.set_ordinal(0);
        }
        self.cursor = PhysicalCursor::default();
        log::debug!("console cleared");
        self.flush_events();
    }

    /// Change the surface dimensions.
    ///
    /// A height change applies immediately, evicting the oldest rows if
    /// the buffer shrinks below its length. A width change is only
    /// recorded here and applied by the next mutation or
    /// [`refresh`](Self::refresh), so rapid consecutive resizes batch
    /// into a single reflow.
    pub fn resize(
        &mut self,
        width: Option<usize>,
        height: Option<usize>,
    ) -> Result<(), ConsoleError> {
        if let Some(width) = width {
            if width < MIN_DIMENSION {
                return Err(ConsoleError::DimensionTooSmall {
                    dimension: "width",
                    value: width,
                });
            }
        }
        if let Some(height) = height {
            if height < MIN_DIMENSION {
                return Err(ConsoleError::DimensionTooSmall {
                    dimension: "height",
                    value: height,
                });
            }
        }
        if let Some(width) = width {
            self.requested_width = width;
        }
        if let Some(height) = height {
            if height != self.height {
                log::debug!("console height {} -> {}", self.height, height);
                self.height = height;
                while self.store.len() > height {
                    if let Some(evicted) = self.store.pop_oldest() {
                        self.evicted_fixup(evicted);
                    }
                }
                let _ = self.store.set_capacity(height);
            }
        }
        self.flush_events();
        Ok(())
    }

    // === Cursor addressing ===

    fn current_row(&self) -> &Row {
        self.store.row(self.cursor.row)
    }

    /// Whether no continuation of the same logical line follows `index`.
    fn is_line_end_row(&self, index: usize) -> bool {
        match self.store.get(index + 1) {
            Some(next) => next.line() != self.store.row(index).line(),
            None => true,
        }
    }

    /// Snapshot the cursor as a logical address: its line id plus the
    /// character offset from the start of that line.
    fn to_logical(&self) -> LogicalCursor {
        let current = self.current_row();
        let mut column = self.cursor.column;
        for back in 1..=current.ordinal() {
            if let Some(index) = self.cursor.row.checked_sub(back) {
                column += self.store.row(index).len();
            }
        }
        LogicalCursor::new(current.line(), column)
    }

    /// Convert a logical address back to store coordinates, walking the
    /// line's rows and clamping to the last one. A fully evicted line
    /// parks the cursor at the top of the buffer.
    fn to_physical(&self, logical: LogicalCursor) -> PhysicalCursor {
        let Some(start) = self.store.iter().position(|r| r.line() == logical.line) else {
            return PhysicalCursor::default();
        };
        let mut column = logical.column;
        let mut index = start;
        loop {
            let len = self.store.row(index).len();
            let next_same = self
                .store
                .get(index + 1)
                .is_some_and(|r| r.line() == logical.line);
            if column < len || !next_same {
                return PhysicalCursor::new(index, column.min(len));
            }
            column -= len;
            index += 1;
        }
    }

    fn alloc_line_id(&mut self) -> LineId {
        self.next_line_id += 1;
        LineId::new(self.next_line_id)
    }

    /// Restore contiguous ordinals `0..k` across the rows of a line.
    fn fix_ordinals(&mut self, line: LineId) {
        let Some(start) = self.store.iter().position(|r| r.line() == line) else {
            return;
        };
        let mut ordinal = 0;
        let mut index = start;
        while let Some(row) = self.store.get_mut(index) {
            if row.line() != line {
                break;
            }
            row.set_ordinal(ordinal);
            ordinal += 1;
            index += 1;
        }
    }

    /// Fold every row of `from` into line `to`, ordinals continuing at
    /// `first_ordinal`.
    fn relabel_line(&mut self, from: LineId, to: LineId, first_ordinal: usize) {
        let mut ordinal = first_ordinal;
        for index in 0..self.store.len() {
            let Some(row) = self.store.get_mut(index) else {
                break;
            };
            if row.line() == from {
                row.set_line(to);
                row.set_ordinal(ordinal);
                ordinal += 1;
                self.tracker.mark(index);
            }
        }
    }

    // === Eviction ===

    fn notify_discard(&mut self, evicted: &Row) {
        log::trace!(
            "discarding row of line {:?} ({} chars)",
            evicted.line(),
            evicted.len()
        );
        for hook in &mut self.hooks.discard {
            hook(0, evicted);
        }
    }

    /// Bookkeeping after the oldest row left the store: every remaining
    /// index shifted down by one. Renumber the evicted row's line,
    /// rebase the cursor, and report the whole surface changed.
    fn evicted_fixup(&mut self, evicted: Row) {
        self.tracker.mark_all();
        let line = evicted.line();
        let mut run_end = 0;
        while let Some(row) = self.store.get_mut(run_end) {
            if row.line() != line {
                break;
            }
            let ordinal = row.ordinal();
            row.set_ordinal(ordinal.saturating_sub(1));
            run_end += 1;
        }
        if self.cursor.row >= run_end + 1 {
            self.cursor.row -= 1;
        }
        self.cursor.row = self.cursor.row.min(self.store.len().saturating_sub(1));
        self.cursor.column = self.cursor.column.min(self.current_row().len());
        self.notify_discard(&evicted);
    }

    // === Write engine ===

    fn write_text(&mut self, text: &str, mode: WriteMode) {
        let mut run_start = 0;
        for (at, ch) in text.char_indices() {
            if ch == '\n' || ch == '\r' {
                if run_start < at {
                    self.write_run(&text[run_start..at], mode);
                }
                self.write_break(ch, mode);
                run_start = at + ch.len_utf8();
            }
        }
        if run_start < text.len() {
            self.write_run(&text[run_start..], mode);
        }
    }

    /// Apply one break-free character run at the cursor.
    fn write_run(&mut self, run: &str, mode: WriteMode) {
        self.saw_carriage_return = false;
        let mut backup = self.to_logical();
        let run_len = run.chars().count();
        let column = self.cursor.column;
        self.tracker.mark(self.cursor.row);
        if let Some(row) = self.store.get_mut(self.cursor.row) {
            if mode == WriteMode::Overwrite {
                let to_remove = run_len.min(row.len().saturating_sub(column));
                row.remove_range(column, to_remove);
            }
            row.insert_at(column, run);
        }
        self.overflow_from(mode, 0);
        self.fix_ordinals(backup.line);
        backup.column += run_len;
        self.cursor = self.to_physical(backup);
    }

    fn write_break(&mut self, ch: char, mode: WriteMode) {
        if ch == '\r' {
            self.new_line(mode);
        } else if !(self.cursor.column == 0 && self.saw_carriage_return) {
            self.new_line(mode);
        }
        self.saw_carriage_return = ch == '\r';
    }

    /// Apply a line break at the cursor.
    fn new_line(&mut self, mode: WriteMode) {
        let prev_column = self.cursor.column;
        let prev_len = self.current_row().len();
        let prev_ordinal = self.current_row().ordinal();
        let at_line_end = self.is_line_end_row(self.cursor.row);
        let mut advance = true;

        // Shift mode carries the tail of the row the cursor leaves down
        // to whichever row ends up under it.
        let tail = if mode == WriteMode::Shift && prev_column < prev_len {
            self.tracker.mark(self.cursor.row);
            self.store
                .get_mut(self.cursor.row)
                .map(|row| row.split_off_at(prev_column))
        } else {
            None
        };

        if mode == WriteMode::Shift && at_line_end {
            if prev_column == 0 && prev_len == 0 && prev_ordinal > 0 {
                // The cursor was pushed onto this empty continuation row
                // by wrapping; relabeling it as a fresh line start avoids
                // a spurious blank row.
                let line = self.alloc_line_id();
                if let Some(row) = self.store.get_mut(self.cursor.row) {
                    row.set_line(line);
                    row.set_ordinal(0);
                }
                self.tracker.mark(self.cursor.row);
                advance = false;
            } else {
                let line = self.alloc_line_id();
                self.tracker.mark(self.cursor.row + 1);
                let row = Row::new(line, 0, String::new());
                if let Some(evicted) = self.store.insert(self.cursor.row + 1, row) {
                    self.evicted_fixup(evicted);
                }
            }
        }

        if advance {
            self.cursor.row += 1;
            if self.cursor.row >= self.store.len() {
                // Overwrite-mode break on the last row opens a fresh
                // line instead of running off the buffer.
                let line = self.alloc_line_id();
                if let Some(evicted) = self.store.push(Row::new(line, 0, String::new())) {
                    self.evicted_fixup(evicted);
                }
                self.cursor.row = self.store.len() - 1;
                self.tracker.mark(self.cursor.row);
            }
        }
        self.cursor.column = 0;

        if let Some(tail) = tail {
            if !tail.is_empty() {
                self.tracker.mark(self.cursor.row);
                if let Some(row) = self.store.get_mut(self.cursor.row) {
                    row.push_str(&tail);
                }
                self.overflow_from(mode, 0);
            }
        }
    }

    /// Re-wrap rows that exceed the width, starting `start_offset` rows
    /// below the cursor. Excess trims off the end of a row and either
    /// carries into the next continuation row or opens a new one,
    /// rechecking each row it lands on. Creating a row past capacity
    /// evicts the oldest.
    fn overflow_from(&mut self, mode: WriteMode, start_offset: usize) {
        let mut checking = start_offset as isize;
        loop {
            let Ok(index) = usize::try_from(self.cursor.row as isize + checking) else {
                break;
            };
            let Some(row) = self.store.get(index) else {
                break;
            };
            if row.len() <= self.width {
                break;
            }
            self.tracker.mark(index);
            let line = row.line();
            let from_ordinal = row.ordinal();
            let excess = match self.store.get_mut(index) {
                Some(row) => row.split_off_at(self.width),
                None => break,
            };
            let next_same = self
                .store
                .get(index + 1)
                .is_some_and(|r| r.line() == line);
            if next_same {
                if let Some(next) = self.store.get_mut(index + 1) {
                    if mode == WriteMode::Overwrite {
                        let excess_len = excess.chars().count();
                        let to_remove = excess_len.min(next.len());
                        next.remove_range(0, to_remove);
                    }
                    next.insert_at(0, &excess);
                }
            } else {
                let row = Row::new(line, from_ordinal + 1, excess);
                if let Some(evicted) = self.store.insert(index + 1, row) {
                    self.evicted_fixup(evicted);
                    checking -= 1;
                }
            }
            let received = (self.cursor.row as isize + checking + 1).max(0) as usize;
            self.tracker.mark(received);
            checking += 1;
        }
    }

    // === Delete engine ===

    fn delete_left(&mut self, count: usize) {
        let mut remaining = count;
        while remaining > 0 {
            let line = self.current_row().line();
            let column = self.cursor.column;
            let removable = remaining.min(column);
            if removable > 0 {
                self.tracker.mark(self.cursor.row);
                if let Some(row) = self.store.get_mut(self.cursor.row) {
                    row.remove_range(column - removable, removable);
                }
                self.back_fill(self.cursor.row, removable);
                self.cursor.column -= removable;
                remaining -= removable;
            }
            if remaining == 0 {
                break;
            }
            if self.cursor.row == 0 {
                // Start of history; the excess count is a no-op.
                break;
            }
            self.cursor.row -= 1;
            let (prev_line, prev_ordinal, prev_len) = {
                let prev = self.current_row();
                (prev.line(), prev.ordinal(), prev.len())
            };
            if prev_line != line {
                // The break between the two lines counts as one deleted
                // character; the whole lower line folds onto the upper.
                self.relabel_line(line, prev_line, prev_ordinal + 1);
                remaining -= 1;
            }
            self.cursor.column = prev_len;
        }
    }

    fn delete_right(&mut self, count: usize) {
        let (start_line, start_ordinal) = {
            let current = self.current_row();
            (current.line(), current.ordinal())
        };
        let column = self.cursor.column;
        let mut remaining = count;

        let removable = remaining.min(self.current_row().len().saturating_sub(column));
        if removable > 0 {
            self.tracker.mark(self.cursor.row);
            if let Some(row) = self.store.get_mut(self.cursor.row) {
                row.remove_range(column, removable);
            }
            remaining -= removable;
        }

        while remaining > 0 {
            if self.cursor.row + 1 >= self.store.len() {
                // End of history; the excess count is a no-op.
                break;
            }
            let next_line = self.store.row(self.cursor.row + 1).line();
            if next_line != start_line {
                // Deleting the break folds the next line onto this one.
                self.relabel_line(next_line, start_line, start_ordinal + 1);
                remaining -= 1;
            }
            let next_len = self.store.row(self.cursor.row + 1).len();
            if remaining >= next_len {
                remaining -= next_len;
                self.tracker.mark_from(self.cursor.row + 1, self.store.len());
                self.store.remove(self.cursor.row + 1);
                continue;
            }
            if remaining > 0 {
                self.tracker.mark(self.cursor.row + 1);
                if let Some(next) = self.store.get_mut(self.cursor.row + 1) {
                    next.drain_prefix(remaining);
                }
                self.back_fill(self.cursor.row + 1, remaining);
                remaining = 0;
            }
        }

        if removable > 0 {
            self.back_fill(self.cursor.row, removable);
        }
        self.fix_ordinals(start_line);
    }

    /// Pull characters forward from continuation rows into a row that
    /// just shrank, removing rows left empty. Stops at the end of the
    /// logical line.
    fn back_fill(&mut self, target_row: usize, count: usize) {
        let mut target = target_row;
        while target + 1 < self.store.len() {
            let line = self.store.row(target).line();
            if self.store.row(target + 1).line() != line {
                break;
            }
            let pulled = match self.store.get_mut(target + 1) {
                Some(origin) => {
                    let take = count.min(origin.len());
                    origin.drain_prefix(take)
                }
                None => break,
            };
            if let Some(row) = self.store.get_mut(target) {
                row.push_str(&pulled);
            }
            self.tracker.mark(target);
            self.tracker.mark(target + 1);
            let origin_empty = self.store.get(target + 1).is_none_or(Row::is_empty);
            if origin_empty {
                self.tracker.mark_from(target + 1, self.store.len());
                if let Some(removed) = self.store.remove(target + 1) {
                    self.fix_ordinals(removed.line());
                }
                break;
            }
            target += 1;
        }
    }

    // === Reflow ===

    /// Apply a pending width change: snapshot the cursor logically,
    /// unwrap every logical line, re-split under the new width, rebuild
    /// the store (truncating the oldest lines past capacity) and restore
    /// the cursor. A width change invalidates every wrap point, so the
    /// whole surface reports changed.
    fn reflow_if_needed(&mut self) {
        if self.requested_width == self.width {
            return;
        }
        log::debug!(
            "re-wrapping {} rows from width {} to {}",
            self.store.len(),
            self.width,
            self.requested_width
        );
        self.tracker.mark_all();
        let backup = self.to_logical();
        self.width = self.requested_width;

        let mut lines: Vec<(LineId, String)> = Vec::new();
        let drained: Vec<Row> = self.store.drain_all().collect();
        for row in drained {
            let continues = lines.last().is_some_and(|(line, _)| *line == row.line());
            if continues {
                if let Some((_, text)) = lines.last_mut() {
                    text.push_str(row.text());
                }
            } else {
                lines.push((row.line(), row.into_content()));
            }
        }

        for (line, text) in lines {
            let mut rest = text.as_str();
            let mut ordinal = 0;
            loop {
                let split = rest
                    .char_indices()
                    .nth(self.width)
                    .map_or(rest.len(), |(at, _)| at);
                let (chunk, tail) = rest.split_at(split);
                if let Some(evicted) = self.store.push(Row::new(line, ordinal, chunk.to_string()))
                {
                    self.notify_discard(&evicted);
                }
                ordinal += 1;
                rest = tail;
                if rest.is_empty() {
                    break;
                }
            }
        }

        // The oldest surviving line may have lost its leading rows.
        if let Some(first) = self.store.first() {
            let line = first.line();
            self.fix_ordinals(line);
        }
        self.cursor = self.to_physical(backup);
    }

    // === Notification ===

    fn flush_events(&mut self) {
        let notifications = self
            .tracker
            .drain(self.store.len(), (self.cursor.row, self.cursor.column));
        if notifications.is_empty() {
            return;
        }
        // Hooks receive the buffer itself for row lookups, so they move
        // out of the struct for the duration of the dispatch.
        let mut hooks = std::mem::take(&mut self.hooks);
        for notification in &notifications {
            match *notification {
                Notification::RowCount(count) => {
                    for hook in &mut hooks.row_count {
                        hook(self, count);
                    }
                }
                Notification::Content(change) => {
                    for hook in &mut hooks.content {
                        hook(self, change);
                    }
                }
                Notification::Cursor { row, column } => {
                    for hook in &mut hooks.cursor {
                        hook(self, row, column);
                    }
                }
            }
        }
        let added = std::mem::replace(&mut self.hooks, hooks);
        self.hooks.absorb(added);
    }
}

/// Formatted writes land at the cursor in Shift mode, so `write!` and
/// `writeln!` drive the buffer directly.
impl fmt::Write for ConsoleBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s, WriteMode::Shift);
        Ok(())
    }
}
