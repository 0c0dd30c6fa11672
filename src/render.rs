//! Render back-end integration.
//!
//! A rendering front end (a real console window, a GUI text widget)
//! mirrors the buffer by redrawing only the rows the buffer reports as
//! changed. This module defines the surface trait those front ends
//! implement and the glue that binds a [`ConsoleBuffer`]'s notification
//! hooks to one.

use std::cell::RefCell;
use std::rc::Rc;

use termline_buffer::ConsoleBuffer;

/// A render target mirroring the console surface.
pub trait RenderSurface {
    /// Redraw one row.
    fn set_row_text(&mut self, index: usize, text: &str);
    /// Move the displayed cursor.
    fn set_cursor_position(&mut self, row: usize, column: usize);
    /// Resize the displayed surface to `count` rows.
    fn set_row_count(&mut self, count: usize);
    /// Drop everything displayed.
    fn clear(&mut self);
}

/// Subscribe a surface to a buffer so changed row ranges, cursor moves
/// and row-count changes redraw automatically.
///
/// The surface is shared because hooks fire from inside the buffer; keep
/// the same `Rc` around to also drive the surface directly.
pub fn bind_surface<S>(console: &mut ConsoleBuffer, surface: Rc<RefCell<S>>)
where
    S: RenderSurface + 'static,
{
    let target = surface.clone();
    console.on_row_count_changed(move |_, count| {
        target.borrow_mut().set_row_count(count);
    });

    let target = surface.clone();
    console.on_content_changed(move |console, change| {
        let mut target = target.borrow_mut();
        if change.all_changed {
            target.clear();
        }
        let last = change.last_row.min(console.row_count().saturating_sub(1));
        for index in change.first_row..=last {
            if let Some(text) = console.row_text(index) {
                target.set_row_text(index, text);
            }
        }
    });

    let target = surface;
    console.on_cursor_moved(move |_, row, column| {
        target.borrow_mut().set_cursor_position(row, column);
    });
}

/// Push the buffer's complete current state to a surface, for the
/// initial paint before incremental updates take over.
pub fn paint_full<S>(console: &ConsoleBuffer, surface: &mut S)
where
    S: RenderSurface,
{
    surface.clear();
    surface.set_row_count(console.row_count());
    for (index, text) in console.row_texts().enumerate() {
        surface.set_row_text(index, text);
    }
    surface.set_cursor_position(console.cursor_row(), console.cursor_column());
}
