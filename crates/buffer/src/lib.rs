//! Virtual console text buffer for termline.
//!
//! Emulates the fixed-width, height-bounded terminal surface a command
//! shell writes to character-by-character: bounded row history with
//! scroll-out eviction, automatic wrapping into logical lines, insert
//! and overwrite write disciplines, cross-row deletion, cursor-preserving
//! resize, and batched change notification for render back ends.

mod console;
mod cursor;
mod error;
mod events;
mod row;
mod store;

pub use console::{ConsoleBuffer, DeleteDirection, WriteMode};
pub use cursor::{LogicalCursor, PhysicalCursor};
pub use error::{ConsoleError, MIN_DIMENSION};
pub use events::{ContentChange, ContentHook, CursorHook, DiscardHook, RowCountHook};
pub use row::{LineId, Row};
