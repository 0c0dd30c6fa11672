//! termline: the virtual-terminal text buffer at the heart of a
//! line-editing console library.
//!
//! The buffer emulates a fixed-width, height-bounded console surface.
//! A shell writes to it character-by-character through
//! [`ConsoleBuffer`]; rendering front ends implement
//! [`render::RenderSurface`] and redraw only the row ranges the buffer
//! reports as changed.
//!
//! ```
//! use termline::{ConsoleBuffer, WriteMode};
//!
//! let mut console = ConsoleBuffer::new(80, 25)?;
//! console.write_line("$ cargo build", WriteMode::Shift);
//! assert_eq!(console.row_text(0), Some("$ cargo build"));
//! # Ok::<(), termline::ConsoleError>(())
//! ```

pub mod render;

pub use termline_buffer::{
    ConsoleBuffer, ConsoleError, ContentChange, DeleteDirection, LineId, LogicalCursor,
    PhysicalCursor, Row, WriteMode, MIN_DIMENSION,
};
