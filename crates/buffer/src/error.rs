//! Typed errors for contract violations.
//!
//! Only misuse of the API surfaces as an error: out-of-range cursor
//! targets and dimensions below the supported floor. Boundary conditions
//! that interactive editing routinely hits (deleting past the buffer
//! ends, moving beyond content) clamp silently instead, and eviction of
//! old rows is an expected, observable consequence of bounded history,
//! never a failure.

use thiserror::Error;

/// Smallest width and height the console surface supports.
pub const MIN_DIMENSION: usize = 2;

/// Errors raised by the console buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConsoleError {
    /// Cursor row outside the current row range.
    #[error("cursor row {row} out of range ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    /// Cursor column past the end of the target row.
    #[error("cursor column {column} out of range (row holds {row_len} characters)")]
    ColumnOutOfRange { column: usize, row_len: usize },

    /// Width or height below [`MIN_DIMENSION`].
    #[error("console {dimension} must be at least 2, got {value}")]
    DimensionTooSmall {
        dimension: &'static str,
        value: usize,
    },
}
