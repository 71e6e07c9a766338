//! Engine errors.

use crate::grid::CellPos;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("cell ({row}, {col}) is outside the board")]
    OutOfBounds { row: usize, col: usize },
    /// Initial generation could not find a colour for a cell without creating a match.
    #[error("no match-free colour for cell ({row}, {col}) after {attempts} attempts")]
    GenerationStuck {
        row: usize,
        col: usize,
        attempts: u32,
    },
    #[error("layout already contains a run at {0}")]
    InitialMatch(CellPos),
    #[error("layout is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    LayoutSize {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("invalid board config: {0}")]
    InvalidConfig(String),
}

impl BoardError {
    pub fn out_of_bounds(pos: CellPos) -> Self {
        Self::OutOfBounds {
            row: pos.row,
            col: pos.col,
        }
    }
}

/// Synchronous swap rejections. Whether an accepted swap sticks is reported later, through
/// events.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SwapError {
    #[error("swap from {from} leaves the board")]
    OutOfBounds { from: CellPos },
    #[error("board is busy")]
    Busy,
    #[error("board is still resolving")]
    Resolving,
    #[error("board is not running")]
    Stopped,
}
