use std::fmt;
use thiserror::Error;

/// Grid axis named in an [`OutOfBounds`] lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("x"),
            Self::Y => f.write_str("y"),
        }
    }
}

/// A cell lookup fell outside the grid extent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{axis} index {index} is outside the grid extent")]
pub struct OutOfBounds {
    pub axis: Axis,
    pub index: i64,
}

/// Errors reading or constructing a height grid.
#[derive(Error, Debug)]
pub enum AscGridError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("header line {line}: expected `{expected} <value>`")]
    Header { line: usize, expected: &'static str },

    #[error("unparsable sample at data row {row}, column {col}")]
    Value { row: usize, col: usize },

    #[error("expected {expected} data rows, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("data row {row} holds {got} samples, expected {expected}")]
    Dimensions {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("invalid grid parameters: {0}")]
    Params(&'static str),
}
