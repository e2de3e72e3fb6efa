//! Formula error types

use gridref_core::{CellValue, ErrorKind, ErrorValue};
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Message reported when evaluation re-enters a cell that is still being computed
pub const ERROR_CIRCULAR_DEPENDENCY: &str = "Circular dependency detected.";

/// Message carried by the `#REF!` error value
pub const ERROR_REFERENCE: &str = "Reference does not exist.";

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// A cell was reached again while its own evaluation was in progress
    #[error("Circular dependency detected.")]
    CircularDependency,

    /// Reference to a cell that does not exist
    #[error("Reference does not exist.")]
    InvalidReference,

    /// Range materialization exceeded the configured cell limit
    #[error("Range {range} has {cells} cells, more than the limit of {limit}")]
    RangeTooLarge {
        range: String,
        cells: u64,
        limit: u64,
    },
}

impl FormulaError {
    /// Error value kind that stands in for this failure in other cells
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::CircularDependency => ErrorKind::Circular,
            FormulaError::InvalidReference => ErrorKind::Ref,
            FormulaError::UnknownFunction(_) => ErrorKind::Name,
            FormulaError::Argument(_) | FormulaError::ArgumentCount { .. } => ErrorKind::Value,
            FormulaError::Parse(_)
            | FormulaError::Evaluation(_)
            | FormulaError::RangeTooLarge { .. } => ErrorKind::Generic,
        }
    }

    /// The failure as a cell value, keeping its message
    pub fn to_value(&self) -> CellValue {
        CellValue::Error(ErrorValue::with_message(self.kind(), self.to_string()))
    }
}
