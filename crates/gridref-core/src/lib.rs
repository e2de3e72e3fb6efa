//! # gridref-core
//!
//! Core data structures for the gridref spreadsheet reference engine.
//!
//! This crate provides the fundamental types used throughout gridref:
//! - [`CellValue`] - Values produced by evaluation (numbers, text, booleans, errors, matrices)
//! - [`CellAddress`] and [`CellRange`] - Sheet-qualified cell addressing and ranges
//! - [`column_to_letters`], [`letters_to_column`], [`parse_address`], [`format_address`] - A1 codec
//! - [`ValueGetter`] - The lookup contract used by the formula runtime
//! - [`CellStore`] - A sparse in-memory store implementing it
//! - [`shift_boxes`] - Moving merged/filter regions across row and column edits
//!
//! ## Example
//!
//! ```rust
//! use gridref_core::{column_to_letters, letters_to_column, parse_address, Coord};
//!
//! assert_eq!(column_to_letters(26), "AA");
//! assert_eq!(letters_to_column("AA"), Some(27));
//! assert_eq!(parse_address("$B$3"), Some(Coord::new(3, 2)));
//! ```

pub mod cell;
pub mod error;
pub mod getter;
pub mod store;
pub mod structure;

// Re-exports for convenience
pub use cell::{
    column_to_letters, detect_data_type, format_address, letters_to_column, parse_address,
    CellAddress, CellConfig, CellRange, CellValue, Coord, Datatype, ErrorKind, ErrorValue,
    SheetId,
};
pub use error::{Error, Result};
pub use getter::ValueGetter;
pub use store::CellStore;
pub use structure::{shift_boxes, BoundingBox, StructuralEdit};

/// Leading character that marks cell text as a formula
pub const FORMULA_MARKER: char = '=';

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u32 = 16_384;
