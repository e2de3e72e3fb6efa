//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - A value produced by evaluation or read from a cell
//! - [`CellAddress`] - A sheet-qualified cell location (e.g., "Sheet1!A1")
//! - [`CellRange`] - A sheet-qualified range of cells (e.g., "Sheet1!A1:B10")
//! - [`CellConfig`] - What a cell store returns for one cell

mod address;
mod value;

pub use address::{
    column_to_letters, format_address, letters_to_column, parse_address, quote_sheet_name,
    unquote_sheet_name, CellAddress, CellRange, CellRangeIterator, Coord, SheetId,
};
pub use value::{detect_data_type, CellConfig, CellValue, Datatype, ErrorKind, ErrorValue};
