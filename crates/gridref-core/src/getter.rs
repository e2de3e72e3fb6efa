//! The cell lookup contract between the formula runtime and whatever owns cells

use crate::cell::{CellConfig, Coord};

/// Read-only access to cell contents
///
/// The implementor owns the authoritative store. Returning `None` means the cell
/// is empty; references to it evaluate to null.
pub trait ValueGetter {
    fn cell(&self, sheet: &str, coord: Coord) -> Option<CellConfig>;
}

impl<F> ValueGetter for F
where
    F: Fn(&str, Coord) -> Option<CellConfig>,
{
    fn cell(&self, sheet: &str, coord: Coord) -> Option<CellConfig> {
        self(sheet, coord)
    }
}
