//! In-memory cell store
//!
//! A sparse `sheet -> row -> column` map of [`CellConfig`]s plus the merged
//! regions of each sheet. It implements [`ValueGetter`] so it can back the
//! formula runtime directly.

use crate::cell::{CellAddress, CellConfig, CellValue, Coord, Datatype};
use crate::error::{Error, Result};
use crate::getter::ValueGetter;
use crate::structure::{shift_boxes, BoundingBox, StructuralEdit};
use crate::{FORMULA_MARKER, MAX_COLS, MAX_ROWS};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
struct SheetData {
    rows: BTreeMap<u32, BTreeMap<u32, CellConfig>>,
    merged_regions: Vec<BoundingBox>,
}

/// Sparse, sheet-keyed storage for cell configs
#[derive(Debug, Default, Clone)]
pub struct CellStore {
    sheets: BTreeMap<String, SheetData>,
}

impl CellStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn check_bounds(coord: Coord) -> Result<()> {
        if coord.row == 0 || coord.row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(coord.row, MAX_ROWS));
        }
        if coord.col == 0 || coord.col > MAX_COLS {
            return Err(Error::ColumnOutOfBounds(coord.col, MAX_COLS));
        }
        Ok(())
    }

    /// Get a cell config
    pub fn get(&self, sheet: &str, coord: Coord) -> Option<&CellConfig> {
        self.sheets
            .get(sheet)
            .and_then(|s| s.rows.get(&coord.row))
            .and_then(|r| r.get(&coord.col))
    }

    /// Set a cell config
    pub fn set(&mut self, sheet: &str, coord: Coord, config: CellConfig) -> Result<()> {
        Self::check_bounds(coord)?;
        self.sheets
            .entry(sheet.to_string())
            .or_default()
            .rows
            .entry(coord.row)
            .or_default()
            .insert(coord.col, config);
        Ok(())
    }

    /// Enter text the way a user types it into a cell
    ///
    /// Text starting with `=` becomes a formula; numbers and TRUE/FALSE are
    /// typed accordingly; empty text clears the cell.
    pub fn set_input(&mut self, sheet: &str, a1: &str, input: &str) -> Result<()> {
        let addr = CellAddress::parse_qualified(a1, sheet)
            .ok_or_else(|| Error::InvalidAddress(a1.to_string()))?;

        if input.is_empty() {
            self.remove(&addr.sheet, addr.coord());
            return Ok(());
        }

        let config = if input.starts_with(FORMULA_MARKER) {
            CellConfig::formula(input)
        } else if input.trim().parse::<f64>().is_ok() {
            CellConfig {
                text: Some(input.to_string()),
                datatype: Some(Datatype::Number),
                ..Default::default()
            }
        } else if input == "TRUE" || input == "FALSE" {
            CellConfig::boolean(input == "TRUE")
        } else {
            CellConfig::text(input)
        };
        self.set(&addr.sheet, addr.coord(), config)
    }

    /// Store the outcome of evaluating a formula cell
    pub fn set_result(
        &mut self,
        addr: &CellAddress,
        result: Option<CellValue>,
        error: Option<String>,
    ) -> Result<()> {
        let config = self
            .sheets
            .get_mut(&addr.sheet)
            .and_then(|s| s.rows.get_mut(&addr.row))
            .and_then(|r| r.get_mut(&addr.col))
            .ok_or_else(|| Error::InvalidAddress(addr.to_string()))?;
        config.result = result;
        config.error = error;
        Ok(())
    }

    /// Remove a cell
    pub fn remove(&mut self, sheet: &str, coord: Coord) -> Option<CellConfig> {
        let data = self.sheets.get_mut(sheet)?;
        let removed = data.rows.get_mut(&coord.row).and_then(|r| r.remove(&coord.col));

        // Clean up empty rows
        if data.rows.get(&coord.row).is_some_and(|r| r.is_empty()) {
            data.rows.remove(&coord.row);
        }
        removed
    }

    /// Get the number of stored cells
    pub fn cell_count(&self) -> usize {
        self.sheets
            .values()
            .flat_map(|s| s.rows.values())
            .map(|r| r.len())
            .sum()
    }

    /// Sheet names, sorted
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    /// All cells in sheet, row, column order
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &CellConfig)> {
        self.sheets.iter().flat_map(|(name, data)| {
            data.rows.iter().flat_map(move |(row, cols)| {
                cols.iter()
                    .map(move |(col, config)| (CellAddress::new(name.clone(), *row, *col), config))
            })
        })
    }

    /// All formula cells in sheet, row, column order
    pub fn formula_cells(&self) -> impl Iterator<Item = (CellAddress, &CellConfig)> {
        self.cells().filter(|(_, config)| config.is_formula())
    }

    /// Merged regions of a sheet
    pub fn merged_regions(&self, sheet: &str) -> &[BoundingBox] {
        self.sheets
            .get(sheet)
            .map(|s| s.merged_regions.as_slice())
            .unwrap_or(&[])
    }

    /// Add a merged region
    pub fn add_merged_region(&mut self, sheet: &str, region: BoundingBox) {
        self.sheets
            .entry(sheet.to_string())
            .or_default()
            .merged_regions
            .push(region);
    }

    /// Move a sheet's merged regions across a row/column insertion or removal
    pub fn apply_structural_edit(&mut self, sheet: &str, edit: StructuralEdit, index: u32) {
        if let Some(data) = self.sheets.get_mut(sheet) {
            data.merged_regions = shift_boxes(&data.merged_regions, edit, index);
            log::debug!(
                "{} {} on '{}': {} merged regions",
                edit,
                index,
                sheet,
                data.merged_regions.len()
            );
        }
    }
}

impl ValueGetter for CellStore {
    fn cell(&self, sheet: &str, coord: Coord) -> Option<CellConfig> {
        self.get(sheet, coord).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_input_detects_types() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "12").unwrap();
        store.set_input("Sheet1", "A2", "=SUM(A1)").unwrap();
        store.set_input("Sheet1", "A3", "TRUE").unwrap();
        store.set_input("Sheet1", "Sheet2!B1", "hello").unwrap();

        let a1 = store.get("Sheet1", Coord::new(1, 1)).unwrap();
        assert_eq!(a1.datatype, Some(Datatype::Number));
        assert!(store.get("Sheet1", Coord::new(2, 1)).unwrap().is_formula());
        assert_eq!(
            store.get("Sheet1", Coord::new(3, 1)).unwrap().datatype,
            Some(Datatype::Boolean)
        );
        assert_eq!(
            store.get("Sheet2", Coord::new(1, 2)).unwrap().text.as_deref(),
            Some("hello")
        );
        assert_eq!(store.cell_count(), 4);
        assert_eq!(store.formula_cells().count(), 1);

        store.set_input("Sheet1", "A3", "").unwrap();
        assert_eq!(store.cell_count(), 3);
    }

    #[test]
    fn test_bounds() {
        let mut store = CellStore::new();
        assert!(store.set("S", Coord::new(0, 1), CellConfig::number(1.0)).is_err());
        assert!(store
            .set("S", Coord::new(1, MAX_COLS + 1), CellConfig::number(1.0))
            .is_err());
        assert!(store.set_input("S", "not-a-cell", "1").is_err());
    }

    #[test]
    fn test_merged_regions_follow_edits() {
        let mut store = CellStore::new();
        store.add_merged_region("Sheet1", BoundingBox::new(1, 1, 2, 1));
        store.apply_structural_edit("Sheet1", StructuralEdit::RowInsert, 1);
        assert_eq!(
            store.merged_regions("Sheet1"),
            &[BoundingBox::new(2, 1, 2, 2)]
        );
        assert!(store.merged_regions("Other").is_empty());
    }
}
