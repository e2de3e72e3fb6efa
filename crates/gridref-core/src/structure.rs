//! Shifting of rectangular regions across row/column insertion and removal
//!
//! Merged regions and filter regions are stored as inclusive, 1-based
//! [`BoundingBox`]es. When rows or columns are inserted or removed, every box
//! is moved so it keeps covering the same cells.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Inclusive, 1-based rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub top: u32,
    pub left: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    pub fn new(top: u32, left: u32, right: u32, bottom: u32) -> Self {
        Self {
            top,
            left,
            right,
            bottom,
        }
    }

    /// Check whether a coordinate lies inside this box
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.top && row <= self.bottom && col >= self.left && col <= self.right
    }
}

/// A row or column insertion/removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructuralEdit {
    RowInsert,
    RowRemove,
    ColumnInsert,
    ColumnRemove,
}

impl StructuralEdit {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructuralEdit::RowInsert => "row-insert",
            StructuralEdit::RowRemove => "row-remove",
            StructuralEdit::ColumnInsert => "column-insert",
            StructuralEdit::ColumnRemove => "column-remove",
        }
    }

    fn is_row(&self) -> bool {
        matches!(self, StructuralEdit::RowInsert | StructuralEdit::RowRemove)
    }

    fn is_insert(&self) -> bool {
        matches!(self, StructuralEdit::RowInsert | StructuralEdit::ColumnInsert)
    }
}

impl fmt::Display for StructuralEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StructuralEdit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "row-insert" => Ok(StructuralEdit::RowInsert),
            "row-remove" => Ok(StructuralEdit::RowRemove),
            "column-insert" => Ok(StructuralEdit::ColumnInsert),
            "column-remove" => Ok(StructuralEdit::ColumnRemove),
            other => Err(Error::InvalidEdit(other.to_string())),
        }
    }
}

/// Shift boxes after inserting or removing the row/column at `index` (1-based)
///
/// Insert at `i`: a box starting at or after `i` moves down/right by one; a box
/// spanning `i` grows by one. Remove at `i`: every edge past `i` moves back by
/// one; a box that only covered `i` on that axis disappears. The orthogonal
/// axis is never touched and index 0 leaves everything as is.
pub fn shift_boxes(boxes: &[BoundingBox], edit: StructuralEdit, index: u32) -> Vec<BoundingBox> {
    if index == 0 {
        return boxes.to_vec();
    }

    boxes
        .iter()
        .filter_map(|bbox| {
            let mut shifted = *bbox;
            let (near, far) = if edit.is_row() {
                (&mut shifted.top, &mut shifted.bottom)
            } else {
                (&mut shifted.left, &mut shifted.right)
            };

            if edit.is_insert() {
                if index <= *near {
                    *near += 1;
                    *far += 1;
                } else if index <= *far {
                    *far += 1;
                }
            } else {
                if *near == index && *far == index {
                    log::trace!("{} {} drops {:?}", edit, index, bbox);
                    return None;
                }
                if *near > index {
                    *near -= 1;
                }
                if *far > index {
                    *far -= 1;
                }
            }
            Some(shifted)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_row_insert() {
        let boxes = vec![BoundingBox::new(1, 1, 2, 1)];
        assert_eq!(
            shift_boxes(&boxes, StructuralEdit::RowInsert, 1),
            vec![BoundingBox::new(2, 1, 2, 2)]
        );
    }

    #[test]
    fn test_column_insert() {
        let boxes = vec![BoundingBox::new(1, 1, 2, 1)];
        assert_eq!(
            shift_boxes(&boxes, StructuralEdit::ColumnInsert, 1),
            vec![BoundingBox::new(1, 2, 3, 1)]
        );
    }

    #[test]
    fn test_insert_inside_box_grows_it() {
        let boxes = vec![BoundingBox::new(2, 1, 1, 5)];
        assert_eq!(
            shift_boxes(&boxes, StructuralEdit::RowInsert, 4),
            vec![BoundingBox::new(2, 1, 1, 6)]
        );
        // after the box: untouched
        assert_eq!(shift_boxes(&boxes, StructuralEdit::RowInsert, 6), boxes);
    }

    #[test]
    fn test_row_remove() {
        let boxes = vec![BoundingBox::new(2, 1, 2, 2)];
        assert_eq!(
            shift_boxes(&boxes, StructuralEdit::RowRemove, 1),
            vec![BoundingBox::new(1, 1, 2, 1)]
        );
    }

    #[test]
    fn test_column_remove() {
        let boxes = vec![BoundingBox::new(2, 2, 2, 5)];
        assert_eq!(
            shift_boxes(&boxes, StructuralEdit::ColumnRemove, 1),
            vec![BoundingBox::new(2, 1, 1, 5)]
        );
    }

    #[test]
    fn test_remove_out_of_bounds_is_noop() {
        let boxes = vec![BoundingBox::new(2, 2, 2, 5)];
        assert_eq!(shift_boxes(&boxes, StructuralEdit::ColumnRemove, 10), boxes);
        assert_eq!(shift_boxes(&boxes, StructuralEdit::RowInsert, 0), boxes);
    }

    #[test]
    fn test_remove_only_row_drops_box() {
        let boxes = vec![BoundingBox::new(3, 1, 4, 3), BoundingBox::new(3, 1, 4, 6)];
        assert_eq!(
            shift_boxes(&boxes, StructuralEdit::RowRemove, 3),
            vec![BoundingBox::new(3, 1, 4, 5)]
        );
    }

    #[test]
    fn test_parse_edit() {
        assert_eq!(
            "column-remove".parse::<StructuralEdit>().unwrap(),
            StructuralEdit::ColumnRemove
        );
        assert!("row-delete".parse::<StructuralEdit>().is_err());
        assert_eq!(StructuralEdit::RowInsert.to_string(), "row-insert");
    }
}
