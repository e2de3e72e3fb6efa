//! Formula translation for copy/paste and fill
//!
//! Moving a formula from `source` to `dest` shifts every relative row/column of
//! its references by the same offset. `$` pins an axis.

use crate::tokenizer::{detokenize, tokenize, TokenKind};
use gridref_core::{column_to_letters, letters_to_column, Coord, FORMULA_MARKER};

const REF_ERROR: &str = "#REF!";

/// Rewrite references in `text` as if the formula moved from `source` to `dest`
///
/// Sheet qualifiers, `$` markers and all other text are preserved. A reference
/// pushed above row 1 or left of column A becomes `#REF!`. Text that is not a
/// formula is returned unchanged.
pub fn translate(text: &str, source: Coord, dest: Coord) -> String {
    if !text.starts_with(FORMULA_MARKER) {
        return text.to_string();
    }

    let delta_row = i64::from(dest.row) - i64::from(source.row);
    let delta_col = i64::from(dest.col) - i64::from(source.col);
    if delta_row == 0 && delta_col == 0 {
        return text.to_string();
    }

    let mut tokens = tokenize(text).tokens;
    for token in tokens.iter_mut() {
        let shifted = match token.kind {
            TokenKind::CellRef => shift_reference(&token.image, delta_row, delta_col),
            TokenKind::RangeRef => shift_range(&token.image, delta_row, delta_col),
            _ => continue,
        };
        token.image = shifted.unwrap_or_else(|| REF_ERROR.to_string());
    }
    detokenize(&tokens)
}

fn shift_range(image: &str, delta_row: i64, delta_col: i64) -> Option<String> {
    let (left, right) = image.split_once(':')?;
    let (qualifier, right) = match right.rfind('!') {
        Some(pos) => right.split_at(pos + 1),
        None => ("", right),
    };
    Some(format!(
        "{}:{}{}",
        shift_reference(left, delta_row, delta_col)?,
        qualifier,
        shift_reference(right, delta_row, delta_col)?
    ))
}

/// Shift one `$?letters$?digits` reference, keeping its markers
fn shift_reference(image: &str, delta_row: i64, delta_col: i64) -> Option<String> {
    let (col_absolute, rest) = match image.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, image),
    };
    let split = rest.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, rest) = rest.split_at(split);
    let (row_absolute, digits) = match rest.strip_prefix('$') {
        Some(digits) => (true, digits),
        None => (false, rest),
    };

    let col = i64::from(letters_to_column(letters)?);
    let row: i64 = digits.parse().ok()?;

    let col = if col_absolute { col } else { col + delta_col };
    let row = if row_absolute { row } else { row + delta_row };
    if col < 1 || row < 1 {
        return None;
    }

    Some(format!(
        "{}{}{}{}",
        if col_absolute { "$" } else { "" },
        column_to_letters(u32::try_from(col - 1).ok()?),
        if row_absolute { "$" } else { "" },
        row
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn coord(row: u32, col: u32) -> Coord {
        Coord::new(row, col)
    }

    #[test]
    fn test_relative() {
        assert_eq!(translate("=A1", coord(1, 2), coord(2, 2)), "=A2");
        assert_eq!(
            translate("=A1 + SUM(A1:A3)", coord(1, 2), coord(2, 2)),
            "=A2 + SUM(A2:A4)"
        );
    }

    #[test]
    fn test_absolute() {
        assert_eq!(
            translate("=$A$1 + SUM($A$1:$A$3)", coord(1, 2), coord(2, 2)),
            "=$A$1 + SUM($A$1:$A$3)"
        );
    }

    #[test]
    fn test_mixed() {
        assert_eq!(
            translate("=A$1 + SUM(A$1:A$3)", coord(1, 2), coord(2, 3)),
            "=B$1 + SUM(B$1:B$3)"
        );
        assert_eq!(
            translate("=$A1 + SUM($A1:$A3)", coord(1, 2), coord(2, 3)),
            "=$A2 + SUM($A2:$A4)"
        );
    }

    #[test]
    fn test_sheet_qualifiers_survive() {
        assert_eq!(
            translate("=Sheet2!B2*'My Sheet'!C3:Other!D4", coord(1, 1), coord(2, 3)),
            "=Sheet2!D3*'My Sheet'!E4:Other!F5"
        );
    }

    #[test]
    fn test_off_grid_becomes_ref_error() {
        assert_eq!(translate("=A1+B2", coord(2, 2), coord(1, 2)), "=#REF!+B1");
        assert_eq!(translate("=SUM(A1:B2)", coord(1, 2), coord(1, 1)), "=SUM(#REF!)");
    }

    #[test]
    fn test_non_formula_unchanged() {
        assert_eq!(translate("A1", coord(1, 1), coord(5, 5)), "A1");
        assert_eq!(translate("=\"A1\"&B1", coord(1, 1), coord(2, 1)), "=\"A1\"&B2");
    }
}
