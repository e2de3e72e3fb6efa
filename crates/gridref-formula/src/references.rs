//! Extract the ranges a formula's text points at
//!
//! Used by editors to highlight referenced cells while a formula is typed, so it
//! works on the token stream and tolerates formulas that do not parse yet.

use crate::tokenizer::{normalize_tokens, TokenKind};
use gridref_core::cell::unquote_sheet_name;
use gridref_core::{CellAddress, CellRange, FORMULA_MARKER};

/// Every cell and range reference in `text`, in order of appearance
///
/// Unqualified references belong to `home_sheet`. Plain (non-formula) text has
/// no selections.
pub fn selections_from_input(text: &str, home_sheet: &str) -> Vec<CellRange> {
    if !text.starts_with(FORMULA_MARKER) {
        return Vec::new();
    }

    let mut selections = Vec::new();
    let mut qualifier: Option<String> = None;

    for token in normalize_tokens(text) {
        match token.kind {
            TokenKind::SheetPrefix => {
                let name = token.image.strip_suffix('!').unwrap_or(&token.image);
                qualifier = Some(unquote_sheet_name(name));
                continue;
            }
            TokenKind::CellRef => {
                let sheet = qualifier.as_deref().unwrap_or(home_sheet);
                if let Some(addr) = CellAddress::parse_qualified(&token.image, sheet) {
                    selections.push(CellRange::single(&addr));
                }
            }
            TokenKind::RangeRef => {
                let sheet = qualifier.as_deref().unwrap_or(home_sheet);
                if let Some(range) = CellRange::parse_qualified(&token.image, sheet) {
                    selections.push(range);
                }
            }
            _ => {}
        }
        qualifier = None;
    }

    selections
}
