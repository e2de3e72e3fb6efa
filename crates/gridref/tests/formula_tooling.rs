//! Tests for addressing, tokenizing, translation and structural edits

use gridref::prelude::*;
use gridref::{function_suggestion, show_cell_suggestions, TokenKind};
use pretty_assertions::assert_eq;

/// Column letters round-trip through the codec
#[test]
fn test_column_codec() {
    for n in [0, 1, 25, 26, 27, 51, 52, 701, 702, 16_383] {
        assert_eq!(letters_to_column(&column_to_letters(n)), Some(n + 1));
    }
    assert_eq!(format_address(Coord::new(10, 28)), "AB10");
    assert_eq!(parse_address("$AB$10"), Some(Coord::new(10, 28)));
}

/// Tokenizing is lossless
#[test]
fn test_lossless_lexing() {
    let formulas = [
        "=SUM(A1, 20)",
        "=IF(A1>=10, \"big\", \"small\")",
        "='My Sheet'!B2 * Sheet2!$C$3:D4 + 12.5%",
        "=CONCAT(\"say \"\"hi\"\"\", A1)",
        "=  -A1 ^ 2 <> #REF!",
    ];
    for formula in formulas {
        assert_eq!(detokenize(&tokenize(formula).tokens), formula);
    }
}

#[test]
fn test_tokens_of_sum() {
    let tokens = tokenize("=SUM(A1, 20)").tokens;
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(tokens.len(), 6);
    assert_eq!(kinds[0], TokenKind::FunctionName);
    assert_eq!(tokens[0].image, "SUM(");
    assert_eq!(kinds[1], TokenKind::CellRef);
    assert_eq!(kinds[5], TokenKind::CloseParen);
}

/// References come out in order, attributed to their sheets
#[test]
fn test_selections_from_input() {
    let ranges = selections_from_input("=SUM(A1,Sheet2!A2)", "Sheet1");
    assert_eq!(ranges.len(), 2);
    assert_eq!(ranges[0].sheet, "Sheet1");
    assert_eq!(ranges[1].sheet, "Sheet2");
    assert_eq!(ranges[1].from, Coord::new(2, 1));

    let ranges = selections_from_input("=SUM(B2:C4)", "Sheet1");
    assert_eq!(ranges[0].cell_count(), 6);
}

#[test]
fn test_translate() {
    assert_eq!(
        translate("=$A$1 + SUM($A$1:$A$3)", Coord::new(1, 2), Coord::new(2, 2)),
        "=$A$1 + SUM($A$1:$A$3)"
    );
    assert_eq!(translate("=A1", Coord::new(1, 2), Coord::new(2, 2)), "=A2");
    assert_eq!(
        translate("=A$1 + SUM(A$1:A$3)", Coord::new(1, 2), Coord::new(2, 3)),
        "=B$1 + SUM(B$1:B$3)"
    );
}

#[test]
fn test_structural_shift() {
    let boxes = [BoundingBox::new(1, 1, 2, 1)];
    assert_eq!(
        shift_boxes(&boxes, StructuralEdit::RowInsert, 1),
        vec![BoundingBox::new(2, 1, 2, 2)]
    );
    assert_eq!(
        shift_boxes(&boxes, StructuralEdit::RowRemove, 10),
        boxes.to_vec()
    );
}

#[test]
fn test_store_tracks_merged_regions() {
    let mut store = CellStore::new();
    store.add_merged_region("Sheet1", BoundingBox::new(3, 1, 2, 4));
    store.apply_structural_edit("Sheet1", "column-insert".parse().unwrap(), 1);
    assert_eq!(
        store.merged_regions("Sheet1"),
        &[BoundingBox::new(3, 2, 3, 4)]
    );
}

/// Suggestions stop once the call is closed
#[test]
fn test_cursor_suggestion_boundary() {
    let text = "=SUM(A1,A2) ";
    let tokens = tokenize(text).tokens;
    assert_eq!(function_suggestion(&tokens, text.len()), None);
    assert!(!show_cell_suggestions(&tokens, text.len()));

    let text = "=SUM(A1, A2, ";
    let tokens = tokenize(text).tokens;
    assert_eq!(
        function_suggestion(&tokens, text.len()).map(|t| t.image),
        Some("SUM(".to_string())
    );
    assert!(show_cell_suggestions(&tokens, text.len()));
}
