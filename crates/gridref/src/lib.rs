//! # gridref
//!
//! Spreadsheet reference engine: A1 addressing, formula tooling and async
//! formula evaluation over a pluggable cell lookup.
//!
//! ## Features
//!
//! - A1 address codec with sheet qualifiers and `$` markers
//! - Lossless formula tokenizer and editor cursor analysis
//! - Reference extraction and copy/paste translation
//! - Async formula evaluation with cycle detection and per-pass caching
//! - Host-registered sync and async functions
//! - Merged-region shifting across row/column edits
//! - Store-level recalculation in dependency order
//!
//! ## Example
//!
//! ```rust
//! use gridref::prelude::*;
//!
//! assert_eq!(column_to_letters(27), "AB");
//! assert_eq!(
//!     translate("=A1+$B$1", Coord::new(1, 1), Coord::new(3, 2)),
//!     "=B3+$B$1"
//! );
//!
//! let tokens = tokenize("=SUM(A1, 20)").tokens;
//! assert_eq!(tokens.len(), 6);
//! ```

pub mod prelude;
pub mod recalc;

// Re-export recalculation types
pub use recalc::{Recalculation, RecalculationOptions, RecalculationStats};

// Re-export core types
pub use gridref_core::{
    column_to_letters,
    detect_data_type,
    format_address,
    letters_to_column,
    parse_address,
    shift_boxes,
    // Structural edits
    BoundingBox,
    // Cell types
    CellAddress,
    CellConfig,
    CellRange,
    // Storage
    CellStore,
    CellValue,
    Coord,
    Datatype,
    // Error types
    Error,
    ErrorKind,
    ErrorValue,
    Result,
    SheetId,
    StructuralEdit,
    ValueGetter,
    // Constants
    FORMULA_MARKER,
    MAX_COLS,
    MAX_ROWS,
};

// Re-export formula types
pub use gridref_formula::{
    call_context, detokenize, function_suggestion, normalize_tokens, parse_formula,
    selections_from_input, show_cell_suggestions, tokenize, translate, CallContext,
    DependencyEdge, DependencyGraph, EvaluationContext, EvaluationResult, EvaluatorConfig,
    FormulaError, FormulaEvaluator, FormulaExpr, FormulaResult, FunctionRegistry, Token,
    TokenKind, Tokenized, ERROR_CIRCULAR_DEPENDENCY, ERROR_REFERENCE,
};
