//! Prelude module - common imports for gridref users
//!
//! ```rust
//! use gridref::prelude::*;
//! ```

pub use crate::{
    // Address codec
    column_to_letters,
    letters_to_column,
    parse_address,
    format_address,
    // Formula tooling
    tokenize,
    detokenize,
    selections_from_input,
    translate,
    shift_boxes,
    // Cell types
    CellAddress,
    CellConfig,
    CellRange,
    CellStore,
    CellValue,
    Coord,
    Datatype,
    ErrorKind,
    // Evaluation
    EvaluationResult,
    EvaluatorConfig,
    FormulaEvaluator,
    ValueGetter,
    // Recalculation types
    Recalculation,
    RecalculationOptions,
    RecalculationStats,
    // Structural edits
    BoundingBox,
    StructuralEdit,
    // Error types
    Error,
    Result,
};
