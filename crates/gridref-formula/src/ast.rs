//! Formula Abstract Syntax Tree types

use gridref_core::{CellAddress, CellRange, Coord, ErrorKind};

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    Text(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal
    Error(ErrorKind),

    // === References ===
    /// Single cell reference
    CellRef(CellReference),
    /// Range reference
    RangeRef(RangeReference),
    /// Defined name (unsupported at evaluation, reported as #NAME?)
    NameRef(String),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function { name: String, args: Vec<FormulaExpr> },
}

/// Cell reference with optional sheet (1-based)
#[derive(Debug, Clone, PartialEq)]
pub struct CellReference {
    pub sheet: Option<String>,
    pub coord: Coord,
}

impl CellReference {
    /// Resolve against the sheet of the formula's anchor cell
    pub fn resolve(&self, home_sheet: &str) -> CellAddress {
        CellAddress::at(self.sheet.as_deref().unwrap_or(home_sheet), self.coord)
    }
}

/// Range reference with optional sheet (1-based, normalized)
#[derive(Debug, Clone, PartialEq)]
pub struct RangeReference {
    pub sheet: Option<String>,
    pub start: Coord,
    pub end: Coord,
}

impl RangeReference {
    /// Resolve against the sheet of the formula's anchor cell
    pub fn resolve(&self, home_sheet: &str) -> CellRange {
        CellRange::new(
            self.sheet.as_deref().unwrap_or(home_sheet),
            self.start,
            self.end,
        )
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
}

impl FormulaExpr {
    /// Visit every cell and range reference, left to right
    pub fn for_each_reference<F>(&self, f: &mut F)
    where
        F: FnMut(Reference<'_>),
    {
        match self {
            FormulaExpr::CellRef(r) => f(Reference::Cell(r)),
            FormulaExpr::RangeRef(r) => f(Reference::Range(r)),
            FormulaExpr::BinaryOp { left, right, .. } => {
                left.for_each_reference(f);
                right.for_each_reference(f);
            }
            FormulaExpr::UnaryOp { operand, .. } => operand.for_each_reference(f),
            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    arg.for_each_reference(f);
                }
            }
            FormulaExpr::Number(_)
            | FormulaExpr::Text(_)
            | FormulaExpr::Boolean(_)
            | FormulaExpr::Error(_)
            | FormulaExpr::NameRef(_) => {}
        }
    }
}

/// A borrowed reference node
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    Cell(&'a CellReference),
    Range(&'a RangeReference),
}

impl Reference<'_> {
    /// Resolve to a sheet-qualified range (a single cell is a 1x1 range)
    pub fn resolve(&self, home_sheet: &str) -> CellRange {
        match self {
            Reference::Cell(r) => CellRange::single(&r.resolve(home_sheet)),
            Reference::Range(r) => r.resolve(home_sheet),
        }
    }
}
