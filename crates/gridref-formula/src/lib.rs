//! # gridref-formula
//!
//! Formula tooling and evaluation for gridref.
//!
//! This crate provides:
//! - A lossless tokenizer (text → tokens → identical text)
//! - Cursor analysis for editor suggestions
//! - Reference extraction and copy/paste translation
//! - Formula parsing (text → AST) and async evaluation (AST → value)
//! - A registry of built-in and host-supplied functions
//! - Dependency tracking for recalculation
//!
//! ## Example
//!
//! ```rust,ignore
//! use gridref_core::CellAddress;
//! use gridref_formula::FormulaEvaluator;
//!
//! let evaluator = FormulaEvaluator::new();
//! let anchor = CellAddress::new("Sheet1", 1, 1);
//! let result = evaluator.evaluate("=SUM(1, 2)", &anchor, None).await;
//! assert_eq!(result.value, Some(3.0.into()));
//! ```

pub mod ast;
pub mod context;
pub mod cursor;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod references;
pub mod rewrite;
pub mod tokenizer;

pub use ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
pub use context::{DependencyEdge, EvaluationContext};
pub use cursor::{call_context, function_suggestion, show_cell_suggestions, CallContext};
pub use dependency::DependencyGraph;
pub use error::{FormulaError, FormulaResult, ERROR_CIRCULAR_DEPENDENCY, ERROR_REFERENCE};
pub use evaluator::{EvaluationResult, EvaluatorConfig, FormulaEvaluator};
pub use functions::{FunctionDef, FunctionRegistry, Implementation};
pub use parser::parse_formula;
pub use references::selections_from_input;
pub use rewrite::translate;
pub use tokenizer::{detokenize, normalize_tokens, tokenize, Token, TokenKind, Tokenized};
