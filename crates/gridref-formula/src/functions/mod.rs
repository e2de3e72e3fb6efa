//! Function registry and built-in functions
//!
//! The built-ins are a small working set. Hosts add their own functions,
//! synchronous or asynchronous, through [`FunctionRegistry::register_fn`] and
//! [`FunctionRegistry::register_async`]; a custom function replaces a built-in
//! of the same name.

pub mod logical;
pub mod math;
pub mod text;

use crate::error::FormulaResult;
use ahash::AHashMap;
use gridref_core::CellValue;
use std::future::Future;
use std::pin::Pin;

/// A boxed future that is not required to be `Send`
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Built-in function signature
pub type FunctionImpl = fn(&[CellValue]) -> FormulaResult<CellValue>;

/// Host-supplied synchronous function
pub type CustomFunction = Box<dyn Fn(&[CellValue]) -> FormulaResult<CellValue>>;

/// Host-supplied asynchronous function
pub type AsyncFunction =
    Box<dyn Fn(Vec<CellValue>) -> LocalBoxFuture<'static, FormulaResult<CellValue>>>;

/// How a function is invoked
pub enum Implementation {
    Builtin(FunctionImpl),
    Custom(CustomFunction),
    Async(AsyncFunction),
}

impl Implementation {
    /// Invoke with already evaluated arguments
    pub async fn call(&self, args: Vec<CellValue>) -> FormulaResult<CellValue> {
        match self {
            Implementation::Builtin(f) => f(&args),
            Implementation::Custom(f) => f(&args),
            Implementation::Async(f) => f(args).await,
        }
    }
}

impl std::fmt::Debug for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Implementation::Builtin(_) => "Builtin",
            Implementation::Custom(_) => "Custom",
            Implementation::Async(_) => "Async",
        })
    }
}

/// Function definition
#[derive(Debug)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: String,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: Implementation,
}

/// Function registry
#[derive(Debug)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();

        registry
    }

    /// Create a registry without built-ins
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Is a function with this name registered?
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        let name = def.name.to_uppercase();
        if self.functions.contains_key(&name) {
            log::debug!("function {} replaced", name);
        }
        self.functions.insert(name.clone(), FunctionDef { name, ..def });
    }

    /// Register a synchronous host function taking any number of arguments
    pub fn register_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[CellValue]) -> FormulaResult<CellValue> + 'static,
    {
        self.register(FunctionDef {
            name: name.to_string(),
            min_args: 0,
            max_args: None,
            implementation: Implementation::Custom(Box::new(f)),
        });
    }

    /// Register an asynchronous host function taking any number of arguments
    pub fn register_async<F, Fut>(&mut self, name: &str, f: F)
    where
        F: Fn(Vec<CellValue>) -> Fut + 'static,
        Fut: Future<Output = FormulaResult<CellValue>> + 'static,
    {
        self.register(FunctionDef {
            name: name.to_string(),
            min_args: 0,
            max_args: None,
            implementation: Implementation::Async(Box::new(move |args| Box::pin(f(args)))),
        });
    }

    fn builtin(&mut self, name: &str, min_args: usize, max_args: Option<usize>, f: FunctionImpl) {
        self.register(FunctionDef {
            name: name.to_string(),
            min_args,
            max_args,
            implementation: Implementation::Builtin(f),
        });
    }

    fn register_math_functions(&mut self) {
        self.builtin("SUM", 1, None, math::fn_sum);
        self.builtin("AVERAGE", 1, None, math::fn_average);
        self.builtin("MIN", 1, None, math::fn_min);
        self.builtin("MAX", 1, None, math::fn_max);
        self.builtin("COUNT", 1, None, math::fn_count);
        self.builtin("ABS", 1, Some(1), math::fn_abs);
        self.builtin("ROUND", 1, Some(2), math::fn_round);
    }

    fn register_logical_functions(&mut self) {
        self.builtin("IF", 2, Some(3), logical::fn_if);
        self.builtin("AND", 1, None, logical::fn_and);
        self.builtin("OR", 1, None, logical::fn_or);
        self.builtin("NOT", 1, Some(1), logical::fn_not);
    }

    fn register_text_functions(&mut self) {
        self.builtin("CONCAT", 1, None, text::fn_concat);
        self.builtin("CONCATENATE", 1, None, text::fn_concatenate);
        self.builtin("LEN", 1, Some(1), text::fn_len);
        self.builtin("UPPER", 1, Some(1), text::fn_upper);
        self.builtin("LOWER", 1, Some(1), text::fn_lower);
    }
}

/// Arguments with matrices flattened row by row
pub(crate) fn flatten(args: &[CellValue]) -> impl Iterator<Item = &CellValue> {
    args.iter().flat_map(|arg| match arg {
        CellValue::Matrix(rows) => rows.iter().flatten().collect::<Vec<_>>(),
        other => vec![other],
    })
}

/// Scalar numeric coercion: numbers, booleans, numeric text and null (as 0)
pub(crate) fn coerce_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n),
        CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        CellValue::Null => Some(0.0),
        CellValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text form of a scalar, as concatenation renders it
pub(crate) fn coerce_text(value: &CellValue) -> String {
    value.to_string()
}
