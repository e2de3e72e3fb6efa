//! Formula evaluator
//!
//! Evaluates formula text anchored at a cell. Evaluation is asynchronous end to
//! end: host functions may be `async`, and formula cells that have no computed
//! result yet are evaluated recursively inside the same [`EvaluationContext`].

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::context::EvaluationContext;
use crate::error::{FormulaError, FormulaResult, ERROR_CIRCULAR_DEPENDENCY};
use crate::functions::{coerce_number, coerce_text, FunctionRegistry, LocalBoxFuture};
use crate::parser::parse_formula;
use chrono::{NaiveDate, NaiveDateTime};
use gridref_core::{
    detect_data_type, CellAddress, CellConfig, CellRange, CellValue, Datatype, ErrorKind,
    ErrorValue, ValueGetter, MAX_COLS, MAX_ROWS,
};
use std::future::Future;

/// Evaluator settings
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Largest range (in cells) a reference may materialize (default: 1,000,000)
    pub max_range_cells: u64,
    /// Recompute referenced formula cells even when they carry a result (default: false)
    pub recalculate_formulas: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_range_cells: 1_000_000,
            recalculate_formulas: false,
        }
    }
}

/// Outcome of evaluating one formula
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationResult {
    pub value: Option<CellValue>,
    pub inferred_type: Option<Datatype>,
    pub error: Option<String>,
}

impl EvaluationResult {
    fn from_outcome(outcome: FormulaResult<CellValue>) -> Self {
        match outcome {
            Ok(CellValue::Error(e)) => Self {
                error: Some(e.to_string()),
                inferred_type: Some(Datatype::Error),
                value: Some(CellValue::Error(e)),
            },
            Ok(value) => Self {
                inferred_type: detect_data_type(&value),
                value: Some(value),
                error: None,
            },
            Err(e) => Self {
                value: None,
                inferred_type: Some(Datatype::Error),
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Formula evaluator: function registry, default value getter and settings
pub struct FormulaEvaluator {
    functions: FunctionRegistry,
    getter: Option<Box<dyn ValueGetter>>,
    config: EvaluatorConfig,
}

impl Default for FormulaEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FormulaEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaEvaluator")
            .field("functions", &self.functions.names().len())
            .field("has_getter", &self.getter.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl FormulaEvaluator {
    /// Create an evaluator with the built-in functions and no value getter
    pub fn new() -> Self {
        Self::with_config(EvaluatorConfig::default())
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self {
            functions: FunctionRegistry::new(),
            getter: None,
            config,
        }
    }

    /// Set the default value getter (builder style)
    pub fn with_value_getter<G: ValueGetter + 'static>(mut self, getter: G) -> Self {
        self.set_value_getter(getter);
        self
    }

    /// Replace the default value getter
    pub fn set_value_getter<G: ValueGetter + 'static>(&mut self, getter: G) {
        self.getter = Some(Box::new(getter));
    }

    pub fn clear_value_getter(&mut self) {
        self.getter = None;
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EvaluatorConfig {
        &mut self.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    /// Register a synchronous host function
    pub fn register_function<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[CellValue]) -> FormulaResult<CellValue> + 'static,
    {
        self.functions.register_fn(name, f);
    }

    /// Register an asynchronous host function
    pub fn register_async_function<F, Fut>(&mut self, name: &str, f: F)
    where
        F: Fn(Vec<CellValue>) -> Fut + 'static,
        Fut: Future<Output = FormulaResult<CellValue>> + 'static,
    {
        self.functions.register_async(name, f);
    }

    /// A fresh context reading through the default value getter
    pub fn context(&self) -> EvaluationContext<'_> {
        EvaluationContext::new(self.getter.as_deref())
    }

    /// Evaluate `text` as the formula of `anchor`
    ///
    /// `getter` overrides the default value getter for this call. Never fails:
    /// parse errors, circular dependencies and runtime errors are reported on
    /// [`EvaluationResult::error`].
    pub async fn evaluate(
        &self,
        text: &str,
        anchor: &CellAddress,
        getter: Option<&dyn ValueGetter>,
    ) -> EvaluationResult {
        let ctx = EvaluationContext::new(getter.or(self.getter.as_deref()));
        self.evaluate_in(&ctx, text, anchor).await
    }

    /// Evaluate inside a caller-owned context, sharing its cache with other calls
    pub async fn evaluate_in(
        &self,
        ctx: &EvaluationContext<'_>,
        text: &str,
        anchor: &CellAddress,
    ) -> EvaluationResult {
        EvaluationResult::from_outcome(self.evaluate_formula(ctx, text, anchor).await)
    }

    /// Every reference in `text`, resolved against the anchor's sheet, in order
    ///
    /// Unparsable text has no dependencies.
    pub fn dependencies(&self, text: &str, anchor: &CellAddress) -> Vec<CellRange> {
        match parse_formula(text) {
            Ok(expr) => {
                let mut out = Vec::new();
                expr.for_each_reference(&mut |r| out.push(r.resolve(&anchor.sheet)));
                out
            }
            Err(e) => {
                log::trace!("no dependencies for unparsable '{}': {}", text, e);
                Vec::new()
            }
        }
    }

    fn evaluate_formula<'a, 'g: 'a>(
        &'a self,
        ctx: &'a EvaluationContext<'g>,
        text: &'a str,
        anchor: &'a CellAddress,
    ) -> LocalBoxFuture<'a, FormulaResult<CellValue>> {
        Box::pin(async move {
            let _marker = ctx.enter(anchor)?;
            let outcome = match parse_formula(text) {
                Ok(expr) => self.eval_expr(ctx, &expr, anchor).await,
                Err(e) => Err(e),
            };
            // readers later in the pass see the failure, not a stored result
            let cached = match &outcome {
                Ok(value) => value.clone(),
                Err(e) => e.to_value(),
            };
            ctx.cache_value(anchor.clone(), cached);
            outcome
        })
    }

    fn eval_expr<'a, 'g: 'a>(
        &'a self,
        ctx: &'a EvaluationContext<'g>,
        expr: &'a FormulaExpr,
        anchor: &'a CellAddress,
    ) -> LocalBoxFuture<'a, FormulaResult<CellValue>> {
        Box::pin(async move {
            match expr {
                // === Literals ===
                FormulaExpr::Number(n) => Ok(CellValue::Number(*n)),
                FormulaExpr::Text(s) => Ok(CellValue::Text(s.clone())),
                FormulaExpr::Boolean(b) => Ok(CellValue::Boolean(*b)),
                FormulaExpr::Error(kind) => Ok(CellValue::error(*kind)),

                // === References ===
                FormulaExpr::CellRef(cell_ref) => {
                    let addr = cell_ref.resolve(&anchor.sheet);
                    ctx.record_edge(anchor, addr.clone());
                    self.resolve_cell(ctx, addr).await
                }

                FormulaExpr::RangeRef(range_ref) => {
                    let range = range_ref.resolve(&anchor.sheet);
                    self.resolve_range(ctx, &range, anchor).await
                }

                FormulaExpr::NameRef(name) => Ok(CellValue::Error(ErrorValue::with_message(
                    ErrorKind::Name,
                    format!("Unknown name '{}'", name),
                ))),

                // === Operators ===
                FormulaExpr::BinaryOp { op, left, right } => {
                    let left_val = self.eval_expr(ctx, left, anchor).await?;
                    let right_val = self.eval_expr(ctx, right, anchor).await?;
                    Ok(evaluate_binary_op(*op, &left_val, &right_val))
                }

                FormulaExpr::UnaryOp { op, operand } => {
                    let val = self.eval_expr(ctx, operand, anchor).await?;
                    Ok(evaluate_unary_op(*op, &val))
                }

                // === Functions ===
                FormulaExpr::Function { name, args } => {
                    self.evaluate_function(ctx, name, args, anchor).await
                }
            }
        })
    }

    /// Value of one cell: the pass cache, then the getter
    ///
    /// Only recomputing a formula cell enters it, so reading a cell whose
    /// formula is in progress yields its stored value.
    async fn resolve_cell(
        &self,
        ctx: &EvaluationContext<'_>,
        addr: CellAddress,
    ) -> FormulaResult<CellValue> {
        if addr.row > MAX_ROWS || addr.col > MAX_COLS {
            return Err(FormulaError::InvalidReference);
        }
        if let Some(value) = ctx.cached(&addr) {
            return Ok(value);
        }

        let config = match ctx.getter().and_then(|g| g.cell(&addr.sheet, addr.coord())) {
            Some(config) => config,
            None => return Ok(CellValue::Null),
        };

        let value = if config.is_formula() {
            let stale = config.result.is_none() && config.error.is_none();
            if self.config.recalculate_formulas || stale {
                match config.text.as_deref() {
                    // caches its own result
                    Some(text) => return self.evaluate_formula(ctx, text, &addr).await,
                    None => CellValue::Null,
                }
            } else {
                stored_formula_value(config)
            }
        } else {
            coerce_cell(&config)
        };

        ctx.cache_value(addr, value.clone());
        Ok(value)
    }

    /// Row-major materialization of a range read by `anchor`
    async fn resolve_range(
        &self,
        ctx: &EvaluationContext<'_>,
        range: &CellRange,
        anchor: &CellAddress,
    ) -> FormulaResult<CellValue> {
        let cells = range.cell_count();
        if cells > self.config.max_range_cells {
            log::debug!(
                "range {} has {} cells, limit is {}",
                range,
                cells,
                self.config.max_range_cells
            );
            return Err(FormulaError::RangeTooLarge {
                range: range.to_string(),
                cells,
                limit: self.config.max_range_cells,
            });
        }

        let mut rows = Vec::with_capacity(range.row_count() as usize);
        for row in range.from.row..=range.to.row {
            let mut values = Vec::with_capacity(range.col_count() as usize);
            for col in range.from.col..=range.to.col {
                let addr = CellAddress::new(range.sheet.clone(), row, col);
                ctx.record_edge(anchor, addr.clone());
                values.push(self.resolve_cell(ctx, addr).await?);
            }
            rows.push(values);
        }
        Ok(CellValue::Matrix(rows))
    }

    /// Evaluate a function call
    async fn evaluate_function(
        &self,
        ctx: &EvaluationContext<'_>,
        name: &str,
        args: &[FormulaExpr],
        anchor: &CellAddress,
    ) -> FormulaResult<CellValue> {
        let func = self
            .functions
            .get(name)
            .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

        // Check argument count
        if args.len() < func.min_args {
            return Err(FormulaError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at least {}", func.min_args),
                actual: args.len(),
            });
        }

        if let Some(max) = func.max_args {
            if args.len() > max {
                return Err(FormulaError::ArgumentCount {
                    function: name.to_string(),
                    expected: format!("at most {}", max),
                    actual: args.len(),
                });
            }
        }

        // Evaluate arguments
        let mut evaluated_args = Vec::with_capacity(args.len());
        for arg in args {
            evaluated_args.push(self.eval_expr(ctx, arg, anchor).await?);
        }

        func.implementation.call(evaluated_args).await
    }
}

/// Result (or stored error) of a formula cell that is not recomputed
fn stored_formula_value(config: CellConfig) -> CellValue {
    if let Some(result) = config.result {
        return result;
    }
    match config.error {
        Some(message) => {
            let kind = if message == ERROR_CIRCULAR_DEPENDENCY {
                ErrorKind::Circular
            } else {
                ErrorKind::from_code(&message).unwrap_or(ErrorKind::Generic)
            };
            CellValue::Error(ErrorValue::with_message(kind, message))
        }
        None => CellValue::Null,
    }
}

/// Typed value of a non-formula cell
fn coerce_cell(config: &CellConfig) -> CellValue {
    let text = config.text.as_deref();
    match config.datatype {
        Some(Datatype::Number) => {
            let trimmed = text.unwrap_or("").trim();
            if trimmed.is_empty() {
                CellValue::Number(0.0)
            } else {
                trimmed
                    .parse()
                    .map(CellValue::Number)
                    .unwrap_or_else(|_| CellValue::text(trimmed))
            }
        }
        Some(Datatype::Boolean) => {
            CellValue::Boolean(text.is_some_and(|t| t.trim().eq_ignore_ascii_case("TRUE")))
        }
        Some(Datatype::Date) => match text {
            Some(t) => parse_datetime(t)
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::text(t)),
            None => CellValue::Null,
        },
        Some(Datatype::Error) => match text {
            Some(t) => CellValue::Error(ErrorValue::with_message(
                ErrorKind::from_code(t).unwrap_or(ErrorKind::Generic),
                t,
            )),
            None => CellValue::Null,
        },
        _ => text.map(CellValue::text).unwrap_or(CellValue::Null),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Evaluate a binary operation
fn evaluate_binary_op(op: BinaryOperator, left: &CellValue, right: &CellValue) -> CellValue {
    // Propagate errors
    if left.is_error() {
        return left.clone();
    }
    if right.is_error() {
        return right.clone();
    }
    if matches!(left, CellValue::Matrix(_)) || matches!(right, CellValue::Matrix(_)) {
        return CellValue::error(ErrorKind::Value);
    }

    let numbers = || Some((coerce_number(left)?, coerce_number(right)?));

    match op {
        // Arithmetic operators
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => {
            let Some((l, r)) = numbers() else {
                return CellValue::error(ErrorKind::Value);
            };
            match op {
                BinaryOperator::Add => CellValue::Number(l + r),
                BinaryOperator::Subtract => CellValue::Number(l - r),
                BinaryOperator::Multiply => CellValue::Number(l * r),
                BinaryOperator::Divide if r == 0.0 => CellValue::error(ErrorKind::Div0),
                BinaryOperator::Divide => CellValue::Number(l / r),
                _ => {
                    let result = l.powf(r);
                    if result.is_nan() || result.is_infinite() {
                        CellValue::error(ErrorKind::Num)
                    } else {
                        CellValue::Number(result)
                    }
                }
            }
        }

        // Comparison operators
        BinaryOperator::Equal => CellValue::Boolean(compare_values(left, right) == 0),
        BinaryOperator::NotEqual => CellValue::Boolean(compare_values(left, right) != 0),
        BinaryOperator::LessThan => CellValue::Boolean(compare_values(left, right) < 0),
        BinaryOperator::LessEqual => CellValue::Boolean(compare_values(left, right) <= 0),
        BinaryOperator::GreaterThan => CellValue::Boolean(compare_values(left, right) > 0),
        BinaryOperator::GreaterEqual => CellValue::Boolean(compare_values(left, right) >= 0),

        // Concatenation
        BinaryOperator::Concat => CellValue::Text(coerce_text(left) + &coerce_text(right)),
    }
}

/// Compare two values for ordering (spreadsheet-style comparison)
fn compare_values(left: &CellValue, right: &CellValue) -> i32 {
    // Empty values
    let zero = CellValue::Number(0.0);
    let left = if left.is_null() { &zero } else { left };
    let right = if right.is_null() { &zero } else { right };

    match (left, right) {
        // Numbers compare numerically
        (CellValue::Number(l), CellValue::Number(r)) => {
            if l < r {
                -1
            } else if l > r {
                1
            } else {
                0
            }
        }

        (CellValue::DateTime(l), CellValue::DateTime(r)) => l.cmp(r) as i32,

        // Strings compare case-insensitively
        (CellValue::Text(l), CellValue::Text(r)) => l.to_lowercase().cmp(&r.to_lowercase()) as i32,

        // Booleans: FALSE < TRUE
        (CellValue::Boolean(l), CellValue::Boolean(r)) => (*l as i32) - (*r as i32),

        // Mixed types: number < string < boolean
        (CellValue::Number(_), CellValue::Text(_)) => -1,
        (CellValue::Text(_), CellValue::Number(_)) => 1,
        (CellValue::Number(_), CellValue::Boolean(_)) => -1,
        (CellValue::Boolean(_), CellValue::Number(_)) => 1,
        (CellValue::Text(_), CellValue::Boolean(_)) => -1,
        (CellValue::Boolean(_), CellValue::Text(_)) => 1,

        // Other cases
        _ => 0,
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(op: UnaryOperator, val: &CellValue) -> CellValue {
    // Propagate errors
    if val.is_error() {
        return val.clone();
    }

    let Some(n) = coerce_number(val) else {
        return CellValue::error(ErrorKind::Value);
    };
    match op {
        UnaryOperator::Negate => CellValue::Number(-n),
        UnaryOperator::Percent => CellValue::Number(n / 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ERROR_REFERENCE;
    use gridref_core::{CellStore, Coord};
    use pretty_assertions::assert_eq;

    fn anchor() -> CellAddress {
        CellAddress::new("Sheet1", 1, 1)
    }

    async fn eval(formula: &str) -> EvaluationResult {
        FormulaEvaluator::new().evaluate(formula, &anchor(), None).await
    }

    fn twelve(_: &str, _: Coord) -> Option<CellConfig> {
        Some(CellConfig {
            text: Some("12".into()),
            datatype: Some(Datatype::Number),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_evaluate_literals() {
        assert_eq!(eval("=42").await.value, Some(CellValue::Number(42.0)));
        assert_eq!(eval("=\"Hello\"").await.value, Some(CellValue::text("Hello")));
        assert_eq!(eval("=TRUE").await.inferred_type, Some(Datatype::Boolean));
    }

    #[tokio::test]
    async fn test_evaluate_arithmetic() {
        assert_eq!(eval("=1+2").await.value, Some(CellValue::Number(3.0)));
        assert_eq!(eval("=2+3*4").await.value, Some(CellValue::Number(14.0)));
        assert_eq!(eval("=(2+3)*4").await.value, Some(CellValue::Number(20.0)));
        assert_eq!(eval("=2^3").await.value, Some(CellValue::Number(8.0)));
        assert_eq!(eval("=-5+50%").await.value, Some(CellValue::Number(-4.5)));
        assert_eq!(eval("=\"3\"*2").await.value, Some(CellValue::Number(6.0)));
    }

    #[tokio::test]
    async fn test_evaluate_comparison_and_concat() {
        assert_eq!(eval("=1<2").await.value, Some(CellValue::Boolean(true)));
        assert_eq!(eval("=\"a\"=\"A\"").await.value, Some(CellValue::Boolean(true)));
        assert_eq!(eval("=1<>1").await.value, Some(CellValue::Boolean(false)));
        let result = eval("=\"Total: \"&3").await;
        assert_eq!(result.value, Some(CellValue::text("Total: 3")));
        assert_eq!(result.inferred_type, Some(Datatype::String));
    }

    #[tokio::test]
    async fn test_error_values_are_classified() {
        let result = eval("=1/0").await;
        assert_eq!(result.value, Some(CellValue::error(ErrorKind::Div0)));
        assert_eq!(result.inferred_type, Some(Datatype::Error));
        assert_eq!(result.error.as_deref(), Some("Division by zero."));

        let result = eval("=#REF!").await;
        assert_eq!(result.error.as_deref(), Some(ERROR_REFERENCE));
        assert_eq!(result.inferred_type, Some(Datatype::Error));

        let result = eval("=\"x\"+1").await;
        assert_eq!(result.value, Some(CellValue::error(ErrorKind::Value)));
    }

    #[tokio::test]
    async fn test_failures_become_errors() {
        let result = eval("=SUM(1,").await;
        assert_eq!(result.value, None);
        assert_eq!(result.inferred_type, Some(Datatype::Error));
        assert!(result.error.unwrap().starts_with("Parse error"));

        let result = eval("=NOPE(1)").await;
        assert_eq!(result.error.as_deref(), Some("Unknown function: NOPE"));

        let result = eval("=ABS(1,2)").await;
        assert!(result.error.unwrap().contains("Wrong number of arguments for ABS"));
    }

    #[tokio::test]
    async fn test_deep_nesting_is_an_error() {
        let formula = format!("={}1{}", "(".repeat(5000), ")".repeat(5000));
        let result = eval(&formula).await;
        assert_eq!(result.value, None);
        assert!(result.error.unwrap().starts_with("Parse error"));
    }

    #[tokio::test]
    async fn test_number_cells_are_parsed() {
        let evaluator = FormulaEvaluator::new();
        let getter: &dyn ValueGetter = &twelve;

        let result = evaluator.evaluate("SUM(A1,2)", &anchor(), Some(getter)).await;
        assert_eq!(result.value, Some(CellValue::Number(14.0)));
        assert_eq!(result.inferred_type, Some(Datatype::Number));

        let result = evaluator.evaluate("=SUM(A1:A3)", &anchor(), Some(getter)).await;
        assert_eq!(result.value, Some(CellValue::Number(36.0)));
    }

    #[tokio::test]
    async fn test_default_getter() {
        let evaluator = FormulaEvaluator::new().with_value_getter(twelve);
        let result = evaluator.evaluate("=A5*2", &anchor(), None).await;
        assert_eq!(result.value, Some(CellValue::Number(24.0)));

        // per-call getter wins
        let empty = |_: &str, _: Coord| -> Option<CellConfig> { None };
        let getter: &dyn ValueGetter = &empty;
        let result = evaluator.evaluate("=A5", &anchor(), Some(getter)).await;
        assert_eq!(result.value, Some(CellValue::Null));
        assert_eq!(result.inferred_type, None);
    }

    #[tokio::test]
    async fn test_no_getter_resolves_null() {
        assert_eq!(eval("=A1+1").await.value, Some(CellValue::Number(1.0)));
        assert_eq!(
            eval("=SUM(B1:C2)").await.value,
            Some(CellValue::Number(0.0))
        );
    }

    #[tokio::test]
    async fn test_text_results() {
        let result = eval("=CONCAT(\"hello\", \" \", \"world\")").await;
        assert_eq!(result.value, Some(CellValue::text("hello world")));
        assert_eq!(result.inferred_type, Some(Datatype::String));
    }

    #[tokio::test]
    async fn test_custom_functions() {
        let mut evaluator = FormulaEvaluator::new();
        evaluator.register_function("FOO", |_| Ok(CellValue::text("bar")));
        evaluator.register_async_function("SUMMER", |_args| async {
            Ok(CellValue::text("hello"))
        });

        let result = evaluator.evaluate("=FOO()", &anchor(), None).await;
        assert_eq!(result.value, Some(CellValue::text("bar")));

        let result = evaluator.evaluate("=SUMMER(1, 2)", &anchor(), None).await;
        assert_eq!(result.value, Some(CellValue::text("hello")));
        assert_eq!(result.inferred_type, Some(Datatype::String));

        evaluator.register_async_function("FAILS", |_args| async {
            Err(FormulaError::Evaluation("backend unavailable".into()))
        });
        let result = evaluator.evaluate("=FAILS()", &anchor(), None).await;
        assert_eq!(
            result.error.as_deref(),
            Some("Evaluation error: backend unavailable")
        );
    }

    #[tokio::test]
    async fn test_formula_cells() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "10").unwrap();
        store.set_input("Sheet1", "A2", "=A1*2").unwrap();
        store.set_input("Sheet1", "A3", "=A2+1").unwrap();
        let evaluator = FormulaEvaluator::new().with_value_getter(store);

        // no stored results: computed on demand
        let result = evaluator
            .evaluate("=A3", &CellAddress::new("Sheet1", 5, 1), None)
            .await;
        assert_eq!(result.value, Some(CellValue::Number(21.0)));
    }

    #[tokio::test]
    async fn test_stored_results_and_recalculation() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "10").unwrap();
        store.set_input("Sheet1", "A2", "=A1*2").unwrap();
        let a2 = CellAddress::new("Sheet1", 2, 1);
        store
            .set_result(&a2, Some(CellValue::Number(99.0)), None)
            .unwrap();

        let mut evaluator = FormulaEvaluator::new().with_value_getter(store);
        let b1 = CellAddress::new("Sheet1", 1, 2);
        let result = evaluator.evaluate("=A2", &b1, None).await;
        assert_eq!(result.value, Some(CellValue::Number(99.0)));

        evaluator.config_mut().recalculate_formulas = true;
        let result = evaluator.evaluate("=A2", &b1, None).await;
        assert_eq!(result.value, Some(CellValue::Number(20.0)));
    }

    #[tokio::test]
    async fn test_circular_dependency() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "=B1").unwrap();
        store.set_input("Sheet1", "B1", "=A1").unwrap();
        let evaluator = FormulaEvaluator::new().with_value_getter(store);

        let result = evaluator.evaluate("=B1", &anchor(), None).await;
        assert_eq!(result.value, None);
        assert_eq!(result.error.as_deref(), Some(ERROR_CIRCULAR_DEPENDENCY));

        // self reference
        let result = evaluator.evaluate("=A1+1", &anchor(), None).await;
        assert_eq!(result.error.as_deref(), Some(ERROR_CIRCULAR_DEPENDENCY));
    }

    #[tokio::test]
    async fn test_markers_cleared_after_failure() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "=A1").unwrap();
        let evaluator = FormulaEvaluator::new().with_value_getter(store);
        let ctx = evaluator.context();
        let result = evaluator.evaluate_in(&ctx, "=A1", &anchor()).await;
        assert_eq!(result.error.as_deref(), Some(ERROR_CIRCULAR_DEPENDENCY));
        assert!(!ctx.is_in_progress(&anchor()));

        let result = evaluator.evaluate_in(&ctx, "=1+1", &anchor()).await;
        assert_eq!(result.value, Some(CellValue::Number(2.0)));
    }

    #[tokio::test]
    async fn test_anchor_reads_its_own_stored_value() {
        let evaluator = FormulaEvaluator::new().with_value_getter(twelve);

        let result = evaluator.evaluate("=SUM(A1,2)", &anchor(), None).await;
        assert_eq!(result.value, Some(CellValue::Number(14.0)));

        let b2 = CellAddress::new("Sheet1", 2, 2);
        let result = evaluator.evaluate("=SUM(B1:B3)", &b2, None).await;
        assert_eq!(result.value, Some(CellValue::Number(36.0)));
    }

    #[tokio::test]
    async fn test_failed_formula_is_cached_as_error() {
        let evaluator = FormulaEvaluator::new();
        let ctx = evaluator.context();
        let result = evaluator.evaluate_in(&ctx, "=NOPE()", &anchor()).await;
        assert!(result.is_error());

        let a2 = CellAddress::new("Sheet1", 2, 1);
        let result = evaluator.evaluate_in(&ctx, "=A1+1", &a2).await;
        let failure = FormulaError::UnknownFunction("NOPE".into());
        assert_eq!(result.value, Some(failure.to_value()));
        assert_eq!(result.error.as_deref(), Some("Unknown function: NOPE"));
    }

    #[tokio::test]
    async fn test_context_records_edges_and_caches() {
        let evaluator = FormulaEvaluator::new().with_value_getter(twelve);
        let ctx = evaluator.context();
        ctx.cache_values(vec![(CellAddress::new("Sheet1", 1, 2), CellValue::Number(1.0))]);

        let c1 = CellAddress::new("Sheet1", 1, 3);
        let result = evaluator.evaluate_in(&ctx, "=B1+Sheet2!A1", &c1).await;
        assert_eq!(result.value, Some(CellValue::Number(13.0)));

        let edges = ctx.edges();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].from, c1);
        assert_eq!(edges[1].to.sheet, "Sheet2");
        assert_eq!(ctx.cached(&c1), Some(CellValue::Number(13.0)));
    }

    #[tokio::test]
    async fn test_range_records_one_edge_per_cell() {
        let evaluator = FormulaEvaluator::new().with_value_getter(twelve);
        let ctx = evaluator.context();
        let result = evaluator.evaluate_in(&ctx, "=SUM(B1:C2)", &anchor()).await;
        assert_eq!(result.value, Some(CellValue::Number(48.0)));

        let read: Vec<String> = ctx.edges().iter().map(|e| e.to.to_a1_string()).collect();
        assert_eq!(read, vec!["B1", "C1", "B2", "C2"]);
        assert!(ctx.edges().iter().all(|e| e.from == anchor()));
    }

    #[tokio::test]
    async fn test_range_guard() {
        let evaluator = FormulaEvaluator::with_config(EvaluatorConfig {
            max_range_cells: 10,
            ..Default::default()
        });
        let result = evaluator.evaluate("=SUM(A1:Z100)", &anchor(), None).await;
        assert!(result.error.unwrap().contains("limit of 10"));
        let result = evaluator.evaluate("=SUM(A1:B5)", &anchor(), None).await;
        assert_eq!(result.value, Some(CellValue::Number(0.0)));
    }

    #[test]
    fn test_dependencies() {
        let evaluator = FormulaEvaluator::new();
        let deps = evaluator.dependencies("SUM(A1, Sheet2!B2)", &anchor());
        let sheets: Vec<_> = deps.iter().map(|r| r.sheet.as_str()).collect();
        assert_eq!(sheets, vec!["Sheet1", "Sheet2"]);

        let deps = evaluator.dependencies("=A1:B3+C4", &anchor());
        assert_eq!(deps[0].cell_count(), 6);
        assert!(deps[1].is_single());

        assert!(evaluator.dependencies("=SUM(", &anchor()).is_empty());
    }

    #[test]
    fn test_coerce_cell() {
        let date = CellConfig {
            text: Some("2024-03-01".into()),
            datatype: Some(Datatype::Date),
            ..Default::default()
        };
        assert!(matches!(coerce_cell(&date), CellValue::DateTime(_)));
        assert_eq!(
            coerce_cell(&CellConfig::boolean(true)),
            CellValue::Boolean(true)
        );
        assert_eq!(coerce_cell(&CellConfig::text("abc")), CellValue::text("abc"));
        assert_eq!(
            coerce_cell(&CellConfig {
                text: Some("#N/A".into()),
                datatype: Some(Datatype::Error),
                ..Default::default()
            }),
            CellValue::Error(ErrorValue::with_message(ErrorKind::Na, "#N/A"))
        );
    }

    #[test]
    fn test_stored_error() {
        let config = CellConfig {
            text: Some("=1/0".into()),
            datatype: Some(Datatype::Formula),
            error: Some("#DIV/0!".into()),
            result: None,
        };
        assert_eq!(
            stored_formula_value(config),
            CellValue::Error(ErrorValue::with_message(ErrorKind::Div0, "#DIV/0!"))
        );
    }
}
