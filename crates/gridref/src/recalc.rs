//! Store-level recalculation
//!
//! Evaluates every formula cell of a [`CellStore`] in dependency order inside a
//! single evaluation pass and writes each `result`/`error` back.
//!
//! # Example
//!
//! ```rust,ignore
//! use gridref::prelude::*;
//!
//! let mut store = CellStore::new();
//! store.set_input("Sheet1", "A1", "10")?;
//! store.set_input("Sheet1", "A2", "=A1*2")?;
//!
//! let evaluator = FormulaEvaluator::new();
//! let stats = Recalculation::new(&evaluator).run(&mut store).await?;
//! println!("Calculated {} cells", stats.cells_calculated);
//! ```

use crate::{
    CellAddress, CellStore, CellValue, DependencyGraph, ErrorKind, ErrorValue,
    EvaluationContext, EvaluationResult, FormulaEvaluator, Result, ValueGetter,
    ERROR_CIRCULAR_DEPENDENCY,
};
use ahash::AHashSet;

/// Options for a recalculation run
#[derive(Debug, Clone)]
pub struct RecalculationOptions {
    /// Recompute every formula, even those that already carry a result (default: true)
    pub force_full_calculation: bool,
}

impl Default for RecalculationOptions {
    fn default() -> Self {
        Self {
            force_full_calculation: true,
        }
    }
}

/// Statistics from a recalculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalculationStats {
    /// Total number of formula cells
    pub formula_count: usize,
    /// Number of cells evaluated
    pub cells_calculated: usize,
    /// Number of cells on a dependency cycle
    pub circular_references: usize,
    /// Number of cells whose outcome carries an error
    pub errors: usize,
}

/// Recalculation driver
#[derive(Debug)]
pub struct Recalculation<'e> {
    evaluator: &'e FormulaEvaluator,
    options: RecalculationOptions,
}

impl<'e> Recalculation<'e> {
    pub fn new(evaluator: &'e FormulaEvaluator) -> Self {
        Self::with_options(evaluator, RecalculationOptions::default())
    }

    pub fn with_options(evaluator: &'e FormulaEvaluator, options: RecalculationOptions) -> Self {
        Self { evaluator, options }
    }

    /// Recalculate the formula cells of `store`
    pub async fn run(&self, store: &mut CellStore) -> Result<RecalculationStats> {
        let mut stats = RecalculationStats::default();

        // Phase 1: collect formulas
        let formulas: Vec<(CellAddress, String)> = store
            .formula_cells()
            .filter(|(_, config)| {
                self.options.force_full_calculation
                    || (config.result.is_none() && config.error.is_none())
            })
            .filter_map(|(addr, config)| config.text.clone().map(|text| (addr, text)))
            .collect();
        stats.formula_count = store.formula_cells().count();

        if formulas.is_empty() {
            return Ok(stats);
        }

        // Phase 2: dependency graph and cycles
        let graph = self.build_graph(&formulas);
        let circular: AHashSet<CellAddress> = formulas
            .iter()
            .map(|(addr, _)| addr)
            .filter(|addr| graph.has_circular_reference(addr))
            .cloned()
            .collect();
        stats.circular_references = circular.len();
        if !circular.is_empty() {
            log::debug!("{} cells on dependency cycles", circular.len());
        }

        // Phase 3: evaluate in order, precedents first
        let cells: Vec<CellAddress> = formulas.iter().map(|(addr, _)| addr.clone()).collect();
        let order = graph.evaluation_order(&cells);
        let texts: ahash::AHashMap<&CellAddress, &str> = formulas
            .iter()
            .map(|(addr, text)| (addr, text.as_str()))
            .collect();

        let outcomes = {
            let ctx = EvaluationContext::new(Some(&*store as &dyn ValueGetter));
            ctx.cache_values(circular.iter().map(|addr| {
                let cycle = ErrorValue::with_message(ErrorKind::Circular, ERROR_CIRCULAR_DEPENDENCY);
                (addr.clone(), CellValue::Error(cycle))
            }));

            let mut outcomes = Vec::with_capacity(order.len());
            for addr in order {
                if circular.contains(&addr) {
                    outcomes.push((addr, circular_result()));
                    continue;
                }
                let Some(text) = texts.get(&addr) else {
                    continue;
                };
                let result = self.evaluator.evaluate_in(&ctx, text, &addr).await;
                stats.cells_calculated += 1;
                outcomes.push((addr, result));
            }
            outcomes
        };

        // Phase 4: write back
        for (addr, result) in outcomes {
            if result.is_error() {
                stats.errors += 1;
            }
            store.set_result(&addr, result.value, result.error)?;
        }

        Ok(stats)
    }

    fn build_graph(&self, formulas: &[(CellAddress, String)]) -> DependencyGraph {
        let limit = self.evaluator.config().max_range_cells;
        let mut graph = DependencyGraph::new();
        for (addr, text) in formulas {
            for range in self.evaluator.dependencies(text, addr) {
                // evaluation reports oversized ranges; no edges needed
                if range.cell_count() > limit {
                    continue;
                }
                for precedent in range.cells() {
                    graph.add_dependency(precedent, addr.clone());
                }
            }
        }
        graph
    }
}

fn circular_result() -> EvaluationResult {
    EvaluationResult {
        value: None,
        inferred_type: Some(crate::Datatype::Error),
        error: Some(ERROR_CIRCULAR_DEPENDENCY.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result_of<'a>(store: &'a CellStore, a1: &str) -> Option<&'a CellValue> {
        let addr = CellAddress::parse_qualified(a1, "Sheet1").unwrap();
        store
            .get(&addr.sheet, addr.coord())
            .and_then(|c| c.result.as_ref())
    }

    #[tokio::test]
    async fn test_simple_calculation() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "10").unwrap();
        store.set_input("Sheet1", "A2", "20").unwrap();
        store.set_input("Sheet1", "A3", "=A1+A2").unwrap();

        let evaluator = FormulaEvaluator::new();
        let stats = Recalculation::new(&evaluator).run(&mut store).await.unwrap();

        assert_eq!(stats.formula_count, 1);
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(stats.errors, 0);
        assert_eq!(result_of(&store, "A3"), Some(&CellValue::Number(30.0)));
    }

    #[tokio::test]
    async fn test_chain_calculation() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "5").unwrap();
        store.set_input("Sheet1", "A4", "=A3*A1").unwrap();
        store.set_input("Sheet1", "A3", "=A2+10").unwrap();
        store.set_input("Sheet1", "A2", "=A1*2").unwrap();

        let evaluator = FormulaEvaluator::new();
        let stats = Recalculation::new(&evaluator).run(&mut store).await.unwrap();

        assert_eq!(stats.formula_count, 3);
        assert_eq!(stats.cells_calculated, 3);
        assert_eq!(result_of(&store, "A2"), Some(&CellValue::Number(10.0)));
        assert_eq!(result_of(&store, "A3"), Some(&CellValue::Number(20.0)));
        assert_eq!(result_of(&store, "A4"), Some(&CellValue::Number(100.0)));
    }

    #[tokio::test]
    async fn test_circular_cells_get_errors() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "=B1").unwrap();
        store.set_input("Sheet1", "B1", "=A1").unwrap();
        store.set_input("Sheet1", "C1", "=A1+1").unwrap();

        let evaluator = FormulaEvaluator::new();
        let stats = Recalculation::new(&evaluator).run(&mut store).await.unwrap();

        assert_eq!(stats.circular_references, 2);
        assert_eq!(stats.errors, 3);
        let a1 = store.get("Sheet1", "A1".parse().unwrap()).unwrap();
        assert_eq!(a1.error.as_deref(), Some(ERROR_CIRCULAR_DEPENDENCY));
        // dependents of a cycle see the #CYCLE! value
        let c1 = store.get("Sheet1", "C1".parse().unwrap()).unwrap();
        assert_eq!(c1.result, Some(CellValue::error(ErrorKind::Circular)));
    }

    #[tokio::test]
    async fn test_readers_see_fresh_failure() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "=NOPE()").unwrap();
        store.set_input("Sheet1", "A2", "=A1+1").unwrap();
        let a1 = CellAddress::new("Sheet1", 1, 1);
        store
            .set_result(&a1, Some(CellValue::Number(5.0)), None)
            .unwrap();

        let evaluator = FormulaEvaluator::new();
        let stats = Recalculation::new(&evaluator).run(&mut store).await.unwrap();

        assert_eq!(stats.errors, 2);
        let a2 = store.get("Sheet1", "A2".parse().unwrap()).unwrap();
        assert_eq!(a2.error.as_deref(), Some("Unknown function: NOPE"));
        assert_eq!(
            a2.result,
            Some(CellValue::Error(ErrorValue::with_message(
                ErrorKind::Name,
                "Unknown function: NOPE"
            )))
        );
    }

    #[tokio::test]
    async fn test_only_pending_without_force() {
        let mut store = CellStore::new();
        store.set_input("Sheet1", "A1", "1").unwrap();
        store.set_input("Sheet1", "A2", "=A1+1").unwrap();
        store.set_input("Sheet1", "A3", "=A1+2").unwrap();
        let a2 = CellAddress::new("Sheet1", 2, 1);
        store
            .set_result(&a2, Some(CellValue::Number(7.0)), None)
            .unwrap();

        let evaluator = FormulaEvaluator::new();
        let options = RecalculationOptions {
            force_full_calculation: false,
        };
        let stats = Recalculation::with_options(&evaluator, options)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(stats.formula_count, 2);
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(result_of(&store, "A2"), Some(&CellValue::Number(7.0)));
        assert_eq!(result_of(&store, "A3"), Some(&CellValue::Number(3.0)));
    }
}
