//! Dependency tracking between formula cells

use ahash::{AHashMap, AHashSet};
use gridref_core::CellAddress;

/// Dependency graph for formula cells
///
/// Tracks which cells read which other cells, so a recalculation can order
/// formulas precedents-first.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellAddress, AHashSet<CellAddress>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency: `dependent` reads `precedent`
    pub fn add_dependency(&mut self, precedent: CellAddress, dependent: CellAddress) {
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Cells that `cell` reads
    pub fn get_precedents<'a>(
        &'a self,
        cell: &CellAddress,
    ) -> impl Iterator<Item = &'a CellAddress> + 'a {
        self.precedents.get(cell).into_iter().flatten()
    }

    /// Order `cells` so every cell comes after the cells it reads
    ///
    /// Precedents that are not in `cells` are left out. Cells on a cycle still
    /// appear exactly once; evaluation reports them as circular.
    pub fn evaluation_order(&self, cells: &[CellAddress]) -> Vec<CellAddress> {
        let wanted: AHashSet<&CellAddress> = cells.iter().collect();
        let mut result = Vec::with_capacity(cells.len());
        let mut visited = AHashSet::new();
        let mut in_stack = AHashSet::new();

        for cell in cells {
            self.topological_sort(cell, &wanted, &mut result, &mut visited, &mut in_stack);
        }

        result
    }

    /// Topological sort helper (DFS over precedents)
    fn topological_sort<'a>(
        &'a self,
        cell: &'a CellAddress,
        wanted: &AHashSet<&CellAddress>,
        result: &mut Vec<CellAddress>,
        visited: &mut AHashSet<&'a CellAddress>,
        in_stack: &mut AHashSet<&'a CellAddress>,
    ) {
        if visited.contains(cell) || in_stack.contains(cell) {
            return;
        }

        in_stack.insert(cell);

        // Visit all precedents first
        for precedent in self.get_precedents(cell) {
            self.topological_sort(precedent, wanted, result, visited, in_stack);
        }

        in_stack.remove(cell);
        visited.insert(cell);
        if wanted.contains(cell) {
            result.push(cell.clone());
        }
    }

    /// Is `cell` reachable from itself?
    ///
    /// A cell that only reads a cycle, without being on it, is not circular.
    pub fn has_circular_reference(&self, cell: &CellAddress) -> bool {
        let mut visited = AHashSet::new();
        let mut pending: Vec<&CellAddress> = self.get_precedents(cell).collect();

        while let Some(next) = pending.pop() {
            if next == cell {
                return true;
            }
            if visited.insert(next) {
                pending.extend(self.get_precedents(next));
            }
        }
        false
    }
}
