//! Per-pass evaluation state: value cache, in-progress markers, traversed edges
//!
//! One [`EvaluationContext`] spans one evaluation pass. It is single-threaded:
//! state lives in `RefCell`s and no borrow is held across an `.await`.

use crate::error::{FormulaError, FormulaResult};
use ahash::{AHashMap, AHashSet};
use gridref_core::{CellAddress, CellValue, ValueGetter};
use std::cell::RefCell;

/// "`from` depends on `to`", recorded while evaluating `from`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DependencyEdge {
    pub from: CellAddress,
    pub to: CellAddress,
}

/// State shared by every evaluation in one pass
pub struct EvaluationContext<'g> {
    getter: Option<&'g dyn ValueGetter>,
    cache: RefCell<AHashMap<CellAddress, CellValue>>,
    in_progress: RefCell<AHashSet<CellAddress>>,
    edges: RefCell<Vec<DependencyEdge>>,
}

impl<'g> EvaluationContext<'g> {
    /// Create a context reading cells through `getter`
    ///
    /// Without a getter every reference resolves to null.
    pub fn new(getter: Option<&'g dyn ValueGetter>) -> Self {
        Self {
            getter,
            cache: RefCell::new(AHashMap::new()),
            in_progress: RefCell::new(AHashSet::new()),
            edges: RefCell::new(Vec::new()),
        }
    }

    pub fn getter(&self) -> Option<&'g dyn ValueGetter> {
        self.getter
    }

    /// Cached value of a cell in this pass
    pub fn cached(&self, addr: &CellAddress) -> Option<CellValue> {
        let hit = self.cache.borrow().get(addr).cloned();
        match &hit {
            Some(_) => log::trace!("cache hit {}", addr),
            None => log::trace!("cache miss {}", addr),
        }
        hit
    }

    /// Cache a value unless one is already present; returns whether it was stored
    pub fn cache_value(&self, addr: CellAddress, value: CellValue) -> bool {
        let mut cache = self.cache.borrow_mut();
        if cache.contains_key(&addr) {
            return false;
        }
        cache.insert(addr, value);
        true
    }

    /// Merge caller-supplied values; existing entries win
    pub fn cache_values<I>(&self, changes: I)
    where
        I: IntoIterator<Item = (CellAddress, CellValue)>,
    {
        let mut cache = self.cache.borrow_mut();
        for (addr, value) in changes {
            cache.entry(addr).or_insert(value);
        }
    }

    /// Drop every cached value
    pub fn clear_cached_values(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Number of cached cells
    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Is this cell's formula currently being evaluated?
    pub fn is_in_progress(&self, addr: &CellAddress) -> bool {
        self.in_progress.borrow().contains(addr)
    }

    /// Mark `addr` in progress until the returned guard is dropped
    ///
    /// Fails with [`FormulaError::CircularDependency`] if it already is.
    pub fn enter(&self, addr: &CellAddress) -> FormulaResult<InProgress<'_, 'g>> {
        if !self.in_progress.borrow_mut().insert(addr.clone()) {
            log::debug!("circular dependency at {}", addr);
            return Err(FormulaError::CircularDependency);
        }
        Ok(InProgress {
            ctx: self,
            addr: addr.clone(),
        })
    }

    /// Record that `from` read `to`
    ///
    /// A range reference records one edge per cell it materializes.
    pub fn record_edge(&self, from: &CellAddress, to: CellAddress) {
        self.edges.borrow_mut().push(DependencyEdge {
            from: from.clone(),
            to,
        });
    }

    /// Edges traversed so far, in traversal order
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.edges.borrow().clone()
    }

    /// Take the recorded edges, leaving none behind
    pub fn take_edges(&self) -> Vec<DependencyEdge> {
        std::mem::take(&mut *self.edges.borrow_mut())
    }
}

impl std::fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("has_getter", &self.getter.is_some())
            .field("cached", &self.cache.borrow().len())
            .field("in_progress", &self.in_progress.borrow().len())
            .field("edges", &self.edges.borrow().len())
            .finish()
    }
}

/// In-progress marker; clears itself on drop
pub struct InProgress<'c, 'g> {
    ctx: &'c EvaluationContext<'g>,
    addr: CellAddress,
}

impl Drop for InProgress<'_, '_> {
    fn drop(&mut self) {
        self.ctx.in_progress.borrow_mut().remove(&self.addr);
    }
}
