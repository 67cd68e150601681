//! Row arithmetic: the linear-combination primitive the whole tableau is built from.

use indexmap::IndexMap;

use crate::symbol::Symbol;

/// The single numerical tolerance used throughout the solver.
///
/// Governs coefficient drop on insertion, the artificial-objective zero
/// check, and the all-dummy redundant-constraint test. Never varied per
/// call site.
pub const EPSILON: f64 = 1e-8;

pub(crate) fn near_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

/// A constant plus a mapping from [`Symbol`] to coefficient.
///
/// Invariant: no cell holds a coefficient within [`EPSILON`] of zero.
/// Iteration order over `cells` is insertion order and is relied on by
/// subject selection and entering-symbol selection for their "first in
/// iteration order" tie-break.
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub constant: f64,
    cells: IndexMap<Symbol, f64>,
}

impl Row {
    pub fn new(constant: f64) -> Self {
        Self { constant, cells: IndexMap::new() }
    }

    pub fn cells(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        self.cells.iter().map(|(&s, &c)| (s, c))
    }

    pub fn is_constant(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_all_dummy(&self) -> bool {
        self.cells.keys().all(|s| s.is_dummy())
    }

    /// Adds `c` to the current coefficient of `symbol`, dropping the cell if
    /// the result is within [`EPSILON`] of zero.
    pub fn insert_symbol(&mut self, symbol: Symbol, c: f64) {
        match self.cells.entry(symbol) {
            indexmap::map::Entry::Occupied(mut entry) => {
                *entry.get_mut() += c;
                if near_zero(*entry.get()) {
                    entry.shift_remove();
                }
            }
            indexmap::map::Entry::Vacant(entry) => {
                if !near_zero(c) {
                    entry.insert(c);
                }
            }
        }
    }

    pub fn insert_symbol_unit(&mut self, symbol: Symbol) {
        self.insert_symbol(symbol, 1.0);
    }

    /// `constant += other.constant * c`; splices every cell of `other`, scaled by `c`.
    pub fn insert_row(&mut self, other: &Row, c: f64) {
        self.constant += other.constant * c;
        for (symbol, coeff) in other.cells() {
            self.insert_symbol(symbol, coeff * c);
        }
    }

    pub fn remove_symbol(&mut self, symbol: Symbol) {
        self.cells.shift_remove(&symbol);
    }

    pub fn reverse_sign(&mut self) {
        self.constant = -self.constant;
        for c in self.cells.values_mut() {
            *c = -*c;
        }
    }

    /// Preconditions: `symbol` is present with a non-zero coefficient.
    ///
    /// Isolates `symbol` on the LHS: removes it, then scales the remaining
    /// constant/coefficients by `k = -1/coeff(symbol)`. After this call the
    /// row reads `symbol = constant + Σ coeff·other_symbol`.
    pub fn solve_for(&mut self, symbol: Symbol) {
        let coeff = self.cells.shift_remove(&symbol).unwrap_or(1.0);
        let k = -1.0 / coeff;
        self.constant *= k;
        for c in self.cells.values_mut() {
            *c *= k;
        }
    }

    /// Inserts a `-1` coefficient for `lhs`, then [`Row::solve_for`]s `rhs`.
    pub fn solve_for_ex(&mut self, lhs: Symbol, rhs: Symbol) {
        self.insert_symbol(lhs, -1.0);
        self.solve_for(rhs);
    }

    pub fn coefficient_for(&self, symbol: Symbol) -> f64 {
        self.cells.get(&symbol).copied().unwrap_or(0.0)
    }

    /// If `symbol` is a cell with coefficient `a`, removes it and splices in
    /// `row` scaled by `a`.
    pub fn substitute(&mut self, symbol: Symbol, row: &Row) {
        if let Some(a) = self.cells.shift_remove(&symbol) {
            self.insert_row(row, a);
        }
    }
}
