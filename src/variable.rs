//! Variable, Expression, Constraint, and Strength.
//!
//! These are treated as external collaborators whose contracts are fixed
//! but whose construction is not this crate's concern. The tableau engine
//! consumes a completed [`Constraint`]; how
//! callers build one is their business. These definitions exist so the
//! crate is usable and testable on its own, the same way the reference
//! Cassowary port this engine is modelled on bundles them alongside the
//! tableau rather than importing them from a separate expression crate.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(0);

/// A user-owned unknown the solver assigns a value to.
///
/// Identity is by id. `Variable::new()` mints a fresh id from a process-wide
/// counter, so variables can be created anywhere without threading a builder
/// through caller code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Variable(u64);

impl Variable {
    pub fn new() -> Self {
        Self(NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn id(&self) -> u64 {
        self.0
    }
}

impl Default for Variable {
    fn default() -> Self {
        Self::new()
    }
}

/// A scalar constant plus an ordered sequence of `(coefficient, Variable)` terms.
///
/// Duplicate variables within one expression are permitted; they compose
/// additively when the tableau row is constructed.
#[derive(Debug, Clone, Default)]
pub struct Expression {
    pub constant: f64,
    pub terms: Vec<(f64, Variable)>,
}

impl Expression {
    pub fn from_constant(constant: f64) -> Self {
        Self { constant, terms: Vec::new() }
    }

    pub fn from_variable(var: Variable) -> Self {
        Self { constant: 0.0, terms: vec![(1.0, var)] }
    }

    pub fn with_term(mut self, coefficient: f64, var: Variable) -> Self {
        self.terms.push((coefficient, var));
        self
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }
}

/// The relation a [`Constraint`] expresses between its expression and zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RelationalOperator {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

/// A non-negative real strength, with the conventional four-level scale and
/// a distinguished `REQUIRED` sentinel.
///
/// The full strength scale (composing weighted sub-levels, clipping rules
/// beyond the sentinel) is caller territory; this is just the sentinel plus
/// the names every caller needs.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct Strength(f64);

impl Strength {
    pub const REQUIRED: Strength = Strength(1_001_001_000.0);
    pub const STRONG: Strength = Strength(1_000_000.0);
    pub const MEDIUM: Strength = Strength(1_000.0);
    pub const WEAK: Strength = Strength(1.0);

    /// Clips `value` into `[0, REQUIRED]`.
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, Self::REQUIRED.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_required(&self) -> bool {
        self.0 >= Self::REQUIRED.0
    }
}

struct ConstraintData {
    expression: Expression,
    operator: RelationalOperator,
    strength: Strength,
}

/// An immutable `{expression, operator, strength}`, cheap to clone, with
/// pointer-identity equality and hashing, the same identity-keyed-collections
/// treatment already used for Symbols.
#[derive(Clone)]
pub struct Constraint(Rc<ConstraintData>);

impl Constraint {
    pub fn new(expression: Expression, operator: RelationalOperator, strength: Strength) -> Self {
        Self(Rc::new(ConstraintData { expression, operator, strength }))
    }

    pub fn expression(&self) -> &Expression {
        &self.0.expression
    }

    pub fn operator(&self) -> RelationalOperator {
        self.0.operator
    }

    pub fn strength(&self) -> Strength {
        self.0.strength
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Constraint {}

impl std::hash::Hash for Constraint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl std::fmt::Debug for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constraint")
            .field("operator", &self.0.operator)
            .field("strength", &self.0.strength.0)
            .finish_non_exhaustive()
    }
}
