//! Error conditions reported back to callers of the solver.

use thiserror::Error;

/// Failures the solver can report. Nothing is silently ignored: every
/// mutating call either succeeds, leaving the tableau invariants intact, or
/// returns one of these and leaves the tableau in its pre-call state.
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    #[error("constraint is already present in the solver")]
    DuplicateConstraint,

    #[error("constraint is not known to the solver")]
    UnknownConstraint,

    #[error("required constraint has no feasible solution")]
    UnsatisfiableConstraint,

    #[error("edit variable is already registered")]
    DuplicateEditVariable,

    #[error("variable is not registered as an edit variable")]
    UnknownEditVariable,

    #[error("edit variables cannot use the required strength")]
    BadRequiredStrength,

    #[error("internal solver invariant was violated: {0}")]
    InternalSolverError(&'static str),
}
