//! Incremental linear constraint solving, Cassowary-style.
//!
//! # Architecture
//!
//! A [`Solver`] keeps a simplex tableau over three kinds of symbol: external
//! symbols stand in for caller [`Variable`]s, slack/error symbols are
//! auxiliaries the solver introduces per constraint, and dummy symbols are
//! zero-valued placeholders used only to give a required equality a subject.
//! [`Solver::add_constraint`] and [`Solver::remove_constraint`] keep the
//! tableau optimal and feasible incrementally, without re-solving from
//! scratch; [`Solver::suggest_value`] nudges a registered edit variable and
//! restores feasibility with the dual simplex method rather than the primal
//! one, since an edit only ever perturbs one row's constant.
//!
//! # Example
//!
//! ```
//! use cassowary::{Constraint, Expression, RelationalOperator, Solver, Strength, Variable};
//!
//! let mut solver = Solver::new();
//! let x = Variable::new();
//!
//! let width_is_20 = Constraint::new(
//!     Expression::from_variable(x).with_constant(-20.0),
//!     RelationalOperator::Equal,
//!     Strength::REQUIRED,
//! );
//! solver.add_constraint(width_is_20).unwrap();
//!
//! solver.update_variables();
//! assert_eq!(solver.value_of(x), 20.0);
//! ```

mod edit;
mod error;
mod row;
mod solver;
mod symbol;
mod tag;
mod variable;

pub use error::SolverError;
pub use solver::Solver;
pub use variable::{Constraint, Expression, RelationalOperator, Strength, Variable};
