//! The tableau state and the simplex-derived algorithms that keep it optimal
//! and feasible across incremental edits.

use indexmap::IndexMap;

use crate::edit::EditInfo;
use crate::error::SolverError;
use crate::row::{near_zero, Row};
use crate::symbol::{Symbol, SymbolKind, SymbolSource};
use crate::tag::Tag;
use crate::variable::{Constraint, Expression, RelationalOperator, Strength, Variable};

/// An incremental linear constraint solver.
///
/// Every mutating method either succeeds, leaving the tableau both optimal
/// (no improving pivot on the objective) and feasible (every basic row has
/// a non-negative constant), or returns a [`SolverError`] without disturbing
/// the solver's observable state (see the error-handling note on
/// [`Solver::add_constraint`] for the one documented exception).
#[derive(Default)]
pub struct Solver {
    symbols: SymbolSource,
    /// The basis: symbol -> the row that expresses it in terms of parametric symbols.
    rows: IndexMap<Symbol, Row>,
    /// The weighted sum of error variables, expressed over parametric symbols.
    objective: Row,
    /// Set only while the artificial-variable phase is in progress.
    artificial: Option<Row>,
    /// External symbol minted for each user variable, lazily on first appearance.
    var_for_variable: IndexMap<Variable, Symbol>,
    /// Tag recorded for each live constraint.
    constraints: IndexMap<Constraint, Tag>,
    /// Bookkeeping for registered edit variables.
    edit_variables: IndexMap<Variable, EditInfo>,
    /// Basis symbols whose rows currently have a negative constant, awaiting dual pivoting.
    infeasible_rows: Vec<Symbol>,
    /// Values pushed back by the last [`Solver::update_variables`] call.
    values: IndexMap<Variable, f64>,
}

impl Solver {
    pub fn new() -> Self {
        Self {
            symbols: SymbolSource::new(),
            rows: IndexMap::new(),
            objective: Row::new(0.0),
            artificial: None,
            var_for_variable: IndexMap::new(),
            constraints: IndexMap::new(),
            edit_variables: IndexMap::new(),
            infeasible_rows: Vec::new(),
            values: IndexMap::new(),
        }
    }

    pub fn has_constraint(&self, constraint: &Constraint) -> bool {
        self.constraints.contains_key(constraint)
    }

    pub fn has_edit_variable(&self, var: Variable) -> bool {
        self.edit_variables.contains_key(&var)
    }

    /// The value `var` held after the last [`Solver::update_variables`] call,
    /// or `0.0` if `var` has never been read back.
    pub fn value_of(&self, var: Variable) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }

    /// Adds a constraint to the solver.
    ///
    /// On [`SolverError::UnsatisfiableConstraint`] raised by a no-natural-
    /// subject row that isn't all-dummy, the tableau may already have been
    /// mutated by pivots the artificial-variable phase performed before
    /// discovering infeasibility, the same behaviour as the reference
    /// algorithm this solver implements. Every other failure mode
    /// (duplicate constraint, or an all-dummy redundant row) is a pure
    /// pre-check and mutates nothing.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), SolverError> {
        if self.constraints.contains_key(&constraint) {
            return Err(SolverError::DuplicateConstraint);
        }

        let (mut row, tag) = self.create_row(&constraint);
        let subject = self.choose_subject(&row, &tag);

        if !subject.is_invalid() {
            row.solve_for(subject);
            self.substitute_everywhere(subject, &row);
            self.rows.insert(subject, row);
        } else if row.is_all_dummy() {
            if !near_zero(row.constant) {
                return Err(SolverError::UnsatisfiableConstraint);
            }
            row.solve_for(tag.marker);
            self.substitute_everywhere(tag.marker, &row);
            self.rows.insert(tag.marker, row);
        } else {
            self.add_with_artificial_variable(row)?;
        }

        self.constraints.insert(constraint, tag);
        self.optimize()
    }

    /// Removes a previously added constraint.
    pub fn remove_constraint(&mut self, constraint: &Constraint) -> Result<(), SolverError> {
        let tag = self
            .constraints
            .shift_remove(constraint)
            .ok_or(SolverError::UnknownConstraint)?;

        self.remove_constraint_effects(constraint, &tag);

        if self.rows.shift_remove(&tag.marker).is_none() {
            let leaving = self
                .marker_leaving_row(tag.marker)
                .ok_or(SolverError::InternalSolverError("no marker-leaving row found"))?;
            let mut row = self.rows.shift_remove(&leaving).expect("leaving row is in the basis");
            row.solve_for_ex(leaving, tag.marker);
            self.substitute_everywhere(tag.marker, &row);
            self.rows.insert(tag.marker, row);
        }

        self.optimize()
    }

    /// Registers `var` as an interactively editable variable.
    pub fn add_edit_variable(&mut self, var: Variable, strength: Strength) -> Result<(), SolverError> {
        if self.edit_variables.contains_key(&var) {
            return Err(SolverError::DuplicateEditVariable);
        }
        if strength.is_required() {
            return Err(SolverError::BadRequiredStrength);
        }

        let constraint = Constraint::new(Expression::from_variable(var), RelationalOperator::Equal, strength);
        self.add_constraint(constraint.clone())?;
        let tag = *self.constraints.get(&constraint).expect("constraint was just added");

        self.edit_variables.insert(var, EditInfo { tag, constraint, constant: 0.0 });
        Ok(())
    }

    pub fn remove_edit_variable(&mut self, var: Variable) -> Result<(), SolverError> {
        let info = self
            .edit_variables
            .shift_remove(&var)
            .ok_or(SolverError::UnknownEditVariable)?;
        self.remove_constraint(&info.constraint)
    }

    /// Suggests a new value for a registered edit variable and restores
    /// feasibility via the dual method.
    pub fn suggest_value(&mut self, var: Variable, value: f64) -> Result<(), SolverError> {
        let Some(info) = self.edit_variables.get_mut(&var) else {
            return Err(SolverError::UnknownEditVariable);
        };
        let delta = value - info.constant;
        info.constant = value;
        let tag = info.tag;

        if let Some(row) = self.rows.get_mut(&tag.marker) {
            row.constant -= delta;
            if row.constant < 0.0 {
                self.infeasible_rows.push(tag.marker);
            }
        } else if let Some(row) = self.rows.get_mut(&tag.other) {
            row.constant += delta;
            if row.constant < 0.0 {
                self.infeasible_rows.push(tag.other);
            }
        } else {
            for (&symbol, row) in self.rows.iter_mut() {
                let coeff = row.coefficient_for(tag.marker);
                if coeff != 0.0 {
                    row.constant += delta * coeff;
                    if row.constant < 0.0 && !symbol.is_external() {
                        self.infeasible_rows.push(symbol);
                    }
                }
            }
        }

        self.dual_optimize()
    }

    /// Pushes the current solution back into [`Solver::value_of`]'s readback map.
    pub fn update_variables(&mut self) {
        for (&var, &symbol) in self.var_for_variable.iter() {
            let value = self.rows.get(&symbol).map_or(0.0, |row| row.constant);
            self.values.insert(var, value);
        }
    }

    // ---- row construction ----------------------------------------------

    fn create_row(&mut self, constraint: &Constraint) -> (Row, Tag) {
        let expression = constraint.expression();
        let mut row = Row::new(expression.constant);

        for &(coeff, var) in &expression.terms {
            if near_zero(coeff) {
                continue;
            }
            let symbol = self.symbol_for_variable(var);
            match self.rows.get(&symbol) {
                Some(basic_row) => row.insert_row(basic_row, coeff),
                None => row.insert_symbol(symbol, coeff),
            }
        }

        let mut tag = Tag::new(Symbol::invalid(), Symbol::invalid());

        match constraint.operator() {
            RelationalOperator::LessOrEqual | RelationalOperator::GreaterOrEqual => {
                let sign = if constraint.operator() == RelationalOperator::LessOrEqual { 1.0 } else { -1.0 };
                let slack = self.symbols.mint(SymbolKind::Slack);
                tag.marker = slack;
                row.insert_symbol(slack, sign);

                if !constraint.strength().is_required() {
                    let error = self.symbols.mint(SymbolKind::Error);
                    tag.other = error;
                    row.insert_symbol(error, -sign);
                    self.objective.insert_symbol(error, constraint.strength().value());
                }
            }
            RelationalOperator::Equal => {
                if constraint.strength().is_required() {
                    let dummy = self.symbols.mint(SymbolKind::Dummy);
                    tag.marker = dummy;
                    row.insert_symbol(dummy, 1.0);
                } else {
                    let error_plus = self.symbols.mint(SymbolKind::Error);
                    let error_minus = self.symbols.mint(SymbolKind::Error);
                    tag.marker = error_plus;
                    tag.other = error_minus;
                    row.insert_symbol(error_plus, -1.0);
                    row.insert_symbol(error_minus, 1.0);
                    self.objective.insert_symbol(error_plus, constraint.strength().value());
                    self.objective.insert_symbol(error_minus, constraint.strength().value());
                }
            }
        }

        if row.constant < 0.0 {
            row.reverse_sign();
        }

        (row, tag)
    }

    fn symbol_for_variable(&mut self, var: Variable) -> Symbol {
        if let Some(&symbol) = self.var_for_variable.get(&var) {
            return symbol;
        }
        let symbol = self.symbols.mint(SymbolKind::External);
        self.var_for_variable.insert(var, symbol);
        symbol
    }

    // ---- subject selection -------------------------------------------------

    fn choose_subject(&self, row: &Row, tag: &Tag) -> Symbol {
        for (symbol, _) in row.cells() {
            if symbol.is_external() {
                return symbol;
            }
        }
        if tag.marker.is_pivotable() && row.coefficient_for(tag.marker) < 0.0 {
            return tag.marker;
        }
        if tag.other.is_pivotable() && row.coefficient_for(tag.other) < 0.0 {
            return tag.other;
        }
        Symbol::invalid()
    }

    // ---- artificial-variable phase -----------------------------------------

    fn add_with_artificial_variable(&mut self, row: Row) -> Result<(), SolverError> {
        let artificial_symbol = self.symbols.mint(SymbolKind::Slack);
        self.rows.insert(artificial_symbol, row.clone());
        self.artificial = Some(row);

        self.optimize_artificial()?;

        let satisfied = near_zero(self.artificial.as_ref().expect("set above").constant);
        self.artificial = None;

        if let Some(mut art_row) = self.rows.shift_remove(&artificial_symbol) {
            if !art_row.is_constant() {
                let entering = art_row.cells().map(|(s, _)| s).find(|s| s.is_pivotable());
                match entering {
                    Some(entering) => {
                        art_row.solve_for_ex(artificial_symbol, entering);
                        self.substitute_everywhere(entering, &art_row);
                        self.rows.insert(entering, art_row);
                    }
                    None => return Err(SolverError::UnsatisfiableConstraint),
                }
            }
        }

        for row in self.rows.values_mut() {
            row.remove_symbol(artificial_symbol);
        }
        self.objective.remove_symbol(artificial_symbol);

        if satisfied {
            Ok(())
        } else {
            Err(SolverError::UnsatisfiableConstraint)
        }
    }

    // ---- primal optimise -----------------------------------------------

    fn entering_symbol(objective: &Row) -> Option<Symbol> {
        objective.cells().find(|&(s, c)| !s.is_dummy() && c < 0.0).map(|(s, _)| s)
    }

    fn leaving_row_for_entering(&self, entering: Symbol) -> Option<Symbol> {
        let mut best: Option<(Symbol, f64)> = None;
        for (&symbol, row) in self.rows.iter() {
            if symbol.is_external() {
                continue;
            }
            let t = row.coefficient_for(entering);
            if t < 0.0 {
                let ratio = -row.constant / t;
                if best.as_ref().map_or(true, |&(_, r)| ratio < r) {
                    best = Some((symbol, ratio));
                }
            }
        }
        best.map(|(s, _)| s)
    }

    fn optimize(&mut self) -> Result<(), SolverError> {
        loop {
            let Some(entering) = Self::entering_symbol(&self.objective) else { break };
            let leaving = self
                .leaving_row_for_entering(entering)
                .ok_or(SolverError::InternalSolverError("objective is unbounded"))?;
            self.pivot(leaving, entering);
        }
        Ok(())
    }

    fn optimize_artificial(&mut self) -> Result<(), SolverError> {
        loop {
            let entering = {
                let objective = self.artificial.as_ref().expect("artificial objective is active");
                Self::entering_symbol(objective)
            };
            let Some(entering) = entering else { break };
            let leaving = self
                .leaving_row_for_entering(entering)
                .ok_or(SolverError::InternalSolverError("artificial objective is unbounded"))?;
            self.pivot(leaving, entering);
        }
        Ok(())
    }

    fn pivot(&mut self, leaving: Symbol, entering: Symbol) {
        let mut row = self.rows.shift_remove(&leaving).expect("leaving row is in the basis");
        row.solve_for_ex(leaving, entering);
        self.substitute_everywhere(entering, &row);
        self.rows.insert(entering, row);
    }

    fn substitute_everywhere(&mut self, symbol: Symbol, row: &Row) {
        for r in self.rows.values_mut() {
            r.substitute(symbol, row);
        }
        self.objective.substitute(symbol, row);
        if let Some(artificial) = self.artificial.as_mut() {
            artificial.substitute(symbol, row);
        }
    }

    // ---- constraint removal -------------------------------------------------

    fn remove_constraint_effects(&mut self, constraint: &Constraint, tag: &Tag) {
        let strength = constraint.strength().value();
        if tag.marker.is_error() {
            self.remove_error_effects(tag.marker, strength);
        } else if tag.other.is_error() {
            self.remove_error_effects(tag.other, strength);
        }
    }

    fn remove_error_effects(&mut self, symbol: Symbol, strength: f64) {
        if let Some(row) = self.rows.get(&symbol).cloned() {
            self.objective.insert_row(&row, -strength);
        } else {
            self.objective.insert_symbol(symbol, -strength);
        }
    }

    fn marker_leaving_row(&self, marker: Symbol) -> Option<Symbol> {
        let mut first: Option<(Symbol, f64)> = None;
        let mut second: Option<(Symbol, f64)> = None;
        let mut third: Option<Symbol> = None;

        for (&symbol, row) in self.rows.iter() {
            let c = row.coefficient_for(marker);
            if c == 0.0 {
                continue;
            }
            if symbol.is_external() {
                third = Some(symbol);
                continue;
            }
            if c < 0.0 {
                let ratio = -row.constant / c;
                if first.as_ref().map_or(true, |&(_, best)| ratio < best) {
                    first = Some((symbol, ratio));
                }
            } else {
                let ratio = row.constant / c;
                if second.as_ref().map_or(true, |&(_, best)| ratio < best) {
                    second = Some((symbol, ratio));
                }
            }
        }

        first.map(|(s, _)| s).or_else(|| second.map(|(s, _)| s)).or(third)
    }

    // ---- dual optimise --------------------------------------------------

    fn dual_optimize(&mut self) -> Result<(), SolverError> {
        while let Some(leaving) = self.infeasible_rows.pop() {
            let needs_pivot = self.rows.get(&leaving).is_some_and(|row| row.constant < 0.0);
            if !needs_pivot {
                continue;
            }

            let row = self.rows.get(&leaving).expect("checked above");
            let mut best: Option<(Symbol, f64)> = None;
            for (symbol, c) in row.cells() {
                if symbol.is_dummy() || c <= 0.0 {
                    continue;
                }
                let ratio = self.objective.coefficient_for(symbol) / c;
                if best.as_ref().map_or(true, |&(_, r)| ratio < r) {
                    best = Some((symbol, ratio));
                }
            }

            let (entering, _) = best.ok_or(SolverError::InternalSolverError("dual optimize found no entering symbol"))?;
            self.pivot(leaving, entering);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::RelationalOperator::*;

    fn eq(expr: Expression, strength: Strength) -> Constraint {
        Constraint::new(expr, Equal, strength)
    }

    fn le(expr: Expression, strength: Strength) -> Constraint {
        Constraint::new(expr, LessOrEqual, strength)
    }

    fn ge(expr: Expression, strength: Strength) -> Constraint {
        Constraint::new(expr, GreaterOrEqual, strength)
    }

    const TOL: f64 = 1e-6;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < TOL
    }

    // S1 -- simple equality.
    #[test]
    fn s1_simple_equality() {
        let mut solver = Solver::new();
        let x = Variable::new();

        solver
            .add_constraint(eq(Expression::from_variable(x).with_constant(-20.0), Strength::REQUIRED))
            .unwrap();

        solver.update_variables();
        assert!(close(solver.value_of(x), 20.0));
    }

    // S2 -- inequality with a weaker preference.
    #[test]
    fn s2_inequality_chain() {
        let mut solver = Solver::new();
        let x = Variable::new();
        let y = Variable::new();

        // x <= y  =>  x - y <= 0
        let expr = Expression::from_variable(x).with_term(-1.0, y);
        solver.add_constraint(le(expr, Strength::REQUIRED)).unwrap();
        solver
            .add_constraint(eq(Expression::from_variable(y).with_constant(-10.0), Strength::REQUIRED))
            .unwrap();
        solver
            .add_constraint(ge(Expression::from_variable(x).with_constant(-5.0), Strength::REQUIRED))
            .unwrap();

        solver.update_variables();
        assert!(close(solver.value_of(x), 5.0));
        assert!(close(solver.value_of(y), 10.0));
    }

    // S3 -- soft conflict: strong beats weak.
    #[test]
    fn s3_soft_conflict() {
        let mut solver = Solver::new();
        let x = Variable::new();

        solver
            .add_constraint(eq(Expression::from_variable(x).with_constant(-40.0), Strength::STRONG))
            .unwrap();
        solver
            .add_constraint(eq(Expression::from_variable(x).with_constant(-10.0), Strength::WEAK))
            .unwrap();

        solver.update_variables();
        assert!(close(solver.value_of(x), 40.0));
    }

    // S4 -- edit variable, including a suggestion that would violate a required bound.
    #[test]
    fn s4_edit_variable() {
        let mut solver = Solver::new();
        let x = Variable::new();

        solver
            .add_constraint(ge(Expression::from_variable(x), Strength::REQUIRED))
            .unwrap();
        solver.add_edit_variable(x, Strength::STRONG).unwrap();

        solver.suggest_value(x, 42.0).unwrap();
        solver.update_variables();
        assert!(close(solver.value_of(x), 42.0));

        solver.suggest_value(x, -5.0).unwrap();
        solver.update_variables();
        assert!(close(solver.value_of(x), 0.0));
    }

    // S5 -- removing a constraint restores the prior solution.
    #[test]
    fn s5_removal_restores_solution() {
        let mut solver = Solver::new();
        let x = Variable::new();
        let y = Variable::new();

        let sum = Expression::from_variable(x).with_term(1.0, y).with_constant(-100.0);
        solver.add_constraint(eq(sum, Strength::REQUIRED)).unwrap();

        let ordering = Expression::from_variable(x).with_term(-1.0, y);
        solver.add_constraint(ge(ordering, Strength::REQUIRED)).unwrap();

        let pin = eq(Expression::from_variable(x).with_constant(-60.0), Strength::STRONG);
        solver.add_constraint(pin.clone()).unwrap();

        solver.update_variables();
        assert!(close(solver.value_of(x), 60.0));
        assert!(close(solver.value_of(y), 40.0));

        solver.remove_constraint(&pin).unwrap();
        solver.update_variables();
        assert!(close(solver.value_of(x), 50.0));
        assert!(close(solver.value_of(y), 50.0));
    }

    // S6 -- conflicting required constraints.
    #[test]
    fn s6_unsatisfiable_required() {
        let mut solver = Solver::new();
        let x = Variable::new();

        solver
            .add_constraint(eq(Expression::from_variable(x).with_constant(-1.0), Strength::REQUIRED))
            .unwrap();

        let result = solver.add_constraint(eq(
            Expression::from_variable(x).with_constant(-2.0),
            Strength::REQUIRED,
        ));
        assert!(matches!(result, Err(SolverError::UnsatisfiableConstraint)));

        solver.update_variables();
        assert!(close(solver.value_of(x), 1.0));
    }

    #[test]
    fn duplicate_constraint_is_rejected() {
        let mut solver = Solver::new();
        let x = Variable::new();
        let c = eq(Expression::from_variable(x).with_constant(-1.0), Strength::REQUIRED);
        solver.add_constraint(c.clone()).unwrap();
        assert!(matches!(solver.add_constraint(c), Err(SolverError::DuplicateConstraint)));
    }

    #[test]
    fn unknown_constraint_removal_is_rejected() {
        let mut solver = Solver::new();
        let x = Variable::new();
        let c = eq(Expression::from_variable(x).with_constant(-1.0), Strength::REQUIRED);
        assert!(matches!(solver.remove_constraint(&c), Err(SolverError::UnknownConstraint)));
    }

    #[test]
    fn edit_variable_rejects_required_strength() {
        let mut solver = Solver::new();
        let x = Variable::new();
        assert!(matches!(
            solver.add_edit_variable(x, Strength::REQUIRED),
            Err(SolverError::BadRequiredStrength)
        ));
    }

    #[test]
    fn duplicate_edit_variable_is_rejected() {
        let mut solver = Solver::new();
        let x = Variable::new();
        solver.add_edit_variable(x, Strength::STRONG).unwrap();
        assert!(matches!(
            solver.add_edit_variable(x, Strength::STRONG),
            Err(SolverError::DuplicateEditVariable)
        ));
    }

    #[test]
    fn suggesting_same_value_twice_is_idempotent() {
        let mut solver = Solver::new();
        let x = Variable::new();
        solver.add_edit_variable(x, Strength::STRONG).unwrap();

        solver.suggest_value(x, 10.0).unwrap();
        solver.update_variables();
        let first = solver.value_of(x);

        solver.suggest_value(x, 10.0).unwrap();
        solver.update_variables();
        assert!(close(first, solver.value_of(x)));
    }

    #[test]
    fn suggest_x_then_y_then_x_returns_to_first_solution() {
        let mut solver = Solver::new();
        let x = Variable::new();
        solver.add_edit_variable(x, Strength::STRONG).unwrap();

        solver.suggest_value(x, 10.0).unwrap();
        solver.update_variables();
        let at_10 = solver.value_of(x);

        solver.suggest_value(x, 25.0).unwrap();
        solver.suggest_value(x, 10.0).unwrap();
        solver.update_variables();
        assert!(close(at_10, solver.value_of(x)));
    }

    #[test]
    fn redundant_required_equality_is_not_an_error() {
        let mut solver = Solver::new();
        let x = Variable::new();
        let y = Variable::new();

        solver
            .add_constraint(eq(Expression::from_variable(x).with_term(-1.0, y), Strength::REQUIRED))
            .unwrap();

        // A distinct Constraint instance expressing the same already-implied
        // relation (x - y == 0) is algebraically redundant, not a conflict.
        let redundant = eq(Expression::from_variable(y).with_term(-1.0, x), Strength::REQUIRED);
        solver.add_constraint(redundant).unwrap();
    }
}
