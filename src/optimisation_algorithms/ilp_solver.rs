use anyhow::Result;
use num_bigint::BigInt;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    ilp_framework::{ilp_error::IlpError, solver_config::SolverConfig},
    ilp_objects::{
        ilp_result::{IlpOutcome, IlpResult},
        range_constraint::RangeConstraint,
    },
    math::{
        polynomial::Polynomial,
        rational::Rational,
        traits::{One, Signed, Zero},
    },
};

use super::tableau::{Tableau, TableauOutcome};

/**
 * Finds integer points minimising affine objectives over a polytope given by range constraints.
 *
 * The solver carries only its configuration, so one value can serve any number of independent calls.
 *
 * ```
 * # use bilp::{IlpSolver, Polynomial, RangeConstraint};
 * // -1 <= x <= 2, -2 <= y <= 2 and -2 <= x + y <= 1
 * let constraints = vec![
 *     RangeConstraint::new(Polynomial::var("x") + Polynomial::var("y") + 2, 4).unwrap(),
 *     RangeConstraint::new(Polynomial::var("x") + 1, 4).unwrap(),
 *     RangeConstraint::new(Polynomial::var("y") + 2, 5).unwrap(),
 * ];
 * let objective = -3 * Polynomial::var("x") + 2 * Polynomial::var("y");
 *
 * let result = IlpSolver::new().solve(&constraints, &objective).unwrap().into_result().unwrap();
 * assert_eq!(result.obj_val, -10);
 * assert_eq!(result.soln["x"], num_bigint::BigInt::from(2));
 * assert_eq!(result.soln["y"], num_bigint::BigInt::from(-2));
 * ```
 */
#[derive(Debug, Clone, Default)]
pub struct IlpSolver {
    config: SolverConfig,
}

impl IlpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /**
     * Builds the standard-form tableau of `constraints` with `objective` in row 0.
     *
     * Every variable `x` becomes the pair `_x_pos - _x_neg` of non-negative columns, in sorted variable
     * order. A constraint `0 <= e + c < r` contributes the rows `-e + s_lo = c` and `e + s_hi = r - 1 - c`,
     * each with its own slack column, scaled to integral coefficients and negated if the right-hand side
     * is negative.
     */
    pub fn make_standard_form_tableau(
        &self,
        constraints: &[RangeConstraint],
        objective: &Polynomial,
    ) -> Result<Tableau> {
        let var_names = collect_var_names(constraints, [objective]);
        build_tableau(constraints, objective, &var_names)
    }

    /// Optimises `objective` over the integer points satisfying `constraints`.
    pub fn solve(
        &self,
        constraints: &[RangeConstraint],
        objective: &Polynomial,
    ) -> Result<IlpOutcome> {
        log::debug!(
            "solve min {} subject to {} constraints",
            objective,
            constraints.len()
        );
        let tableau = self.make_standard_form_tableau(constraints, objective)?;
        let outcome = self.solve_tableau(tableau)?;
        check_objective(objective, &outcome)?;
        Ok(outcome)
    }

    /**
     * Optimises a standard-form tableau and recombines the split variables into an integer solution.
     *
     * Fractional optima are refined with Gomory cuts until every original variable is integral.
     */
    pub fn solve_tableau(&self, mut tableau: Tableau) -> Result<IlpOutcome> {
        match tableau.make_optimal(&self.config)? {
            TableauOutcome::Optimal => {}
            TableauOutcome::Infeasible => return Ok(IlpOutcome::Infeasible),
            TableauOutcome::Unbounded => return Ok(IlpOutcome::Unbounded),
        }
        let split = split_variables(tableau.var_names());
        if self.make_integral(&mut tableau, 1..2 * split.len() + 1)? == TableauOutcome::Infeasible {
            return Ok(IlpOutcome::Infeasible);
        }
        Ok(IlpOutcome::Solved(extract_result(&tableau, &split)?))
    }

    /**
     * Optimises every objective over the same constraints.
     *
     * The constraint tableau is canonicalised once; each objective then only replaces row 0 of a copy
     * and pivots from the shared basis. Equal objectives share one entry of the result.
     */
    pub fn batch_solve(
        &self,
        constraints: &[RangeConstraint],
        objectives: &[Polynomial],
    ) -> Result<BTreeMap<Polynomial, IlpOutcome>> {
        log::debug!(
            "batch solve {} objectives subject to {} constraints",
            objectives.len(),
            constraints.len()
        );
        let var_names = collect_var_names(constraints, objectives);
        let mut canonical = build_tableau(constraints, &Polynomial::new(), &var_names)?;
        let feasible = canonical.select_basic_vars()?;

        let mut results = BTreeMap::new();
        for objective in objectives {
            if results.contains_key(objective) {
                continue;
            }
            let outcome = if feasible {
                let mut tableau = canonical.clone();
                let costs = objective_costs(objective, &var_names, tableau.cols() - 2);
                tableau.set_objective(&costs, objective.constant())?;
                self.solve_tableau(tableau)?
            } else {
                IlpOutcome::Infeasible
            };
            check_objective(objective, &outcome)?;
            log::trace!("{} -> {:?}", objective, outcome);
            results.insert(objective.clone(), outcome);
        }
        Ok(results)
    }

    /// Adds Gomory cuts until every basic variable among `columns` is integral.
    fn make_integral(
        &self,
        tableau: &mut Tableau,
        columns: std::ops::Range<usize>,
    ) -> Result<TableauOutcome> {
        let mut cuts = 0;
        while let Some(row) = tableau.first_fractional_row(columns.clone()) {
            if cuts == self.config.max_cuts {
                log::warn!(
                    "no integral solution after {} cuts; reporting the problem as infeasible",
                    cuts
                );
                return Ok(TableauOutcome::Infeasible);
            }
            tableau.add_gomory_cut(row)?;
            cuts += 1;
            match tableau.restore_feasibility(self.config.max_pivots)? {
                TableauOutcome::Optimal => {}
                outcome => return Ok(outcome),
            }
        }
        if cuts > 0 {
            log::debug!("integral solution after {} cuts", cuts);
        }
        Ok(TableauOutcome::Optimal)
    }
}

fn collect_var_names<'a>(
    constraints: &[RangeConstraint],
    objectives: impl IntoIterator<Item = &'a Polynomial>,
) -> Vec<String> {
    let mut names = BTreeSet::new();
    for constraint in constraints {
        names.extend(constraint.poly().var_set());
    }
    for objective in objectives {
        names.extend(objective.var_set());
    }
    names.into_iter().collect()
}

fn build_tableau(
    constraints: &[RangeConstraint],
    objective: &Polynomial,
    var_names: &[String],
) -> Result<Tableau> {
    if var_names.is_empty() {
        return Err(IlpError::MalformedConstraint(
            "the constraint system references no variables".to_string(),
        )
        .into());
    }
    let n = var_names.len();
    let rows = 1 + 2 * constraints.len();
    let cols = 1 + 2 * n + 2 * constraints.len() + 1;
    let rhs = cols - 1;
    let mut entries = vec![Rational::zero(); rows * cols];

    entries[0] = Rational::one();

    for (k, constraint) in constraints.iter().enumerate() {
        let poly = constraint.poly();
        let scale = Rational::from(poly.denominator_lcm());
        let constant = poly.constant();
        let upper = &Rational::from(constraint.range() - 1) - &constant;
        for (side, sign, bound) in [(0, -1i64, constant), (1, 1i64, upper)] {
            let row = 1 + 2 * k + side;
            let slack = 1 + 2 * n + 2 * k + side;
            let mut values = vec![Rational::zero(); cols];
            for (i, name) in var_names.iter().enumerate() {
                let coeff = &(&poly.get(name) * sign) * &scale;
                values[2 * i + 2] = -&coeff;
                values[2 * i + 1] = coeff;
            }
            values[slack] = Rational::one();
            values[rhs] = &bound * &scale;
            if values[rhs].is_negative() {
                values.iter_mut().for_each(|x| *x = -&*x);
            }
            entries[row * cols..(row + 1) * cols].clone_from_slice(&values);
        }
    }

    let mut labels = Vec::with_capacity(cols - 2);
    for name in var_names {
        labels.push(format!("_{}_pos", name));
        labels.push(format!("_{}_neg", name));
    }
    for k in 0..constraints.len() {
        labels.push(format!("_slack_{}_lo", k));
        labels.push(format!("_slack_{}_hi", k));
    }
    let mut tableau = Tableau::from_rows(rows, cols, entries, labels)?;
    tableau.set_objective(
        &objective_costs(objective, var_names, cols - 2),
        objective.constant(),
    )?;
    Ok(tableau)
}

/// The cost of every variable column: `c` for `_x_pos`, `-c` for `_x_neg`, zero for slacks.
fn objective_costs(objective: &Polynomial, var_names: &[String], columns: usize) -> Vec<Rational> {
    let mut costs = vec![Rational::zero(); columns];
    for (i, name) in var_names.iter().enumerate() {
        let coeff = objective.get(name);
        costs[2 * i + 1] = -&coeff;
        costs[2 * i] = coeff;
    }
    costs
}

/// Recovers the original variables from the leading `_x_pos`, `_x_neg` column pairs.
fn split_variables(labels: &[String]) -> Vec<String> {
    labels
        .chunks(2)
        .map_while(|pair| match pair {
            [pos, neg] => {
                let name = pos.strip_prefix('_')?.strip_suffix("_pos")?;
                (neg.strip_prefix('_')?.strip_suffix("_neg")? == name).then(|| name.to_string())
            }
            _ => None,
        })
        .collect()
}

fn extract_result(tableau: &Tableau, split: &[String]) -> Result<IlpResult> {
    let symbolic = tableau.get_symbolic_solution();
    let mut soln = BTreeMap::new();
    for (i, name) in split.iter().enumerate() {
        let value = &symbolic[2 * i] - &symbolic[2 * i + 1];
        let value: BigInt = value.to_integer().ok_or_else(|| {
            IlpError::InternalInvariantViolation(format!(
                "{} = {} is not integral after the cutting planes",
                name, value
            ))
        })?;
        soln.insert(name.clone(), value);
    }
    Ok(IlpResult {
        soln,
        obj_val: tableau.objective_value(),
    })
}

/// The objective value read from the tableau must match the objective evaluated at the solution.
fn check_objective(objective: &Polynomial, outcome: &IlpOutcome) -> Result<()> {
    if let IlpOutcome::Solved(result) = outcome {
        let evaluated = objective.eval(&result.soln)?;
        if evaluated != result.obj_val {
            return Err(IlpError::InternalInvariantViolation(format!(
                "objective {} evaluates to {} but the tableau reports {}",
                objective, evaluated, result.obj_val
            ))
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ntest::timeout;
    use num_bigint::BigInt;

    use crate::{
        ilp_framework::{
            ilp_error::IlpError,
            solver_config::{PivotPolicy, SolverConfig},
        },
        ilp_objects::{ilp_result::IlpOutcome, range_constraint::RangeConstraint},
        math::{polynomial::Polynomial, rational::Rational, traits::Signed},
        optimisation_algorithms::tableau::TableauOutcome,
    };

    use super::IlpSolver;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn var(name: &str) -> Polynomial {
        Polynomial::var(name)
    }

    fn constraint(poly: Polynomial, range: i64) -> RangeConstraint {
        RangeConstraint::new(poly, range).unwrap()
    }

    fn triangle() -> Vec<RangeConstraint> {
        vec![
            constraint(var("x") + var("y") + 2, 4),
            constraint(var("x") + 1, 4),
            constraint(var("y") + 2, 5),
        ]
    }

    fn subdivision() -> Vec<RangeConstraint> {
        vec![
            constraint(var("i_0"), 2),
            constraint(var("i_0") + 2 * var("k_0"), 5),
            constraint(var("i_0") + var("i_1") + var("k_0"), 35),
            constraint(var("i_0") + 2 * var("i_1"), 70),
        ]
    }

    #[test]
    fn basic_tableau() {
        let constraints = vec![constraint(var("x") + 4, 4)];
        let t = IlpSolver::new()
            .make_standard_form_tableau(&constraints, &Polynomial::term("x", 3))
            .unwrap();

        assert_eq!(t.rows(), 3);
        assert_eq!(t.cols(), 6);
        let expected = [
            [1, -3, 3, 0, 0, 0],
            [0, -1, 1, 1, 0, 4],
            [0, -1, 1, 0, -1, 1],
        ];
        for (i, row) in expected.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                assert_eq!(t.mat()[[i, j]], *value, "entry ({}, {})", i, j);
            }
        }
        assert_eq!(
            t.var_names(),
            &["_x_pos", "_x_neg", "_slack_0_lo", "_slack_0_hi"]
        );
    }

    #[test]
    fn standard_form_scales_rational_rows() {
        let half = Rational::new(1, 2).unwrap();
        let constraints = vec![constraint(Polynomial::term("x", half) + 1, 3)];
        let t = IlpSolver::new()
            .make_standard_form_tableau(&constraints, &var("x"))
            .unwrap();
        // -x/2 + s = 1 and x/2 + s = 1, doubled
        let expected = [
            [1, -1, 1, 0, 0, 0],
            [0, -1, 1, 1, 0, 2],
            [0, 1, -1, 0, 1, 2],
        ];
        for (i, row) in expected.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                assert_eq!(t.mat()[[i, j]], *value, "entry ({}, {})", i, j);
            }
        }
    }

    #[test]
    fn standard_form_without_variables() {
        let constraints = vec![constraint(Polynomial::from(1), 4)];
        let err = IlpSolver::new()
            .make_standard_form_tableau(&constraints, &Polynomial::new())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IlpError>(),
            Some(IlpError::MalformedConstraint(_))
        ));
    }

    #[test]
    #[timeout(5000)]
    fn simple_optimize() {
        init();
        let constraints = vec![constraint(var("x") + 4, 4)];
        let mut t = IlpSolver::new()
            .make_standard_form_tableau(&constraints, &(3 * var("x")))
            .unwrap();
        assert_eq!(
            t.make_optimal(&SolverConfig::default()).unwrap(),
            TableauOutcome::Optimal
        );

        let soln = t.get_symbolic_solution();
        assert_eq!(t.var_names()[0], "_x_pos");
        assert_eq!(t.var_names()[1], "_x_neg");
        assert_eq!(soln[0], 0);
        assert_eq!(soln[1], 4);
    }

    #[test]
    #[timeout(5000)]
    fn optimize_2d() {
        init();
        let objective = -3 * var("x") + 2 * var("y");
        let mut t = IlpSolver::new()
            .make_standard_form_tableau(&triangle(), &objective)
            .unwrap();
        assert_eq!(
            t.make_optimal(&SolverConfig::default()).unwrap(),
            TableauOutcome::Optimal
        );

        let soln = t.get_symbolic_solution();
        assert_eq!(&t.var_names()[..4], &["_x_pos", "_x_neg", "_y_pos", "_y_neg"]);
        assert_eq!(soln[0], 2);
        assert_eq!(soln[1], 0);
        assert_eq!(soln[2], 0);
        assert_eq!(soln[3], 2);
    }

    #[test]
    #[timeout(5000)]
    fn trivial_ilp() {
        init();
        let solver = IlpSolver::new();
        let objective = -3 * var("x") + 2 * var("y");
        let t = solver
            .make_standard_form_tableau(&triangle(), &objective)
            .unwrap();
        let res = solver.solve_tableau(t).unwrap().into_result().unwrap();

        assert_eq!(res.soln["x"], BigInt::from(2));
        assert_eq!(res.soln["y"], BigInt::from(-2));
        assert_eq!(res.obj_val, -10);
    }

    #[test]
    #[timeout(5000)]
    fn ilp_2d() {
        init();
        let constraints = vec![
            constraint(2 * var("x") + var("y") + 2, 6),
            constraint(var("x") + 1, 4),
            constraint(var("y") + 2, 5),
        ];
        let objective = -3 * var("x") + 2 * var("y");
        let res = IlpSolver::new()
            .solve(&constraints, &objective)
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(res.soln["x"], BigInt::from(2));
        assert_eq!(res.soln["y"], BigInt::from(-2));
        assert_eq!(res.obj_val, -10);
    }

    #[test]
    #[timeout(5000)]
    fn ilp_needs_cuts() {
        init();
        // the relaxation reaches k_0 = -1/2 at i_0 = 1
        let res = IlpSolver::new()
            .solve(&subdivision(), &var("k_0"))
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(res.obj_val, 0);
        assert_eq!(res.soln["k_0"], BigInt::from(0));
    }

    #[test]
    #[timeout(10000)]
    fn subdivision_1d() {
        init();
        let objectives = vec![
            var("i_0"),
            -var("i_0"),
            var("i_1"),
            -var("i_1"),
            var("k_0"),
            -var("k_0"),
        ];
        let res = IlpSolver::new()
            .batch_solve(&subdivision(), &objectives)
            .unwrap();

        let obj_val = |p: Polynomial| res[&p].result().unwrap().obj_val.clone();
        assert_eq!(obj_val(var("i_0")), 0);
        assert_eq!(obj_val(-var("i_0")), -1);
        assert_eq!(obj_val(var("i_1")), 0);
        assert_eq!(obj_val(-var("i_1")), -34);
        assert_eq!(obj_val(var("k_0")), 0);
        assert_eq!(obj_val(-var("k_0")), -2);
    }

    #[test]
    #[timeout(10000)]
    fn single_and_batch_agree() {
        init();
        let solver = IlpSolver::new();
        let objectives = vec![
            var("i_0") + var("i_1"),
            var("k_0") - 2 * var("i_1") + 3,
            -var("i_0") - var("k_0"),
        ];
        let batch = solver.batch_solve(&subdivision(), &objectives).unwrap();
        for objective in &objectives {
            let single = solver.solve(&subdivision(), objective).unwrap();
            assert_eq!(
                single.result().unwrap().obj_val,
                batch[objective].result().unwrap().obj_val,
                "objective {}",
                objective
            );
        }
    }

    #[test]
    #[timeout(5000)]
    fn batch_collapses_equal_objectives() {
        init();
        let objectives = vec![
            var("x") + var("y"),
            var("y") + var("x"),
            2 * var("x") - var("x") + var("y"),
        ];
        let res = IlpSolver::new()
            .batch_solve(&triangle(), &objectives)
            .unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[&(var("x") + var("y"))].result().unwrap().obj_val, -2);
    }

    #[test]
    #[timeout(5000)]
    fn pivot_policies_agree() {
        init();
        let bland = IlpSolver::with_config(
            SolverConfig::default().with_pivot_policy(PivotPolicy::Bland),
        );
        let dantzig = IlpSolver::new();
        for objective in [var("i_1"), -var("i_1"), var("i_0") - var("k_0")] {
            let by_bland = bland.solve(&subdivision(), &objective).unwrap();
            let by_dantzig = dantzig.solve(&subdivision(), &objective).unwrap();
            assert_eq!(
                by_bland.result().unwrap().obj_val,
                by_dantzig.result().unwrap().obj_val
            );
        }
    }

    #[test]
    #[timeout(5000)]
    fn infeasible_constraints() {
        init();
        // x <= -1 and x >= 0
        let constraints = vec![constraint(var("x") + 4, 4), constraint(var("x"), 10)];
        let solver = IlpSolver::new();
        assert_eq!(
            solver.solve(&constraints, &var("x")).unwrap(),
            IlpOutcome::Infeasible
        );
        let batch = solver
            .batch_solve(&constraints, &[var("x"), -var("x")])
            .unwrap();
        assert!(batch.values().all(|outcome| *outcome == IlpOutcome::Infeasible));
    }

    #[test]
    #[timeout(5000)]
    fn integer_infeasible_constraints() {
        init();
        // 1 <= 2x <= 1 has the rational solution 1/2 only
        let constraints = vec![constraint(2 * var("x") - 1, 1)];
        let outcome = IlpSolver::new().solve(&constraints, &var("x")).unwrap();
        assert_eq!(outcome, IlpOutcome::Infeasible);
        let err = outcome.into_result().unwrap_err();
        assert!(err.downcast_ref::<IlpError>().unwrap().is_infeasible());
    }

    #[test]
    #[timeout(5000)]
    fn unbounded_objective() {
        init();
        let constraints = vec![constraint(var("x") + 1, 4)];
        let outcome = IlpSolver::new()
            .solve(&constraints, &(var("x") - var("y")))
            .unwrap();
        assert_eq!(outcome, IlpOutcome::Unbounded);
    }

    #[test]
    #[timeout(5000)]
    fn objective_constant_is_reported() {
        init();
        let res = IlpSolver::new()
            .solve(&triangle(), &(var("x") + 7))
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(res.obj_val, 6);
        assert_eq!(res.soln["x"], BigInt::from(-1));
    }

    #[test]
    #[timeout(5000)]
    fn solution_satisfies_constraints() {
        init();
        let objective = var("i_0") - 3 * var("i_1") + var("k_0");
        let res = IlpSolver::new()
            .solve(&subdivision(), &objective)
            .unwrap()
            .into_result()
            .unwrap();
        for constraint in subdivision() {
            let value = constraint.poly().eval(&res.soln).unwrap();
            assert!(value.is_non_negative(), "{} violated", constraint);
            assert!(value < Rational::from(constraint.range().clone()), "{} violated", constraint);
        }
    }
}
