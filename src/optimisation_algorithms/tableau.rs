use anyhow::{anyhow, Result};
use itertools::Itertools;
use ndarray::Array2;
use std::fmt::Display;

use crate::{
    ilp_framework::{
        ilp_error::IlpError,
        solver_config::{PivotPolicy, SolverConfig},
    },
    math::{
        rational::Rational,
        traits::{One, Signed, Zero},
    },
};

/**
 * A simplex tableau over exact rationals.
 *
 * Row 0 is the objective row, rows 1.. are constraint rows. Column 0 is the objective indicator (1 in
 * row 0, 0 elsewhere), the last column is the right-hand side, and every column in between is a
 * non-negative variable labelled by `var_names`.
 *
 * Row 0 reads `z - c·x = rhs`: it stores the negated cost of every variable, and its right-hand side is
 * the objective value of the current basic solution. A variable with a positive row-0 entry improves
 * (decreases) the objective, so the tableau is optimal once no variable column has a positive entry.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tableau {
    mat: Array2<Rational>,
    var_names: Vec<String>,
    basis: Option<Vec<usize>>,
    objective_offset: Rational,
}

/// The result of running a simplex phase on a tableau.
/// - `Optimal`: the tableau is canonical, feasible and optimal
/// - `Infeasible`: no basic feasible solution exists (or the pivot budget ran out)
/// - `Unbounded`: the objective can be decreased without limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableauOutcome {
    Optimal,
    Infeasible,
    Unbounded,
}

impl Tableau {
    /**
     * Creates a tableau from its dense row-major entries.
     *
     * `var_names` labels the variable columns (all but the first and the last); pass an empty vector to
     * have labels generated. Column 0 must be the objective indicator.
     */
    pub fn from_rows(
        rows: usize,
        cols: usize,
        entries: Vec<Rational>,
        var_names: Vec<String>,
    ) -> Result<Self> {
        if rows < 1 || cols < 2 {
            return Err(IlpError::MalformedTableau(format!(
                "a tableau needs an objective row and two columns, got {}x{}",
                rows, cols
            ))
            .into());
        }
        let mat = Array2::from_shape_vec((rows, cols), entries).map_err(|e| {
            IlpError::MalformedTableau(format!(
                "entries do not form a {}x{} matrix: {}",
                rows, cols, e
            ))
        })?;
        let var_names = if var_names.is_empty() {
            (1..cols - 1).map(|j| format!("_v{}", j)).collect()
        } else if var_names.len() == cols - 2 {
            var_names
        } else {
            return Err(IlpError::MalformedTableau(format!(
                "{} variable names for {} variable columns",
                var_names.len(),
                cols - 2
            ))
            .into());
        };
        if !mat[[0, 0]].is_one() || (1..rows).any(|r| !mat[[r, 0]].is_zero()) {
            return Err(IlpError::MalformedTableau(
                "column 0 must be the objective indicator".to_string(),
            )
            .into());
        }

        Ok(Self {
            mat,
            var_names,
            basis: None,
            objective_offset: Rational::zero(),
        })
    }

    pub fn mat(&self) -> &Array2<Rational> {
        &self.mat
    }

    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    /// Number of rows, including the objective row.
    pub fn rows(&self) -> usize {
        self.mat.nrows()
    }

    /// Number of columns, including the indicator and right-hand side columns.
    pub fn cols(&self) -> usize {
        self.mat.ncols()
    }

    fn rhs(&self) -> usize {
        self.mat.ncols() - 1
    }

    /// The basic column of every constraint row, once the tableau has been canonicalised.
    pub fn basis(&self) -> Option<&[usize]> {
        self.basis.as_deref()
    }

    /// Objective value of the current basic solution, including the constant offset of the objective.
    pub fn objective_value(&self) -> Rational {
        &self.mat[[0, self.rhs()]] + &self.objective_offset
    }

    /// True if every constraint row has a unit basic column with a zero objective entry and a
    /// non-negative right-hand side.
    pub fn is_canonical(&self) -> bool {
        match &self.basis {
            Some(basis) => self.check_basis(basis).is_ok(),
            None => false,
        }
    }

    /**
     * Replaces the objective row by `costs` (one entry per variable column) and re-prices it against the
     * current basis, so a canonical tableau stays canonical. `offset` is the constant term of the
     * objective.
     */
    pub fn set_objective(&mut self, costs: &[Rational], offset: Rational) -> Result<()> {
        if costs.len() != self.cols() - 2 {
            return Err(IlpError::MalformedTableau(format!(
                "{} objective coefficients for {} variable columns",
                costs.len(),
                self.cols() - 2
            ))
            .into());
        }
        let rhs = self.rhs();
        self.mat[[0, 0]] = Rational::one();
        for (j, cost) in costs.iter().enumerate() {
            self.mat[[0, j + 1]] = -cost;
        }
        self.mat[[0, rhs]] = Rational::zero();
        self.objective_offset = offset;
        if self.basis.is_some() {
            self.price_out_objective();
        }
        Ok(())
    }

    /// The value of every variable column in the current basic solution: the right-hand side of its row
    /// if it is basic, zero otherwise.
    pub fn get_symbolic_solution(&self) -> Vec<Rational> {
        let rhs = self.rhs();
        let mut solution = vec![Rational::zero(); self.cols() - 2];
        if let Some(basis) = &self.basis {
            for (i, col) in basis.iter().enumerate() {
                solution[col - 1] = self.mat[[i + 1, rhs]].clone();
            }
        }
        solution
    }

    /**
     * Brings the tableau into canonical basic feasible form. Returns false if the constraints are
     * infeasible.
     *
     * Rows with a negative right-hand side are negated. Every row that already owns a unit column keeps
     * it as its basic variable; the other rows receive an artificial variable and a phase-1 simplex
     * minimises the sum of the artificials. Rows that turn out to be redundant are removed. Calling this
     * on a canonical tableau changes nothing.
     */
    pub fn select_basic_vars(&mut self) -> Result<bool> {
        if self.is_canonical() {
            return Ok(true);
        }
        let rows = self.rows();
        let rhs = self.rhs();

        for r in 1..rows {
            if self.mat[[r, rhs]].is_negative() {
                self.mat.row_mut(r).iter_mut().for_each(|x| *x = -&*x);
            }
        }

        let mut basis: Vec<Option<usize>> = vec![None; rows - 1];
        let mut used = vec![false; rhs];
        for r in 1..rows {
            let unit = (1..rhs).find(|&c| {
                !used[c]
                    && self.mat[[r, c]].is_positive()
                    && (1..rows).all(|o| o == r || self.mat[[o, c]].is_zero())
            });
            if let Some(c) = unit {
                let factor = self.mat[[r, c]].recip()?;
                self.mat.row_mut(r).iter_mut().for_each(|x| *x *= &factor);
                used[c] = true;
                basis[r - 1] = Some(c);
            }
        }

        let missing = basis
            .iter()
            .enumerate()
            .filter(|(_, col)| col.is_none())
            .map(|(i, _)| i + 1)
            .collect::<Vec<_>>();

        if missing.is_empty() {
            self.basis = Some(basis.into_iter().flatten().collect());
        } else if !self.phase_one(basis, &missing)? {
            log::debug!("phase 1 found no feasible basis");
            return Ok(false);
        }

        self.price_out_objective();
        let basis = self.basis.as_deref().unwrap_or_default();
        self.check_basis(basis)?;
        Ok(true)
    }

    /**
     * Adds one artificial column per row in `missing`, minimises their sum, and copies the resulting
     * basis back. Returns false if the minimum is positive.
     */
    fn phase_one(&mut self, basis: Vec<Option<usize>>, missing: &[usize]) -> Result<bool> {
        let rows = self.rows();
        let rhs = self.rhs();
        let artificial_start = rhs;
        let aug_cols = self.cols() + missing.len();

        let mut aug = Array2::from_elem((rows, aug_cols), Rational::zero());
        for r in 1..rows {
            for c in 0..rhs {
                aug[[r, c]] = self.mat[[r, c]].clone();
            }
            aug[[r, aug_cols - 1]] = self.mat[[r, rhs]].clone();
        }
        aug[[0, 0]] = Rational::one();
        let mut aug_basis = basis;
        for (k, &r) in missing.iter().enumerate() {
            aug[[r, artificial_start + k]] = Rational::one();
            aug[[0, artificial_start + k]] = -Rational::one();
            aug_basis[r - 1] = Some(artificial_start + k);
        }

        let mut phase1 = Tableau {
            mat: aug,
            var_names: (1..aug_cols - 1).map(|j| format!("_a{}", j)).collect(),
            basis: Some(aug_basis.into_iter().flatten().collect()),
            objective_offset: Rational::zero(),
        };
        phase1.price_out_objective();
        log::trace!("phase 1 tableau with {} artificial variables", missing.len());

        match phase1.optimise(PivotPolicy::Bland, usize::MAX)? {
            TableauOutcome::Optimal => {}
            TableauOutcome::Unbounded => {
                return Err(IlpError::InternalInvariantViolation(
                    "phase 1 objective is bounded below by zero".to_string(),
                )
                .into());
            }
            TableauOutcome::Infeasible => return Ok(false),
        }
        if phase1.objective_value().is_positive() {
            return Ok(false);
        }

        //drive artificial variables at level zero out of the basis
        let mut redundant = vec![];
        for r in 1..rows {
            let basic = phase1.basic_column(r)?;
            if basic < artificial_start {
                continue;
            }
            match (1..artificial_start).find(|&c| !phase1.mat[[r, c]].is_zero()) {
                Some(c) => phase1.pivot(r, c)?,
                None => redundant.push(r),
            }
        }
        if !redundant.is_empty() {
            log::debug!("removing {} redundant constraint rows", redundant.len());
        }

        let kept_rows = (0..rows)
            .filter(|r| !redundant.contains(r))
            .collect::<Vec<_>>();
        let phase1_rhs = phase1.rhs();
        let objective = self.mat.row(0).to_owned();
        self.mat = Array2::from_shape_fn((kept_rows.len(), self.cols()), |(i, j)| {
            let r = kept_rows[i];
            match (r, j) {
                (0, _) => objective[j].clone(),
                (_, j) if j == rhs => phase1.mat[[r, phase1_rhs]].clone(),
                _ => phase1.mat[[r, j]].clone(),
            }
        });
        let phase1_basis = phase1.basis.unwrap_or_default();
        self.basis = Some(
            kept_rows
                .iter()
                .skip(1)
                .map(|r| phase1_basis[r - 1])
                .collect(),
        );
        Ok(true)
    }

    /**
     * Runs the primal simplex to optimality, canonicalising the tableau first if needed.
     *
     * Stops with `Optimal` when no variable column has a positive objective entry, and with `Unbounded`
     * when an improving column has no positive entry in any constraint row. Exceeding
     * `config.max_pivots` is reported as `Infeasible`.
     */
    pub fn make_optimal(&mut self, config: &SolverConfig) -> Result<TableauOutcome> {
        if !self.is_canonical() && !self.select_basic_vars()? {
            return Ok(TableauOutcome::Infeasible);
        }
        let outcome = self.optimise(config.pivot_policy, config.max_pivots)?;
        if outcome == TableauOutcome::Optimal {
            let basis = self.basis.as_deref().unwrap_or_default();
            self.check_basis(basis)?;
        }
        Ok(outcome)
    }

    fn optimise(&mut self, policy: PivotPolicy, max_pivots: usize) -> Result<TableauOutcome> {
        let mut pivots = 0usize;
        loop {
            let Some(col) = self.entering_column(policy) else {
                log::trace!("simplex optimal after {} pivots", pivots);
                return Ok(TableauOutcome::Optimal);
            };
            let Some(row) = self.leaving_row(col, policy)? else {
                log::trace!("column {} is unbounded", self.var_names[col - 1]);
                return Ok(TableauOutcome::Unbounded);
            };
            if pivots == max_pivots {
                log::warn!(
                    "simplex did not converge within {} pivots using {}",
                    max_pivots,
                    policy
                );
                return Ok(TableauOutcome::Infeasible);
            }
            self.pivot(row, col)?;
            pivots += 1;
        }
    }

    fn entering_column(&self, policy: PivotPolicy) -> Option<usize> {
        let mut candidates = (1..self.rhs()).filter(|&c| self.mat[[0, c]].is_positive());
        match policy {
            PivotPolicy::Bland => candidates.next(),
            PivotPolicy::Dantzig => candidates.fold(None, |best, c| match best {
                Some(b) if self.mat[[0, b]] >= self.mat[[0, c]] => Some(b),
                _ => Some(c),
            }),
        }
    }

    fn leaving_row(&self, col: usize, policy: PivotPolicy) -> Result<Option<usize>> {
        let rhs = self.rhs();
        let mut best: Option<(usize, Rational)> = None;
        for r in 1..self.rows() {
            let entry = &self.mat[[r, col]];
            if !entry.is_positive() {
                continue;
            }
            let ratio = self.mat[[r, rhs]].checked_div(entry)?;
            let better = match &best {
                None => true,
                Some((best_row, best_ratio)) => {
                    ratio < *best_ratio
                        || (ratio == *best_ratio
                            && policy == PivotPolicy::Bland
                            && self.basic_column(r)? < self.basic_column(*best_row)?)
                }
            };
            if better {
                best = Some((r, ratio));
            }
        }
        Ok(best.map(|(row, _)| row))
    }

    /**
     * Restores primal feasibility with the dual simplex, keeping the objective row optimal.
     *
     * The row with the most negative right-hand side leaves; the entering column minimises
     * `row0 / entry` over the negative entries of that row. A leaving row without negative entries
     * proves infeasibility.
     */
    pub fn restore_feasibility(&mut self, max_pivots: usize) -> Result<TableauOutcome> {
        if self.basis.is_none() {
            return Err(anyhow!("the dual simplex needs a canonical tableau"));
        }
        let rhs = self.rhs();
        for _ in 0..max_pivots {
            let leaving = (1..self.rows())
                .filter(|&r| self.mat[[r, rhs]].is_negative())
                .fold(None, |best: Option<usize>, r| match best {
                    Some(b) if self.mat[[b, rhs]] <= self.mat[[r, rhs]] => Some(b),
                    _ => Some(r),
                });
            let Some(row) = leaving else {
                return Ok(TableauOutcome::Optimal);
            };

            let mut best: Option<(usize, Rational)> = None;
            for c in 1..rhs {
                let entry = &self.mat[[row, c]];
                if entry.is_non_negative() {
                    continue;
                }
                let ratio = self.mat[[0, c]].checked_div(entry)?;
                if best.as_ref().is_none_or(|(_, best_ratio)| ratio < *best_ratio) {
                    best = Some((c, ratio));
                }
            }
            let Some((col, _)) = best else {
                log::trace!("dual simplex: row {} cannot become feasible", row);
                return Ok(TableauOutcome::Infeasible);
            };
            self.pivot(row, col)?;
        }
        log::warn!("dual simplex did not converge within {} pivots", max_pivots);
        Ok(TableauOutcome::Infeasible)
    }

    /// The lowest constraint row whose basic variable is one of `columns` and has a fractional value.
    pub fn first_fractional_row(&self, columns: std::ops::Range<usize>) -> Option<usize> {
        let rhs = self.rhs();
        let basis = self.basis.as_deref()?;
        basis
            .iter()
            .enumerate()
            .find(|(i, col)| columns.contains(*col) && !self.mat[[i + 1, rhs]].is_integer())
            .map(|(i, _)| i + 1)
    }

    /**
     * Appends the Gomory fractional cut of `row` as a new constraint row with its own slack column.
     *
     * For the row `x_B + Σ a_j·x_j = b` the cut is `Σ frac(a_j)·x_j >= frac(b)`, stored as
     * `-Σ frac(a_j)·x_j + s = -frac(b)`. It holds for every point in which all variables are integral,
     * but cuts off the current basic solution, which leaves the tableau primal infeasible; call
     * [`Tableau::restore_feasibility`] afterwards.
     */
    pub fn add_gomory_cut(&mut self, row: usize) -> Result<()> {
        let Some(basis) = &self.basis else {
            return Err(anyhow!("cuts can only be derived from a canonical tableau"));
        };
        if row == 0 || row >= self.rows() {
            return Err(anyhow!("row {} is not a constraint row", row));
        }
        let rows = self.rows();
        let rhs = self.rhs();
        let cut_col = rhs;
        let cut_count = self.var_names.iter().filter(|n| n.starts_with("_cut_")).count();

        let mat = &self.mat;
        let extended = Array2::from_shape_fn((rows + 1, rhs + 2), |(i, j)| {
            match (i == rows, j) {
                (false, j) if j < cut_col => mat[[i, j]].clone(),
                (false, j) if j == cut_col => Rational::zero(),
                (false, _) => mat[[i, rhs]].clone(),
                (true, 0) => Rational::zero(),
                (true, j) if j < cut_col => -mat[[row, j]].fract(),
                (true, j) if j == cut_col => Rational::one(),
                (true, _) => -mat[[row, rhs]].fract(),
            }
        });
        let mut basis = basis.clone();
        basis.push(cut_col);

        log::trace!(
            "cut {} from row {} with right-hand side {}",
            cut_count,
            row,
            self.mat[[row, rhs]]
        );
        self.mat = extended;
        self.basis = Some(basis);
        self.var_names.push(format!("_cut_{}", cut_count));
        Ok(())
    }

    fn basic_column(&self, row: usize) -> Result<usize> {
        self.basis
            .as_ref()
            .and_then(|basis| basis.get(row - 1))
            .copied()
            .ok_or_else(|| {
                IlpError::InternalInvariantViolation(format!("row {} has no basic variable", row))
                    .into()
            })
    }

    /// Makes `col` basic in `row`: scales the row to a unit pivot and eliminates the column elsewhere.
    fn pivot(&mut self, row: usize, col: usize) -> Result<()> {
        let pivot = self.mat[[row, col]].clone();
        if pivot.is_zero() {
            return Err(IlpError::InternalInvariantViolation(format!(
                "pivot on a zero entry at ({}, {})",
                row, col
            ))
            .into());
        }
        log::trace!(
            "pivot on row {} column {} ({})",
            row,
            col,
            self.var_names[col - 1]
        );
        let factor = pivot.recip()?;
        self.mat.row_mut(row).iter_mut().for_each(|x| *x *= &factor);

        let pivot_row = self.mat.row(row).to_owned();
        for r in 0..self.rows() {
            if r == row {
                continue;
            }
            let factor = self.mat[[r, col]].clone();
            if factor.is_zero() {
                continue;
            }
            for (x, p) in self.mat.row_mut(r).iter_mut().zip(pivot_row.iter()) {
                *x -= &factor * p;
            }
        }

        match self.basis.as_mut().and_then(|basis| basis.get_mut(row - 1)) {
            Some(basic) => *basic = col,
            None => {
                return Err(IlpError::InternalInvariantViolation(format!(
                    "pivot row {} has no basic variable",
                    row
                ))
                .into());
            }
        }
        Ok(())
    }

    fn price_out_objective(&mut self) {
        let Some(basis) = self.basis.clone() else {
            return;
        };
        for (i, col) in basis.into_iter().enumerate() {
            let factor = self.mat[[0, col]].clone();
            if factor.is_zero() {
                continue;
            }
            let row = self.mat.row(i + 1).to_owned();
            for (x, p) in self.mat.row_mut(0).iter_mut().zip(row.iter()) {
                *x -= &factor * p;
            }
        }
    }

    fn check_basis(&self, basis: &[usize]) -> Result<()> {
        let rows = self.rows();
        let rhs = self.rhs();
        if basis.len() != rows - 1 {
            return Err(IlpError::InternalInvariantViolation(format!(
                "{} basic variables for {} constraint rows",
                basis.len(),
                rows - 1
            ))
            .into());
        }
        for (i, &col) in basis.iter().enumerate() {
            if col == 0 || col >= rhs {
                return Err(IlpError::InternalInvariantViolation(format!(
                    "basic column {} is not a variable column",
                    col
                ))
                .into());
            }
            let unit = (0..rows).all(|r| {
                if r == i + 1 {
                    self.mat[[r, col]].is_one()
                } else {
                    self.mat[[r, col]].is_zero()
                }
            });
            if !unit {
                return Err(IlpError::InternalInvariantViolation(format!(
                    "basic column {} of row {} is not a unit column",
                    self.var_names[col - 1],
                    i + 1
                ))
                .into());
            }
            if self.mat[[i + 1, rhs]].is_negative() {
                return Err(IlpError::InternalInvariantViolation(format!(
                    "row {} has a negative right-hand side",
                    i + 1
                ))
                .into());
            }
        }
        Ok(())
    }
}

impl Display for Tableau {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[{}]", self.var_names.iter().join(", "))?;
        for row in self.mat.rows() {
            writeln!(f, "[{}]", row.iter().join(", "))?;
        }
        Ok(())
    }
}
