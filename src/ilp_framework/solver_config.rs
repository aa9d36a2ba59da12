use std::fmt::Display;

/// Rule used by the primal simplex to choose the entering and leaving variables.
///
/// - `Dantzig`: the entering column is the one with the largest improving reduced cost (ties: lowest
///   column); the leaving row is the minimum ratio (ties: lowest row). Usually few pivots, but it can
///   cycle on degenerate tableaux, so the pivot cap is what guarantees termination.
/// - `Bland`: the entering column is the lowest-index improving column; the leaving row is the minimum
///   ratio with ties broken by the lowest basic column. Never cycles.
///
/// Both rules reach the same optimal objective value on any feasible bounded tableau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotPolicy {
    #[default]
    Dantzig,
    Bland,
}

impl Display for PivotPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PivotPolicy::Dantzig => write!(f, "Dantzig"),
            PivotPolicy::Bland => write!(f, "Bland"),
        }
    }
}

pub const DEFAULT_MAX_PIVOTS: usize = 10_000;
pub const DEFAULT_MAX_CUTS: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    pub pivot_policy: PivotPolicy,

    /// Upper bound on the pivots of a single simplex run. Reaching it is reported as infeasible.
    pub max_pivots: usize,

    /// Upper bound on the cutting planes added while recovering an integer solution.
    pub max_cuts: usize,
}

impl SolverConfig {
    pub fn with_pivot_policy(mut self, pivot_policy: PivotPolicy) -> Self {
        self.pivot_policy = pivot_policy;
        self
    }

    pub fn with_max_pivots(mut self, max_pivots: usize) -> Self {
        self.max_pivots = max_pivots;
        self
    }

    pub fn with_max_cuts(mut self, max_cuts: usize) -> Self {
        self.max_cuts = max_cuts;
        self
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            pivot_policy: PivotPolicy::default(),
            max_pivots: DEFAULT_MAX_PIVOTS,
            max_cuts: DEFAULT_MAX_CUTS,
        }
    }
}
