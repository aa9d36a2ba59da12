pub mod math {
    pub mod traits;
    pub mod rational;
    pub mod polynomial;
}
pub mod ilp_objects {
    pub mod range_constraint;
    pub mod ilp_result;
}
pub mod ilp_framework {
    pub mod ilp_error;
    pub mod solver_config;
}
pub mod optimisation_algorithms {
    pub mod tableau;
    pub mod ilp_solver;
}

pub use ilp_framework::{
    ilp_error::IlpError,
    solver_config::{PivotPolicy, SolverConfig},
};
pub use ilp_objects::{
    ilp_result::{IlpOutcome, IlpResult},
    range_constraint::RangeConstraint,
};
pub use math::{polynomial::Polynomial, rational::Rational};
pub use optimisation_algorithms::{
    ilp_solver::IlpSolver,
    tableau::{Tableau, TableauOutcome},
};
