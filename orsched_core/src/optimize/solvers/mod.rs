//! Backends which solve a [`Problem`], and the trait they implement
//!
//! Every model in this crate is handed to a `&dyn Solver`, so backends can be swapped freely.
//! [`default_solver`] picks one according to the global configuration.
pub mod clarabel;
#[cfg(feature = "highs")]
pub mod highs;
pub mod microlp;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::configuration::{self, SolverChoice};
use crate::optimize::constraint::Constraint;
use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;

pub use self::clarabel::ClarabelSolver;
pub use self::microlp::MicrolpSolver;

/// A solver backend able to optimize a linear [`Problem`]
pub trait Solver {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Whether the backend can handle Integer and Binary variables
    fn integer_variable_capable(&self) -> bool;

    /// Whether the backend reports dual values for continuous problems
    fn dual_values_capable(&self) -> bool;

    /// Solve the problem
    ///
    /// Infeasible, unbounded and unfinished solves are reported through the
    /// [`OptimizationStatus`](crate::optimize::OptimizationStatus) of the returned solution,
    /// errors are reserved for problems the backend cannot accept at all.
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;
}

/// Routes continuous problems to one backend and mixed integer problems to another
pub struct CompositeSolver {
    continuous: Box<dyn Solver>,
    mixed_integer: Box<dyn Solver>,
}

impl CompositeSolver {
    pub fn new(continuous: Box<dyn Solver>, mixed_integer: Box<dyn Solver>) -> Self {
        Self {
            continuous,
            mixed_integer,
        }
    }

    /// Clarabel for LP relaxations (it reports duals), microlp for integer programs
    pub fn clarabel_microlp() -> Self {
        Self::new(
            Box::new(ClarabelSolver::default()),
            Box::new(MicrolpSolver::default()),
        )
    }
}

impl Solver for CompositeSolver {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn integer_variable_capable(&self) -> bool {
        self.mixed_integer.integer_variable_capable()
    }

    fn dual_values_capable(&self) -> bool {
        self.continuous.dual_values_capable()
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let backend = if problem.has_integer_variables() {
            &self.mixed_integer
        } else {
            &self.continuous
        };
        debug!(
            backend = backend.name(),
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "dispatching problem"
        );
        backend.solve(problem)
    }
}

/// Create the solver selected by the global configuration
pub fn default_solver() -> Result<Box<dyn Solver>, SolverError> {
    match configuration::solver_choice() {
        SolverChoice::Clarabel => Ok(Box::new(CompositeSolver::clarabel_microlp())),
        SolverChoice::Highs => highs_backend(),
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "highs")] {
        fn highs_backend() -> Result<Box<dyn Solver>, SolverError> {
            Ok(Box::new(self::highs::HighsSolver::default()))
        }
    } else {
        fn highs_backend() -> Result<Box<dyn Solver>, SolverError> {
            Err(SolverError::FeatureNotEnabled("highs"))
        }
    }
}

/// Terms of a constraint as (variable position, coefficient), with repeated variables summed
/// and zero coefficients dropped
pub(crate) fn merged_terms(constraint: &Constraint) -> Vec<(usize, f64)> {
    let mut merged: IndexMap<usize, f64> = IndexMap::new();
    for term in constraint.get_terms() {
        *merged.entry(term.variable.0).or_insert(0.) += term.coefficient;
    }
    merged.into_iter().filter(|(_, c)| *c != 0.).collect()
}

/// A constraint without terms whose bounds exclude zero can never be satisfied
pub(crate) fn has_unsatisfiable_empty_row(problem: &Problem) -> bool {
    problem.constraints().iter().any(|c| {
        let (lower_bound, upper_bound) = c.get_bounds();
        merged_terms(c).is_empty() && (lower_bound > 0. || upper_bound < 0.)
    })
}

/// Errors raised by solver backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The backend can't represent a variable of this type
    #[error("Solver {solver} does not support the type of variable {variable}")]
    UnsupportedVariableType {
        solver: &'static str,
        variable: String,
    },
    /// The solution carries no dual values
    #[error("Dual values are not available for this solution")]
    DualValuesUnavailable,
    /// A dual value was requested for a constraint that isn't in the solved problem
    #[error("No constraint with index {0} in the solved problem")]
    UnknownConstraint(usize),
    /// The selected backend needs a cargo feature that wasn't enabled
    #[error("Solver requires the {0} feature to be enabled")]
    FeatureNotEnabled(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::variable::VariableIndex;
    use crate::optimize::OptimizationStatus;

    #[test]
    fn merged_terms_sum_duplicates() {
        let c = Constraint::new_inequality(
            "c",
            &[
                (VariableIndex(1), 1.),
                (VariableIndex(0), 2.),
                (VariableIndex(1), -1.),
                (VariableIndex(0), 1.),
            ],
            0.,
            1.,
        );
        assert_eq!(merged_terms(&c), vec![(0, 3.)]);
    }

    #[test]
    fn empty_row_detection() {
        let mut problem = Problem::new_minimization();
        problem.add_new_binary_variable("x").unwrap();
        problem
            .add_new_inequality_constraint("ok", &[], f64::NEG_INFINITY, 1.)
            .unwrap();
        assert!(!has_unsatisfiable_empty_row(&problem));
        problem
            .add_new_inequality_constraint("cover", &[], 1., f64::INFINITY)
            .unwrap();
        assert!(has_unsatisfiable_empty_row(&problem));
    }

    #[test]
    fn composite_routes_on_integer_variables() {
        let solver = CompositeSolver::clarabel_microlp();
        assert!(solver.integer_variable_capable());
        assert!(solver.dual_values_capable());

        // min x + y, x + y >= 1, binary
        let mut problem = Problem::new_minimization();
        let x = problem.add_new_binary_variable("x").unwrap();
        let y = problem.add_new_binary_variable("y").unwrap();
        problem.add_new_linear_objective_term(x, 1.).unwrap();
        problem.add_new_linear_objective_term(y, 2.).unwrap();
        problem
            .add_new_inequality_constraint("cover", &[(x, 1.), (y, 1.)], 1., f64::INFINITY)
            .unwrap();
        let solution = solver.solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 1.).abs() < 1e-6);
        assert!(solution.dual_values.is_none());
    }

    #[test]
    fn default_solver_follows_configuration() {
        let solver = default_solver().unwrap();
        assert_eq!(solver.name(), "composite");
    }
}
