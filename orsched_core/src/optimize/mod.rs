//! Module for constructing and solving optimization problems

pub mod constraint;
pub mod objective;
pub mod problem;
pub mod solvers;
pub mod variable;

use serde::{Deserialize, Serialize};

use crate::optimize::constraint::ConstraintIndex;
use crate::optimize::solvers::SolverError;
use crate::optimize::variable::VariableIndex;

/// Struct representing the solution to an optimization problem
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Optimized value of the objective
    ///
    /// Some(f64) if the optimization was completed successfully, None otherwise
    pub objective_value: Option<f64>,
    /// Values of the variables at the optimum,
    ///
    /// Some(Vec), indexed by [`VariableIndex`], if the problem could be solved, None otherwise
    pub variable_values: Option<Vec<f64>>,
    /// Values of the dual variables at the optimum
    ///
    /// Some(Vec), indexed by [`ConstraintIndex`], if the problem could be solved and the solver
    /// supports retrieving the dual values, None otherwise. Each value is the rate of change of
    /// the optimal objective per unit increase of the constraint's binding bound.
    pub dual_values: Option<Vec<f64>>,
}

impl ProblemSolution {
    /// A solution carrying only a status, used for every outcome other than Optimal
    pub fn without_values(status: OptimizationStatus) -> Self {
        Self {
            status,
            objective_value: None,
            variable_values: None,
            dual_values: None,
        }
    }

    /// Whether the problem was solved to optimality
    pub fn is_optimal(&self) -> bool {
        self.status == OptimizationStatus::Optimal
    }

    /// Value of a variable at the optimum, None if no values are available
    pub fn value(&self, variable: VariableIndex) -> Option<f64> {
        self.variable_values
            .as_ref()
            .and_then(|values| values.get(variable.0).copied())
    }

    /// Dual value of a constraint
    ///
    /// Fails with [`SolverError::DualValuesUnavailable`] when the backend did not report duals and
    /// with [`SolverError::UnknownConstraint`] when the index is outside the solved problem, so a
    /// legitimately zero dual is never confused with a missing one.
    pub fn dual(&self, constraint: ConstraintIndex) -> Result<f64, SolverError> {
        let duals = self
            .dual_values
            .as_ref()
            .ok_or(SolverError::DualValuesUnavailable)?;
        duals
            .get(constraint.0)
            .copied()
            .ok_or(SolverError::UnknownConstraint(constraint.0))
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationStatus {
    /// Problem has been optimized
    Optimal,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// The solver stopped without a verdict, e.g. it hit its time or iteration limit
    NotSolved,
}
