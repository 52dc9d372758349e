//! Room assignment models built on the conflict graph and solved through a [`Solver`]
//!
//! [`Solver`]: crate::optimize::solvers::Solver

pub mod column_generation;
pub mod covering;
pub mod direct;
pub mod pricing;
pub mod verification;

use thiserror::Error;

use crate::model::ModelError;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::SolverError;

/// Error type of every solve entry point in this module
///
/// Solver outcomes such as Infeasible are not errors, they are reported through the status of
/// the returned result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    /// Invalid input data
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The optimization problem could not be assembled
    #[error(transparent)]
    Problem(#[from] ProblemError),
    /// The backend rejected the problem or its solution is missing data
    #[error(transparent)]
    Solver(#[from] SolverError),
}
