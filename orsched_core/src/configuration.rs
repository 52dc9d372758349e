//! Process wide defaults used when building solver settings
use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

pub struct Configuration {
    /// Reduced costs must be below `-tolerance` for a column to count as improving
    pub tolerance: f64,
    /// Maximum number of master/pricing rounds in column generation
    pub max_iterations: usize,
    /// Maximum number of search nodes a single pricing call may expand
    pub max_pricing_nodes: usize,
    /// Backend used by [`default_solver`](crate::optimize::solvers::default_solver)
    pub solver: SolverChoice,
    /// Wall clock limit handed to the backend, in seconds
    pub solver_time_limit: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            tolerance: 1e-6,
            max_iterations: 200,
            max_pricing_nodes: 1_000_000,
            solver: SolverChoice::Clarabel,
            solver_time_limit: f64::INFINITY,
        }
    }
}

/// Enum used to specify the default solver to use
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolverChoice {
    /// Clarabel for LP relaxations, microlp for integer programs
    Clarabel,
    /// Use HiGHS for everything, requires the highs feature to be enabled
    Highs,
}

/// Read the current tolerance, falling back to the default if the lock is poisoned
pub(crate) fn tolerance() -> f64 {
    CONFIGURATION
        .read()
        .map(|c| c.tolerance)
        .unwrap_or_else(|_| Configuration::default().tolerance)
}

pub(crate) fn max_iterations() -> usize {
    CONFIGURATION
        .read()
        .map(|c| c.max_iterations)
        .unwrap_or_else(|_| Configuration::default().max_iterations)
}

pub(crate) fn max_pricing_nodes() -> usize {
    CONFIGURATION
        .read()
        .map(|c| c.max_pricing_nodes)
        .unwrap_or_else(|_| Configuration::default().max_pricing_nodes)
}

pub(crate) fn solver_choice() -> SolverChoice {
    CONFIGURATION
        .read()
        .map(|c| c.solver)
        .unwrap_or(SolverChoice::Clarabel)
}

pub(crate) fn solver_time_limit() -> f64 {
    CONFIGURATION
        .read()
        .map(|c| c.solver_time_limit)
        .unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Configuration::default();
        assert!((config.tolerance - 1e-6).abs() < 1e-15);
        assert_eq!(config.max_iterations, 200);
        assert_eq!(config.solver, SolverChoice::Clarabel);
        assert!(config.solver_time_limit.is_infinite());
    }
}
