//! Provides struct for representing an optimization problem's objective
use serde::{Deserialize, Serialize};

use crate::optimize::variable::VariableIndex;

/// Represents the Objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    terms: Vec<ObjectiveTerm>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            sense,
        }
    }

    /// Sense of the objective
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Add a new linear term to the objective
    pub fn add_linear_term(&mut self, variable: VariableIndex, coefficient: f64) {
        self.terms.push(ObjectiveTerm {
            variable,
            coefficient,
        });
    }

    /// Terms currently in the objective
    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Dense coefficient vector over `num_variables` variables, summing repeated terms
    pub fn coefficients(&self, num_variables: usize) -> Vec<f64> {
        let mut c = vec![0.; num_variables];
        for term in &self.terms {
            c[term.variable.0] += term.coefficient;
        }
        c
    }

    /// Evaluate the objective at the given variable values
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|t| t.coefficient * values[t.variable.0])
            .sum()
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

/// A linear term in the objective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveTerm {
    /// Variable in objective term
    pub variable: VariableIndex,
    /// Coefficient for linear term
    pub coefficient: f64,
}
