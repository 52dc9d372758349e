//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Position of a variable inside a [`Problem`](crate::optimize::problem::Problem)
///
/// Indices are handed out in insertion order and never reused
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableIndex(pub usize);

#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Variable {
    /// Used to identify the variable
    #[builder(setter(into))]
    pub id: String,
    /// Domain of the variable, see [`VariableType`]
    #[builder(default = "VariableType::Continuous")]
    pub variable_type: VariableType,
    /// Lowest value the variable can take
    #[builder(default = "0.0")]
    pub lower_bound: f64,
    /// Highest value the variable can take
    #[builder(default = "f64::INFINITY")]
    pub upper_bound: f64,
    /// Position of the variable in its problem, set when the variable is added
    #[builder(default = "VariableIndex(0)")]
    pub(crate) index: VariableIndex,
}

impl Variable {
    /// Index of this variable in the problem it belongs to
    pub fn index(&self) -> VariableIndex {
        self.index
    }

    /// Whether the variable has to take an integral value
    pub fn is_integral(&self) -> bool {
        matches!(
            self.variable_type,
            VariableType::Integer | VariableType::Binary
        )
    }

    /// Bounds of the variable, with binary variables clamped to [0, 1]
    pub fn effective_bounds(&self) -> (f64, f64) {
        match self.variable_type {
            VariableType::Binary => (self.lower_bound.max(0.), self.upper_bound.min(1.)),
            _ => (self.lower_bound, self.upper_bound),
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.id, self.variable_type)
    }
}

/// Represents the type of variable in an optimization problem
///
/// # Notes:
/// Not all variable types are supported for all solvers, currently Clarabel only supports
/// Continuous variables, while microlp and HiGHS support all types
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq, Serialize, Deserialize)]
pub enum VariableType {
    /// Continuous variable
    Continuous,
    /// Integer variable
    Integer,
    /// Binary Variable
    Binary,
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "CONTINUOUS"),
            VariableType::Integer => write!(f, "INTEGER"),
            VariableType::Binary => write!(f, "BINARY"),
        }
    }
}
