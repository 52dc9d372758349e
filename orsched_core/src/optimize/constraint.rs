//! Provides struct for representing a constraint in an optimization problem
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::optimize::variable::VariableIndex;

/// Position of a constraint inside a [`Problem`](crate::optimize::problem::Problem)
///
/// This is the structural key dual values are reported against. It does not depend on the
/// constraint's display id, so callers can keep their own map from domain keys to indices.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintIndex(pub usize);

/// Represents a linear constraint in an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Human readable identifier
        id: String,
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint, `lower_bound` <= `terms` <= `upper_bound`
    ///
    /// Either bound may be infinite, which leaves that side unconstrained
    Inequality {
        /// Human readable identifier
        id: String,
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The lowest value the sum of the terms can take
        lower_bound: f64,
        /// The highest value the sum of the terms can take
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint
    ///
    /// # Parameters
    /// - `id`: Identifier for the constraint
    /// - `terms`: Slice of (variable, coefficient) pairs
    /// - `equals`: The right hand side of the equality
    ///
    /// # Examples
    /// ```rust
    /// use orsched_core::optimize::constraint::Constraint;
    /// use orsched_core::optimize::variable::VariableIndex;
    /// // Create a constraint representing 3*x + 2*y = 6
    /// let c = Constraint::new_equality("c", &[(VariableIndex(0), 3.), (VariableIndex(1), 2.)], 6.);
    /// assert_eq!(c.get_terms().len(), 2);
    /// ```
    pub fn new_equality(id: &str, terms: &[(VariableIndex, f64)], equals: f64) -> Self {
        Constraint::Equality {
            id: id.to_string(),
            terms: Constraint::into_terms(terms),
            equals,
        }
    }

    /// Create a new inequality constraint
    ///
    /// # Parameters
    /// - `id`: Identifier for the constraint
    /// - `terms`: Slice of (variable, coefficient) pairs
    /// - `lower_bound`: The lowest value the constraint can take
    /// - `upper_bound`: The highest value the constraint can take
    ///
    /// # Examples
    /// ```rust
    /// use orsched_core::optimize::constraint::Constraint;
    /// use orsched_core::optimize::variable::VariableIndex;
    /// // represents the inequality x + y >= 1
    /// let c = Constraint::new_inequality(
    ///     "cover",
    ///     &[(VariableIndex(0), 1.), (VariableIndex(1), 1.)],
    ///     1.,
    ///     f64::INFINITY,
    /// );
    /// assert_eq!(c.get_id(), "cover");
    /// ```
    pub fn new_inequality(
        id: &str,
        terms: &[(VariableIndex, f64)],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Constraint::Inequality {
            id: id.to_string(),
            terms: Constraint::into_terms(terms),
            lower_bound,
            upper_bound,
        }
    }

    /// Identifier of the constraint
    pub fn get_id(&self) -> &str {
        match self {
            Constraint::Equality { id, .. } | Constraint::Inequality { id, .. } => id,
        }
    }

    /// Terms of the constraint
    pub fn get_terms(&self) -> &[ConstraintTerm] {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// Bounds of the constraint as (lower, upper), equal for equality constraints
    pub fn get_bounds(&self) -> (f64, f64) {
        match self {
            Constraint::Equality { equals, .. } => (*equals, *equals),
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => (*lower_bound, *upper_bound),
        }
    }

    fn into_terms(terms: &[(VariableIndex, f64)]) -> Vec<ConstraintTerm> {
        terms
            .iter()
            .map(|&(variable, coefficient)| ConstraintTerm {
                variable,
                coefficient,
            })
            .collect()
    }

    /// Convert a slice of terms into a String representation
    fn terms_to_string(terms: &[ConstraintTerm]) -> String {
        if terms.is_empty() {
            return "0".to_string();
        }
        terms
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Equality { id, terms, equals } => {
                write!(f, "{}: {} = {}", id, Self::terms_to_string(terms), equals)
            }
            Constraint::Inequality {
                id,
                terms,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "{}: {} <= {} <= {}",
                id,
                lower_bound,
                Self::terms_to_string(terms),
                upper_bound
            ),
        }
    }
}

/// Represents a single term in a constraint, specifically
/// represents the multiplication of the `variable` by the `coefficient`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintTerm {
    /// Index of the variable
    pub variable: VariableIndex,
    /// The coefficient for the variable
    pub coefficient: f64,
}

impl Display for ConstraintTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*x{}", self.coefficient, self.variable.0)
    }
}
