//! Provides struct representing an optimization problem
use crate::optimize::constraint::{Constraint, ConstraintIndex};
use crate::optimize::objective::{Objective, ObjectiveSense};
use crate::optimize::variable::{Variable, VariableBuilder, VariableIndex, VariableType};
use indexmap::IndexMap;
use thiserror::Error;

/// A linear optimization problem
///
/// Variables and constraints are append only, so the indices handed out when adding them stay
/// valid for the lifetime of the problem.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem, keyed by id, in index order
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem, in index order
    constraints: Vec<Constraint>,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: Vec::new(),
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Adding Variables
    /// Add a variable to the optimization problem, returning its index
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<VariableIndex, ProblemError> {
        // Validate that the variable can in fact be added to the problem
        self.validate_variable(&variable)?;
        let index = VariableIndex(self.variables.len());
        variable.index = index;
        self.variables.insert(variable.id.clone(), variable);
        Ok(index)
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<VariableIndex, ProblemError> {
        let new_var = VariableBuilder::default()
            .id(id)
            .variable_type(variable_type)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .build()
            .map_err(|e| ProblemError::VariableBuild(e.to_string()))?;
        self.add_variable(new_var)
    }

    /// Create a new binary variable and add it to the problem
    pub fn add_new_binary_variable(&mut self, id: &str) -> Result<VariableIndex, ProblemError> {
        self.add_new_variable(id, VariableType::Binary, 0., 1.)
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem, returning its index
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<ConstraintIndex, ProblemError> {
        self.validate_constraint(&constraint)?;
        let index = ConstraintIndex(self.constraints.len());
        self.constraints.push(constraint);
        Ok(index)
    }

    /// Create a new equality constraint and add it to the model
    pub fn add_new_equality_constraint(
        &mut self,
        id: &str,
        terms: &[(VariableIndex, f64)],
        equals: f64,
    ) -> Result<ConstraintIndex, ProblemError> {
        self.add_constraint(Constraint::new_equality(id, terms, equals))
    }

    /// Create a new inequality constraint and add it to the model
    pub fn add_new_inequality_constraint(
        &mut self,
        id: &str,
        terms: &[(VariableIndex, f64)],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<ConstraintIndex, ProblemError> {
        self.add_constraint(Constraint::new_inequality(
            id,
            terms,
            lower_bound,
            upper_bound,
        ))
    }
    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new linear term to the objective
    pub fn add_new_linear_objective_term(
        &mut self,
        variable: VariableIndex,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if variable.0 >= self.variables.len() {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        self.objective.add_linear_term(variable, coefficient);
        Ok(())
    }
    // endregion Adding Objective Terms

    // region Accessors
    /// Objective of the problem
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Variables in index order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Constraints in index order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Current number of variables in the model
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Current number of constraints in the model
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
    // endregion Accessors

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        // Check if there is already a variable with this id
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        // Check if the variable bounds are valid
        if variable.lower_bound > variable.upper_bound
            || variable.lower_bound.is_nan()
            || variable.upper_bound.is_nan()
        {
            return Err(ProblemError::InvalidVariableBounds);
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        // Check that for inequality constraints the bounds make sense
        let (lower_bound, upper_bound) = constraint.get_bounds();
        if lower_bound > upper_bound || lower_bound.is_nan() || upper_bound.is_nan() {
            return Err(ProblemError::InvalidConstraintBounds);
        }
        // Check that the variables in this constraint are in the model
        if constraint
            .get_terms()
            .iter()
            .any(|t| t.variable.0 >= self.variables.len())
        {
            return Err(ProblemError::NonExistentVariablesInConstraint);
        }
        Ok(())
    }
    // endregion Validation Functions

    // region Check Problem
    /// Whether any variable must take integral values
    pub fn has_integer_variables(&self) -> bool {
        self.variables.values().any(|v| v.is_integral())
    }
    // endregion Check Problem
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add a variable with the same id as an existing variable: {0}")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to add a variable with lower_bound>upper_bound")]
    InvalidVariableBounds,
    /// Error when the variable builder rejects its inputs
    #[error("Failed to build variable: {0}")]
    VariableBuild(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add an inequality constraint with lower_bound > upper_bound")]
    InvalidConstraintBounds,
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Tried to add a constraint with variables not in the model")]
    NonExistentVariablesInConstraint,
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variables not in the model")]
    NonExistentVariablesInObjective,
}
