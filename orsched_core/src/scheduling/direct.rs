//! Direct operation to resource assignment model
//!
//! One binary variable `x(op, res)` per usable pair. Every operation takes exactly one resource
//! and, per resource, each conflicting pair may use it at most once:
//!
//! ```text
//! min  sum cost(op, res) * x(op, res)
//! s.t. sum_res x(op, res) = 1                 for every op
//!      x(i, res) + x(j, res) <= 1             for every res, every conflicting (i, j)
//! ```
//!
//! The model is exact but grows with conflicts times resources, see
//! [`covering`](crate::scheduling::covering) for the schedule based alternative.
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conflict::ConflictGraph;
use crate::model::cost::CostModel;
use crate::model::operation::OperationId;
use crate::model::resource::ResourceId;
use crate::model::ModelError;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::optimize::variable::VariableIndex;
use crate::optimize::OptimizationStatus;
use crate::scheduling::SchedulingError;

/// How a pair without an entry in the cost table is treated
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingCostPolicy {
    /// Fail with [`ModelError::MissingCost`]
    #[default]
    Reject,
    /// The operation can't use that resource, no variable is created for the pair
    Forbid,
}

/// Outcome of a direct assignment solve
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub status: OptimizationStatus,
    /// Total cost, Some only when Optimal
    pub objective_value: Option<f64>,
    /// Resource of each operation, Some only when Optimal
    pub assignment: Option<IndexMap<OperationId, ResourceId>>,
}

impl AssignmentResult {
    fn without_assignment(status: OptimizationStatus) -> Self {
        Self {
            status,
            objective_value: None,
            assignment: None,
        }
    }

    /// Number of distinct resources the assignment uses
    pub fn resources_used(&self) -> usize {
        self.assignment
            .as_ref()
            .map(|a| a.values().collect::<IndexSet<_>>().len())
            .unwrap_or(0)
    }
}

/// The assembled problem plus the pair each variable stands for
#[derive(Clone, Debug)]
pub struct DirectModel {
    pub problem: Problem,
    pub variables: IndexMap<(OperationId, ResourceId), VariableIndex>,
    /// Usable resources of each operation with their variables, in graph order
    pub by_operation: Vec<Vec<(ResourceId, VariableIndex)>>,
    /// Operations left without any usable resource
    pub stranded: Vec<OperationId>,
}

pub struct DirectAssignmentSolver<'a> {
    graph: &'a ConflictGraph,
    costs: &'a CostModel,
    resources: Vec<ResourceId>,
    policy: MissingCostPolicy,
}

impl<'a> DirectAssignmentSolver<'a> {
    /// Create a solver over every operation in `graph`, repeated resources are ignored
    pub fn new(graph: &'a ConflictGraph, costs: &'a CostModel, resources: &[ResourceId]) -> Self {
        let resources: IndexSet<ResourceId> = resources.iter().cloned().collect();
        Self {
            graph,
            costs,
            resources: resources.into_iter().collect(),
            policy: MissingCostPolicy::default(),
        }
    }

    pub fn with_missing_cost_policy(mut self, policy: MissingCostPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble the binary program without solving it
    ///
    /// # Errors
    /// [`ModelError::MissingCost`] under [`MissingCostPolicy::Reject`] for the first pair that
    /// has no cost, or a [`ProblemError`](crate::optimize::problem::ProblemError) if the
    /// problem can't be assembled.
    pub fn build(&self) -> Result<DirectModel, SchedulingError> {
        let mut problem = Problem::new_minimization();
        let mut variables: IndexMap<(OperationId, ResourceId), VariableIndex> = IndexMap::new();
        let mut by_operation: Vec<Vec<(ResourceId, VariableIndex)>> =
            vec![Vec::new(); self.graph.len()];
        // x per operation, per resource position
        let mut grid: Vec<Vec<Option<VariableIndex>>> =
            vec![vec![None; self.resources.len()]; self.graph.len()];

        for (i, op) in self.graph.ids().enumerate() {
            for (r, res) in self.resources.iter().enumerate() {
                let cost = match self.costs.cost(op, res) {
                    Ok(cost) => cost,
                    Err(ModelError::MissingCost { .. })
                        if self.policy == MissingCostPolicy::Forbid =>
                    {
                        continue
                    }
                    Err(e) => return Err(e.into()),
                };
                let x = problem.add_new_binary_variable(&format!("x_{}_{}", i, r))?;
                problem.add_new_linear_objective_term(x, cost)?;
                grid[i][r] = Some(x);
                by_operation[i].push((res.clone(), x));
                variables.insert((op.clone(), res.clone()), x);
            }
        }

        let mut stranded = Vec::new();
        for (i, op) in self.graph.ids().enumerate() {
            let terms: Vec<(VariableIndex, f64)> =
                by_operation[i].iter().map(|&(_, x)| (x, 1.)).collect();
            if terms.is_empty() {
                stranded.push(op.clone());
            }
            problem.add_new_equality_constraint(&format!("assign_{}", i), &terms, 1.)?;
        }

        for (r, _) in self.resources.iter().enumerate() {
            for (a, b) in self.graph.conflicting_pairs() {
                let (Some(i), Some(j)) = (self.graph.index_of(a), self.graph.index_of(b)) else {
                    continue;
                };
                if let (Some(xi), Some(xj)) = (grid[i][r], grid[j][r]) {
                    problem.add_new_inequality_constraint(
                        &format!("exclusion_{}_{}_{}", i, j, r),
                        &[(xi, 1.), (xj, 1.)],
                        f64::NEG_INFINITY,
                        1.,
                    )?;
                }
            }
        }

        debug!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "built direct assignment model"
        );
        Ok(DirectModel {
            problem,
            variables,
            by_operation,
            stranded,
        })
    }

    /// Build and solve the assignment model
    ///
    /// Infeasible, unbounded and unfinished solves come back as the result status with no
    /// assignment. An operation with no usable resource makes the model Infeasible without
    /// calling the backend.
    pub fn solve(&self, solver: &dyn Solver) -> Result<AssignmentResult, SchedulingError> {
        info!(
            operations = self.graph.len(),
            resources = self.resources.len(),
            backend = solver.name(),
            "solving direct assignment"
        );
        if self.graph.is_empty() {
            return Ok(AssignmentResult {
                status: OptimizationStatus::Optimal,
                objective_value: Some(0.),
                assignment: Some(IndexMap::new()),
            });
        }

        let model = self.build()?;
        if !model.stranded.is_empty() {
            info!(
                stranded = model.stranded.len(),
                "operations without a usable resource, model is infeasible"
            );
            return Ok(AssignmentResult::without_assignment(
                OptimizationStatus::Infeasible,
            ));
        }

        let solution = solver.solve(&model.problem)?;
        if !solution.is_optimal() {
            info!(status = ?solution.status, "direct assignment not solved to optimality");
            return Ok(AssignmentResult::without_assignment(solution.status));
        }

        let mut assignment: IndexMap<OperationId, ResourceId> = IndexMap::new();
        for (op, options) in self.graph.ids().zip(&model.by_operation) {
            let best = options
                .iter()
                .map(|(res, x)| (res, solution.value(*x).unwrap_or(0.)))
                .filter(|(_, value)| *value > 0.5)
                .max_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((res, _)) = best {
                assignment.insert(op.clone(), res.clone());
            }
        }
        let result = AssignmentResult {
            status: solution.status,
            objective_value: solution.objective_value,
            assignment: Some(assignment),
        };
        info!(
            objective = ?result.objective_value,
            resources_used = result.resources_used(),
            "direct assignment solved"
        );
        Ok(result)
    }
}
