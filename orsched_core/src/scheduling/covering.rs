//! Set covering model over a fixed list of schedules
//!
//! One selector per schedule, every operation covered at least once:
//!
//! ```text
//! min  sum cost(s) * y(s)
//! s.t. sum_{s contains op} y(s) >= 1          for every op
//! ```
//!
//! Selectors are binary for the integer model and continuous in `[0, inf)` for the LP
//! relaxation that column generation prices against.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conflict::ConflictGraph;
use crate::model::cost::CostModel;
use crate::model::operation::OperationId;
use crate::model::schedule::Schedule;
use crate::model::ModelError;
use crate::optimize::constraint::ConstraintIndex;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::optimize::variable::{VariableIndex, VariableType};
use crate::optimize::{OptimizationStatus, ProblemSolution};
use crate::scheduling::SchedulingError;

/// How the cost of a schedule follows from its members
///
/// A schedule costs `fixed + sum of per operation costs`.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnCosting {
    /// Every schedule costs 1, so the covering model minimizes the number of rooms
    Unit,
    /// Schedules cost a fixed amount plus a cost per member
    PerOperation {
        fixed: f64,
        costs: IndexMap<OperationId, f64>,
    },
}

impl ColumnCosting {
    pub fn unit() -> Self {
        ColumnCosting::Unit
    }

    /// Price each member at its mean cost over the resources it can use, with no fixed part
    ///
    /// Fails with [`ModelError::NoCostsForOperation`] for an operation with no cost entries.
    pub fn mean_operation_cost(
        cost_model: &CostModel,
        graph: &ConflictGraph,
    ) -> Result<Self, ModelError> {
        let costs = graph
            .ids()
            .map(|id| Ok((id.clone(), cost_model.mean_cost(id)?)))
            .collect::<Result<IndexMap<_, _>, ModelError>>()?;
        Ok(ColumnCosting::PerOperation { fixed: 0., costs })
    }

    /// Cost every schedule pays regardless of its members
    pub fn fixed(&self) -> f64 {
        match self {
            ColumnCosting::Unit => 1.,
            ColumnCosting::PerOperation { fixed, .. } => *fixed,
        }
    }

    pub fn operation_cost(&self, operation: &OperationId) -> Result<f64, ModelError> {
        match self {
            ColumnCosting::Unit => Ok(0.),
            ColumnCosting::PerOperation { costs, .. } => costs
                .get(operation)
                .copied()
                .ok_or_else(|| ModelError::UnknownOperation(operation.clone())),
        }
    }

    /// Create a schedule with its cost filled in
    pub fn schedule(&self, members: Vec<OperationId>) -> Result<Schedule, ModelError> {
        let variable_cost = members
            .iter()
            .map(|id| self.operation_cost(id))
            .sum::<Result<f64, ModelError>>()?;
        Ok(Schedule::new(members, self.fixed() + variable_cost))
    }
}

/// Domain of the schedule selectors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectorDomain {
    Binary,
    Continuous,
}

/// The assembled covering problem
#[derive(Clone, Debug)]
pub struct CoveringModel {
    pub problem: Problem,
    /// Selector of each column, in column order
    pub selectors: Vec<VariableIndex>,
    /// Coverage constraint of each operation, in graph order
    pub coverage: IndexMap<OperationId, ConstraintIndex>,
}

impl CoveringModel {
    /// Operations no column covers
    pub fn uncovered(&self) -> Vec<&OperationId> {
        self.coverage
            .iter()
            .filter(|(_, &c)| {
                self.problem
                    .constraints()
                    .get(c.0)
                    .is_some_and(|row| row.get_terms().is_empty())
            })
            .map(|(id, _)| id)
            .collect()
    }
}

/// Outcome of the integer covering model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoveringResult {
    pub status: OptimizationStatus,
    /// Total cost of the selected schedules, Some only when Optimal
    pub objective_value: Option<f64>,
    /// Positions of the selected schedules in the column list
    pub selected: Vec<usize>,
    /// The selected schedules, one room each
    pub schedules: Vec<Schedule>,
    /// Position of the first selected schedule covering each operation, Some only when Optimal
    pub assignment: Option<IndexMap<OperationId, usize>>,
}

impl CoveringResult {
    fn without_selection(status: OptimizationStatus) -> Self {
        Self {
            status,
            objective_value: None,
            selected: Vec::new(),
            schedules: Vec::new(),
            assignment: None,
        }
    }

    /// Number of rooms the selection needs
    pub fn rooms(&self) -> usize {
        self.schedules.len()
    }
}

/// Outcome of the LP relaxation
#[derive(Clone, Debug, PartialEq)]
pub struct RelaxationResult {
    pub status: OptimizationStatus,
    pub objective_value: Option<f64>,
    /// Selector values in column order, Some only when Optimal
    pub values: Option<Vec<f64>>,
    /// Dual price of each operation's coverage constraint, Some only when Optimal
    pub duals: Option<IndexMap<OperationId, f64>>,
}

pub struct SetCoveringSolver<'a> {
    graph: &'a ConflictGraph,
}

impl<'a> SetCoveringSolver<'a> {
    pub fn new(graph: &'a ConflictGraph) -> Self {
        Self { graph }
    }

    /// Validate the columns and assemble the covering problem
    ///
    /// Columns must have distinct member sets, as in a
    /// [`ColumnPool`](crate::model::schedule::ColumnPool).
    ///
    /// # Errors
    /// - [`ModelError::UnknownOperationInColumn`] for a member not in the graph
    /// - [`ModelError::ConflictingSchedule`] for a column with two overlapping members
    pub fn build(
        &self,
        columns: &[Schedule],
        domain: SelectorDomain,
    ) -> Result<CoveringModel, SchedulingError> {
        for column in columns {
            column.validate(self.graph)?;
        }

        let mut problem = Problem::new_minimization();
        let mut selectors = Vec::with_capacity(columns.len());
        for column in columns {
            let y = match domain {
                SelectorDomain::Binary => problem.add_new_binary_variable(&column.variable_id())?,
                SelectorDomain::Continuous => problem.add_new_variable(
                    &column.variable_id(),
                    VariableType::Continuous,
                    0.,
                    f64::INFINITY,
                )?,
            };
            problem.add_new_linear_objective_term(y, column.cost)?;
            selectors.push(y);
        }

        let mut coverage = IndexMap::with_capacity(self.graph.len());
        for (i, op) in self.graph.ids().enumerate() {
            let terms: Vec<(VariableIndex, f64)> = columns
                .iter()
                .zip(&selectors)
                .filter(|(column, _)| column.contains(op))
                .map(|(_, &y)| (y, 1.))
                .collect();
            let c = problem.add_new_inequality_constraint(
                &format!("cover_{}", i),
                &terms,
                1.,
                f64::INFINITY,
            )?;
            coverage.insert(op.clone(), c);
        }

        debug!(
            columns = columns.len(),
            operations = coverage.len(),
            ?domain,
            "built covering model"
        );
        Ok(CoveringModel {
            problem,
            selectors,
            coverage,
        })
    }

    /// Solve the integer covering model over `columns`
    ///
    /// If some operation is in no column the model is infeasible and the backend isn't called.
    pub fn solve(
        &self,
        columns: &[Schedule],
        solver: &dyn Solver,
    ) -> Result<CoveringResult, SchedulingError> {
        info!(
            columns = columns.len(),
            operations = self.graph.len(),
            backend = solver.name(),
            "solving set covering"
        );
        let model = self.build(columns, SelectorDomain::Binary)?;
        let Some(solution) = self.solve_model(&model, solver)? else {
            return Ok(CoveringResult::without_selection(
                OptimizationStatus::Infeasible,
            ));
        };
        if !solution.is_optimal() {
            info!(status = ?solution.status, "set covering not solved to optimality");
            return Ok(CoveringResult::without_selection(solution.status));
        }

        let selected: Vec<usize> = model
            .selectors
            .iter()
            .enumerate()
            .filter(|(_, &y)| solution.value(y).unwrap_or(0.) > 0.5)
            .map(|(k, _)| k)
            .collect();
        let mut assignment = IndexMap::with_capacity(self.graph.len());
        for op in self.graph.ids() {
            if let Some(&k) = selected.iter().find(|&&k| columns[k].contains(op)) {
                assignment.insert(op.clone(), k);
            }
        }
        let result = CoveringResult {
            status: solution.status,
            objective_value: solution.objective_value,
            schedules: selected.iter().map(|&k| columns[k].clone()).collect(),
            selected,
            assignment: Some(assignment),
        };
        info!(
            objective = ?result.objective_value,
            rooms = result.rooms(),
            "set covering solved"
        );
        Ok(result)
    }

    /// Solve the LP relaxation over `columns`, reading the dual price of every coverage row
    ///
    /// # Errors
    /// [`SolverError::DualValuesUnavailable`](crate::optimize::solvers::SolverError) if the
    /// backend solves the relaxation but reports no duals.
    pub fn solve_relaxation(
        &self,
        columns: &[Schedule],
        solver: &dyn Solver,
    ) -> Result<RelaxationResult, SchedulingError> {
        let model = self.build(columns, SelectorDomain::Continuous)?;
        let solution = match self.solve_model(&model, solver)? {
            Some(solution) if solution.is_optimal() => solution,
            Some(solution) => return Ok(Self::unsolved_relaxation(solution.status)),
            None => return Ok(Self::unsolved_relaxation(OptimizationStatus::Infeasible)),
        };

        let mut duals = IndexMap::with_capacity(model.coverage.len());
        for (op, &c) in &model.coverage {
            duals.insert(op.clone(), solution.dual(c)?);
        }
        let values = model
            .selectors
            .iter()
            .map(|&y| solution.value(y).unwrap_or(0.))
            .collect();
        Ok(RelaxationResult {
            status: solution.status,
            objective_value: solution.objective_value,
            values: Some(values),
            duals: Some(duals),
        })
    }

    fn unsolved_relaxation(status: OptimizationStatus) -> RelaxationResult {
        RelaxationResult {
            status,
            objective_value: None,
            values: None,
            duals: None,
        }
    }

    /// None when an uncovered operation makes the model infeasible before any solve
    fn solve_model(
        &self,
        model: &CoveringModel,
        solver: &dyn Solver,
    ) -> Result<Option<ProblemSolution>, SchedulingError> {
        let uncovered = model.uncovered();
        if !uncovered.is_empty() {
            info!(
                uncovered = uncovered.len(),
                first = %uncovered[0],
                "operations not covered by any column, model is infeasible"
            );
            return Ok(None);
        }
        if model.coverage.is_empty() {
            // Nothing to cover, selecting nothing is optimal
            return Ok(Some(ProblemSolution {
                status: OptimizationStatus::Optimal,
                objective_value: Some(0.),
                variable_values: Some(vec![0.; model.selectors.len()]),
                dual_values: Some(Vec::new()),
            }));
        }
        Ok(Some(solver.solve(&model.problem)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cost::CostTable;
    use crate::model::operation::test_support::{abc, op};
    use crate::model::schedule::ColumnPool;
    use crate::optimize::solvers::CompositeSolver;
    use crate::scheduling::test_support::StalledSolver;
    use crate::scheduling::verification::verify_cover;

    fn ids(names: &[&str]) -> Vec<OperationId> {
        names.iter().map(|n| OperationId::new(*n)).collect()
    }

    fn unit_pool(groups: &[&[&str]]) -> ColumnPool {
        let costing = ColumnCosting::unit();
        groups
            .iter()
            .map(|g| costing.schedule(ids(g)).unwrap())
            .collect()
    }

    #[test]
    fn abc_picks_two_rooms() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let pool = unit_pool(&[&["A"], &["B"], &["C"], &["A", "C"]]);
        let result = SetCoveringSolver::new(&graph)
            .solve(pool.as_slice(), &CompositeSolver::clarabel_microlp())
            .unwrap();
        assert_eq!(result.status, OptimizationStatus::Optimal);
        assert!((result.objective_value.unwrap() - 2.).abs() < 1e-6);
        assert_eq!(result.rooms(), 2);
        assert_eq!(result.selected, vec![1, 3]);
        let assignment = result.assignment.as_ref().unwrap();
        assert_eq!(assignment[&OperationId::new("A")], 3);
        assert_eq!(assignment[&OperationId::new("B")], 1);
        assert!(verify_cover(&graph, &result.schedules).is_empty());
    }

    #[test]
    fn relaxation_duals_price_each_operation() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let pool = unit_pool(&[&["A"], &["B"], &["C"]]);
        let relaxation = SetCoveringSolver::new(&graph)
            .solve_relaxation(pool.as_slice(), &CompositeSolver::clarabel_microlp())
            .unwrap();
        assert_eq!(relaxation.status, OptimizationStatus::Optimal);
        assert!((relaxation.objective_value.unwrap() - 3.).abs() < 1e-6);
        let duals = relaxation.duals.unwrap();
        for op in ["A", "B", "C"] {
            assert!((duals[&OperationId::new(op)] - 1.).abs() < 1e-6);
        }
    }

    #[test]
    fn uncovered_operation_is_infeasible_without_a_solve() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let pool = unit_pool(&[&["A", "C"]]);
        let backend = StalledSolver::default();
        let covering = SetCoveringSolver::new(&graph);
        let model = covering.build(pool.as_slice(), SelectorDomain::Binary).unwrap();
        assert_eq!(model.uncovered(), vec![&OperationId::new("B")]);

        let result = covering.solve(pool.as_slice(), &backend).unwrap();
        assert_eq!(result.status, OptimizationStatus::Infeasible);
        assert!(result.assignment.is_none());
        let relaxation = covering.solve_relaxation(pool.as_slice(), &backend).unwrap();
        assert_eq!(relaxation.status, OptimizationStatus::Infeasible);
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn bad_columns_are_rejected_before_solving() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let covering = SetCoveringSolver::new(&graph);
        let backend = StalledSolver::default();
        let conflicting = vec![Schedule::new(ids(&["A", "B"]), 1.)];
        assert_eq!(
            covering.solve(&conflicting, &backend).unwrap_err(),
            SchedulingError::Model(ModelError::ConflictingSchedule("A".into(), "B".into()))
        );
        let unknown = vec![Schedule::new(ids(&["Z"]), 1.)];
        assert_eq!(
            covering.solve(&unknown, &backend).unwrap_err(),
            SchedulingError::Model(ModelError::UnknownOperationInColumn("Z".into()))
        );
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn mean_costing_sums_member_means() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let mut table = CostTable::new();
        table.insert("A", "Q1", 10.).unwrap();
        table.insert("A", "Q2", 20.).unwrap();
        table.insert("B", "Q1", 4.).unwrap();
        table.insert("C", "Q2", 6.).unwrap();
        let costing = ColumnCosting::mean_operation_cost(&CostModel::new(table), &graph).unwrap();
        assert_eq!(costing.fixed(), 0.);
        let schedule = costing.schedule(ids(&["A", "C"])).unwrap();
        assert!((schedule.cost - 21.).abs() < 1e-12);
        assert_eq!(
            costing.schedule(ids(&["Z"])),
            Err(ModelError::UnknownOperation("Z".into()))
        );

        let mut sparse = CostTable::new();
        sparse.insert("A", "Q1", 1.).unwrap();
        assert_eq!(
            ColumnCosting::mean_operation_cost(&CostModel::new(sparse), &graph),
            Err(ModelError::NoCostsForOperation("B".into()))
        );
    }

    #[test]
    fn multi_cover_is_allowed() {
        // X and Y overlap, Z fits after either, so Z ends up covered twice
        let ops = vec![
            op("X", (8, 0), (9, 0)),
            op("Y", (8, 0), (9, 0)),
            op("Z", (10, 0), (11, 0)),
        ];
        let graph = ConflictGraph::build(&ops).unwrap();
        let pool = unit_pool(&[&["X", "Z"], &["Y", "Z"]]);
        let result = SetCoveringSolver::new(&graph)
            .solve(pool.as_slice(), &CompositeSolver::clarabel_microlp())
            .unwrap();
        assert_eq!(result.status, OptimizationStatus::Optimal);
        assert!((result.objective_value.unwrap() - 2.).abs() < 1e-6);
        assert_eq!(result.selected, vec![0, 1]);
        assert_eq!(result.assignment.unwrap()[&OperationId::new("Z")], 0);
    }
}
