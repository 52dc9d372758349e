//! Implements a solver interface for HiGHS, requires the highs feature
use ::highs::{HighsModelStatus, RowProblem, Sense};
use tracing::debug;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{has_unsatisfiable_empty_row, merged_terms, Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// LP and MILP backend built on HiGHS, reports dual values for continuous problems
#[derive(Clone, Debug, Default)]
pub struct HighsSolver {}

impl Solver for HighsSolver {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn dual_values_capable(&self) -> bool {
        true
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        if has_unsatisfiable_empty_row(problem) {
            return Ok(ProblemSolution::without_values(
                OptimizationStatus::Infeasible,
            ));
        }
        let coefficients = problem.objective().coefficients(problem.num_variables());
        let mut pb = RowProblem::default();
        let columns: Vec<_> = problem
            .variables()
            .map(|var| {
                let (lower_bound, upper_bound) = var.effective_bounds();
                let c = coefficients[var.index().0];
                if var.is_integral() {
                    pb.add_integer_column(c, lower_bound..=upper_bound)
                } else {
                    pb.add_column(c, lower_bound..=upper_bound)
                }
            })
            .collect();

        // Row positions in the HiGHS model, None for constraints without terms
        let mut row_of = Vec::with_capacity(problem.num_constraints());
        let mut next_row = 0;
        for constraint in problem.constraints() {
            let terms = merged_terms(constraint);
            if terms.is_empty() {
                row_of.push(None);
                continue;
            }
            let (lower_bound, upper_bound) = constraint.get_bounds();
            pb.add_row(
                lower_bound..=upper_bound,
                terms.into_iter().map(|(j, c)| (columns[j], c)),
            );
            row_of.push(Some(next_row));
            next_row += 1;
        }

        let sense = match problem.objective().sense() {
            ObjectiveSense::Minimize => Sense::Minimise,
            ObjectiveSense::Maximize => Sense::Maximise,
        };
        let solved = pb.optimise(sense).solve();
        let status = match solved.status() {
            HighsModelStatus::Optimal => OptimizationStatus::Optimal,
            HighsModelStatus::Infeasible => OptimizationStatus::Infeasible,
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                OptimizationStatus::Unbounded
            }
            other => {
                debug!(status = ?other, "highs stopped without a verdict");
                OptimizationStatus::NotSolved
            }
        };
        if status != OptimizationStatus::Optimal {
            return Ok(ProblemSolution::without_values(status));
        }

        let solution = solved.get_solution();
        let values = solution.columns().to_vec();
        let dual_values = if problem.has_integer_variables() {
            None
        } else {
            let row_duals = solution.dual_rows();
            Some(
                row_of
                    .iter()
                    .map(|row| row.map_or(0., |r| row_duals[r]))
                    .collect(),
            )
        };
        Ok(ProblemSolution {
            status,
            objective_value: Some(problem.objective().evaluate(&values)),
            variable_values: Some(values),
            dual_values,
        })
    }
}
