//! Implements a solver interface for microlp
//!
//! microlp is a pure Rust simplex solver with branch and bound for integer variables. It does
//! not expose dual values.
use ::microlp::{
    ComparisonOp, Error as MicrolpError, LinearExpr, OptimizationDirection,
    Problem as MicrolpProblem, Variable as MicrolpVariable,
};
use tracing::warn;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{has_unsatisfiable_empty_row, merged_terms, Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// LP and MILP backend built on microlp
#[derive(Clone, Debug, Default)]
pub struct MicrolpSolver {}

fn linear_expr(terms: &[(usize, f64)], vars: &[MicrolpVariable]) -> LinearExpr {
    let mut expr = LinearExpr::empty();
    for &(j, c) in terms {
        expr.add(vars[j], c);
    }
    expr
}

/// Integer bounds microlp can represent, None when a bound is infinite or outside `i32`
fn integer_bounds(lower_bound: f64, upper_bound: f64) -> Option<(i32, i32)> {
    let representable = |b: f64| b.is_finite() && b >= i32::MIN as f64 && b <= i32::MAX as f64;
    if representable(lower_bound) && representable(upper_bound) {
        Some((lower_bound.ceil() as i32, upper_bound.floor() as i32))
    } else {
        None
    }
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn dual_values_capable(&self) -> bool {
        false
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        if has_unsatisfiable_empty_row(problem) {
            return Ok(ProblemSolution::without_values(
                OptimizationStatus::Infeasible,
            ));
        }
        let direction = match problem.objective().sense() {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut lp = MicrolpProblem::new(direction);
        let coefficients = problem.objective().coefficients(problem.num_variables());

        let mut vars = Vec::with_capacity(problem.num_variables());
        for var in problem.variables() {
            let c = coefficients[var.index().0];
            let (lower_bound, upper_bound) = var.effective_bounds();
            let lp_var = match var.variable_type {
                VariableType::Continuous => lp.add_var(c, (lower_bound, upper_bound)),
                VariableType::Binary => lp.add_binary_var(c),
                VariableType::Integer => match integer_bounds(lower_bound, upper_bound) {
                    Some(bounds) => lp.add_integer_var(c, bounds),
                    None => {
                        return Err(SolverError::UnsupportedVariableType {
                            solver: self.name(),
                            variable: var.id.clone(),
                        })
                    }
                },
            };
            vars.push(lp_var);
        }

        for constraint in problem.constraints() {
            let terms = merged_terms(constraint);
            if terms.is_empty() {
                continue;
            }
            match constraint {
                Constraint::Equality { equals, .. } => {
                    lp.add_constraint(linear_expr(&terms, &vars), ComparisonOp::Eq, *equals);
                }
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if lower_bound == upper_bound {
                        lp.add_constraint(
                            linear_expr(&terms, &vars),
                            ComparisonOp::Eq,
                            *lower_bound,
                        );
                        continue;
                    }
                    if lower_bound.is_finite() {
                        lp.add_constraint(
                            linear_expr(&terms, &vars),
                            ComparisonOp::Ge,
                            *lower_bound,
                        );
                    }
                    if upper_bound.is_finite() {
                        lp.add_constraint(
                            linear_expr(&terms, &vars),
                            ComparisonOp::Le,
                            *upper_bound,
                        );
                    }
                }
            }
        }

        match lp.solve() {
            Ok(solution) => {
                let values: Vec<f64> = problem
                    .variables()
                    .zip(&vars)
                    .map(|(var, lp_var)| {
                        let value = solution[*lp_var];
                        if var.is_integral() {
                            value.round()
                        } else {
                            value
                        }
                    })
                    .collect();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(problem.objective().evaluate(&values)),
                    variable_values: Some(values),
                    dual_values: None,
                })
            }
            Err(MicrolpError::Infeasible) => Ok(ProblemSolution::without_values(
                OptimizationStatus::Infeasible,
            )),
            Err(MicrolpError::Unbounded) => Ok(ProblemSolution::without_values(
                OptimizationStatus::Unbounded,
            )),
            #[allow(unreachable_patterns)]
            Err(other) => {
                warn!(error = ?other, "microlp stopped without a verdict");
                Ok(ProblemSolution::without_values(
                    OptimizationStatus::NotSolved,
                ))
            }
        }
    }
}
