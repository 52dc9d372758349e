//! Implements a solver interface for Clarabel
//!
//! Clarabel is an interior point solver for conic programs. Linear programs are passed as
//! `min q'x s.t. Ax + s = b, s in K`, with equality rows in a zero cone and every finite
//! inequality or variable bound as a row of the nonnegative cone.
use ::clarabel::algebra::CscMatrix;
use ::clarabel::solver::{
    DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use tracing::{debug, warn};

use crate::configuration;
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{has_unsatisfiable_empty_row, merged_terms, Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// LP backend built on Clarabel, reports dual values
#[derive(Clone, Debug)]
pub struct ClarabelSolver {
    /// Print Clarabel's iteration log
    pub verbose: bool,
    /// Wall clock limit in seconds
    pub time_limit: f64,
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self {
            verbose: false,
            time_limit: configuration::solver_time_limit(),
        }
    }
}

/// Where the rows of a constraint ended up in the conic form
#[derive(Clone, Copy, Debug, Default)]
struct RowPlacement {
    equality: Option<usize>,
    lower: Option<usize>,
    upper: Option<usize>,
}

/// Rows in conic form, equality rows first
#[derive(Default)]
struct ConicRows {
    equality: Vec<(Vec<(usize, f64)>, f64)>,
    inequality: Vec<(Vec<(usize, f64)>, f64)>,
}

impl ConicRows {
    fn push_equality(&mut self, terms: Vec<(usize, f64)>, rhs: f64) -> usize {
        self.equality.push((terms, rhs));
        self.equality.len() - 1
    }

    /// Push `terms <= rhs`, returns the position among the inequality rows
    fn push_upper(&mut self, terms: Vec<(usize, f64)>, rhs: f64) -> usize {
        self.inequality.push((terms, rhs));
        self.inequality.len() - 1
    }

    /// Push `terms >= rhs` as `-terms <= -rhs`
    fn push_lower(&mut self, terms: &[(usize, f64)], rhs: f64) -> usize {
        let negated = terms.iter().map(|&(j, c)| (j, -c)).collect();
        self.push_upper(negated, -rhs)
    }

    fn num_rows(&self) -> usize {
        self.equality.len() + self.inequality.len()
    }

    /// Assemble A in compressed sparse column form together with b
    fn assemble(&self, num_variables: usize) -> (CscMatrix<f64>, Vec<f64>) {
        let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); num_variables];
        let mut b = Vec::with_capacity(self.num_rows());
        for (row, (terms, rhs)) in self.equality.iter().chain(&self.inequality).enumerate() {
            for &(j, c) in terms {
                columns[j].push((row, c));
            }
            b.push(*rhs);
        }
        let mut colptr = Vec::with_capacity(num_variables + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for column in columns {
            // rows are pushed in increasing order, so each column is already sorted
            for (row, c) in column {
                rowval.push(row);
                nzval.push(c);
            }
            colptr.push(rowval.len());
        }
        (
            CscMatrix::new(self.num_rows(), num_variables, colptr, rowval, nzval),
            b,
        )
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn integer_variable_capable(&self) -> bool {
        false
    }

    fn dual_values_capable(&self) -> bool {
        true
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        if let Some(var) = problem.variables().find(|v| v.is_integral()) {
            return Err(SolverError::UnsupportedVariableType {
                solver: self.name(),
                variable: var.id.clone(),
            });
        }
        if has_unsatisfiable_empty_row(problem) {
            return Ok(ProblemSolution::without_values(
                OptimizationStatus::Infeasible,
            ));
        }

        let n = problem.num_variables();
        let sign = match problem.objective().sense() {
            ObjectiveSense::Minimize => 1.,
            ObjectiveSense::Maximize => -1.,
        };
        let q: Vec<f64> = problem
            .objective()
            .coefficients(n)
            .into_iter()
            .map(|c| sign * c)
            .collect();

        let mut rows = ConicRows::default();
        let mut placements = Vec::with_capacity(problem.num_constraints());
        for constraint in problem.constraints() {
            let terms = merged_terms(constraint);
            let mut placement = RowPlacement::default();
            if !terms.is_empty() {
                match constraint {
                    Constraint::Equality { equals, .. } => {
                        placement.equality = Some(rows.push_equality(terms, *equals));
                    }
                    Constraint::Inequality {
                        lower_bound,
                        upper_bound,
                        ..
                    } => {
                        if lower_bound == upper_bound {
                            placement.equality = Some(rows.push_equality(terms, *lower_bound));
                        } else {
                            if lower_bound.is_finite() {
                                placement.lower = Some(rows.push_lower(&terms, *lower_bound));
                            }
                            if upper_bound.is_finite() {
                                placement.upper = Some(rows.push_upper(terms, *upper_bound));
                            }
                        }
                    }
                }
            }
            placements.push(placement);
        }
        for var in problem.variables() {
            let (lower_bound, upper_bound) = var.effective_bounds();
            let j = var.index().0;
            if lower_bound.is_finite() {
                rows.push_lower(&[(j, 1.)], lower_bound);
            }
            if upper_bound.is_finite() {
                rows.push_upper(vec![(j, 1.)], upper_bound);
            }
        }

        if rows.num_rows() == 0 {
            // Nothing constrains the variables, so any nonzero cost is unbounded
            return Ok(if q.iter().all(|c| *c == 0.) {
                ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(0.),
                    variable_values: Some(vec![0.; n]),
                    dual_values: Some(vec![0.; problem.num_constraints()]),
                }
            } else {
                ProblemSolution::without_values(OptimizationStatus::Unbounded)
            });
        }

        let num_equality = rows.equality.len();
        let (a, b) = rows.assemble(n);
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let mut cones = Vec::new();
        if num_equality > 0 {
            cones.push(SupportedConeT::ZeroConeT(num_equality));
        }
        if !rows.inequality.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(rows.inequality.len()));
        }
        let settings = DefaultSettings {
            verbose: self.verbose,
            time_limit: self.time_limit,
            ..DefaultSettings::default()
        };

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = match solver.solution.status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => {
                warn!("clarabel reached reduced accuracy, accepting solution as optimal");
                OptimizationStatus::Optimal
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            other => {
                debug!(status = ?other, "clarabel stopped without a verdict");
                OptimizationStatus::NotSolved
            }
        };
        if status != OptimizationStatus::Optimal {
            return Ok(ProblemSolution::without_values(status));
        }

        let x = solver.solution.x.clone();
        let z = &solver.solution.z;
        let inequality_offset = num_equality;
        let duals = placements
            .iter()
            .map(|placement| {
                let equality = placement.equality.map_or(0., |r| -z[r]);
                let lower = placement.lower.map_or(0., |r| z[inequality_offset + r]);
                let upper = placement.upper.map_or(0., |r| z[inequality_offset + r]);
                sign * (equality + lower - upper)
            })
            .collect();

        Ok(ProblemSolution {
            status,
            objective_value: Some(problem.objective().evaluate(&x)),
            variable_values: Some(x),
            dual_values: Some(duals),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::variable::VariableType;

    #[test]
    fn rejects_integer_variables() {
        let mut problem = Problem::new_minimization();
        problem.add_new_binary_variable("y").unwrap();
        let res = ClarabelSolver::default().solve(&problem);
        assert!(matches!(
            res,
            Err(SolverError::UnsupportedVariableType { .. })
        ));
    }

    #[test]
    fn covering_lp_duals() {
        // min y1 + y2 + y3
        // a: y1 + y3 >= 1, b: y2 + y3 >= 1
        // Optimum y3 = 1 with objective 1, duals sum to 1
        let mut problem = Problem::new_minimization();
        let mut vars = Vec::new();
        for id in ["y1", "y2", "y3"] {
            let v = problem
                .add_new_variable(id, VariableType::Continuous, 0., f64::INFINITY)
                .unwrap();
            problem.add_new_linear_objective_term(v, 1.).unwrap();
            vars.push(v);
        }
        let a = problem
            .add_new_inequality_constraint("a", &[(vars[0], 1.), (vars[2], 1.)], 1., f64::INFINITY)
            .unwrap();
        let b = problem
            .add_new_inequality_constraint("b", &[(vars[1], 1.), (vars[2], 1.)], 1., f64::INFINITY)
            .unwrap();

        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 1.).abs() < 1e-6);
        assert!((solution.value(vars[2]).unwrap() - 1.).abs() < 1e-5);
        let pa = solution.dual(a).unwrap();
        let pb = solution.dual(b).unwrap();
        assert!(pa > -1e-6 && pb > -1e-6);
        assert!((pa + pb - 1.).abs() < 1e-5);
    }

    #[test]
    fn equality_dual_and_maximization() {
        // max 3x + 2y, x + y = 4, x <= 3
        let mut problem = Problem::new_maximization();
        let x = problem
            .add_new_variable("x", VariableType::Continuous, 0., 3.)
            .unwrap();
        let y = problem
            .add_new_variable("y", VariableType::Continuous, 0., f64::INFINITY)
            .unwrap();
        problem.add_new_linear_objective_term(x, 3.).unwrap();
        problem.add_new_linear_objective_term(y, 2.).unwrap();
        let total = problem
            .add_new_equality_constraint("total", &[(x, 1.), (y, 1.)], 4.)
            .unwrap();

        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 11.).abs() < 1e-5);
        // one more unit of total goes to y
        assert!((solution.dual(total).unwrap() - 2.).abs() < 1e-5);
    }

    #[test]
    fn infeasible_lp() {
        let mut problem = Problem::new_minimization();
        let x = problem
            .add_new_variable("x", VariableType::Continuous, 0., 1.)
            .unwrap();
        problem
            .add_new_inequality_constraint("c", &[(x, 1.)], 2., f64::INFINITY)
            .unwrap();
        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.objective_value.is_none());
    }

    #[test]
    fn empty_cover_row_is_infeasible() {
        let mut problem = Problem::new_minimization();
        problem
            .add_new_variable("x", VariableType::Continuous, 0., 1.)
            .unwrap();
        problem
            .add_new_inequality_constraint("c", &[], 1., f64::INFINITY)
            .unwrap();
        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
    }
}
