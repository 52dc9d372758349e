//! Column generation over the set covering model
//!
//! The pool starts from the greedy partition. Each iteration solves the LP relaxation over the
//! pool, reads the coverage duals and prices new schedules against them. Once pricing finds
//! nothing (or a limit is hit) the integer covering model is solved over the final pool.
use std::time::{Duration, Instant};

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::configuration;
use crate::conflict::ConflictGraph;
use crate::model::operation::OperationId;
use crate::model::schedule::ColumnPool;
use crate::optimize::solvers::Solver;
use crate::optimize::OptimizationStatus;
use crate::partition::GreedyPartitioner;
use crate::scheduling::covering::{ColumnCosting, CoveringResult, SetCoveringSolver};
use crate::scheduling::pricing::{price, PricingRequest, PricingStrategy};
use crate::scheduling::SchedulingError;

/// Limits and tolerances of a column generation run
///
/// Unset fields are read from the global [`CONFIGURATION`](configuration::CONFIGURATION).
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct ColumnGenerationSettings {
    /// Maximum number of master LP solves
    #[builder(default = "configuration::max_iterations()")]
    pub max_iterations: usize,
    /// Reduced costs must be below `-tolerance` for a column to be added
    #[builder(default = "configuration::tolerance()")]
    pub tolerance: f64,
    #[builder(default)]
    pub pricing: PricingStrategy,
    /// Search node budget of a single pricing call
    #[builder(default = "configuration::max_pricing_nodes()")]
    pub max_pricing_nodes: usize,
    /// Wall clock budget, checked before each iteration
    #[builder(default = "None", setter(strip_option))]
    pub time_limit: Option<Duration>,
}

impl Default for ColumnGenerationSettings {
    fn default() -> Self {
        Self {
            max_iterations: configuration::max_iterations(),
            tolerance: configuration::tolerance(),
            pricing: PricingStrategy::default(),
            max_pricing_nodes: configuration::max_pricing_nodes(),
            time_limit: None,
        }
    }
}

/// Why the iteration stopped
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Pricing found no improving schedule
    Converged,
    IterationLimit,
    TimeLimit,
    /// Pricing found nothing but could not prove that nothing exists
    PricingIncomplete,
    /// The master LP was not solved to optimality
    Failed(OptimizationStatus),
}

/// State of the restricted master problem, owned by one engine run
#[derive(Clone, Debug, Default)]
pub struct MasterProblemState {
    pub pool: ColumnPool,
    /// Dual price of each operation's coverage row from the last optimal master LP
    pub duals: IndexMap<OperationId, f64>,
    /// Master LP solves so far
    pub iteration: usize,
    /// Objective of the last optimal master LP
    pub lp_objective: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct ColumnGenerationOutcome {
    pub termination: Termination,
    pub master: MasterProblemState,
    /// Last master LP objective
    ///
    /// A lower bound on the integer optimum when the run converged with exhaustive pricing.
    pub lp_bound: Option<f64>,
    /// Integer covering solution over the final pool, None when the run failed
    pub result: Option<CoveringResult>,
}

impl ColumnGenerationOutcome {
    /// Whether the LP relaxation was proven optimal over every possible schedule
    pub fn is_certified(&self) -> bool {
        self.termination == Termination::Converged
    }
}

pub struct ColumnGenerationEngine<'a> {
    graph: &'a ConflictGraph,
    costing: ColumnCosting,
    settings: ColumnGenerationSettings,
}

impl<'a> ColumnGenerationEngine<'a> {
    pub fn new(graph: &'a ConflictGraph, costing: ColumnCosting) -> Self {
        Self {
            graph,
            costing,
            settings: ColumnGenerationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ColumnGenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ColumnGenerationSettings {
        &self.settings
    }

    /// Pool from the first fit partition of the operations in input order
    pub fn seed_pool(&self) -> Result<ColumnPool, SchedulingError> {
        let groups = GreedyPartitioner::new(self.graph).partition_in_input_order()?;
        let mut pool = ColumnPool::new();
        for members in groups {
            pool.insert(self.costing.schedule(members)?);
        }
        Ok(pool)
    }

    /// Run column generation from the greedy seed pool
    pub fn run(&self, solver: &dyn Solver) -> Result<ColumnGenerationOutcome, SchedulingError> {
        let pool = self.seed_pool()?;
        self.run_with_pool(pool, solver)
    }

    /// Run column generation from a caller supplied pool
    ///
    /// The backend must report duals for continuous problems. A master LP that isn't solved to
    /// optimality ends the run with [`Termination::Failed`] and the last valid state.
    pub fn run_with_pool(
        &self,
        pool: ColumnPool,
        solver: &dyn Solver,
    ) -> Result<ColumnGenerationOutcome, SchedulingError> {
        let started = Instant::now();
        let covering = SetCoveringSolver::new(self.graph);
        let request = PricingRequest {
            strategy: self.settings.pricing,
            tolerance: self.settings.tolerance,
            max_nodes: self.settings.max_pricing_nodes,
        };
        let mut master = MasterProblemState {
            pool,
            ..MasterProblemState::default()
        };
        info!(
            operations = self.graph.len(),
            seed_columns = master.pool.len(),
            backend = solver.name(),
            "starting column generation"
        );

        let termination = loop {
            if master.iteration >= self.settings.max_iterations {
                break Termination::IterationLimit;
            }
            if self
                .settings
                .time_limit
                .is_some_and(|limit| started.elapsed() >= limit)
            {
                break Termination::TimeLimit;
            }

            let relaxation = covering.solve_relaxation(master.pool.as_slice(), solver)?;
            master.iteration += 1;
            let (Some(objective), Some(duals)) = (relaxation.objective_value, relaxation.duals)
            else {
                warn!(
                    iteration = master.iteration,
                    status = ?relaxation.status,
                    "master LP not solved to optimality"
                );
                let lp_bound = master.lp_objective;
                return Ok(ColumnGenerationOutcome {
                    termination: Termination::Failed(relaxation.status),
                    master,
                    lp_bound,
                    result: None,
                });
            };
            master.lp_objective = Some(objective);
            master.duals = duals;

            let pricing = price(self.graph, &master.duals, &self.costing, request)?;
            let mut added = 0;
            for members in pricing.columns.iter().cloned() {
                if master.pool.insert(self.costing.schedule(members)?) {
                    added += 1;
                }
            }
            info!(
                iteration = master.iteration,
                lp_objective = objective,
                columns = master.pool.len(),
                added,
                "column generation iteration"
            );

            if added == 0 {
                // The search only records sets beating its incumbent, so known columns can hide
                // smaller improving ones
                if !pricing.columns.is_empty() {
                    warn!(
                        iteration = master.iteration,
                        found = pricing.columns.len(),
                        "pricing only returned columns already in the pool, stopping"
                    );
                    break Termination::PricingIncomplete;
                }
                break if pricing.exhaustive {
                    Termination::Converged
                } else {
                    Termination::PricingIncomplete
                };
            }
        };

        debug!(?termination, elapsed = ?started.elapsed(), "solving integer master");
        let result = covering.solve(master.pool.as_slice(), solver)?;
        info!(
            ?termination,
            iterations = master.iteration,
            columns = master.pool.len(),
            lp_bound = ?master.lp_objective,
            objective = ?result.objective_value,
            rooms = result.rooms(),
            "column generation finished"
        );
        Ok(ColumnGenerationOutcome {
            termination,
            lp_bound: master.lp_objective,
            master,
            result: Some(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;
    use crate::model::cost::CostModel;
    use crate::model::operation::test_support::{abc, arb_operations, op};
    use crate::model::schedule::ScheduleKey;
    use crate::optimize::solvers::CompositeSolver;
    use crate::partition::max_overlap;
    use crate::scheduling::test_support::{abc_costs, FixedDualSolver, StalledSolver};
    use crate::scheduling::verification::verify_cover;
    use proptest::prelude::*;

    fn singletons(graph: &ConflictGraph) -> ColumnPool {
        let costing = ColumnCosting::unit();
        graph
            .ids()
            .map(|id| costing.schedule(vec![id.clone()]).unwrap())
            .collect()
    }

    #[test]
    fn settings_default_from_configuration() {
        let settings = ColumnGenerationSettingsBuilder::default()
            .pricing(PricingStrategy::Pairs)
            .build()
            .unwrap();
        assert_eq!(settings.max_iterations, 200);
        assert_eq!(settings.pricing, PricingStrategy::Pairs);
        assert!(settings.time_limit.is_none());
        assert_eq!(
            ColumnGenerationSettings::default().pricing,
            PricingStrategy::MaximumWeightIndependentSet
        );
    }

    #[test]
    fn abc_from_greedy_seed() {
        logging::init_test();
        let graph = ConflictGraph::build(&abc()).unwrap();
        let engine = ColumnGenerationEngine::new(&graph, ColumnCosting::unit());
        assert_eq!(engine.seed_pool().unwrap().len(), 2);

        let outcome = engine.run(&CompositeSolver::clarabel_microlp()).unwrap();
        assert_eq!(outcome.termination, Termination::Converged);
        assert!(outcome.is_certified());
        assert!((outcome.lp_bound.unwrap() - 2.).abs() < 1e-6);
        let result = outcome.result.unwrap();
        assert_eq!(result.status, OptimizationStatus::Optimal);
        assert_eq!(result.rooms(), 2);
        assert!(verify_cover(&graph, &result.schedules).is_empty());
    }

    #[test]
    fn grows_singletons_into_shared_schedule() {
        logging::init_test();
        let graph = ConflictGraph::build(&abc()).unwrap();
        let outcome = ColumnGenerationEngine::new(&graph, ColumnCosting::unit())
            .run_with_pool(singletons(&graph), &CompositeSolver::clarabel_microlp())
            .unwrap();
        assert_eq!(outcome.termination, Termination::Converged);
        assert!(outcome.master.iteration >= 2);
        let key = ScheduleKey::new(&[OperationId::new("A"), OperationId::new("C")]);
        assert!(outcome.master.pool.contains(&key));
        assert_eq!(outcome.master.duals.len(), 3);

        let result = outcome.result.unwrap();
        assert_eq!(result.rooms(), 2);
        assert!((result.objective_value.unwrap() - 2.).abs() < 1e-6);
    }

    #[test]
    fn pool_never_holds_duplicates() {
        let ops = vec![
            op("a", (8, 0), (9, 0)),
            op("b", (8, 30), (9, 30)),
            op("c", (9, 0), (10, 0)),
            op("d", (9, 30), (10, 30)),
            op("e", (10, 0), (11, 0)),
            op("f", (8, 0), (11, 0)),
        ];
        let graph = ConflictGraph::build(&ops).unwrap();
        let outcome = ColumnGenerationEngine::new(&graph, ColumnCosting::unit())
            .run_with_pool(singletons(&graph), &CompositeSolver::clarabel_microlp())
            .unwrap();
        let keys: Vec<ScheduleKey> = outcome.master.pool.iter().map(|s| s.key()).collect();
        for (i, key) in keys.iter().enumerate() {
            assert!(!keys[i + 1..].contains(key));
        }
        for schedule in outcome.master.pool.iter() {
            assert!(schedule.validate(&graph).is_ok());
        }
        // f overlaps everything, so it needs a room of its own next to the a-c-e and b-d chains
        let result = outcome.result.unwrap();
        assert_eq!(result.rooms(), 3);
        assert!(verify_cover(&graph, &result.schedules).is_empty());
    }

    #[test]
    fn pair_pricing_is_not_certified() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let settings = ColumnGenerationSettingsBuilder::default()
            .pricing(PricingStrategy::Pairs)
            .build()
            .unwrap();
        let outcome = ColumnGenerationEngine::new(&graph, ColumnCosting::unit())
            .with_settings(settings)
            .run_with_pool(singletons(&graph), &CompositeSolver::clarabel_microlp())
            .unwrap();
        assert_eq!(outcome.termination, Termination::PricingIncomplete);
        assert!(!outcome.is_certified());
        assert_eq!(outcome.result.unwrap().rooms(), 2);
    }

    #[test]
    fn known_columns_from_pricing_are_not_certified() {
        // Unit duals price {A, C}, which the greedy seed already holds
        let graph = ConflictGraph::build(&abc()).unwrap();
        let backend = FixedDualSolver { dual: 1. };
        let outcome = ColumnGenerationEngine::new(&graph, ColumnCosting::unit())
            .run(&backend)
            .unwrap();
        assert_eq!(outcome.termination, Termination::PricingIncomplete);
        assert!(!outcome.is_certified());
        assert_eq!(outcome.master.iteration, 1);
        assert_eq!(outcome.master.pool.len(), 2);
        assert_eq!(outcome.result.unwrap().rooms(), 2);
    }

    #[test]
    fn limits_still_solve_the_integer_master() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let solver = CompositeSolver::clarabel_microlp();

        let one_round = ColumnGenerationSettingsBuilder::default()
            .max_iterations(1usize)
            .build()
            .unwrap();
        let outcome = ColumnGenerationEngine::new(&graph, ColumnCosting::unit())
            .with_settings(one_round)
            .run_with_pool(singletons(&graph), &solver)
            .unwrap();
        assert_eq!(outcome.termination, Termination::IterationLimit);
        assert_eq!(outcome.master.iteration, 1);
        assert_eq!(outcome.result.unwrap().rooms(), 2);

        let no_time = ColumnGenerationSettingsBuilder::default()
            .time_limit(Duration::ZERO)
            .build()
            .unwrap();
        let outcome = ColumnGenerationEngine::new(&graph, ColumnCosting::unit())
            .with_settings(no_time)
            .run_with_pool(singletons(&graph), &solver)
            .unwrap();
        assert_eq!(outcome.termination, Termination::TimeLimit);
        assert!(outcome.lp_bound.is_none());
        assert_eq!(outcome.result.unwrap().rooms(), 3);
    }

    #[test]
    fn unsolved_master_fails_with_last_state() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let backend = StalledSolver::default();
        let engine = ColumnGenerationEngine::new(&graph, ColumnCosting::unit());
        let outcome = engine.run(&backend).unwrap();
        assert_eq!(
            outcome.termination,
            Termination::Failed(OptimizationStatus::NotSolved)
        );
        assert!(outcome.result.is_none());
        assert!(outcome.lp_bound.is_none());
        assert_eq!(outcome.master.iteration, 1);
        assert_eq!(outcome.master.pool.len(), 2);
        assert_eq!(backend.calls.get(), 1);
    }

    #[test]
    fn mean_costing_covers_at_member_cost() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let costs: CostModel = abc_costs();
        let costing = ColumnCosting::mean_operation_cost(&costs, &graph).unwrap();
        let outcome = ColumnGenerationEngine::new(&graph, costing)
            .run(&CompositeSolver::clarabel_microlp())
            .unwrap();
        assert_eq!(outcome.termination, Termination::Converged);
        // means: A 1.5, B 2, C 1
        let result = outcome.result.unwrap();
        assert!((result.objective_value.unwrap() - 4.5).abs() < 1e-6);
        assert!((outcome.lp_bound.unwrap() - 4.5).abs() < 1e-5);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn unit_costing_bound_matches_peak_overlap(ops in arb_operations(1..16)) {
            let graph = ConflictGraph::build(&ops).unwrap();
            let outcome = ColumnGenerationEngine::new(&graph, ColumnCosting::unit())
                .run(&CompositeSolver::clarabel_microlp())
                .unwrap();

            let keys: Vec<ScheduleKey> = outcome.master.pool.iter().map(|s| s.key()).collect();
            for (i, key) in keys.iter().enumerate() {
                prop_assert!(!keys[i + 1..].contains(key));
            }
            let result = outcome.result.as_ref().unwrap();
            prop_assert_eq!(result.status, OptimizationStatus::Optimal);
            prop_assert!(verify_cover(&graph, &result.schedules).is_empty());

            let peak = max_overlap(&graph);
            prop_assert!(result.rooms() >= peak);
            if outcome.termination == Termination::Converged {
                prop_assert!((outcome.lp_bound.unwrap() - peak as f64).abs() < 1e-4);
            }
        }
    }
}
