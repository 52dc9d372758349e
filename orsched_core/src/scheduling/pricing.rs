//! Pricing step of column generation: find schedules with negative reduced cost
//!
//! With node weights `w(op) = dual(op) - cost(op)`, a schedule's reduced cost is
//! `fixed - sum w(op)`, so improving columns are independent sets of the conflict graph whose
//! weight exceeds the fixed cost.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conflict::ConflictGraph;
use crate::model::operation::OperationId;
use crate::model::ModelError;
use crate::scheduling::covering::ColumnCosting;

/// Search used to find improving schedules
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingStrategy {
    /// Exact maximum weight independent set search, bounded by a node budget
    #[default]
    MaximumWeightIndependentSet,
    /// Only two member schedules are considered
    ///
    /// An approximation: finding nothing does not prove the relaxation optimal.
    Pairs,
}

/// Improving schedules found by one pricing call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PricingOutcome {
    /// Member lists in graph order, best first
    pub columns: Vec<Vec<OperationId>>,
    /// Whether an empty result proves that no improving schedule exists
    pub exhaustive: bool,
    /// Search nodes expanded
    pub nodes: usize,
}

/// Parameters of one pricing call
#[derive(Copy, Clone, Debug)]
pub struct PricingRequest {
    pub strategy: PricingStrategy,
    /// A schedule improves only if its reduced cost is below `-tolerance`
    pub tolerance: f64,
    /// Node budget for the independent set search
    pub max_nodes: usize,
}

/// Find improving schedules for the given coverage duals
///
/// Fails with [`ModelError::UnknownOperation`] if an operation of the graph has no dual price.
pub fn price(
    graph: &ConflictGraph,
    duals: &IndexMap<OperationId, f64>,
    costing: &ColumnCosting,
    request: PricingRequest,
) -> Result<PricingOutcome, ModelError> {
    let weights = graph
        .ids()
        .map(|id| {
            let dual = duals
                .get(id)
                .copied()
                .ok_or_else(|| ModelError::UnknownOperation(id.clone()))?;
            Ok(dual - costing.operation_cost(id)?)
        })
        .collect::<Result<Vec<f64>, ModelError>>()?;
    let threshold = costing.fixed() + request.tolerance;

    let (sets, exhaustive, nodes): (Vec<Vec<usize>>, bool, usize) = match request.strategy {
        PricingStrategy::MaximumWeightIndependentSet => {
            let mut search = IndependentSetSearch::new(graph, &weights, threshold, request.max_nodes);
            search.run();
            let sets = search
                .found
                .into_iter()
                .rev()
                .map(|set| extend_with_free_operations(graph, &weights, set))
                .collect();
            (sets, !search.truncated, search.nodes)
        }
        PricingStrategy::Pairs => {
            let mut sets = Vec::new();
            for i in 0..weights.len() {
                for j in (i + 1)..weights.len() {
                    if !graph.conflict_at(i, j) && weights[i] + weights[j] > threshold {
                        sets.push(vec![i, j]);
                    }
                }
            }
            (sets, false, weights.len() * weights.len().saturating_sub(1) / 2)
        }
    };

    let mut columns: Vec<Vec<OperationId>> = Vec::with_capacity(sets.len());
    for set in sets {
        let members: Vec<OperationId> = set
            .into_iter()
            .filter_map(|i| graph.id_at(i).cloned())
            .collect();
        if !columns.contains(&members) {
            columns.push(members);
        }
    }
    debug!(
        strategy = ?request.strategy,
        found = columns.len(),
        exhaustive,
        nodes,
        "priced columns"
    );
    Ok(PricingOutcome {
        columns,
        exhaustive,
        nodes,
    })
}

/// Branch and bound over independent sets of positive weight nodes
///
/// Every time the incumbent improves on both the threshold and the previous incumbent, the new
/// set is recorded, so `found` is ordered by increasing weight.
struct IndependentSetSearch<'a> {
    graph: &'a ConflictGraph,
    weights: &'a [f64],
    best_weight: f64,
    found: Vec<Vec<usize>>,
    nodes: usize,
    max_nodes: usize,
    truncated: bool,
}

impl<'a> IndependentSetSearch<'a> {
    fn new(graph: &'a ConflictGraph, weights: &'a [f64], threshold: f64, max_nodes: usize) -> Self {
        Self {
            graph,
            weights,
            best_weight: threshold,
            found: Vec::new(),
            nodes: 0,
            max_nodes,
            truncated: false,
        }
    }

    fn run(&mut self) {
        // Heaviest first, so good incumbents show up early and prune more
        let mut candidates: Vec<usize> = (0..self.weights.len())
            .filter(|&i| self.weights[i] > 0.)
            .collect();
        candidates.sort_by(|&a, &b| self.weights[b].total_cmp(&self.weights[a]).then(a.cmp(&b)));
        let mut chosen = Vec::new();
        self.expand(&mut chosen, 0., &candidates);
    }

    fn expand(&mut self, chosen: &mut Vec<usize>, weight: f64, candidates: &[usize]) {
        if self.nodes >= self.max_nodes {
            self.truncated = true;
            return;
        }
        self.nodes += 1;

        if weight > self.best_weight {
            self.best_weight = weight;
            let mut set = chosen.clone();
            set.sort_unstable();
            self.found.push(set);
        }

        // remaining[k] = weight still reachable from candidates[k..]
        let mut remaining: Vec<f64> = vec![0.; candidates.len() + 1];
        for k in (0..candidates.len()).rev() {
            remaining[k] = remaining[k + 1] + self.weights[candidates[k]];
        }

        for (k, &v) in candidates.iter().enumerate() {
            if weight + remaining[k] <= self.best_weight {
                break;
            }
            let next: Vec<usize> = candidates[k + 1..]
                .iter()
                .copied()
                .filter(|&u| !self.graph.conflict_at(v, u))
                .collect();
            chosen.push(v);
            self.expand(chosen, weight + self.weights[v], &next);
            chosen.pop();
            if self.truncated {
                return;
            }
        }
    }
}

/// Add every operation with nonnegative weight that fits, in graph order
fn extend_with_free_operations(
    graph: &ConflictGraph,
    weights: &[f64],
    mut set: Vec<usize>,
) -> Vec<usize> {
    for i in 0..weights.len() {
        if weights[i] >= 0. && !set.contains(&i) && set.iter().all(|&m| !graph.conflict_at(i, m)) {
            set.push(i);
        }
    }
    set.sort_unstable();
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::operation::test_support::{abc, op};

    fn duals(graph: &ConflictGraph, values: &[f64]) -> IndexMap<OperationId, f64> {
        graph.ids().cloned().zip(values.iter().copied()).collect()
    }

    fn request(strategy: PricingStrategy) -> PricingRequest {
        PricingRequest {
            strategy,
            tolerance: 1e-6,
            max_nodes: 10_000,
        }
    }

    fn names(columns: &[Vec<OperationId>]) -> Vec<Vec<&str>> {
        columns
            .iter()
            .map(|c| c.iter().map(|id| id.as_str()).collect())
            .collect()
    }

    #[test]
    fn singleton_duals_price_the_compatible_pair() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let outcome = price(
            &graph,
            &duals(&graph, &[1., 1., 1.]),
            &ColumnCosting::unit(),
            request(PricingStrategy::MaximumWeightIndependentSet),
        )
        .unwrap();
        assert!(outcome.exhaustive);
        assert_eq!(names(&outcome.columns)[0], vec!["A", "C"]);
    }

    #[test]
    fn optimal_duals_price_nothing() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        for strategy in [PricingStrategy::MaximumWeightIndependentSet, PricingStrategy::Pairs] {
            let outcome = price(
                &graph,
                &duals(&graph, &[0.5, 1., 0.5]),
                &ColumnCosting::unit(),
                request(strategy),
            )
            .unwrap();
            assert!(outcome.columns.is_empty());
            assert_eq!(outcome.exhaustive, strategy == PricingStrategy::MaximumWeightIndependentSet);
        }
    }

    #[test]
    fn finds_sets_larger_than_pairs() {
        // Four back to back operations, none overlapping
        let ops = vec![
            op("a", (8, 0), (9, 0)),
            op("b", (9, 0), (10, 0)),
            op("c", (10, 0), (11, 0)),
            op("d", (11, 0), (12, 0)),
        ];
        let graph = ConflictGraph::build(&ops).unwrap();
        let quarter = duals(&graph, &[0.3, 0.3, 0.3, 0.3]);
        let mwis = price(
            &graph,
            &quarter,
            &ColumnCosting::unit(),
            request(PricingStrategy::MaximumWeightIndependentSet),
        )
        .unwrap();
        assert_eq!(names(&mwis.columns)[0], vec!["a", "b", "c", "d"]);

        let pairs = price(
            &graph,
            &quarter,
            &ColumnCosting::unit(),
            request(PricingStrategy::Pairs),
        )
        .unwrap();
        assert!(pairs.columns.is_empty());
        assert!(!pairs.exhaustive);
    }

    #[test]
    fn zero_weight_operations_extend_the_column() {
        let ops = vec![
            op("a", (8, 0), (9, 0)),
            op("b", (8, 30), (9, 30)),
            op("c", (10, 0), (11, 0)),
        ];
        let graph = ConflictGraph::build(&ops).unwrap();
        let outcome = price(
            &graph,
            &duals(&graph, &[2., 0.5, 0.]),
            &ColumnCosting::unit(),
            request(PricingStrategy::MaximumWeightIndependentSet),
        )
        .unwrap();
        assert_eq!(names(&outcome.columns), vec![vec!["a", "c"]]);
    }

    #[test]
    fn node_budget_stops_the_search() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let outcome = price(
            &graph,
            &duals(&graph, &[0.5, 1., 0.5]),
            &ColumnCosting::unit(),
            PricingRequest {
                max_nodes: 1,
                ..request(PricingStrategy::MaximumWeightIndependentSet)
            },
        )
        .unwrap();
        assert!(!outcome.exhaustive);
        assert_eq!(outcome.nodes, 1);
    }

    #[test]
    fn missing_dual_is_an_error() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let partial: IndexMap<OperationId, f64> = [(OperationId::new("A"), 1.)].into_iter().collect();
        assert_eq!(
            price(
                &graph,
                &partial,
                &ColumnCosting::unit(),
                request(PricingStrategy::Pairs)
            ),
            Err(ModelError::UnknownOperation("B".into()))
        );
    }
}
