//! First fit grouping of operations into conflict free schedules
//!
//! This is greedy interval graph coloring. Fed in non-decreasing start order it uses the
//! minimum possible number of schedules (the chromatic number of the interval graph). Under any
//! other order it is only a heuristic and the count is an upper bound.
use indexmap::IndexSet;
use tracing::debug;

use crate::conflict::ConflictGraph;
use crate::model::operation::OperationId;
use crate::model::ModelError;

pub struct GreedyPartitioner<'a> {
    graph: &'a ConflictGraph,
}

impl<'a> GreedyPartitioner<'a> {
    pub fn new(graph: &'a ConflictGraph) -> Self {
        Self { graph }
    }

    /// Group operations into schedules, processing them in the given order
    ///
    /// Each operation joins the first schedule (in creation order) holding nothing it conflicts
    /// with, or opens a new schedule. Member lists keep the processing order.
    ///
    /// # Errors
    /// - [`ModelError::UnknownOperation`] if an id is not in the graph
    /// - [`ModelError::DuplicateOperationId`] if an id appears twice in `order`
    pub fn partition(&self, order: &[OperationId]) -> Result<Vec<Vec<OperationId>>, ModelError> {
        let mut seen: IndexSet<usize> = IndexSet::with_capacity(order.len());
        let mut schedules: Vec<Vec<usize>> = Vec::new();

        for id in order {
            let i = self
                .graph
                .index_of(id)
                .ok_or_else(|| ModelError::UnknownOperation(id.clone()))?;
            if !seen.insert(i) {
                return Err(ModelError::DuplicateOperationId(id.clone()));
            }
            let slot = schedules
                .iter()
                .position(|members| members.iter().all(|&m| !self.graph.conflict_at(i, m)));
            match slot {
                Some(s) => schedules[s].push(i),
                None => schedules.push(vec![i]),
            }
        }

        debug!(
            operations = order.len(),
            schedules = schedules.len(),
            "greedy partition"
        );
        Ok(schedules
            .into_iter()
            .map(|members| {
                members
                    .into_iter()
                    .filter_map(|i| self.graph.id_at(i).cloned())
                    .collect()
            })
            .collect())
    }

    /// Partition every operation in the graph, in its input order
    pub fn partition_in_input_order(&self) -> Result<Vec<Vec<OperationId>>, ModelError> {
        let order: Vec<OperationId> = self.graph.ids().cloned().collect();
        self.partition(&order)
    }

    /// Partition every operation in non-decreasing start order, which is optimal
    pub fn partition_by_start_time(&self) -> Result<Vec<Vec<OperationId>>, ModelError> {
        self.partition(&self.graph.operations_by_start())
    }
}

/// Size of the largest set of operations running at the same instant
///
/// For interval conflicts this equals the minimum number of rooms.
pub fn max_overlap(graph: &ConflictGraph) -> usize {
    // Sweep over start (+1) and end (-1) events, ends first at equal instants
    let mut events: Vec<_> = graph
        .operations()
        .flat_map(|op| [(op.start, 1i64), (op.end, -1i64)])
        .collect();
    events.sort();
    let mut current = 0i64;
    let mut best = 0i64;
    for (_, delta) in events {
        current += delta;
        best = best.max(current);
    }
    best as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::operation::test_support::{abc, arb_operations, op};
    use proptest::prelude::*;

    fn names(schedules: &[Vec<OperationId>]) -> Vec<Vec<&str>> {
        schedules
            .iter()
            .map(|s| s.iter().map(|id| id.as_str()).collect())
            .collect()
    }

    #[test]
    fn abc_needs_two_rooms() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let schedules = GreedyPartitioner::new(&graph)
            .partition_by_start_time()
            .unwrap();
        assert_eq!(names(&schedules), vec![vec!["A", "C"], vec!["B"]]);
        assert_eq!(max_overlap(&graph), 2);
    }

    #[test]
    fn bad_order_uses_extra_room() {
        // Chain a-b-c-d where first fit in order a, d, b, c needs 3 schedules
        let ops = vec![
            op("a", (8, 0), (9, 0)),
            op("b", (8, 30), (10, 0)),
            op("c", (9, 30), (11, 0)),
            op("d", (10, 30), (12, 0)),
        ];
        let graph = ConflictGraph::build(&ops).unwrap();
        let partitioner = GreedyPartitioner::new(&graph);
        let order: Vec<OperationId> = ["a", "d", "b", "c"].iter().map(|s| OperationId::new(*s)).collect();
        let greedy = partitioner.partition(&order).unwrap();
        assert_eq!(names(&greedy), vec![vec!["a", "d"], vec!["b"], vec!["c"]]);
        let best = partitioner.partition_by_start_time().unwrap();
        assert_eq!(best.len(), 2);
        assert_eq!(max_overlap(&graph), 2);
    }

    #[test]
    fn unknown_and_repeated_ids() {
        let graph = ConflictGraph::build(&abc()).unwrap();
        let partitioner = GreedyPartitioner::new(&graph);
        assert_eq!(
            partitioner.partition(&[OperationId::new("Z")]),
            Err(ModelError::UnknownOperation("Z".into()))
        );
        assert_eq!(
            partitioner.partition(&[OperationId::new("A"), OperationId::new("A")]),
            Err(ModelError::DuplicateOperationId("A".into()))
        );
        assert!(partitioner.partition(&[]).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn schedules_are_independent_and_cover_everything(ops in arb_operations(1..30)) {
            let graph = ConflictGraph::build(&ops).unwrap();
            let partitioner = GreedyPartitioner::new(&graph);
            let input_order = partitioner.partition_in_input_order().unwrap();
            let by_start = partitioner.partition_by_start_time().unwrap();
            for schedules in [&input_order, &by_start] {
                let total: usize = schedules.iter().map(|s| s.len()).sum();
                prop_assert_eq!(total, ops.len());
                for s in schedules.iter() {
                    for (i, a) in s.iter().enumerate() {
                        for b in &s[i + 1..] {
                            prop_assert!(!graph.conflict(a, b));
                        }
                    }
                }
            }
            // start order is exact, any other order is an upper bound
            prop_assert_eq!(by_start.len(), max_overlap(&graph));
            prop_assert!(input_order.len() >= by_start.len());
        }
    }
}
