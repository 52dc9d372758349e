//! Time overlap conflict graph over operations
//!
//! Two operations conflict when their intervals overlap strictly, so they can never share a
//! room. Operations that only touch (`end == start`) do not conflict.
use indexmap::IndexMap;
use tracing::debug;

use crate::model::operation::{Operation, OperationId};
use crate::model::ModelError;

/// Symmetric, irreflexive overlap relation over a validated set of operations
///
/// Operations keep their input order, and every operation has a dense index in that order.
#[derive(Clone, Debug)]
pub struct ConflictGraph {
    operations: IndexMap<OperationId, Operation>,
    /// Row major n x n adjacency matrix
    matrix: Vec<bool>,
    /// Sorted neighbor indices per operation
    neighbors: Vec<Vec<usize>>,
    edge_count: usize,
}

impl ConflictGraph {
    /// Build the conflict graph by comparing every pair of operations
    ///
    /// Fails with [`ModelError::InvalidInterval`] if any operation doesn't end strictly after it
    /// starts, and with [`ModelError::DuplicateOperationId`] if an id is repeated.
    pub fn build(operations: &[Operation]) -> Result<Self, ModelError> {
        let mut by_id: IndexMap<OperationId, Operation> = IndexMap::with_capacity(operations.len());
        for op in operations {
            if !op.has_valid_interval() {
                return Err(ModelError::InvalidInterval {
                    id: op.id.clone(),
                    start: op.start,
                    end: op.end,
                });
            }
            if by_id.insert(op.id.clone(), op.clone()).is_some() {
                return Err(ModelError::DuplicateOperationId(op.id.clone()));
            }
        }

        let n = by_id.len();
        let mut graph = ConflictGraph {
            operations: by_id,
            matrix: vec![false; n * n],
            neighbors: vec![Vec::new(); n],
            edge_count: 0,
        };
        for i in 0..n {
            for j in (i + 1)..n {
                if graph.operations[i].overlaps(&graph.operations[j]) {
                    graph.add_edge(i, j);
                }
            }
        }
        debug!(
            operations = n,
            conflicts = graph.edge_count,
            "built conflict graph"
        );
        Ok(graph)
    }

    // j > i, so pushing keeps neighbor lists sorted
    fn add_edge(&mut self, i: usize, j: usize) {
        let n = self.operations.len();
        self.matrix[i * n + j] = true;
        self.matrix[j * n + i] = true;
        self.neighbors[i].push(j);
        self.neighbors[j].push(i);
        self.edge_count += 1;
    }

    /// Whether two operations conflict, false for unknown ids and for an operation with itself
    pub fn conflict(&self, a: &OperationId, b: &OperationId) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.conflict_at(i, j),
            _ => false,
        }
    }

    /// Index based variant of [`ConflictGraph::conflict`]
    pub fn conflict_at(&self, i: usize, j: usize) -> bool {
        let n = self.operations.len();
        i < n && j < n && self.matrix[i * n + j]
    }

    pub fn contains(&self, id: &OperationId) -> bool {
        self.operations.contains_key(id)
    }

    pub fn index_of(&self, id: &OperationId) -> Option<usize> {
        self.operations.get_index_of(id)
    }

    pub fn id_at(&self, index: usize) -> Option<&OperationId> {
        self.operations.get_index(index).map(|(id, _)| id)
    }

    pub fn operation(&self, id: &OperationId) -> Option<&Operation> {
        self.operations.get(id)
    }

    /// Operations in input order
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Operation ids in input order
    pub fn ids(&self) -> impl Iterator<Item = &OperationId> {
        self.operations.keys()
    }

    /// Ids of the operations that conflict with `id`, empty for unknown ids
    pub fn neighbors(&self, id: &OperationId) -> Vec<&OperationId> {
        self.index_of(id)
            .map(|i| {
                self.neighbors[i]
                    .iter()
                    .filter_map(|&j| self.id_at(j))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sorted neighbor indices of the operation at `index`
    pub fn neighbors_at(&self, index: usize) -> &[usize] {
        self.neighbors
            .get(index)
            .map(|n| n.as_slice())
            .unwrap_or(&[])
    }

    /// Every conflicting pair once, as (earlier, later) in input order
    pub fn conflicting_pairs(&self) -> impl Iterator<Item = (&OperationId, &OperationId)> + '_ {
        self.neighbors.iter().enumerate().flat_map(move |(i, ns)| {
            ns.iter().filter(move |&&j| j > i).filter_map(move |&j| {
                Some((self.id_at(i)?, self.id_at(j)?))
            })
        })
    }

    /// Ids sorted by non-decreasing start, ties kept in input order
    pub fn operations_by_start(&self) -> Vec<OperationId> {
        let mut ops: Vec<&Operation> = self.operations.values().collect();
        // sort_by_key is stable
        ops.sort_by_key(|op| op.start);
        ops.into_iter().map(|op| op.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}
