//! Costs of running an operation in a given resource
use indexmap::{IndexMap, IndexSet};

use crate::model::operation::OperationId;
use crate::model::resource::ResourceId;
use crate::model::ModelError;

/// Sparse table of (operation, resource) costs
///
/// An absent pair means the operation can't use that resource, it is never read as zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CostTable {
    entries: IndexMap<(OperationId, ResourceId), f64>,
}

impl CostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cost, replacing any previous entry for the pair
    ///
    /// # Parameters
    /// - `operation`: Operation the cost applies to
    /// - `resource`: Resource the cost applies to
    /// - `cost`: Nonnegative, finite cost
    ///
    /// # Examples
    /// ```rust
    /// use orsched_core::model::cost::CostTable;
    /// let mut table = CostTable::new();
    /// table.insert("op1", "Q1", 12.5).unwrap();
    /// assert!(table.insert("op1", "Q2", -1.).is_err());
    /// ```
    pub fn insert(
        &mut self,
        operation: impl Into<OperationId>,
        resource: impl Into<ResourceId>,
        cost: f64,
    ) -> Result<(), ModelError> {
        let operation = operation.into();
        let resource = resource.into();
        if !cost.is_finite() || cost < 0. {
            return Err(ModelError::InvalidCost {
                operation,
                resource,
                cost,
            });
        }
        self.entries.insert((operation, resource), cost);
        Ok(())
    }

    /// Cost of a pair, None if the pair has no entry
    pub fn get(&self, operation: &OperationId, resource: &ResourceId) -> Option<f64> {
        // IndexMap needs an owned key shape for tuple lookups
        self.entries
            .get(&(operation.clone(), resource.clone()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&OperationId, &ResourceId, f64)> {
        self.entries.iter().map(|((o, r), c)| (o, r, *c))
    }
}

/// Resolves costs from a [`CostTable`], surfacing missing entries as errors
#[derive(Clone, Debug)]
pub struct CostModel {
    table: CostTable,
    /// Resources in first seen order
    resources: IndexSet<ResourceId>,
}

impl CostModel {
    pub fn new(table: CostTable) -> Self {
        let resources = table.iter().map(|(_, r, _)| r.clone()).collect();
        Self { table, resources }
    }

    /// Cost of running `operation` in `resource`
    ///
    /// Fails with [`ModelError::MissingCost`] when the table has no entry for the pair.
    pub fn cost(&self, operation: &OperationId, resource: &ResourceId) -> Result<f64, ModelError> {
        self.table
            .get(operation, resource)
            .ok_or_else(|| ModelError::MissingCost {
                operation: operation.clone(),
                resource: resource.clone(),
            })
    }

    /// Resources that appear in the table, in first seen order
    pub fn resources(&self) -> Vec<ResourceId> {
        self.resources.iter().cloned().collect()
    }

    /// Average cost of an operation over the resources that have an entry for it
    ///
    /// Used as a resource independent cost when operations are grouped into schedules before
    /// knowing which room hosts them.
    pub fn mean_cost(&self, operation: &OperationId) -> Result<f64, ModelError> {
        let (sum, count) = self
            .table
            .iter()
            .filter(|(o, _, _)| *o == operation)
            .fold((0., 0usize), |(sum, count), (_, _, c)| (sum + c, count + 1));
        if count == 0 {
            return Err(ModelError::NoCostsForOperation(operation.clone()));
        }
        Ok(sum / count as f64)
    }

    /// Check every (operation, resource) pair has a cost, reporting the first missing one
    pub fn validate_complete<'a>(
        &self,
        operations: impl IntoIterator<Item = &'a OperationId>,
        resources: &[ResourceId],
    ) -> Result<(), ModelError> {
        for operation in operations {
            for resource in resources {
                self.cost(operation, resource)?;
            }
        }
        Ok(())
    }
}
