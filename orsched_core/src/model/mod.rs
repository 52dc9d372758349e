//! This module provides the data model for operating room assignment: operations, resources,
//! costs and schedules.

pub mod cost;
pub mod operation;
pub mod resource;
pub mod schedule;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::model::operation::OperationId;
use crate::model::resource::ResourceId;

/// Errors raised while validating input data, before any model is handed to a solver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// An operation does not end strictly after it starts
    #[error("Operation {id} has an invalid interval: end {end} is not after start {start}")]
    InvalidInterval {
        id: OperationId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// A cost was required for a pair with no entry in the cost table
    #[error("No cost for operation {operation} in resource {resource}")]
    MissingCost {
        operation: OperationId,
        resource: ResourceId,
    },
    /// An operation has no cost entry for any resource
    #[error("No costs at all for operation {0}")]
    NoCostsForOperation(OperationId),
    /// A cost is negative or not a finite number
    #[error("Invalid cost {cost} for operation {operation} in resource {resource}")]
    InvalidCost {
        operation: OperationId,
        resource: ResourceId,
        cost: f64,
    },
    /// Two operations share an id
    #[error("Operation id {0} appears more than once")]
    DuplicateOperationId(OperationId),
    /// An id that isn't in the operation set was used
    #[error("Unknown operation {0}")]
    UnknownOperation(OperationId),
    /// A schedule references an operation that isn't in the operation set
    #[error("Schedule references unknown operation {0}")]
    UnknownOperationInColumn(OperationId),
    /// A schedule contains two operations whose intervals overlap
    #[error("Schedule contains conflicting operations {0} and {1}")]
    ConflictingSchedule(OperationId, OperationId),
}
