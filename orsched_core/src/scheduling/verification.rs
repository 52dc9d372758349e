//! Independent checks of reported assignments and schedule selections
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::conflict::ConflictGraph;
use crate::model::operation::OperationId;
use crate::model::resource::ResourceId;
use crate::model::schedule::Schedule;

/// A problem found in a reported solution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    /// No selected schedule contains the operation
    Uncovered(OperationId),
    /// The assignment has no resource for the operation
    Unassigned(OperationId),
    /// The solution mentions an operation the graph doesn't know
    UnknownOperation(OperationId),
    /// Two conflicting operations were put in the same resource
    SharedResource {
        resource: ResourceId,
        first: OperationId,
        second: OperationId,
    },
    /// Two conflicting operations were put in the same schedule
    SharedSchedule {
        schedule: usize,
        first: OperationId,
        second: OperationId,
    },
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::Uncovered(id) => write!(f, "operation {} is not covered", id),
            Violation::Unassigned(id) => write!(f, "operation {} has no resource", id),
            Violation::UnknownOperation(id) => write!(f, "unknown operation {}", id),
            Violation::SharedResource {
                resource,
                first,
                second,
            } => write!(f, "{} and {} overlap in resource {}", first, second, resource),
            Violation::SharedSchedule {
                schedule,
                first,
                second,
            } => write!(f, "{} and {} overlap in schedule {}", first, second, schedule),
        }
    }
}

/// Check an operation to resource assignment against the conflict graph
///
/// Returns every violation found, an empty list means the assignment is valid.
pub fn verify_assignment(
    graph: &ConflictGraph,
    assignment: &IndexMap<OperationId, ResourceId>,
) -> Vec<Violation> {
    let mut violations: Vec<Violation> = assignment
        .keys()
        .filter(|id| !graph.contains(id))
        .map(|id| Violation::UnknownOperation(id.clone()))
        .collect();
    violations.extend(
        graph
            .ids()
            .filter(|id| !assignment.contains_key(*id))
            .map(|id| Violation::Unassigned(id.clone())),
    );

    let mut by_resource: IndexMap<&ResourceId, Vec<&OperationId>> = IndexMap::new();
    for (op, res) in assignment {
        by_resource.entry(res).or_default().push(op);
    }
    for (resource, ops) in by_resource {
        for (i, first) in ops.iter().enumerate() {
            for second in &ops[i + 1..] {
                if graph.conflict(first, second) {
                    violations.push(Violation::SharedResource {
                        resource: resource.clone(),
                        first: (*first).clone(),
                        second: (*second).clone(),
                    });
                }
            }
        }
    }
    violations
}

/// Check that the selected schedules cover every operation without internal conflicts
pub fn verify_cover(graph: &ConflictGraph, schedules: &[Schedule]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (k, schedule) in schedules.iter().enumerate() {
        let members = schedule.members();
        for (i, first) in members.iter().enumerate() {
            if !graph.contains(first) {
                violations.push(Violation::UnknownOperation(first.clone()));
                continue;
            }
            for second in &members[i + 1..] {
                if graph.conflict(first, second) {
                    violations.push(Violation::SharedSchedule {
                        schedule: k,
                        first: first.clone(),
                        second: second.clone(),
                    });
                }
            }
        }
    }
    violations.extend(
        graph
            .ids()
            .filter(|id| !schedules.iter().any(|s| s.contains(id)))
            .map(|id| Violation::Uncovered(id.clone())),
    );
    violations
}
