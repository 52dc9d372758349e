//! Schedules (columns): groups of operations that can share one room
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictGraph;
use crate::model::operation::OperationId;
use crate::model::ModelError;
use crate::utils::hashing::hash_as_hex_string;

/// Identity of a schedule: its members, sorted
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleKey(Vec<OperationId>);

impl ScheduleKey {
    pub fn new<'a>(members: impl IntoIterator<Item = &'a OperationId>) -> Self {
        let mut ids: Vec<OperationId> = members.into_iter().cloned().collect();
        ids.sort();
        ids.dedup();
        ScheduleKey(ids)
    }
}

/// A set of operations with no pairwise conflict, plus its aggregate cost
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Members in the order they were added
    members: Vec<OperationId>,
    /// Aggregate cost of selecting this schedule
    pub cost: f64,
}

impl Schedule {
    /// Create a schedule, dropping repeated members
    ///
    /// This does not check the members against a conflict graph, see [`Schedule::validate`].
    pub fn new(members: impl IntoIterator<Item = OperationId>, cost: f64) -> Self {
        let mut unique: Vec<OperationId> = Vec::new();
        for id in members {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Schedule {
            members: unique,
            cost,
        }
    }

    pub fn members(&self) -> &[OperationId] {
        &self.members
    }

    pub fn contains(&self, operation: &OperationId) -> bool {
        self.members.contains(operation)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn key(&self) -> ScheduleKey {
        ScheduleKey::new(&self.members)
    }

    /// Id used for this schedule's variable in a master problem
    pub fn variable_id(&self) -> String {
        format!("schedule_{}", hash_as_hex_string(&self.key()))
    }

    /// Check every member is known to the graph and no two members conflict
    pub fn validate(&self, graph: &ConflictGraph) -> Result<(), ModelError> {
        if let Some(unknown) = self.members.iter().find(|id| !graph.contains(id)) {
            return Err(ModelError::UnknownOperationInColumn(unknown.clone()));
        }
        for (i, a) in self.members.iter().enumerate() {
            for b in &self.members[i + 1..] {
                if graph.conflict(a, b) {
                    return Err(ModelError::ConflictingSchedule(a.clone(), b.clone()));
                }
            }
        }
        Ok(())
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.members.iter().map(|id| id.as_str()).collect();
        write!(f, "{{{}}} cost {}", ids.join(", "), self.cost)
    }
}

/// Append only pool of schedules
///
/// A schedule's position in the pool is its column index in master problems built over the
/// pool. Schedules are never removed or modified, and a member set is stored at most once.
#[derive(Clone, Debug, Default)]
pub struct ColumnPool {
    columns: Vec<Schedule>,
    keys: HashSet<ScheduleKey>,
}

impl ColumnPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schedule, returning false (and leaving the pool untouched) if its member set is
    /// already present
    pub fn insert(&mut self, schedule: Schedule) -> bool {
        if !self.keys.insert(schedule.key()) {
            return false;
        }
        self.columns.push(schedule);
        true
    }

    pub fn contains(&self, key: &ScheduleKey) -> bool {
        self.keys.contains(key)
    }

    pub fn get(&self, index: usize) -> Option<&Schedule> {
        self.columns.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schedule> {
        self.columns.iter()
    }

    pub fn as_slice(&self) -> &[Schedule] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<Schedule> for ColumnPool {
    fn from_iter<T: IntoIterator<Item = Schedule>>(iter: T) -> Self {
        let mut pool = ColumnPool::new();
        for schedule in iter {
            pool.insert(schedule);
        }
        pool
    }
}
