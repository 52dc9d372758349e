//! This module provides the Operation struct, a surgical operation with a fixed time slot
use std::fmt::{Display, Formatter};

use chrono::NaiveDateTime;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Identifier of an operation
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn new(id: impl Into<String>) -> Self {
        OperationId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        OperationId(value.to_string())
    }
}

/// Structure representing a scheduled surgical operation
///
/// The operation occupies its room over the half open interval `[start, end)`.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Used to identify the operation
    #[builder(setter(into))]
    pub id: OperationId,
    /// Surgical specialty, only used to select operations upstream of the solvers
    #[builder(setter(into, strip_option), default = "None")]
    pub specialty: Option<String>,
    /// Instant the operation starts
    pub start: NaiveDateTime,
    /// Instant the operation ends, must be strictly after `start`
    pub end: NaiveDateTime,
}

impl Operation {
    pub fn new(id: impl Into<OperationId>, start: NaiveDateTime, end: NaiveDateTime) -> Operation {
        Operation {
            id: id.into(),
            specialty: None,
            start,
            end,
        }
    }

    /// Whether `end` is strictly after `start`
    pub fn has_valid_interval(&self) -> bool {
        self.end > self.start
    }

    /// Whether the two operations can't share a room
    ///
    /// Intervals that only touch (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &Operation) -> bool {
        self.start < other.end && self.end > other.start
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{} - {})",
            self.id,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Keep the operations belonging to one of the given specialties, in their original order
///
/// Operations without a specialty are dropped.
pub fn filter_by_specialty(operations: &[Operation], specialties: &[&str]) -> Vec<Operation> {
    operations
        .iter()
        .filter(|op| {
            op.specialty
                .as_deref()
                .is_some_and(|s| specialties.contains(&s))
        })
        .cloned()
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn touching_intervals_do_not_overlap() {
        let ops = abc();
        assert!(ops[0].overlaps(&ops[1]));
        assert!(ops[1].overlaps(&ops[0]));
        assert!(ops[1].overlaps(&ops[2]));
        assert!(!ops[0].overlaps(&ops[2]));
        assert!(!ops[2].overlaps(&ops[0]));
    }

    #[test]
    fn builder_and_validity() {
        let operation = OperationBuilder::default()
            .id("OP-1")
            .specialty("Cardiología Pediátrica")
            .start(at(8, 0))
            .end(at(9, 15))
            .build()
            .unwrap();
        assert!(operation.has_valid_interval());
        assert_eq!(format!("{}", operation), "OP-1 [08:00 - 09:15)");

        let backwards = op("OP-2", (10, 0), (9, 0));
        assert!(!backwards.has_valid_interval());
        let empty = op("OP-3", (10, 0), (10, 0));
        assert!(!empty.has_valid_interval());
    }

    #[test]
    fn specialty_filter() {
        let mut ops = abc();
        ops[0].specialty = Some("Cirugía Cardiovascular".to_string());
        ops[2].specialty = Some("Cardiología Pediátrica".to_string());
        let kept = filter_by_specialty(&ops, &["Cardiología Pediátrica", "Cirugía Cardiovascular"]);
        let ids: Vec<_> = kept.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn serde_round_trip_keeps_interval() {
        let operation = op("A", (9, 0), (10, 0));
        let json = serde_json::to_string(&operation).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, operation);
    }
}
