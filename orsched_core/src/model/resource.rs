//! Resources are interchangeable operating rooms, identified only by their id
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identifier of a resource (operating room)
///
/// Kept distinct from [`OperationId`](crate::model::operation::OperationId) so the two can't be
/// mixed up in cost lookups.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        ResourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        ResourceId(value.to_string())
    }
}
