#![forbid(unsafe_code)]

//! Timestamped store snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{FieldValue, FieldValues};

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Contents of one store at a point in time.
///
/// Snapshots are replaced wholesale, never patched. A snapshot with no
/// values is "absent": the store has not received data yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub values: FieldValues,
    pub modified_at: Option<Timestamp>,
}

impl StoreSnapshot {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(values: FieldValues, modified_at: Timestamp) -> Self {
        Self {
            values,
            modified_at: Some(modified_at),
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.values.is_empty()
    }

    /// Value equality, ignoring timestamps and key order.
    #[must_use]
    pub fn same_values(&self, other: &Self) -> bool {
        self.values == other.values
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }
}
