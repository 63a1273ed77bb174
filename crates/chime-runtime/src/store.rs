#![forbid(unsafe_code)]

//! Versioned, wholesale-replaced snapshot store.
//!
//! Each of the dashboard's stores (`root-store`, `sidebar-store`) is a
//! [`Store`]: one [`StoreSnapshot`] plus a version counter bumped on every
//! effective replacement. There is no patching; callers hand in a complete
//! new snapshot.
//!
//! # Invariants
//!
//! 1. `version` increments by exactly 1 on each replacement that changes the
//!    snapshot (values or timestamp).
//! 2. Replacing with an identical snapshot is a no-op.

use chime_core::{FieldValues, StoreSnapshot, Timestamp};
use tracing::trace;

/// A named snapshot cell with change versioning.
#[derive(Debug, Clone)]
pub struct Store {
    name: &'static str,
    snapshot: StoreSnapshot,
    version: u64,
}

impl Store {
    /// Create an empty (absent) store.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            snapshot: StoreSnapshot::empty(),
            version: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn values(&self) -> &FieldValues {
        &self.snapshot.values
    }

    #[must_use]
    pub fn modified_at(&self) -> Option<Timestamp> {
        self.snapshot.modified_at
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.snapshot.is_absent()
    }

    /// Current version. Increments by 1 on each effective replacement.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the snapshot wholesale. Returns whether anything changed.
    pub fn replace(&mut self, snapshot: StoreSnapshot) -> bool {
        if self.snapshot == snapshot {
            return false;
        }
        self.snapshot = snapshot;
        self.version += 1;
        trace!(
            store = self.name,
            version = self.version,
            fields = self.snapshot.values.len(),
            "store replaced"
        );
        true
    }

    /// Replace with `values` stamped at `at`.
    pub fn publish(&mut self, values: FieldValues, at: Timestamp) -> bool {
        self.replace(StoreSnapshot::new(values, at))
    }
}
