#![forbid(unsafe_code)]

//! Reconciliation of the root store, sidebar store and location hash.
//!
//! # Design
//!
//! A [`Reconciler`] owns both stores and the last known location hash. The
//! host feeds it [`SyncEvent`]s; each event runs one synchronous pass, and a
//! pass may schedule follow-up passes on an internal FIFO queue. Passes never
//! touch the host: they return [`SyncCmd`]s that the host applies (write the
//! hash, push values into widgets, re-render).
//!
//! Which store wins a comparison is decided by [`compare`]:
//!
//! | root \ sidebar | absent      | never stamped | stamped `s`          |
//! |----------------|-------------|---------------|----------------------|
//! | never stamped  | root        | **fatal**     | sidebar              |
//! | stamped `r`    | root        | root          | root if `r >= s`     |
//!
//! Equal values short-circuit to [`Decision::InSync`] before the table.
//!
//! # Invariants
//!
//! 1. Comparing stores with equal values produces no write and no command.
//! 2. A hash equal to the root store's encoding is never applied again.
//!    Switches a hash leaves out count as off, both when comparing and when
//!    the hash is applied, so root always holds what the form will report.
//! 3. A submission equal to the sidebar snapshot is suppressed.
//! 4. Root only changes through a hash pass or a sidebar win, and every root
//!    change emits exactly one [`SyncCmd::RootChanged`].
//!
//! # Failure Modes
//!
//! - **Both timestamps absent, values differ**: [`SyncError::InvariantViolation`].
//!   Logged at `error`; the rest of the dispatch is discarded.
//! - **Failed dispatch**: writes made by earlier passes of the same dispatch
//!   are rolled back, since their commands never reach the host.
//! - **Runaway follow-ups**: more passes than the configured budget yields
//!   [`SyncError::PassBudgetExceeded`] instead of looping forever.

use std::collections::VecDeque;

use chime_core::{FormCodec, StoreSnapshot, Submission, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span};

use crate::config::{DashboardConfig, SyncConfig};
use crate::error::{Result, SyncError};
use crate::store::Store;

pub const ROOT_STORE: &str = "root-store";
pub const SIDEBAR_STORE: &str = "sidebar-store";

/// Input to one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEvent {
    /// The browser location hash changed (navigation, paste, or our own write).
    HashChanged(String),
    /// A tracked sidebar field changed; carries every tracked field's raw value.
    FieldsSubmitted(Submission),
    /// One of the stores was replaced.
    StoresChanged,
}

impl SyncEvent {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HashChanged(_) => "hash_changed",
            Self::FieldsSubmitted(_) => "fields_submitted",
            Self::StoresChanged => "stores_changed",
        }
    }
}

/// Side effect for the host to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncCmd {
    /// Set `window.location.hash`.
    WriteHash(String),
    /// Push values into the bound sidebar widgets.
    SetFormFields(Submission),
    /// The root store was replaced; downstream views should re-render.
    RootChanged(StoreSnapshot),
}

/// Outcome of comparing the two stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    InSync,
    RootWins,
    SidebarWins,
}

/// Decide which store is authoritative.
///
/// # Errors
///
/// [`SyncError::InvariantViolation`] when the values differ and neither store
/// was ever stamped.
pub fn compare(root: &StoreSnapshot, sidebar: &StoreSnapshot) -> Result<Decision> {
    if root.same_values(sidebar) {
        return Ok(Decision::InSync);
    }
    if sidebar.is_absent() {
        return Ok(Decision::RootWins);
    }
    match (root.modified_at, sidebar.modified_at) {
        (Some(r), Some(s)) if r >= s => Ok(Decision::RootWins),
        (Some(_), Some(_)) | (None, Some(_)) => Ok(Decision::SidebarWins),
        (Some(_), None) => Ok(Decision::RootWins),
        (None, None) => Err(SyncError::InvariantViolation {
            root: None,
            sidebar: None,
        }),
    }
}

/// Session-scoped reconciliation service.
#[derive(Debug, Clone)]
pub struct Reconciler {
    codec: FormCodec,
    root: Store,
    sidebar: Store,
    location_hash: String,
    queue: VecDeque<SyncEvent>,
    max_passes: usize,
}

impl Reconciler {
    #[must_use]
    pub fn new(codec: FormCodec, sync: &SyncConfig) -> Self {
        Self {
            codec,
            root: Store::new(ROOT_STORE),
            sidebar: Store::new(SIDEBAR_STORE),
            location_hash: String::new(),
            queue: VecDeque::new(),
            max_passes: sync.max_passes_per_dispatch,
        }
    }

    #[must_use]
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.codec(), &config.sync)
    }

    #[must_use]
    pub fn codec(&self) -> &FormCodec {
        &self.codec
    }

    #[must_use]
    pub fn root(&self) -> &Store {
        &self.root
    }

    #[must_use]
    pub fn sidebar(&self) -> &Store {
        &self.sidebar
    }

    /// Last hash seen or written.
    #[must_use]
    pub fn location_hash(&self) -> &str {
        &self.location_hash
    }

    /// Load persisted store contents, e.g. after a page reload.
    ///
    /// No pass runs; dispatch [`SyncEvent::StoresChanged`] to reconcile.
    pub fn restore(&mut self, root: StoreSnapshot, sidebar: StoreSnapshot) {
        self.root.replace(root);
        self.sidebar.replace(sidebar);
    }

    /// Run `event` and every follow-up pass it schedules.
    ///
    /// Commands are returned in the order the passes produced them.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`] aborts the dispatch and clears the queue. Its
    /// commands are discarded, so the stores and the location hash are rolled
    /// back to what they were before `event`.
    pub fn dispatch(&mut self, event: SyncEvent, now: Timestamp) -> Result<Vec<SyncCmd>> {
        let checkpoint = Checkpoint {
            root: self.root.clone(),
            sidebar: self.sidebar.clone(),
            location_hash: self.location_hash.clone(),
        };
        self.queue.clear();
        self.queue.push_back(event);

        let result = self.drain(now);
        if result.is_err() {
            self.queue.clear();
            self.root = checkpoint.root;
            self.sidebar = checkpoint.sidebar;
            self.location_hash = checkpoint.location_hash;
        }
        result
    }

    fn drain(&mut self, now: Timestamp) -> Result<Vec<SyncCmd>> {
        let mut cmds = Vec::new();
        let mut passes = 0_usize;
        while let Some(event) = self.queue.pop_front() {
            passes += 1;
            if passes > self.max_passes {
                error!(budget = self.max_passes, "pass budget exhausted");
                return Err(SyncError::PassBudgetExceeded {
                    budget: self.max_passes,
                });
            }
            let _span = info_span!("reconcile.pass", event = event.kind(), pass = passes).entered();
            self.pass(event, now, &mut cmds)?;
        }
        Ok(cmds)
    }

    fn pass(&mut self, event: SyncEvent, now: Timestamp, cmds: &mut Vec<SyncCmd>) -> Result<()> {
        match event {
            SyncEvent::HashChanged(fragment) => {
                self.on_hash_changed(fragment, now, cmds);
                Ok(())
            }
            SyncEvent::FieldsSubmitted(submission) => {
                self.on_fields_submitted(&submission, now);
                Ok(())
            }
            SyncEvent::StoresChanged => self.on_stores_changed(now, cmds),
        }
    }

    fn on_hash_changed(&mut self, fragment: String, now: Timestamp, cmds: &mut Vec<SyncCmd>) {
        let values = self.codec.decode_fragment(&fragment);
        self.location_hash = fragment;
        if values.is_empty() {
            debug!("empty hash ignored");
            return;
        }
        // A hash may omit switches; the form reports them as off.
        let values = self.codec.with_switches(values);
        if &values == self.root.values() {
            debug!("hash matches root store");
            return;
        }
        info!(fields = values.len(), "hash applied to root store");
        self.root.publish(values, now);
        cmds.push(SyncCmd::RootChanged(self.root.snapshot().clone()));
        self.queue.push_back(SyncEvent::StoresChanged);
    }

    fn on_fields_submitted(&mut self, submission: &Submission, now: Timestamp) {
        let values = self.codec.normalize(submission);
        if &values == self.sidebar.values() {
            debug!("submission identical to sidebar store; suppressed");
            return;
        }
        debug!(fields = values.len(), "sidebar store updated");
        self.sidebar.publish(values, now);
        self.queue.push_back(SyncEvent::StoresChanged);
    }

    fn on_stores_changed(&mut self, now: Timestamp, cmds: &mut Vec<SyncCmd>) -> Result<()> {
        let root_at = self.root.modified_at();
        let sidebar_at = self.sidebar.modified_at();
        let decision = compare(self.root.snapshot(), self.sidebar.snapshot()).inspect_err(|err| {
            error!(?root_at, ?sidebar_at, %err, "store comparison invariant violated");
        })?;

        match decision {
            Decision::InSync => {
                debug!("stores in sync");
            }
            Decision::RootWins => {
                info!(?root_at, ?sidebar_at, "root store wins; syncing sidebar");
                let values = self.root.values().clone();
                cmds.push(SyncCmd::SetFormFields(self.codec.to_submission(&values)));
                self.sidebar.publish(values, now);
                self.queue.push_back(SyncEvent::StoresChanged);
            }
            Decision::SidebarWins => {
                info!(?root_at, ?sidebar_at, "sidebar store wins; syncing root and hash");
                let values = self.sidebar.values().clone();
                let hash = self.codec.encode_fragment(&values);
                self.root.publish(values, now);
                self.location_hash.clone_from(&hash);
                cmds.push(SyncCmd::WriteHash(hash));
                cmds.push(SyncCmd::RootChanged(self.root.snapshot().clone()));
                self.queue.push_back(SyncEvent::StoresChanged);
            }
        }
        Ok(())
    }
}

/// Reconciler state captured before a dispatch.
struct Checkpoint {
    root: Store,
    sidebar: Store,
    location_hash: String,
}
