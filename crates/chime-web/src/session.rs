#![forbid(unsafe_code)]

//! Host-driven dashboard session.
//!
//! [`WebSession`] stands in for the browser page: it holds what the address
//! bar and the sidebar widgets currently show, queues the events they fire,
//! and routes the reconciler's commands back into them the way a browser
//! would. Writing the hash fires a hash change; setting widget values fires
//! a form submission. Those echoes are absorbed by the reconciler's
//! idempotence guards, so a session always settles.
//!
//! # Determinism contract
//!
//! Time only moves through [`DeterministicClock`]. Each dispatch is stamped
//! with a strictly increasing timestamp (the clock, or one past the previous
//! stamp when the clock has not moved), so two browser events never share a
//! modification time.
//!
//! # Example
//!
//! ```ignore
//! let mut session = WebSession::new(&DashboardConfig::default(), model);
//! session.clock_mut().set_millis(1_000);
//! session.push_hash("#n_days=60");
//! session.run_until_idle()?;
//! assert_eq!(session.outcome().label(), "rendered");
//! ```

use std::collections::VecDeque;

use chime_core::{FieldValues, FormCodec, RawValue, Submission, Timestamp};
use chime_runtime::{
    Clock, DashboardConfig, Reconciler, Simulation, SimulationTrigger, SyncCmd, SyncError,
    SyncEvent, TriggerOutcome,
};
use thiserror::Error;
use tracing::{debug, info_span};

use crate::DeterministicClock;
use crate::export::export_href;

/// Upper bound on events one [`WebSession::run_until_idle`] call may process.
pub const MAX_SETTLE_STEPS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("session did not settle within {steps} events")]
    NotSettled { steps: usize },
}

/// What one [`WebSession::step`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Commands returned by the reconciler, in order.
    pub commands: Vec<SyncCmd>,
    /// Events the commands fed back into the inbox.
    pub echoed: usize,
    /// Whether the simulation trigger ran.
    pub rendered: bool,
}

/// One dashboard page, driven by the host.
pub struct WebSession<S> {
    clock: DeterministicClock,
    reconciler: Reconciler,
    trigger: SimulationTrigger<S>,
    inbox: VecDeque<SyncEvent>,
    location_hash: String,
    form: Submission,
    outcome: TriggerOutcome,
    last_stamp: Option<Timestamp>,
}

impl<S: Simulation> WebSession<S> {
    /// Start a session on an empty page. Rendering starts suspended.
    #[must_use]
    pub fn new(config: &DashboardConfig, simulation: S) -> Self {
        let reconciler = Reconciler::from_config(config);
        let mut trigger = SimulationTrigger::from_config(config, simulation);
        let outcome = trigger.on_root_changed(reconciler.root().snapshot());
        Self {
            clock: DeterministicClock::new(),
            reconciler,
            trigger,
            inbox: VecDeque::new(),
            location_hash: String::new(),
            form: Submission::new(),
            outcome,
            last_stamp: None,
        }
    }

    pub fn clock_mut(&mut self) -> &mut DeterministicClock {
        &mut self.clock
    }

    #[must_use]
    pub fn codec(&self) -> &FormCodec {
        self.reconciler.codec()
    }

    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// What the address bar shows.
    #[must_use]
    pub fn location_hash(&self) -> &str {
        &self.location_hash
    }

    /// What the sidebar widgets show, in transport form.
    #[must_use]
    pub fn form(&self) -> &Submission {
        &self.form
    }

    /// Normalized view of [`form`](Self::form).
    #[must_use]
    pub fn form_values(&self) -> FieldValues {
        self.codec().normalize(&self.form)
    }

    /// Latest render outcome.
    #[must_use]
    pub fn outcome(&self) -> &TriggerOutcome {
        &self.outcome
    }

    /// Times the simulation has run.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.trigger.runs()
    }

    /// PDF export link for the current root store.
    #[must_use]
    pub fn export_href(&self) -> String {
        export_href(self.codec(), self.reconciler.root().snapshot())
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// The user navigated or pasted a URL.
    pub fn push_hash(&mut self, fragment: impl Into<String>) {
        let fragment = fragment.into();
        self.location_hash.clone_from(&fragment);
        self.inbox.push_back(SyncEvent::HashChanged(fragment));
    }

    /// Replace every widget value at once and fire a submission.
    pub fn push_submission(&mut self, form: Submission) {
        self.form = form;
        self.inbox
            .push_back(SyncEvent::FieldsSubmitted(self.form.clone()));
    }

    /// The user changed one widget.
    pub fn edit(&mut self, field: &str, raw: impl Into<RawValue>) {
        self.form.insert(field, raw);
        self.inbox
            .push_back(SyncEvent::FieldsSubmitted(self.form.clone()));
    }

    /// Process one queued event. Returns `None` when the inbox is empty.
    ///
    /// # Errors
    ///
    /// A reconciler error; the session keeps its state and the inbox keeps
    /// any events not yet processed.
    pub fn step(&mut self) -> Result<Option<StepReport>, SessionError> {
        let Some(event) = self.inbox.pop_front() else {
            return Ok(None);
        };
        let now = self.next_stamp();
        let _span = info_span!("session.step", event = event.kind(), at = %now).entered();

        let commands = self.reconciler.dispatch(event, now)?;
        let mut report = StepReport::default();
        for cmd in &commands {
            match cmd {
                SyncCmd::WriteHash(hash) => {
                    self.location_hash.clone_from(hash);
                    self.inbox.push_back(SyncEvent::HashChanged(hash.clone()));
                    report.echoed += 1;
                }
                SyncCmd::SetFormFields(fields) => {
                    for (name, raw) in fields.iter() {
                        self.form.insert(name, raw.clone());
                    }
                    self.inbox
                        .push_back(SyncEvent::FieldsSubmitted(self.form.clone()));
                    report.echoed += 1;
                }
                SyncCmd::RootChanged(root) => {
                    self.outcome = self.trigger.on_root_changed(root);
                    report.rendered = true;
                }
            }
        }
        debug!(commands = commands.len(), echoed = report.echoed, "step applied");
        report.commands = commands;
        Ok(Some(report))
    }

    /// Step until the inbox is empty. Returns the number of events processed.
    ///
    /// # Errors
    ///
    /// A reconciler error, or [`SessionError::NotSettled`] after
    /// [`MAX_SETTLE_STEPS`] events.
    pub fn run_until_idle(&mut self) -> Result<usize, SessionError> {
        let mut steps = 0;
        while self.step()?.is_some() {
            steps += 1;
            if steps >= MAX_SETTLE_STEPS && !self.inbox.is_empty() {
                return Err(SessionError::NotSettled { steps });
            }
        }
        Ok(steps)
    }

    fn next_stamp(&mut self) -> Timestamp {
        let now = self.clock.now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => Timestamp::from_millis(last.as_millis().saturating_add(1)),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}
