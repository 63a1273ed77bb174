#![forbid(unsafe_code)]

//! Runtime: stores, reconciliation, and the simulation trigger.
//!
//! # Role in the dashboard
//! `chime-runtime` keeps the three views of the sidebar state consistent.
//! A session owns one [`Reconciler`] (root store, sidebar store, last known
//! location hash) and one [`SimulationTrigger`]. The host feeds browser
//! events in as [`SyncEvent`]s and applies the [`SyncCmd`]s that come back;
//! every [`SyncCmd::RootChanged`] is handed to the trigger, which validates
//! the root store and runs the external model.
//!
//! # Key components
//! - [`store`]: versioned snapshot cells.
//! - [`reconcile`]: the tie-break protocol and its event queue.
//! - [`simulation`]: the model boundary and render outcomes.
//! - [`render`]: sampled tables, CSV links, visibility flags.
//! - [`config`]: TOML/JSON configuration with validation.
//! - [`clock`]: timestamp source.

pub mod clock;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod render;
pub mod simulation;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use config::{
    ConfigError, DashboardConfig, LogFormat, LoggingConfig, MIN_PASSES_PER_DISPATCH, RenderConfig,
    SyncConfig,
};
pub use error::{Result, SyncError};
pub use reconcile::{Decision, Reconciler, SyncCmd, SyncEvent, compare};
pub use render::{RenderPlan, TableView};
pub use simulation::{
    ResultTable, Simulation, SimulationError, SimulationOutput, SimulationTrigger, TableRow,
    TriggerOutcome,
};
pub use store::Store;
