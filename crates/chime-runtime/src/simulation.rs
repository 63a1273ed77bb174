#![forbid(unsafe_code)]

//! Boundary to the external simulation model.
//!
//! The model itself lives elsewhere; this module defines what it consumes
//! ([`ParsedParameters`]), what it produces ([`SimulationOutput`]), and the
//! [`SimulationTrigger`] that runs it whenever the root store changes.
//!
//! # Failure Modes
//!
//! - **Empty root store**: rendering is suspended; the model is not called.
//! - **Invalid fields**: reported per field as [`TriggerOutcome::Invalid`].
//! - **Model error**: reported as [`TriggerOutcome::Failed`].
//!
//! None of these panic or abort the session.

use chime_core::{FormCodec, ParsedParameters, StoreSnapshot, ValidationErrors};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::config::DashboardConfig;
use crate::render::RenderPlan;

/// One row of a result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Days since the start of the projection; may be negative for history.
    pub day: i64,
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

/// Projection keyed by day and date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    /// Names of the value columns, excluding `day` and `date`.
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl ResultTable {
    /// Rows whose day is a multiple of `stride`. A zero stride keeps every row.
    #[must_use]
    pub fn sampled(&self, stride: u32) -> Self {
        let stride = i64::from(stride.max(1));
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| row.day.rem_euclid(stride) == 0)
                .cloned()
                .collect(),
        }
    }
}

/// Everything the model returns for one parameter set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationOutput {
    pub admissions: ResultTable,
    pub census: ResultTable,
    pub sir: ResultTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("simulation rejected parameters: {0}")]
    Rejected(String),

    #[error("simulation failed: {0}")]
    Failed(String),
}

/// External projection model.
pub trait Simulation {
    /// Run the model for `params`.
    ///
    /// # Errors
    ///
    /// Any model-side failure; it is reported, never propagated as a panic.
    fn run(&self, params: &ParsedParameters) -> Result<SimulationOutput, SimulationError>;
}

impl<F> Simulation for F
where
    F: Fn(&ParsedParameters) -> Result<SimulationOutput, SimulationError>,
{
    fn run(&self, params: &ParsedParameters) -> Result<SimulationOutput, SimulationError> {
        self(params)
    }
}

/// Result of reacting to one root-store state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// Root store is empty; nothing rendered.
    Suspended,
    /// Root store values failed validation.
    Invalid { errors: ValidationErrors },
    /// The model ran and produced a plan.
    Rendered { plan: Box<RenderPlan> },
    /// The model returned an error.
    Failed { message: String },
}

impl TriggerOutcome {
    #[must_use]
    pub fn plan(&self) -> Option<&RenderPlan> {
        match self {
            Self::Rendered { plan } => Some(plan),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Suspended => "suspended",
            Self::Invalid { .. } => "invalid",
            Self::Rendered { .. } => "rendered",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Runs the model whenever the root store changes.
#[derive(Debug, Clone)]
pub struct SimulationTrigger<S> {
    codec: FormCodec,
    simulation: S,
    table_stride: u32,
    runs: u64,
}

impl<S: Simulation> SimulationTrigger<S> {
    #[must_use]
    pub fn new(codec: FormCodec, simulation: S, table_stride: u32) -> Self {
        Self {
            codec,
            simulation,
            table_stride,
            runs: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &DashboardConfig, simulation: S) -> Self {
        Self::new(config.codec(), simulation, config.render.table_stride)
    }

    /// Number of times the model has been invoked.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    #[must_use]
    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    /// React to a new root-store snapshot.
    pub fn on_root_changed(&mut self, root: &StoreSnapshot) -> TriggerOutcome {
        let _span = info_span!("simulation.trigger", fields = root.values.len()).entered();
        if root.is_absent() {
            debug!("root store empty; rendering suspended");
            return TriggerOutcome::Suspended;
        }
        let params = match self.codec.to_parameters(&root.values) {
            Ok(params) => params,
            Err(errors) => {
                warn!(%errors, "root store failed validation");
                return TriggerOutcome::Invalid { errors };
            }
        };
        let display = self.codec.display_options(&root.values);

        self.runs += 1;
        match self.simulation.run(&params) {
            Ok(output) => {
                info!(run = self.runs, n_days = params.n_days, "simulation rendered");
                TriggerOutcome::Rendered {
                    plan: Box::new(RenderPlan::build(
                        &output,
                        &params,
                        display,
                        self.table_stride,
                    )),
                }
            }
            Err(err) => {
                warn!(%err, "simulation failed");
                TriggerOutcome::Failed {
                    message: err.to_string(),
                }
            }
        }
    }
}
