#![forbid(unsafe_code)]

//! Dashboard configuration as data.
//!
//! Everything tunable about a dashboard session lives in one
//! [`DashboardConfig`] loadable from TOML or JSON.
//!
//! # Loading
//!
//! ```toml
//! # chime.toml
//! [defaults]
//! population = 1200000
//! market_share = 20.0
//!
//! [sync]
//! max_passes_per_dispatch = 32
//!
//! [render]
//! table_stride = 14
//!
//! [logging]
//! filter = "chime_runtime=debug"
//! format = "json"
//! ```
//!
//! ```rust,ignore
//! let config = DashboardConfig::from_toml_file("chime.toml")?.validated()?;
//! ```
//!
//! # Defaults
//!
//! Every field has a default, so an empty file is a valid configuration and
//! `DashboardConfig::default()` matches the stock CHIME sidebar.

use std::path::{Path, PathBuf};

use chime_core::{ChimeDefaults, FieldValues, FormCodec, FormSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level DashboardConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Default values for the sidebar inputs.
    pub defaults: ChimeDefaults,

    /// Reconciliation limits.
    pub sync: SyncConfig,

    /// Render plan shaping.
    pub render: RenderConfig,

    /// Log filter and output format.
    pub logging: LoggingConfig,
}

impl DashboardConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    /// Load by extension: `.json` is JSON, anything else is TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of problems. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.sync.max_passes_per_dispatch < MIN_PASSES_PER_DISPATCH {
            errors.push(format!(
                "sync.max_passes_per_dispatch must be >= {MIN_PASSES_PER_DISPATCH} \
                 (an edit or hash load takes three passes to settle), got {}",
                self.sync.max_passes_per_dispatch
            ));
        }
        if self.render.table_stride == 0 {
            errors.push("render.table_stride must be >= 1".to_owned());
        }
        if self.logging.filter.trim().is_empty() {
            errors.push("logging.filter must not be empty".to_owned());
        }

        // Defaults must themselves pass field validation.
        if let Err(invalid) = self.codec().to_parameters(&FieldValues::new()) {
            errors.extend(
                invalid
                    .errors()
                    .iter()
                    .map(|e| format!("defaults.{e}")),
            );
        }

        errors
    }

    /// Return `self` if [`validate`](Self::validate) finds nothing.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Sidebar schema with the configured defaults.
    #[must_use]
    pub fn schema(&self) -> FormSchema {
        FormSchema::chime(&self.defaults)
    }

    /// Codec over [`schema`](Self::schema).
    #[must_use]
    pub fn codec(&self) -> FormCodec {
        FormCodec::new(self.schema().into())
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Passes needed by a single edit or hash load: apply, propagate, confirm.
pub const MIN_PASSES_PER_DISPATCH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Passes one external event may cause before the dispatch is aborted.
    pub max_passes_per_dispatch: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_passes_per_dispatch: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Keep every n-th day in the result tables.
    pub table_stride: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { table_stride: 7 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
