use std::path::PathBuf;

use chime_core::ValidationErrors;
use chime_runtime::{ConfigError, SyncError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("replay step {step} did not settle within {limit} events")]
    NotSettled { step: usize, limit: usize },

    #[error("cannot read replay script {}: {source}", .path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Sync(_) | Self::NotSettled { .. } => 3,
            Self::Config(_) => 4,
            Self::Io(_) | Self::Json(_) | Self::Script { .. } => 1,
        }
    }
}
