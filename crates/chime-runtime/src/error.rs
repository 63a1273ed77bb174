#![forbid(unsafe_code)]

use chime_core::Timestamp;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Fatal outcome of a reconciliation dispatch.
///
/// Either variant aborts the dispatch and discards its queued follow-ups.
/// Store writes already applied by earlier passes of the same dispatch stay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(
        "root and sidebar stores differ but neither has a timestamp \
         (root={}, sidebar={})",
        describe(.root),
        describe(.sidebar)
    )]
    InvariantViolation {
        root: Option<Timestamp>,
        sidebar: Option<Timestamp>,
    },

    #[error("dispatch exceeded its budget of {budget} passes")]
    PassBudgetExceeded { budget: usize },
}

fn describe(at: &Option<Timestamp>) -> String {
    at.map_or_else(|| "never".to_owned(), |at| at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_message_names_both_timestamps() {
        let err = SyncError::InvariantViolation {
            root: None,
            sidebar: None,
        };
        assert_eq!(
            err.to_string(),
            "root and sidebar stores differ but neither has a timestamp (root=never, sidebar=never)"
        );
    }

    #[test]
    fn budget_message() {
        let err = SyncError::PassBudgetExceeded { budget: 64 };
        assert_eq!(err.to_string(), "dispatch exceeded its budget of 64 passes");
    }
}
