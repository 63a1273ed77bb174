#![forbid(unsafe_code)]

//! Validation errors raised while turning field values into parameters.
//!
//! Errors are collected per field so the sidebar can show each message next
//! to the input that caused it.

use serde::Serialize;
use thiserror::Error;

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldError {
    #[error("{field}: a value is required")]
    Missing { field: String },

    #[error("{field}: {value} is outside {}", describe_range(.min, .max))]
    OutOfRange {
        field: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("{field}: expected a number, got {raw:?}")]
    NotANumber { field: String, raw: String },

    #[error("{field}: expected a whole number, got {value}")]
    NotAnInteger { field: String, value: f64 },

    #[error("{field}: expected a date (YYYY-MM-DD), got {raw:?}")]
    InvalidDate { field: String, raw: String },
}

impl FieldError {
    /// Name of the offending field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { field }
            | Self::OutOfRange { field, .. }
            | Self::NotANumber { field, .. }
            | Self::NotAnInteger { field, .. }
            | Self::InvalidDate { field, .. } => field,
        }
    }
}

fn describe_range(min: &Option<f64>, max: &Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{min}, {max}]"),
        (Some(min), None) => format!("[{min}, ∞)"),
        (None, Some(max)) => format!("(-∞, {max}]"),
        (None, None) => "(-∞, ∞)".to_owned(),
    }
}

/// Every field error found in one parse, in schema order.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(transparent)]
#[error("{} invalid field(s): {}", .0.len(), join(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Errors reported for `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> {
        self.0.iter().filter(move |e| e.field() == field)
    }
}

pub type Result<T> = std::result::Result<T, ValidationErrors>;

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_names_bounds() {
        let err = FieldError::OutOfRange {
            field: "market_share".into(),
            value: 140.0,
            min: Some(0.001),
            max: Some(100.0),
        };
        assert_eq!(err.to_string(), "market_share: 140 is outside [0.001, 100]");
        assert_eq!(err.field(), "market_share");
    }

    #[test]
    fn open_ended_range() {
        let err = FieldError::OutOfRange {
            field: "n_days".into(),
            value: 10.0,
            min: Some(30.0),
            max: None,
        };
        assert_eq!(err.to_string(), "n_days: 10 is outside [30, ∞)");
    }

    #[test]
    fn aggregate_lists_every_field() {
        let errors = ValidationErrors(vec![
            FieldError::Missing {
                field: "population".into(),
            },
            FieldError::NotANumber {
                field: "icu_rate".into(),
                raw: "lots".into(),
            },
        ]);
        assert_eq!(
            errors.to_string(),
            "2 invalid field(s): population: a value is required; icu_rate: expected a number, got \"lots\""
        );
        assert_eq!(errors.for_field("icu_rate").count(), 1);
    }
}
