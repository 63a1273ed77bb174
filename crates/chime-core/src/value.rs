#![forbid(unsafe_code)]

//! Tagged field values.
//!
//! Every sidebar input resolves to a [`FieldValue`]. Values are untagged on
//! the wire so a store serialized to JSON reads like the form it mirrors
//! (`{"n_days": 60, "as_date": false}`).

use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Date format shared by fragments, query strings and date widgets.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Token used for an explicit empty value in fragments.
pub const NULL_TOKEN: &str = "None";

/// Flat mapping of field name to value.
///
/// Insertion order is preserved, equality ignores it.
pub type FieldValues = IndexMap<String, FieldValue>;

/// One input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Explicitly cleared input.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    /// Cast a fragment token: integer first, then float, else the raw string.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        if token == NULL_TOKEN {
            return Self::Null;
        }
        if let Ok(int) = token.parse::<i64>() {
            return Self::Int(int);
        }
        if let Ok(float) = token.parse::<f64>() {
            return Self::Float(float);
        }
        Self::Text(token.to_owned())
    }

    /// Numeric view of the value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Token form, as written into fragments (before escaping).
///
/// Whole floats keep a trailing `.0` so they decode back as floats.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str(NULL_TOKEN),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.format(DATE_FORMAT)),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Build a [`FieldValues`] map from `(name, value)` pairs.
///
/// Later duplicates overwrite earlier ones in place.
pub fn values_from<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> FieldValues
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_cast_prefers_integer_then_float() {
        assert_eq!(FieldValue::from_token("60"), FieldValue::Int(60));
        assert_eq!(FieldValue::from_token("-3"), FieldValue::Int(-3));
        assert_eq!(FieldValue::from_token("2.5"), FieldValue::Float(2.5));
        assert_eq!(FieldValue::from_token("1e3"), FieldValue::Float(1000.0));
        assert_eq!(
            FieldValue::from_token("Philadelphia"),
            FieldValue::Text("Philadelphia".into())
        );
        assert_eq!(FieldValue::from_token("None"), FieldValue::Null);
    }

    #[test]
    fn whole_floats_keep_their_decimal_point() {
        assert_eq!(FieldValue::Float(45.0).to_string(), "45.0");
        assert_eq!(FieldValue::Float(0.75).to_string(), "0.75");
        assert_eq!(FieldValue::Int(45).to_string(), "45");
    }

    #[test]
    fn date_and_null_tokens() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 7).unwrap();
        assert_eq!(FieldValue::Date(date).to_string(), "2020-03-07");
        assert_eq!(FieldValue::Null.to_string(), "None");
    }

    #[test]
    fn untagged_json_shape() {
        let values = values_from([
            ("n_days", FieldValue::Int(60)),
            ("market_share", FieldValue::Float(2.5)),
            ("as_date", FieldValue::Bool(false)),
            ("max_y_axis_value", FieldValue::Null),
        ]);
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(
            json,
            r#"{"n_days":60,"market_share":2.5,"as_date":false,"max_y_axis_value":null}"#
        );
        let back: FieldValues = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = values_from([("a", 1_i64), ("b", 2)]);
        let b = values_from([("b", 2_i64), ("a", 1)]);
        assert_eq!(a, b);
    }
}
