#![forbid(unsafe_code)]

//! Fragment and query-string codec.
//!
//! # Wire format
//!
//! ```text
//! #market_share=25;n_days=60;as_date=true;date_first_hospitalized=2020-03-07
//! ```
//!
//! - pairs are `key=value`, joined by `;` (fragments) or `&` (queries);
//! - keys are written in schema declaration order;
//! - values are percent-escaped so neither separator can leak out of them;
//! - whole floats keep a `.0` suffix so they decode as floats again.
//!
//! Decoding is lenient: segments without `=` are dropped, unknown keys are
//! dropped, and a repeated key keeps its last value. Nothing here fails.
//!
//! # Invariants
//!
//! For any mapping `m` of valid values over schema fields,
//! `decode_fragment(&encode_fragment(&m)) == m`.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::trace;

use crate::schema::{FieldKind, FieldSpec, FormSchema};
use crate::value::{DATE_FORMAT, FieldValue, FieldValues, NULL_TOKEN};

const FRAGMENT_SEPARATOR: char = ';';
const QUERY_SEPARATOR: char = '&';

/// Converts field values to and from their flat string forms.
///
/// Cloning is cheap; the schema is shared.
#[derive(Debug, Clone)]
pub struct FormCodec {
    schema: Arc<FormSchema>,
}

impl FormCodec {
    #[must_use]
    pub fn new(schema: Arc<FormSchema>) -> Self {
        Self { schema }
    }

    #[must_use]
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    #[must_use]
    pub fn shared_schema(&self) -> Arc<FormSchema> {
        Arc::clone(&self.schema)
    }

    /// Encode as a URL fragment, `#` included. Empty values encode to `""`.
    #[must_use]
    pub fn encode_fragment(&self, values: &FieldValues) -> String {
        let body = self.encode_pairs(values, FRAGMENT_SEPARATOR);
        if body.is_empty() {
            body
        } else {
            format!("#{body}")
        }
    }

    /// Decode a URL fragment, with or without its leading `#`.
    #[must_use]
    pub fn decode_fragment(&self, fragment: &str) -> FieldValues {
        let body = fragment.strip_prefix('#').unwrap_or(fragment);
        self.decode_pairs(body, FRAGMENT_SEPARATOR)
    }

    /// Encode as a `&`-joined query string (no leading `?`).
    #[must_use]
    pub fn encode_query(&self, values: &FieldValues) -> String {
        self.encode_pairs(values, QUERY_SEPARATOR)
    }

    /// Decode a query string, with or without its leading `?`.
    #[must_use]
    pub fn decode_query(&self, query: &str) -> FieldValues {
        let body = query.strip_prefix('?').unwrap_or(query);
        self.decode_pairs(body, QUERY_SEPARATOR)
    }

    /// Interpret one raw token according to the field kind.
    ///
    /// Returns `None` for fields that carry no value.
    #[must_use]
    pub fn decode_value(spec: &FieldSpec, raw: &str) -> Option<FieldValue> {
        let value = match spec.kind {
            FieldKind::Number(_) if raw.is_empty() => FieldValue::Null,
            FieldKind::Number(_) => FieldValue::from_token(raw),
            FieldKind::Switch => match raw {
                "true" | "on" => FieldValue::Bool(true),
                "false" | "off" => FieldValue::Bool(false),
                other => FieldValue::Text(other.to_owned()),
            },
            FieldKind::Date => match raw {
                "" | NULL_TOKEN => FieldValue::Null,
                other => NaiveDate::parse_from_str(other, DATE_FORMAT)
                    .map_or_else(|_| FieldValue::Text(other.to_owned()), FieldValue::Date),
            },
            FieldKind::Header | FieldKind::Button { .. } => return None,
        };
        Some(value)
    }

    fn encode_pairs(&self, values: &FieldValues, separator: char) -> String {
        let mut out = String::new();
        for spec in self.schema.tracked() {
            let Some(value) = values.get(spec.name) else {
                continue;
            };
            if !out.is_empty() {
                out.push(separator);
            }
            out.push_str(spec.name);
            out.push('=');
            escape_into(&mut out, &value.to_string());
        }
        out
    }

    fn decode_pairs(&self, body: &str, separator: char) -> FieldValues {
        let mut values = FieldValues::new();
        for segment in body.split(separator) {
            if segment.is_empty() {
                continue;
            }
            let Some((key, raw)) = segment.split_once('=') else {
                trace!(segment, "dropping segment without '='");
                continue;
            };
            let key = unescape(key);
            let Some(spec) = self.schema.get(&key) else {
                trace!(key = %key, "dropping unknown key");
                continue;
            };
            if let Some(value) = Self::decode_value(spec, &unescape(raw)) {
                values.insert(key, value);
            }
        }
        values
    }
}

impl Default for FormCodec {
    fn default() -> Self {
        Self::new(Arc::new(FormSchema::default()))
    }
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// Percent-escape everything outside the RFC 3986 unreserved set.
#[must_use]
pub fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    escape_into(&mut out, raw);
    out
}

fn escape_into(out: &mut String, raw: &str) {
    for byte in raw.bytes() {
        if is_unreserved(byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
}

/// Reverse of [`escape_into`]. `+` reads as a space; invalid escapes are
/// kept literally.
fn unescape(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => match bytes
                .get(i + 1..i + 3)
                .and_then(|pair| hex_pair(pair[0], pair[1]))
            {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = char::from(hi).to_digit(16)?;
    let lo = char::from(lo).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::*;
    use crate::value::values_from;
    use pretty_assertions::assert_eq;

    fn codec() -> FormCodec {
        FormCodec::default()
    }

    #[test]
    fn decodes_scenario_fragment() {
        let values = codec().decode_fragment("#n_days=60;market_share=25");
        assert_eq!(
            values,
            values_from([(N_DAYS, 60_i64), (MARKET_SHARE, 25_i64)])
        );
    }

    #[test]
    fn encodes_in_declaration_order() {
        let values = values_from([
            (N_DAYS, FieldValue::Int(60)),
            (MARKET_SHARE, FieldValue::Float(2.5)),
            (AS_DATE, FieldValue::Bool(true)),
        ]);
        assert_eq!(
            codec().encode_fragment(&values),
            "#market_share=2.5;n_days=60;as_date=true"
        );
    }

    #[test]
    fn empty_values_encode_to_empty_fragment() {
        assert_eq!(codec().encode_fragment(&FieldValues::new()), "");
        assert!(codec().decode_fragment("").is_empty());
        assert!(codec().decode_fragment("#").is_empty());
    }

    #[test]
    fn malformed_segments_are_dropped() {
        let values = codec().decode_fragment("#n_days;icu_rate=10;;=5;market_share");
        assert_eq!(values, values_from([(ICU_RATE, 10_i64)]));
    }

    #[test]
    fn splits_on_first_equals_only() {
        let schema = FormSchema::new([crate::schema::FieldSpec::optional_number(
            "label",
            crate::schema::NumberSpec::new(crate::schema::Step::Any),
        )]);
        let codec = FormCodec::new(Arc::new(schema));
        let values = codec.decode_fragment("label=a=b");
        assert_eq!(values, values_from([("label", "a=b")]));
    }

    #[test]
    fn unknown_keys_and_layout_fields_are_dropped() {
        let values = codec().decode_fragment("#susceptible=1000;regional_parameters=x;n_days=45");
        assert_eq!(values, values_from([(N_DAYS, 45_i64)]));
    }

    #[test]
    fn repeated_key_keeps_last_value() {
        let values = codec().decode_fragment("n_days=45;n_days=90");
        assert_eq!(values, values_from([(N_DAYS, 90_i64)]));
    }

    #[test]
    fn switch_and_date_tokens() {
        let values = codec().decode_fragment(
            "as_date=on;show_tables=false;date_first_hospitalized=2020-03-07;max_y_axis_value=None",
        );
        let date = NaiveDate::from_ymd_opt(2020, 3, 7).unwrap();
        assert_eq!(
            values,
            values_from([
                (AS_DATE, FieldValue::Bool(true)),
                (SHOW_TABLES, FieldValue::Bool(false)),
                (DATE_FIRST_HOSPITALIZED, FieldValue::Date(date)),
                (MAX_Y_AXIS_VALUE, FieldValue::Null),
            ])
        );
    }

    #[test]
    fn non_numeric_number_token_stays_text() {
        let values = codec().decode_fragment("icu_rate=lots");
        assert_eq!(values, values_from([(ICU_RATE, "lots")]));
    }

    #[test]
    fn separators_inside_values_are_escaped() {
        let schema = FormSchema::new([crate::schema::FieldSpec::optional_number(
            "note",
            crate::schema::NumberSpec::new(crate::schema::Step::Any),
        )]);
        let codec = FormCodec::new(Arc::new(schema));
        let values = values_from([("note", "a;b=c&d e+%")]);
        let fragment = codec.encode_fragment(&values);
        assert_eq!(fragment, "#note=a%3Bb%3Dc%26d%20e%2B%25");
        assert_eq!(codec.decode_fragment(&fragment), values);
    }

    #[test]
    fn query_uses_ampersand() {
        let values = values_from([(N_DAYS, 60_i64), (ICU_RATE, 10_i64)]);
        let query = codec().encode_query(&values);
        assert_eq!(query, "icu_rate=10&n_days=60");
        assert_eq!(codec().decode_query(&format!("?{query}")), values);
    }

    #[test]
    fn percent_encode_keeps_unreserved() {
        assert_eq!(percent_encode("day,date\n0,2020-03-07"), "day%2Cdate%0A0%2C2020-03-07");
    }

    #[test]
    fn plus_reads_as_space_and_bad_escapes_survive() {
        assert_eq!(unescape("a+b"), "a b");
        assert_eq!(unescape("100%"), "100%");
        assert_eq!(unescape("%zz"), "%zz");
        assert_eq!(unescape("%C3%A9"), "é");
    }
}
