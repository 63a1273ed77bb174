#![forbid(unsafe_code)]

//! Typed simulation inputs derived from field values.
//!
//! [`FormCodec::to_parameters`] is the only way to build a
//! [`ParsedParameters`]: it fills defaults, checks bounds, scales percent
//! fields to fractions and pairs each rate with its length of stay.

use chrono::NaiveDate;
use serde::Serialize;

use crate::codec::FormCodec;
use crate::error::{self, FieldError, ValidationErrors};
use crate::schema::field::*;
use crate::schema::{FieldKind, FieldSpec, FormSchema};
use crate::value::{FieldValue, FieldValues};

const I64_MIN_F: f64 = i64::MIN as f64;
const I64_MAX_F: f64 = i64::MAX as f64;
const I64_END_F: f64 = 9_223_372_036_854_775_808.0;

/// Share of patients needing a level of care, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Disposition {
    /// Fraction in `[0, 1]`.
    pub rate: f64,
    /// Length of stay in days.
    pub days: i64,
}

/// How epidemic growth is pinned down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Growth {
    /// Days for cases to double before distancing.
    DoublingTime(f64),
    /// First hospitalized case; doubling time is fitted by the model.
    FirstHospitalized(NaiveDate),
}

/// Inputs consumed by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedParameters {
    pub population: i64,
    pub current_hospitalized: i64,
    pub growth: Growth,
    /// Fraction in `[0, 1]`.
    pub relative_contact_rate: f64,
    /// Fraction in `(0, 1]`.
    pub market_share: f64,
    pub infectious_days: i64,
    pub n_days: i64,
    pub hospitalized: Disposition,
    pub icu: Disposition,
    pub ventilated: Disposition,
    pub max_y_axis: Option<i64>,
}

impl ParsedParameters {
    #[must_use]
    pub fn doubling_time(&self) -> Option<f64> {
        match self.growth {
            Growth::DoublingTime(days) => Some(days),
            Growth::FirstHospitalized(_) => None,
        }
    }

    #[must_use]
    pub fn date_first_hospitalized(&self) -> Option<NaiveDate> {
        match self.growth {
            Growth::DoublingTime(_) => None,
            Growth::FirstHospitalized(date) => Some(date),
        }
    }
}

/// Presentation switches that do not reach the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DisplayOptions {
    pub as_date: bool,
    pub show_tables: bool,
    pub show_tool_details: bool,
    pub show_additional_projections: bool,
}

/// Resolves fields against the schema and accumulates errors.
struct FieldReader<'a> {
    schema: &'a FormSchema,
    values: &'a FieldValues,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(schema: &'a FormSchema, values: &'a FieldValues) -> Self {
        Self {
            schema,
            values,
            errors: Vec::new(),
        }
    }

    /// Explicit non-null value, else the schema default.
    ///
    /// Records `Missing` for a required field with neither.
    fn resolve(&mut self, name: &str) -> Option<(&'a FieldSpec, FieldValue)> {
        let Some(spec) = self.schema.get(name) else {
            self.missing(name);
            return None;
        };
        let value = self
            .values
            .get(name)
            .filter(|v| !v.is_null())
            .or(spec.default.as_ref())
            .cloned();
        match value {
            Some(value) => Some((spec, value)),
            None if spec.optional => None,
            None => {
                self.missing(name);
                None
            }
        }
    }

    fn missing(&mut self, name: &str) {
        self.errors.push(FieldError::Missing {
            field: name.to_owned(),
        });
    }

    /// Bounded number in display units.
    fn number(&mut self, name: &str) -> Option<f64> {
        self.checked_number(name).map(|(number, _)| number)
    }

    /// Bounded number, plus the exact integer when the value was one.
    fn checked_number(&mut self, name: &str) -> Option<(f64, Option<i64>)> {
        let (spec, value) = self.resolve(name)?;
        let value = match value {
            FieldValue::Text(text) => FieldValue::from_token(&text),
            other => other,
        };
        let exact = match &value {
            FieldValue::Int(int) => Some(*int),
            _ => None,
        };
        let number = value.as_f64();
        let Some(number) = number.filter(|n| !n.is_nan()) else {
            self.errors.push(FieldError::NotANumber {
                field: name.to_owned(),
                raw: value.to_string(),
            });
            return None;
        };
        if let FieldKind::Number(bounds) = &spec.kind {
            if !bounds.contains(number) {
                self.errors.push(FieldError::OutOfRange {
                    field: name.to_owned(),
                    value: number,
                    min: bounds.min,
                    max: bounds.max,
                });
                return None;
            }
            if bounds.step.is_integral() && number.fract() != 0.0 {
                self.errors.push(FieldError::NotAnInteger {
                    field: name.to_owned(),
                    value: number,
                });
                return None;
            }
        }
        Some((number, exact))
    }

    /// Whole number. Integers pass through exactly; whole floats must fit
    /// in `i64`.
    fn integer(&mut self, name: &str) -> Option<i64> {
        let (number, exact) = self.checked_number(name)?;
        if let Some(int) = exact {
            return Some(int);
        }
        if number.fract() != 0.0 {
            self.errors.push(FieldError::NotAnInteger {
                field: name.to_owned(),
                value: number,
            });
            return None;
        }
        // 2^63 is the first float past i64::MAX.
        if !(I64_MIN_F..I64_END_F).contains(&number) {
            self.errors.push(FieldError::OutOfRange {
                field: name.to_owned(),
                value: number,
                min: Some(I64_MIN_F),
                max: Some(I64_MAX_F),
            });
            return None;
        }
        Some(number as i64)
    }

    /// Percent fields come back as fractions.
    fn fraction(&mut self, name: &str) -> Option<f64> {
        let percent = self
            .schema
            .get(name)
            .and_then(FieldSpec::number_spec)
            .is_some_and(|spec| spec.percent);
        let number = self.number(name)?;
        Some(if percent { number / 100.0 } else { number })
    }

    fn disposition(&mut self, rate: &str, days: &str) -> Option<Disposition> {
        let rate = self.fraction(rate);
        let days = self.integer(days);
        Some(Disposition {
            rate: rate?,
            days: days?,
        })
    }

    fn date(&mut self, name: &str) -> Option<NaiveDate> {
        match self.resolve(name)? {
            (_, FieldValue::Date(date)) => Some(date),
            (_, other) => {
                self.errors.push(FieldError::InvalidDate {
                    field: name.to_owned(),
                    raw: other.to_string(),
                });
                None
            }
        }
    }

    /// Doubling time and first-hospitalized date are exclusive.
    ///
    /// An explicit doubling time wins. A date is used when doubling time is
    /// absent, and required when doubling time was explicitly cleared.
    fn growth(&mut self) -> Option<Growth> {
        let doubling = self.values.get(DOUBLING_TIME).map(FieldValue::is_null);
        let has_date = self
            .values
            .get(DATE_FIRST_HOSPITALIZED)
            .is_some_and(|v| !v.is_null());
        match doubling {
            Some(true) => match self.date(DATE_FIRST_HOSPITALIZED) {
                Some(date) => Some(Growth::FirstHospitalized(date)),
                None => {
                    if !self.errors.iter().any(|e| e.field() == DATE_FIRST_HOSPITALIZED) {
                        self.missing(DATE_FIRST_HOSPITALIZED);
                    }
                    None
                }
            },
            None if has_date => self.date(DATE_FIRST_HOSPITALIZED).map(Growth::FirstHospitalized),
            _ => self.number(DOUBLING_TIME).map(Growth::DoublingTime),
        }
    }

    fn optional_integer(&mut self, name: &str) -> Option<i64> {
        self.integer(name)
    }

    fn switch(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(FieldValue::as_bool)
            .or_else(|| {
                self.schema
                    .get(name)
                    .and_then(|spec| spec.default.as_ref())
                    .and_then(FieldValue::as_bool)
            })
            .unwrap_or(false)
    }

    fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        if !self.errors.is_empty() {
            return Err(ValidationErrors(self.errors));
        }
        build().ok_or_else(|| ValidationErrors(Vec::new()))
    }
}

impl FormCodec {
    /// Derive simulation inputs from field values.
    ///
    /// # Errors
    ///
    /// Returns every field problem found (missing required value, non-number,
    /// non-integer, out of bounds, bad date) in evaluation order.
    pub fn to_parameters(&self, values: &FieldValues) -> error::Result<ParsedParameters> {
        let mut r = FieldReader::new(self.schema(), values);

        let market_share = r.fraction(MARKET_SHARE);
        let population = r.integer(POPULATION);
        let current_hospitalized = r.integer(CURRENT_HOSPITALIZED);
        let growth = r.growth();
        let relative_contact_rate = r.fraction(RELATIVE_CONTACT_RATE);
        let infectious_days = r.integer(INFECTIOUS_DAYS);
        let hospitalized = r.disposition(HOSPITALIZED_RATE, HOSPITALIZED_LOS);
        let icu = r.disposition(ICU_RATE, ICU_LOS);
        let ventilated = r.disposition(VENTILATED_RATE, VENTILATED_LOS);
        let n_days = r.integer(N_DAYS);
        let max_y_axis = r.optional_integer(MAX_Y_AXIS_VALUE);

        r.finish(|| {
            Some(ParsedParameters {
                population: population?,
                current_hospitalized: current_hospitalized?,
                growth: growth?,
                relative_contact_rate: relative_contact_rate?,
                market_share: market_share?,
                infectious_days: infectious_days?,
                n_days: n_days?,
                hospitalized: hospitalized?,
                icu: icu?,
                ventilated: ventilated?,
                max_y_axis,
            })
        })
    }

    /// Read the display switches; absent switches fall back to defaults.
    #[must_use]
    pub fn display_options(&self, values: &FieldValues) -> DisplayOptions {
        let r = FieldReader::new(self.schema(), values);
        DisplayOptions {
            as_date: r.switch(AS_DATE),
            show_tables: r.switch(SHOW_TABLES),
            show_tool_details: r.switch(SHOW_TOOL_DETAILS),
            show_additional_projections: r.switch(SHOW_ADDITIONAL_PROJECTIONS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::values_from;
    use pretty_assertions::assert_eq;

    fn codec() -> FormCodec {
        FormCodec::default()
    }

    #[test]
    fn defaults_fill_everything_absent() {
        let params = codec().to_parameters(&FieldValues::new()).unwrap();
        assert_eq!(params.population, 3_600_000);
        assert_eq!(params.current_hospitalized, 69);
        assert_eq!(params.growth, Growth::DoublingTime(4.0));
        assert_eq!(params.market_share, 0.15);
        assert_eq!(params.relative_contact_rate, 0.3);
        assert_eq!(params.n_days, 100);
        assert_eq!(
            params.icu,
            Disposition {
                rate: 0.0075,
                days: 9
            }
        );
        assert_eq!(params.max_y_axis, None);
    }

    #[test]
    fn percent_fields_scale_to_fractions() {
        let values = values_from([(MARKET_SHARE, 45_i64)]);
        let params = codec().to_parameters(&values).unwrap();
        assert_eq!(params.market_share, 0.45);
    }

    #[test]
    fn scenario_fragment_to_parameters() {
        let codec = codec();
        let values = codec.decode_fragment("#n_days=60;market_share=25");
        let params = codec.to_parameters(&values).unwrap();
        assert_eq!(params.market_share, 0.25);
        assert_eq!(params.n_days, 60);
    }

    #[test]
    fn rates_pair_with_lengths_of_stay() {
        let values = values_from([
            (HOSPITALIZED_RATE, FieldValue::Float(5.0)),
            (HOSPITALIZED_LOS, FieldValue::Int(8)),
            (VENTILATED_RATE, FieldValue::Int(1)),
        ]);
        let params = codec().to_parameters(&values).unwrap();
        assert_eq!(
            params.hospitalized,
            Disposition {
                rate: 0.05,
                days: 8
            }
        );
        assert_eq!(params.ventilated.rate, 0.01);
        assert_eq!(params.ventilated.days, 10);
    }

    #[test]
    fn out_of_bounds_is_reported_per_field() {
        let values = values_from([
            (MARKET_SHARE, FieldValue::Int(140)),
            (N_DAYS, FieldValue::Int(10)),
            (ICU_RATE, FieldValue::Int(5)),
        ]);
        let errors = codec().to_parameters(&values).unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(FieldError::field).collect();
        assert_eq!(fields, vec![MARKET_SHARE, N_DAYS]);
        assert_eq!(
            errors.errors()[0],
            FieldError::OutOfRange {
                field: MARKET_SHARE.into(),
                value: 140.0,
                min: Some(0.001),
                max: Some(100.0),
            }
        );
    }

    #[test]
    fn required_field_without_default_is_missing() {
        let schema = FormSchema::default().with_default(POPULATION, None);
        let codec = FormCodec::new(std::sync::Arc::new(schema));
        let errors = codec.to_parameters(&FieldValues::new()).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[FieldError::Missing {
                field: POPULATION.into()
            }]
        );
    }

    #[test]
    fn whole_number_fields_reject_fractions() {
        let values = values_from([(N_DAYS, FieldValue::Float(60.5))]);
        let errors = codec().to_parameters(&values).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[FieldError::NotAnInteger {
                field: N_DAYS.into(),
                value: 60.5
            }]
        );
    }

    #[test]
    fn whole_floats_are_accepted_as_integers() {
        let values = values_from([(N_DAYS, FieldValue::Float(60.0))]);
        assert_eq!(codec().to_parameters(&values).unwrap().n_days, 60);
    }

    #[test]
    fn large_integers_are_read_exactly() {
        let population = 9_007_199_254_740_993_i64;
        let params = codec()
            .to_parameters(&values_from([(POPULATION, population)]))
            .unwrap();
        assert_eq!(params.population, population);
    }

    #[test]
    fn whole_floats_beyond_i64_are_out_of_range() {
        let values = codec().decode_fragment("#population=1e30");
        assert_eq!(values.get(POPULATION), Some(&FieldValue::Float(1e30)));
        let err = codec().to_parameters(&values).unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert!(matches!(
            &err.errors()[0],
            FieldError::OutOfRange { field, value, .. } if field == POPULATION && *value == 1e30
        ));
    }

    #[test]
    fn text_in_number_field_is_rejected() {
        let values = values_from([(ICU_RATE, "lots")]);
        let errors = codec().to_parameters(&values).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[FieldError::NotANumber {
                field: ICU_RATE.into(),
                raw: "lots".into()
            }]
        );
    }

    #[test]
    fn date_used_when_doubling_time_absent() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 7).unwrap();
        let values = values_from([(DATE_FIRST_HOSPITALIZED, FieldValue::Date(date))]);
        let params = codec().to_parameters(&values).unwrap();
        assert_eq!(params.growth, Growth::FirstHospitalized(date));
        assert_eq!(params.doubling_time(), None);
        assert_eq!(params.date_first_hospitalized(), Some(date));
    }

    #[test]
    fn explicit_doubling_time_wins_over_date() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 7).unwrap();
        let values = values_from([
            (DATE_FIRST_HOSPITALIZED, FieldValue::Date(date)),
            (DOUBLING_TIME, FieldValue::Float(3.5)),
        ]);
        let params = codec().to_parameters(&values).unwrap();
        assert_eq!(params.growth, Growth::DoublingTime(3.5));
    }

    #[test]
    fn cleared_doubling_time_requires_a_date() {
        let values = values_from([(DOUBLING_TIME, FieldValue::Null)]);
        let errors = codec().to_parameters(&values).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[FieldError::Missing {
                field: DATE_FIRST_HOSPITALIZED.into()
            }]
        );
    }

    #[test]
    fn bad_date_is_reported() {
        let values = values_from([
            (DOUBLING_TIME, FieldValue::Null),
            (DATE_FIRST_HOSPITALIZED, FieldValue::Text("March".into())),
        ]);
        let errors = codec().to_parameters(&values).unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert!(matches!(errors.errors()[0], FieldError::InvalidDate { .. }));
    }

    #[test]
    fn max_y_axis_is_optional_but_bounded() {
        let params = codec()
            .to_parameters(&values_from([(MAX_Y_AXIS_VALUE, 500_i64)]))
            .unwrap();
        assert_eq!(params.max_y_axis, Some(500));

        let errors = codec()
            .to_parameters(&values_from([(MAX_Y_AXIS_VALUE, 5_i64)]))
            .unwrap_err();
        assert_eq!(errors.errors()[0].field(), MAX_Y_AXIS_VALUE);
    }

    #[test]
    fn display_switches_default_off() {
        let codec = codec();
        assert_eq!(codec.display_options(&FieldValues::new()), DisplayOptions::default());
        let options = codec.display_options(&values_from([(SHOW_TABLES, true)]));
        assert!(options.show_tables);
        assert!(!options.as_date);
    }
}
