#![forbid(unsafe_code)]

//! Declarative description of the sidebar inputs.
//!
//! A [`FormSchema`] is an ordered list of [`FieldSpec`]s built once at
//! startup. Declaration order matters: it is the order fields are rendered,
//! encoded into fragments, and collected from submissions.
//!
//! Only [`FieldKind::Number`], [`FieldKind::Switch`] and [`FieldKind::Date`]
//! fields carry values ("tracked" fields). Headers and buttons are layout.

use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// Lower bound shared by strictly positive float inputs.
pub const FLOAT_INPUT_MIN: f64 = 0.001;

/// Field names used by the CHIME form.
pub mod field {
    pub const REGIONAL_PARAMETERS: &str = "regional_parameters";
    pub const MARKET_SHARE: &str = "market_share";
    pub const POPULATION: &str = "population";
    pub const CURRENT_HOSPITALIZED: &str = "current_hospitalized";
    pub const SPREAD_AND_CONTACT: &str = "spread_and_contact";
    pub const DATE_FIRST_HOSPITALIZED: &str = "date_first_hospitalized";
    pub const DOUBLING_TIME: &str = "doubling_time";
    pub const RELATIVE_CONTACT_RATE: &str = "relative_contact_rate";
    pub const INFECTIOUS_DAYS: &str = "infectious_days";
    pub const SEVERITY_PARAMETERS: &str = "severity_parameters";
    pub const HOSPITALIZED_RATE: &str = "hospitalized_rate";
    pub const ICU_RATE: &str = "icu_rate";
    pub const VENTILATED_RATE: &str = "ventilated_rate";
    pub const HOSPITALIZED_LOS: &str = "hospitalized_los";
    pub const ICU_LOS: &str = "icu_los";
    pub const VENTILATED_LOS: &str = "ventilated_los";
    pub const DISPLAY_PARAMETERS: &str = "display_parameters";
    pub const N_DAYS: &str = "n_days";
    pub const MAX_Y_AXIS_VALUE: &str = "max_y_axis_value";
    pub const AS_DATE: &str = "as_date";
    pub const SHOW_TABLES: &str = "show_tables";
    pub const SHOW_TOOL_DETAILS: &str = "show_tool_details";
    pub const SHOW_ADDITIONAL_PROJECTIONS: &str = "show_additional_projections";
    pub const SAVE_PARAMETERS: &str = "save_parameters";
}

/// Input step granularity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Any real value (`step="any"`).
    Any,
    By(f64),
}

impl Step {
    /// Whole-number steps restrict the field to integers.
    #[must_use]
    pub fn is_integral(self) -> bool {
        match self {
            Self::Any => false,
            Self::By(step) => step.fract() == 0.0,
        }
    }
}

/// Bounds and scaling of a numeric input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberSpec {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Step,
    /// Displayed as a percentage, computed as a fraction.
    pub percent: bool,
}

impl NumberSpec {
    #[must_use]
    pub const fn new(step: Step) -> Self {
        Self {
            min: None,
            max: None,
            step,
            percent: false,
        }
    }

    #[must_use]
    pub const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    #[must_use]
    pub const fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Percent input bounded to `[min, 100]`.
    #[must_use]
    pub const fn percent(mut self) -> Self {
        self.percent = true;
        self.max = Some(100.0);
        self
    }

    /// Whether `value` lies in `[min, max]`.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Widget kind of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Header,
    Number(NumberSpec),
    Switch,
    Date,
    Button { label: &'static str },
}

/// One input field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Value used when the field is absent from a snapshot.
    pub default: Option<FieldValue>,
    /// Absent with no default resolves to "no value" instead of an error.
    pub optional: bool,
}

impl FieldSpec {
    #[must_use]
    pub const fn header(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Header,
            default: None,
            optional: true,
        }
    }

    #[must_use]
    pub fn number(name: &'static str, spec: NumberSpec, default: impl Into<FieldValue>) -> Self {
        Self {
            name,
            kind: FieldKind::Number(spec),
            default: Some(default.into()),
            optional: false,
        }
    }

    #[must_use]
    pub const fn optional_number(name: &'static str, spec: NumberSpec) -> Self {
        Self {
            name,
            kind: FieldKind::Number(spec),
            default: None,
            optional: true,
        }
    }

    #[must_use]
    pub const fn switch(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Switch,
            default: Some(FieldValue::Bool(false)),
            optional: false,
        }
    }

    #[must_use]
    pub const fn date(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Date,
            default: None,
            optional: true,
        }
    }

    #[must_use]
    pub const fn button(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Button { label },
            default: None,
            optional: true,
        }
    }

    /// Whether the field carries a value in the stores.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        match self.kind {
            FieldKind::Number(_) | FieldKind::Switch | FieldKind::Date => true,
            FieldKind::Header | FieldKind::Button { .. } => false,
        }
    }

    #[must_use]
    pub fn number_spec(&self) -> Option<&NumberSpec> {
        match &self.kind {
            FieldKind::Number(spec) => Some(spec),
            _ => None,
        }
    }
}

/// Default model inputs, in display units (percentages as 0..=100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChimeDefaults {
    pub population: i64,
    pub current_hospitalized: i64,
    pub doubling_time: f64,
    pub relative_contact_rate: f64,
    pub infectious_days: i64,
    pub market_share: f64,
    pub n_days: i64,
    pub hospitalized_rate: f64,
    pub hospitalized_los: i64,
    pub icu_rate: f64,
    pub icu_los: i64,
    pub ventilated_rate: f64,
    pub ventilated_los: i64,
}

impl Default for ChimeDefaults {
    fn default() -> Self {
        Self {
            population: 3_600_000,
            current_hospitalized: 69,
            doubling_time: 4.0,
            relative_contact_rate: 30.0,
            infectious_days: 14,
            market_share: 15.0,
            n_days: 100,
            hospitalized_rate: 2.5,
            hospitalized_los: 7,
            icu_rate: 0.75,
            icu_los: 9,
            ventilated_rate: 0.5,
            ventilated_los: 10,
        }
    }
}

/// Ordered set of field specs.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    /// Build a schema from specs in declaration order.
    ///
    /// Later specs with a duplicate name are ignored.
    #[must_use]
    pub fn new(specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        let mut fields: Vec<FieldSpec> = Vec::new();
        for spec in specs {
            if fields.iter().any(|f| f.name == spec.name) {
                tracing::warn!(field = spec.name, "duplicate field spec ignored");
                continue;
            }
            fields.push(spec);
        }
        Self { fields }
    }

    /// The CHIME sidebar, with defaults taken from `defaults`.
    #[must_use]
    pub fn chime(defaults: &ChimeDefaults) -> Self {
        use field::*;

        let float_any = NumberSpec::new(Step::Any);
        let whole = NumberSpec::new(Step::By(1.0));

        Self::new([
            FieldSpec::header(REGIONAL_PARAMETERS),
            FieldSpec::number(
                MARKET_SHARE,
                float_any.min(FLOAT_INPUT_MIN).percent(),
                defaults.market_share,
            ),
            FieldSpec::number(POPULATION, whole.min(1.0), defaults.population),
            FieldSpec::number(
                CURRENT_HOSPITALIZED,
                whole.min(0.0),
                defaults.current_hospitalized,
            ),
            FieldSpec::header(SPREAD_AND_CONTACT),
            FieldSpec::date(DATE_FIRST_HOSPITALIZED),
            FieldSpec::number(
                DOUBLING_TIME,
                float_any.min(FLOAT_INPUT_MIN),
                defaults.doubling_time,
            ),
            FieldSpec::number(
                RELATIVE_CONTACT_RATE,
                float_any.min(0.0).percent(),
                defaults.relative_contact_rate,
            ),
            FieldSpec::number(INFECTIOUS_DAYS, whole.min(1.0), defaults.infectious_days),
            FieldSpec::header(SEVERITY_PARAMETERS),
            FieldSpec::number(
                HOSPITALIZED_RATE,
                float_any.min(0.0).percent(),
                defaults.hospitalized_rate,
            ),
            FieldSpec::number(ICU_RATE, float_any.min(0.0).percent(), defaults.icu_rate),
            FieldSpec::number(
                VENTILATED_RATE,
                float_any.min(0.0).percent(),
                defaults.ventilated_rate,
            ),
            FieldSpec::number(HOSPITALIZED_LOS, whole.min(0.0), defaults.hospitalized_los),
            FieldSpec::number(ICU_LOS, whole.min(0.0), defaults.icu_los),
            FieldSpec::number(VENTILATED_LOS, whole.min(0.0), defaults.ventilated_los),
            FieldSpec::header(DISPLAY_PARAMETERS),
            FieldSpec::number(N_DAYS, whole.min(30.0), defaults.n_days),
            FieldSpec::optional_number(MAX_Y_AXIS_VALUE, NumberSpec::new(Step::By(10.0)).min(10.0)),
            FieldSpec::switch(AS_DATE),
            FieldSpec::switch(SHOW_TABLES),
            FieldSpec::switch(SHOW_TOOL_DETAILS),
            FieldSpec::switch(SHOW_ADDITIONAL_PROJECTIONS),
            FieldSpec::button(SAVE_PARAMETERS, "Save"),
        ])
    }

    /// Replace the default of `name`. `None` makes a non-optional field
    /// required.
    #[must_use]
    pub fn with_default(mut self, name: &str, default: Option<FieldValue>) -> Self {
        if let Some(spec) = self.fields.iter_mut().find(|f| f.name == name) {
            spec.default = default;
        }
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All specs in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    /// Value-carrying specs in declaration order.
    pub fn tracked(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_tracked())
    }

    #[must_use]
    pub fn is_tracked(&self, name: &str) -> bool {
        self.get(name).is_some_and(FieldSpec::is_tracked)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FormSchema {
    fn default() -> Self {
        Self::chime(&ChimeDefaults::default())
    }
}
