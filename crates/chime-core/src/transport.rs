#![forbid(unsafe_code)]

//! Raw widget values as the browser transport delivers them.
//!
//! Switch widgets are checklists: "on" arrives as `[true]`, "off" arrives as
//! an empty list or not at all. Number boxes may arrive as numbers or as the
//! text the user typed. [`FormCodec::normalize`] turns a [`Submission`] into
//! plain [`FieldValues`]; [`FormCodec::to_submission`] goes the other way so
//! store values can be pushed back into widgets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::FormCodec;
use crate::schema::{FieldKind, FormSchema};
use crate::value::{FieldValue, FieldValues};

/// One raw widget value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Checklist payload of a switch widget.
    Checklist(Vec<bool>),
    Value(FieldValue),
}

impl RawValue {
    /// Transport form of a switch state.
    #[must_use]
    pub fn switch(on: bool) -> Self {
        if on {
            Self::Checklist(vec![true])
        } else {
            Self::Checklist(Vec::new())
        }
    }
}

impl From<FieldValue> for RawValue {
    fn from(value: FieldValue) -> Self {
        Self::Value(value)
    }
}

macro_rules! raw_scalar_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for RawValue {
            fn from(value: $ty) -> Self {
                Self::Value(FieldValue::from(value))
            }
        })*
    };
}

raw_scalar_from!(i64, f64, bool, &str);

/// Ordered field name -> raw value list from one form change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission(IndexMap<String, RawValue>);

impl Submission {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, raw: impl Into<RawValue>) -> Self {
        self.insert(name, raw);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, raw: impl Into<RawValue>) {
        self.0.insert(name.into(), raw.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a store key is bound to its widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetProperty {
    /// Number and date inputs: the widget's `value`.
    Value,
    /// Switch checklists: the widget's selected `value` list.
    Checklist,
}

/// Link between one store key and one sidebar widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub field: &'static str,
    pub property: WidgetProperty,
}

impl WidgetProperty {
    /// Property holding the value of a `kind` widget. Layout kinds have none.
    #[must_use]
    pub fn for_kind(kind: &FieldKind) -> Option<Self> {
        match kind {
            FieldKind::Switch => Some(Self::Checklist),
            FieldKind::Number(_) | FieldKind::Date => Some(Self::Value),
            FieldKind::Header | FieldKind::Button { .. } => None,
        }
    }
}

impl FieldBinding {
    /// Bindings for every value-carrying field, in schema order.
    #[must_use]
    pub fn for_schema(schema: &FormSchema) -> Vec<Self> {
        schema
            .fields()
            .filter_map(|spec| {
                WidgetProperty::for_kind(&spec.kind).map(|property| Self {
                    field: spec.name,
                    property,
                })
            })
            .collect()
    }

    /// Transport form of `value` for this widget.
    #[must_use]
    pub fn raw(&self, value: &FieldValue) -> RawValue {
        match self.property {
            WidgetProperty::Checklist => RawValue::switch(value.as_bool().unwrap_or(false)),
            WidgetProperty::Value => RawValue::Value(value.clone()),
        }
    }
}

fn switch_is_on(raw: Option<&RawValue>) -> bool {
    match raw {
        Some(RawValue::Checklist(items)) => items.as_slice() == [true],
        Some(RawValue::Value(FieldValue::Bool(on))) => *on,
        Some(RawValue::Value(FieldValue::Text(text))) => matches!(text.as_str(), "on" | "true"),
        Some(RawValue::Value(_)) | None => false,
    }
}

impl FormCodec {
    /// Normalize a raw submission into field values, in schema order.
    ///
    /// Switches always resolve to a boolean (absent means off). Other fields
    /// missing from the submission are left out. Unknown names are ignored.
    #[must_use]
    pub fn normalize(&self, submission: &Submission) -> FieldValues {
        let mut values = FieldValues::new();
        for spec in self.schema().tracked() {
            let raw = submission.get(spec.name);
            let value = match (&spec.kind, raw) {
                (FieldKind::Switch, raw) => FieldValue::Bool(switch_is_on(raw)),
                (_, None) => continue,
                (_, Some(RawValue::Checklist(_))) => {
                    debug!(field = spec.name, "ignoring checklist payload on a scalar field");
                    continue;
                }
                (_, Some(RawValue::Value(FieldValue::Text(text)))) => {
                    match Self::decode_value(spec, text) {
                        Some(value) => value,
                        None => continue,
                    }
                }
                (_, Some(RawValue::Value(value))) => value.clone(),
            };
            values.insert(spec.name.to_owned(), value);
        }
        values
    }

    /// `values` as a form would report them: every switch missing from
    /// `values` is added as off.
    #[must_use]
    pub fn with_switches(&self, mut values: FieldValues) -> FieldValues {
        for spec in self.schema().fields() {
            if matches!(spec.kind, FieldKind::Switch) && !values.contains_key(spec.name) {
                values.insert(spec.name.to_owned(), FieldValue::Bool(false));
            }
        }
        values
    }

    /// Transport form of `values`, for pushing store contents into widgets.
    #[must_use]
    pub fn to_submission(&self, values: &FieldValues) -> Submission {
        let mut submission = Submission::new();
        for binding in FieldBinding::for_schema(self.schema()) {
            if let Some(value) = values.get(binding.field) {
                submission.insert(binding.field, binding.raw(value));
            }
        }
        submission
    }
}
