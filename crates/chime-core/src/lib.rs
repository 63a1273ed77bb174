#![forbid(unsafe_code)]

//! Core: form schema, field values, store snapshots, and the form codec.
//!
//! # Role in the dashboard
//! `chime-core` is the data layer. It owns the declarative description of
//! every sidebar input, the tagged values those inputs carry, and the three
//! conversions the rest of the system relies on:
//!
//! - raw widget submissions -> normalized field values ([`transport`]),
//! - field values <-> URL fragment / export query strings ([`codec`]),
//! - field values -> typed simulation inputs ([`params`]).
//!
//! # How it fits in the system
//! `chime-runtime` builds the reconciliation service on top of these types.
//! `chime-web` adapts them to a host-driven browser session. Nothing in this
//! crate performs I/O or keeps mutable state.

pub mod codec;
pub mod error;
pub mod params;
pub mod schema;
pub mod snapshot;
pub mod transport;
pub mod value;

pub use codec::FormCodec;
pub use error::{FieldError, ValidationErrors};
pub use params::{Disposition, DisplayOptions, Growth, ParsedParameters};
pub use schema::{ChimeDefaults, FieldKind, FieldSpec, FormSchema, NumberSpec, Step};
pub use snapshot::{StoreSnapshot, Timestamp};
pub use transport::{FieldBinding, RawValue, Submission, WidgetProperty};
pub use value::{FieldValue, FieldValues};
