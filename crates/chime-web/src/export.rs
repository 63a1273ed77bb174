#![forbid(unsafe_code)]

//! PDF export parameter contract.
//!
//! The export endpoint takes the same pairs as the hash fragment, joined
//! with `&` instead of `;`:
//!
//! ```text
//! /download-as-pdf?market_share=25&n_days=60&as_date=true
//! ```
//!
//! Rendering the PDF is someone else's job; this module only guarantees that
//! a link built from the root store reconstructs the same parameters.

use chime_core::{DisplayOptions, FormCodec, ParsedParameters, StoreSnapshot, ValidationErrors};
use serde::Serialize;

pub const EXPORT_PATH: &str = "/download-as-pdf";

/// Parameters recovered from an export request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub params: ParsedParameters,
    pub display: DisplayOptions,
}

impl ExportRequest {
    /// Rebuild parameters from a query string (leading `?` optional).
    ///
    /// # Errors
    ///
    /// Field validation errors, exactly as the sidebar would report them.
    pub fn from_query(codec: &FormCodec, query: &str) -> Result<Self, ValidationErrors> {
        let values = codec.decode_query(query);
        Ok(Self {
            params: codec.to_parameters(&values)?,
            display: codec.display_options(&values),
        })
    }
}

/// Export link for the current root store.
#[must_use]
pub fn export_href(codec: &FormCodec, root: &StoreSnapshot) -> String {
    let query = codec.encode_query(&root.values);
    if query.is_empty() {
        EXPORT_PATH.to_owned()
    } else {
        format!("{EXPORT_PATH}?{query}")
    }
}
