//! # Reconstruction Error Types
//!
//! Errors raised while turning a row table into output objects. They surface
//! after the items query ran but before any result is handed back, so a caller
//! never sees a partially built page.

use thiserror::Error;

use super::value::BindingValue;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error(
        "Field '{field}' of node '{node}' reads binding '{binding}', which is not present in the result set and has no default."
    )]
    MissingBinding {
        node: String,
        field: String,
        binding: String,
    },

    #[error(
        "Rows grouped under node '{node}' disagree on field '{field}' (binding '{binding}'): {first} vs {conflicting}."
    )]
    InconsistentGrouping {
        node: String,
        field: String,
        binding: String,
        first: String,
        conflicting: String,
    },

    #[error("List field '{field}' cannot be built on ungrouped node '{node}'.")]
    ListFieldOnUngroupedNode { node: String, field: String },

    #[error("Grouped node '{node}' was given an empty row group.")]
    EmptyGroup { node: String },
}

/// Render an optional cell for error and warning messages.
pub(crate) fn describe(value: Option<&BindingValue>) -> String {
    value.map_or_else(|| "null".to_string(), |v| v.to_string())
}
