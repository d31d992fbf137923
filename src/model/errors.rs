//! # Schema Error Types
//!
//! Errors raised while building or loading schema descriptors. All of them are
//! detected before any query runs and are never retried.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error(
        "Requested grouping key '{key}' does not denote an applicable grouping field of node '{node}'. {applicable}"
    )]
    InvalidGroupBy {
        node: String,
        key: String,
        applicable: String,
    },

    #[error("Node '{node}' has a list field '{field}' but does not specify 'group_by'.")]
    MissingGroupBy { node: String, field: String },

    #[error("Node '{node}' specifies 'group_by' but has no grouping target (i.e. a list field).")]
    GroupByWithoutListField { node: String },

    #[error("Object list field '{field}' of node '{node}' holds model '{model}', which does not specify 'group_by'.")]
    UngroupedListItem {
        node: String,
        field: String,
        model: String,
    },

    #[error("Truthiness rule references '{field}', which is not a field of node '{node}'.")]
    UnknownTruthinessField { node: String, field: String },

    #[error(
        "Setting a truthiness rule on root node '{node}' is not supported; root presence is controlled by the query result set."
    )]
    RootTruthiness { node: String },

    #[error("Node '{node}' declares field '{field}' more than once.")]
    DuplicateField { node: String, field: String },

    #[error("Field '{field}' references unknown model '{model}'.")]
    UnknownNode { field: String, model: String },

    #[error("Model '{model}' references itself through nested fields: {path}")]
    CyclicNode { model: String, path: String },

    #[error("Invalid model definition: {message}")]
    InvalidDefinition { message: String },

    #[error("Failed to read definitions file: {error}")]
    ConfigReadError { error: String },

    #[error("Failed to parse definitions: {error}")]
    ConfigParseError { error: String },
}

impl SchemaError {
    pub(crate) fn invalid_definition(message: impl Into<String>) -> Self {
        SchemaError::InvalidDefinition {
            message: message.into(),
        }
    }
}
