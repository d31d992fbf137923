//! SPARQL execution
//!
//! `QueryExecutor` is the seam between the adapter and whatever runs the
//! rewritten queries. `HttpSparqlExecutor` speaks the SPARQL 1.1 protocol and
//! decodes `application/sparql-results+json` into a [`RowTable`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::mapper::{BindingValue, RowTable};

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("SPARQL endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SPARQL endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("SPARQL endpoint rejected the query: {body}")]
    QueryRejected { body: String },

    #[error("Failed to decode SPARQL results: {0}")]
    Decode(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a SELECT query and return its solutions as a row table.
    async fn execute(&self, query: &str) -> Result<RowTable, ExecutionError>;
}

#[derive(Debug, Clone)]
pub struct HttpSparqlExecutor {
    client: Client,
    endpoint: String,
}

impl HttpSparqlExecutor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ExecutionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpSparqlExecutor {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryExecutor for HttpSparqlExecutor {
    async fn execute(&self, query: &str) -> Result<RowTable, ExecutionError> {
        log::debug!("Sending query to {}: {}", self.endpoint, query);

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("SPARQL endpoint {} answered {}", self.endpoint, status);
            return Err(if status == StatusCode::BAD_REQUEST {
                ExecutionError::QueryRejected { body }
            } else {
                ExecutionError::Status {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        let body = response.text().await?;
        let table = decode_results(&body)?;
        log::debug!("Received {} rows from {}", table.len(), self.endpoint);
        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    head: Head,
    results: Solutions,
}

#[derive(Debug, Deserialize)]
struct Head {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Solutions {
    bindings: Vec<BTreeMap<String, RdfTerm>>,
}

#[derive(Debug, Deserialize)]
struct RdfTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
    datatype: Option<String>,
}

/// Decode a `application/sparql-results+json` document.
///
/// Columns follow `head.vars`; variables a solution leaves unbound are null.
pub fn decode_results(body: &str) -> Result<RowTable, ExecutionError> {
    let results: SparqlResults =
        serde_json::from_str(body).map_err(|e| ExecutionError::Decode(e.to_string()))?;

    let mut table = RowTable::new(results.head.vars);
    for solution in results.results.bindings {
        let mut row = Vec::with_capacity(solution.len());
        for (variable, term) in solution {
            row.push((variable, Some(decode_term(term)?)));
        }
        table.push_row(row);
    }
    Ok(table)
}

fn decode_term(term: RdfTerm) -> Result<BindingValue, ExecutionError> {
    match term.kind.as_str() {
        "uri" => Ok(BindingValue::Uri(term.value)),
        "bnode" => Ok(BindingValue::BlankNode(term.value)),
        "literal" | "typed-literal" => Ok(decode_literal(term.value, term.lang, term.datatype)),
        other => Err(ExecutionError::Decode(format!(
            "unknown RDF term type '{}'",
            other
        ))),
    }
}

fn decode_literal(value: String, lang: Option<String>, datatype: Option<String>) -> BindingValue {
    if let Some(lang) = lang {
        return BindingValue::LangString { value, lang };
    }
    let Some(datatype) = datatype else {
        return BindingValue::String(value);
    };
    if datatype == RDF_LANG_STRING {
        return BindingValue::String(value);
    }

    let decoded = match datatype.strip_prefix(XSD) {
        Some("string") => Some(BindingValue::String(value.clone())),
        Some(
            "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
            | "positiveInteger" | "nonPositiveInteger" | "negativeInteger" | "unsignedLong"
            | "unsignedInt" | "unsignedShort" | "unsignedByte",
        ) => value.trim().parse().ok().map(BindingValue::Integer),
        Some("decimal" | "double" | "float") => {
            value.trim().parse().ok().map(BindingValue::Double)
        }
        Some("boolean") => match value.trim() {
            "true" | "1" => Some(BindingValue::Boolean(true)),
            "false" | "0" => Some(BindingValue::Boolean(false)),
            _ => None,
        },
        Some("date") => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .ok()
            .map(BindingValue::Date),
        Some("dateTime") => DateTime::parse_from_rfc3339(value.trim())
            .map(BindingValue::DateTime)
            .or_else(|_| {
                NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S%.f")
                    .map(BindingValue::LocalDateTime)
            })
            .ok(),
        Some("time") => NaiveTime::parse_from_str(value.trim(), "%H:%M:%S%.f")
            .ok()
            .map(BindingValue::Time),
        _ => None,
    };

    // lexical forms that do not fit their datatype are kept verbatim
    decoded.unwrap_or(BindingValue::Typed { value, datatype })
}
