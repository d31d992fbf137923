//! Model adapter
//!
//! Ties one base query and one schema to an executor. A page request runs the
//! items and count queries concurrently and reconstructs the items; an item
//! request filters the base query on a key field.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use super::executor::{ExecutionError, QueryExecutor};
use super::models::{Page, SparqlPreview};
use crate::mapper::{reconstruct, BindingValue, MappingError, OutputObject, RowTable};
use crate::model::{Schema, SchemaError};
use crate::query::{
    check_query, ItemQueryConstructor, PageQueryConstructor, QueryError, QueryParameters,
    DEFAULT_MAX_PAGE_SIZE,
};

const COUNT_BINDING: &str = "cnt";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Count query returned no usable '?{}' binding", COUNT_BINDING)]
    MissingCount,

    #[error("No result for item key {key}")]
    NoResultsFound { key: String },

    #[error("Item key {key} matched {count} results, expected exactly one")]
    MultipleResultsFound { key: String, count: usize },
}

pub struct SparqlModelAdapter {
    query: String,
    schema: Schema,
    executor: Arc<dyn QueryExecutor>,
    max_page_size: i64,
}

impl SparqlModelAdapter {
    /// Fails when the base query is not a plain SELECT query.
    pub fn new(
        query: impl Into<String>,
        schema: Schema,
        executor: Arc<dyn QueryExecutor>,
    ) -> Result<Self, AdapterError> {
        let query = query.into().trim().to_string();
        check_query(&query)?;
        Ok(SparqlModelAdapter {
            query,
            schema,
            executor,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        })
    }

    pub fn with_max_page_size(mut self, max_page_size: i64) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn query_text(&self) -> &str {
        &self.query
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rewritten items and count queries for a page, without running them.
    pub fn preview(&self, parameters: &QueryParameters) -> Result<SparqlPreview, AdapterError> {
        let constructor = self.page_constructor(parameters)?;
        Ok(SparqlPreview {
            items_query: constructor.get_items_query()?,
            count_query: constructor.get_count_query()?,
        })
    }

    pub async fn query(&self, parameters: &QueryParameters) -> Result<Page, AdapterError> {
        let constructor = self.page_constructor(parameters)?;
        let items_query = constructor.get_items_query()?;
        let count_query = constructor.get_count_query()?;

        let (items_table, count_table) = tokio::try_join!(
            self.executor.execute(&items_query),
            self.executor.execute(&count_query)
        )?;

        let total = read_count(&count_table)?;
        let items = reconstruct(self.schema.root(), &items_table)?;
        log::debug!(
            "Page {} of '{}': {} items, {} total",
            parameters.page,
            self.schema.root().name(),
            items.len(),
            total
        );

        Ok(Page::new(items, parameters.page, parameters.size, total))
    }

    /// The single object whose key field matches. `datatype` and `lang`
    /// turn the string comparison into a typed or language-tagged literal match.
    pub async fn get_item(
        &self,
        key: &BTreeMap<String, String>,
        datatype: Option<&str>,
        lang: Option<&str>,
    ) -> Result<OutputObject, AdapterError> {
        let item_query =
            ItemQueryConstructor::new(&self.query, &self.schema, key, datatype, lang)?
                .get_item_query()?;

        let table = self.executor.execute(&item_query).await?;
        let mut items = reconstruct(self.schema.root(), &table)?;

        match items.len() {
            0 => Err(AdapterError::NoResultsFound {
                key: describe_key(key),
            }),
            1 => Ok(items.remove(0)),
            count => Err(AdapterError::MultipleResultsFound {
                key: describe_key(key),
                count,
            }),
        }
    }

    fn page_constructor(
        &self,
        parameters: &QueryParameters,
    ) -> Result<PageQueryConstructor, QueryError> {
        PageQueryConstructor::with_max_size(
            &self.query,
            parameters,
            &self.schema,
            self.max_page_size,
        )
    }
}

fn read_count(table: &RowTable) -> Result<u64, AdapterError> {
    let count = match table.get(0, COUNT_BINDING) {
        Some(BindingValue::Integer(count)) => u64::try_from(*count).ok(),
        Some(BindingValue::Double(count)) if *count >= 0.0 && count.fract() == 0.0 => {
            Some(*count as u64)
        }
        Some(BindingValue::String(count)) | Some(BindingValue::Typed { value: count, .. }) => {
            count.trim().parse().ok()
        }
        _ => None,
    };
    count.ok_or(AdapterError::MissingCount)
}

fn describe_key(key: &BTreeMap<String, String>) -> String {
    key.iter()
        .map(|(field, value)| format!("{}={:?}", field, value))
        .collect::<Vec<_>>()
        .join(", ")
}
