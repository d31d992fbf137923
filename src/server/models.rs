use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::mapper::OutputObject;

/// One page of reconstructed objects.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub items: Vec<OutputObject>,
    pub page: i64,
    pub size: i64,
    /// Number of rows, or of distinct group keys for grouped schemas
    pub total: u64,
    pub pages: u64,
}

impl Page {
    pub fn new(items: Vec<OutputObject>, page: i64, size: i64, total: u64) -> Self {
        let pages = match u64::try_from(size) {
            Ok(size) if size > 0 => total.div_ceil(size),
            _ => 0,
        };
        Page {
            items,
            page,
            size,
            total,
            pages,
        }
    }
}

/// Query string of `GET /endpoints/{name}/item`.
///
/// `datatype` and `lang` are reserved; every other parameter is a key field.
#[derive(Debug, Default, Deserialize)]
pub struct ItemParams {
    pub datatype: Option<String>,
    pub lang: Option<String>,
    #[serde(flatten)]
    pub key: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointInfo {
    pub name: String,
    pub model: String,
    pub grouped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub orderable_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SparqlPreview {
    pub items_query: String,
    pub count_query: String,
}
