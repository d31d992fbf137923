use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use super::adapter::AdapterError;
use super::models::{ItemParams, Page};
use super::{AppState, EndpointState};
use crate::query::QueryParameters;

type HandlerError = (StatusCode, Json<Value>);

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "service": "sparqltree",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn list_endpoints_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Value>, HandlerError> {
    let endpoints = app_state
        .endpoints
        .values()
        .map(|endpoint| &endpoint.info)
        .collect::<Vec<_>>();

    Ok(Json(json!({ "endpoints": endpoints })))
}

pub async fn page_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<QueryParameters>,
) -> Result<Json<Page>, HandlerError> {
    let endpoint = lookup(&app_state, &name)?;
    log::debug!("Page request on '{}': {:?}", name, params);

    let page = endpoint
        .adapter
        .query(&params)
        .await
        .map_err(|e| error_response(&name, e))?;

    Ok(Json(page))
}

pub async fn item_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<ItemParams>,
) -> Result<Json<Value>, HandlerError> {
    let endpoint = lookup(&app_state, &name)?;
    log::debug!("Item request on '{}': {:?}", name, params.key);

    let item = endpoint
        .adapter
        .get_item(
            &params.key,
            params.datatype.as_deref(),
            params.lang.as_deref(),
        )
        .await
        .map_err(|e| error_response(&name, e))?;

    Ok(Json(item.to_json()))
}

/// Rewritten queries for a page request, without executing them.
pub async fn sparql_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<QueryParameters>,
) -> Result<Json<Value>, HandlerError> {
    let endpoint = lookup(&app_state, &name)?;

    let preview = endpoint
        .adapter
        .preview(&params)
        .map_err(|e| error_response(&name, e))?;

    Ok(Json(json!({
        "endpoint": name,
        "items_query": preview.items_query,
        "count_query": preview.count_query
    })))
}

fn lookup<'a>(app_state: &'a AppState, name: &str) -> Result<&'a EndpointState, HandlerError> {
    app_state.endpoints.get(name).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("Unknown endpoint '{}'", name)
            })),
        )
    })
}

pub(crate) fn status_for(error: &AdapterError) -> StatusCode {
    match error {
        AdapterError::Schema(_) | AdapterError::Query(_) => StatusCode::BAD_REQUEST,
        AdapterError::NoResultsFound { .. } => StatusCode::NOT_FOUND,
        AdapterError::MultipleResultsFound { .. } => StatusCode::CONFLICT,
        AdapterError::Execution(_) | AdapterError::MissingCount => StatusCode::BAD_GATEWAY,
        AdapterError::Mapping(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(endpoint: &str, error: AdapterError) -> HandlerError {
    let status = status_for(&error);
    if status.is_server_error() {
        log::error!("Request on '{}' failed: {}", endpoint, error);
    } else {
        log::debug!("Request on '{}' rejected: {}", endpoint, error);
    }

    (
        status,
        Json(json!({
            "error": error.to_string()
        })),
    )
}
