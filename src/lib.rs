//! sparqltree - nested object views over flat SPARQL results
//!
//! This crate turns the flat solution rows of a SPARQL SELECT query into
//! nested objects and serves them page by page:
//! - Schema descriptors for the output objects (`model`)
//! - Row-to-tree reconstruction with grouping, truthiness and consistency checks (`mapper`)
//! - Pagination, count and single-item query rewriting (`query`)
//! - A SPARQL protocol client and an HTTP API over declared endpoints (`server`)

pub mod config;
pub mod mapper;
pub mod model;
pub mod query;
pub mod server;
