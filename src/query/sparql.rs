//! Text operations on SPARQL queries
//!
//! The base query is treated as text and only touched in three places: the
//! SELECT clause, the tail of the outermost group pattern and the solution
//! modifiers appended after it.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use super::errors::QueryError;
use super::shape::parse_query_shape;

lazy_static! {
    /// Leading PREFIX/BASE declarations, with surrounding whitespace and comments.
    static ref PROLOGUE: Regex = Regex::new(
        r"(?i)\A(?:\s+|#[^\n]*|prefix\s+[^\s:]*:\s*<[^>]*>|base\s*<[^>]*>)*"
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// An `order by` expression over a single binding.
///
/// Without a direction it renders as the bare variable (`?x`), with one as
/// `ASC(?x)` / `DESC(?x)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub binding: String,
    pub direction: Option<OrderDirection>,
}

impl OrderClause {
    pub fn new(binding: impl Into<String>) -> Self {
        OrderClause {
            binding: binding.into(),
            direction: None,
        }
    }

    pub fn with_direction(binding: impl Into<String>, desc: bool) -> Self {
        OrderClause {
            binding: binding.into(),
            direction: Some(if desc {
                OrderDirection::Desc
            } else {
                OrderDirection::Asc
            }),
        }
    }
}

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            None => write!(f, "?{}", self.binding),
            Some(OrderDirection::Asc) => write!(f, "ASC(?{})", self.binding),
            Some(OrderDirection::Desc) => write!(f, "DESC(?{})", self.binding),
        }
    }
}

/// Replace the SELECT clause of `query` (keyword, modifier and projection)
/// with `repl`. Prologue, dataset clauses and comments are kept.
pub fn replace_query_select_clause(query: &str, repl: &str) -> Result<String, QueryError> {
    let clause = parse_query_shape(query)
        .map_err(|_| QueryError::construction("Unable to obtain SELECT clause."))?
        .select_clause;

    Ok(format!(
        "{}{}{}",
        &query[..clause.start],
        repl,
        &query[clause.end..]
    ))
}

/// Remove PREFIX and BASE declarations; subqueries must not carry them.
pub fn remove_sparql_prefixes(query: &str) -> String {
    PROLOGUE.replace(query, "").trim().to_string()
}

/// Insert `injectant` right before the last closing brace of `query`.
pub fn inject_into_query(query: &str, injectant: &str) -> Result<String, QueryError> {
    let tail = query
        .rfind('}')
        .ok_or_else(|| QueryError::construction("Unable to inject into query: no closing brace."))?;

    Ok(format!("{} {} {}", &query[..tail], injectant, &query[tail..]))
}

/// Append `order by`, `limit` and `offset` modifiers, each only when given.
pub fn add_solution_modifier(
    query: &str,
    order_by: Option<&OrderClause>,
    limit: Option<u64>,
    offset: Option<u64>,
) -> String {
    let mut modified = query.to_string();

    if let Some(order_by) = order_by {
        modified.push_str(&format!(" order by {}", order_by));
    }
    if let Some(limit) = limit {
        modified.push_str(&format!(" limit {}", limit));
    }
    if let Some(offset) = offset {
        modified.push_str(&format!(" offset {}", offset));
    }

    modified
}
