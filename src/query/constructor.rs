//! Pagination Query Rewriter
//!
//! Builds the items and count queries for one page request. Grouped schemas
//! paginate over distinct group keys instead of rows: a subquery selects the
//! keys of the requested page and is injected into the base query, so the
//! outer result holds every row of exactly those groups.

use std::collections::BTreeMap;

use super::errors::QueryError;
use super::parameters::{QueryParameters, DEFAULT_MAX_PAGE_SIZE};
use super::shape::check_query;
use super::sparql::{
    add_solution_modifier, inject_into_query, remove_sparql_prefixes,
    replace_query_select_clause, OrderClause,
};
use crate::model::schema::Schema;

const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";

/// Items and count queries for one page of a base query.
#[derive(Debug, Clone)]
pub struct PageQueryConstructor {
    query: String,
    group_by: Option<String>,
    order: OrderClause,
    limit: u64,
    offset: u64,
}

impl PageQueryConstructor {
    pub fn new(
        query: &str,
        parameters: &QueryParameters,
        schema: &Schema,
    ) -> Result<Self, QueryError> {
        Self::with_max_size(query, parameters, schema, DEFAULT_MAX_PAGE_SIZE)
    }

    pub fn with_max_size(
        query: &str,
        parameters: &QueryParameters,
        schema: &Schema,
        max_size: i64,
    ) -> Result<Self, QueryError> {
        parameters.check(max_size)?;
        let shape = check_query(query)?;
        let group_by = schema.group_by_binding().map(str::to_string);

        let order = match &parameters.order_by {
            Some(order_by) => {
                let orderable = schema.orderable_fields();
                let binding =
                    orderable
                        .resolve(order_by)
                        .ok_or_else(|| QueryError::InvalidOrderBy {
                            order_by: order_by.clone(),
                            applicable: orderable.keys().collect::<Vec<_>>().join(", "),
                        })?;
                OrderClause::with_direction(binding, parameters.desc.unwrap_or(false))
            }
            None => match &group_by {
                Some(group_by) => OrderClause::new(group_by.clone()),
                // first projected binding keeps ungrouped pagination deterministic
                None => OrderClause::new(shape.projected_variables().first().ok_or_else(
                    || QueryError::construction("query projects no variables to order by"),
                )?),
            },
        };

        Ok(PageQueryConstructor {
            query: shape.up_to_pattern_end(query).to_string(),
            group_by,
            order,
            limit: parameters.limit(),
            offset: parameters.offset(),
        })
    }

    pub fn get_items_query(&self) -> Result<String, QueryError> {
        let items_query = match &self.group_by {
            None => add_solution_modifier(
                &self.query,
                Some(&self.order),
                Some(self.limit),
                Some(self.offset),
            ),
            Some(group_by) => self.grouped_items_query(group_by)?,
        };

        log::debug!("Items query: {}", items_query);
        Ok(items_query)
    }

    pub fn get_count_query(&self) -> Result<String, QueryError> {
        let select_clause = match &self.group_by {
            None => "select (count(*) as ?cnt)".to_string(),
            Some(group_by) => format!("select (count(distinct ?{}) as ?cnt)", group_by),
        };

        let count_query = replace_query_select_clause(&self.query, &select_clause)?;
        log::debug!("Count query: {}", count_query);
        Ok(count_query)
    }

    fn grouped_items_query(&self, group_by: &str) -> Result<String, QueryError> {
        let subquery = replace_query_select_clause(
            &remove_sparql_prefixes(&self.query),
            &format!("select distinct ?{}", group_by),
        )?;
        let subquery = add_solution_modifier(
            &subquery,
            Some(&self.order),
            Some(self.limit),
            Some(self.offset),
        );

        let injected = inject_into_query(&self.query, &format!("{{{}}}", subquery))?;
        Ok(add_solution_modifier(&injected, Some(&self.order), None, None))
    }
}

/// Items query for `page` of `base_query` under `schema`.
pub fn build_items_query(
    base_query: &str,
    schema: &Schema,
    page: i64,
    size: i64,
    order_by: Option<&str>,
    desc: Option<bool>,
) -> Result<String, QueryError> {
    let parameters = QueryParameters {
        page,
        size,
        order_by: order_by.map(str::to_string),
        desc,
    };
    PageQueryConstructor::new(base_query, &parameters, schema)?.get_items_query()
}

/// Count query for `base_query`: rows, or distinct group keys for grouped schemas.
pub fn build_count_query(base_query: &str, schema: &Schema) -> Result<String, QueryError> {
    PageQueryConstructor::new(base_query, &QueryParameters::default(), schema)?.get_count_query()
}

/// Typed literal tag of an item key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LiteralTag {
    Datatype(String),
    Lang(String),
}

/// Single-item query: the base query filtered on one key field.
#[derive(Debug, Clone)]
pub struct ItemQueryConstructor {
    query: String,
    binding: String,
    value: String,
    tag: Option<LiteralTag>,
}

impl ItemQueryConstructor {
    /// `key` must hold exactly one entry, mapping a root field name to the
    /// lexical value to match. `datatype` accepts a full IRI or an `xsd:` name.
    pub fn new(
        query: &str,
        schema: &Schema,
        key: &BTreeMap<String, String>,
        datatype: Option<&str>,
        lang: Option<&str>,
    ) -> Result<Self, QueryError> {
        let mut entries = key.iter();
        let (Some((field, value)), None) = (entries.next(), entries.next()) else {
            return Err(QueryError::InvalidItemKey {
                reason: format!("expected exactly one key field, got {}", key.len()),
            });
        };

        let binding = schema
            .bindings()
            .get(field)
            .map(str::to_string)
            .ok_or_else(|| QueryError::InvalidItemKey {
                reason: format!("'{}' is not a field of '{}'", field, schema.root().name()),
            })?;

        let tag = match (datatype, lang) {
            (Some(_), Some(_)) => return Err(QueryError::ConflictingFilterTags),
            (Some(datatype), None) => Some(LiteralTag::Datatype(expand_datatype(datatype))),
            (None, Some(lang)) => Some(LiteralTag::Lang(lang.to_string())),
            (None, None) => None,
        };

        let shape = check_query(query)?;
        if !shape.projected_variables().contains(&binding) {
            return Err(QueryError::UnprojectedKeyBinding {
                field: field.clone(),
                binding,
            });
        }

        Ok(ItemQueryConstructor {
            query: shape.up_to_pattern_end(query).to_string(),
            binding,
            value: value.clone(),
            tag,
        })
    }

    pub fn filter_clause(&self) -> String {
        let literal = escape_literal(&self.value);
        match &self.tag {
            None => format!("filter (str(?{}) = \"{}\")", self.binding, literal),
            Some(LiteralTag::Datatype(datatype)) => {
                format!("filter (?{} = \"{}\"^^<{}>)", self.binding, literal, datatype)
            }
            Some(LiteralTag::Lang(lang)) => {
                format!("filter (?{} = \"{}\"@{})", self.binding, literal, lang)
            }
        }
    }

    pub fn get_item_query(&self) -> Result<String, QueryError> {
        let item_query = inject_into_query(&self.query, &self.filter_clause())?;
        log::debug!("Item query: {}", item_query);
        Ok(item_query)
    }
}

fn expand_datatype(datatype: &str) -> String {
    match datatype.strip_prefix("xsd:") {
        Some(local) => format!("{}{}", XSD_NAMESPACE, local),
        None => datatype.trim_start_matches('<').trim_end_matches('>').to_string(),
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
