//! Field-to-binding lookups
//!
//! `FieldsBindingsMap` resolves the field names of a single node to the row
//! bindings they read. `OrderableFieldsMap` walks singular nested objects and
//! collects every scalar field a page can be ordered by: root fields under
//! their plain name, nested fields as `"<Node>.<field>"`.

use super::node::{FieldKind, Node};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldsBindingsMap {
    entries: Vec<(String, String)>,
}

impl FieldsBindingsMap {
    pub fn new(node: &Node) -> Self {
        FieldsBindingsMap {
            entries: node
                .fields()
                .iter()
                .map(|field| (field.name().to_string(), field.binding().to_string()))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, binding)| binding.as_str())
    }

    /// Reverse lookup from binding to field name.
    pub fn field_for(&self, binding: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, b)| b == binding)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, binding)| (name.as_str(), binding.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderableFieldsMap {
    node: String,
    entries: Vec<(String, String)>,
}

impl OrderableFieldsMap {
    pub fn new(root: &Node) -> Self {
        let mut entries = Vec::new();
        collect_orderable(root, true, &mut entries);
        OrderableFieldsMap {
            node: root.name().to_string(),
            entries,
        }
    }

    /// Resolve an `order_by` value to a binding.
    ///
    /// Accepts an orderable key, or a binding that one of the keys maps to.
    pub fn resolve(&self, order_by: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == order_by)
            .or_else(|| self.entries.iter().find(|(_, binding)| binding == order_by))
            .map(|(_, binding)| binding.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn node_name(&self) -> &str {
        &self.node
    }
}

fn collect_orderable(node: &Node, top_level: bool, entries: &mut Vec<(String, String)>) {
    for field in node.fields() {
        match field.kind() {
            FieldKind::Object(nested) => collect_orderable(nested, false, entries),
            FieldKind::Scalar => {
                let key = if top_level {
                    field.name().to_string()
                } else {
                    format!("{}.{}", node.name(), field.name())
                };
                entries.push((key, field.binding().to_string()));
            }
            // unions and aggregates have no single value per result row
            FieldKind::ObjectUnion { .. } | FieldKind::ScalarList | FieldKind::ObjectList(_) => {}
        }
    }
}
