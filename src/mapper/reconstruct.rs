//! Tree Reconstructor
//!
//! Turns a flat [`RowTable`] into the object graph described by a schema
//! [`Node`]. Two builders recurse into each other:
//!
//! - the **ungrouped** builder produces one object from one row. A grouped
//!   child of an ungrouped object is resolved by reverse-partitioning the
//!   surrounding context on the child's own group key.
//! - the **grouped** builder produces one object from all rows sharing a
//!   group key, aggregating list fields across them.
//!
//! Rows are addressed by index into the table and never copied. Output order
//! always follows row order: ungrouped nodes yield one object per row, grouped
//! nodes one object per distinct key in first-appearance order.

use super::consistency::{ConsistencyChecker, GroupingWarning, Peers};
use super::errors::MappingError;
use super::rows::RowTable;
use super::truthiness::is_truthy;
use super::value::{BindingValue, OutputObject, OutputValue};
use crate::model::node::{FieldKind, FieldSpec, Node};

/// Reconstructed objects plus the grouping violations tolerated on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub objects: Vec<OutputObject>,
    pub warnings: Vec<GroupingWarning>,
}

/// Reconstruct `table` into a list of `node` objects.
pub fn reconstruct(node: &Node, table: &RowTable) -> Result<Vec<OutputObject>, MappingError> {
    reconstruct_with_report(node, table).map(|reconstruction| reconstruction.objects)
}

/// Like [`reconstruct`], also returning relaxed grouping-consistency warnings.
pub fn reconstruct_with_report(
    node: &Node,
    table: &RowTable,
) -> Result<Reconstruction, MappingError> {
    log::debug!(
        "Reconstructing {} row(s) into '{}' ({})",
        table.len(),
        node.name(),
        if node.is_grouped() { "grouped" } else { "ungrouped" }
    );

    let rows: Vec<usize> = (0..table.len()).collect();
    let mut reconstructor = Reconstructor {
        table,
        checker: ConsistencyChecker::default(),
    };
    let objects = reconstructor.instantiate(node, &rows)?;

    Ok(Reconstruction {
        objects,
        warnings: reconstructor.checker.into_warnings(),
    })
}

struct Reconstructor<'t> {
    table: &'t RowTable,
    checker: ConsistencyChecker,
}

impl<'t> Reconstructor<'t> {
    /// Top-level dispatch over a row subset.
    fn instantiate(&mut self, node: &Node, rows: &[usize]) -> Result<Vec<OutputObject>, MappingError> {
        match node.group_by() {
            None => rows
                .iter()
                .map(|row| {
                    let peers = Peers {
                        rows: std::slice::from_ref(row),
                        owner: node,
                    };
                    self.ungrouped(node, *row, &peers, rows)
                })
                .collect(),
            Some(key) => self
                .partition(node, key, rows)?
                .iter()
                .map(|group| self.grouped(node, group))
                .collect(),
        }
    }

    fn ungrouped(
        &mut self,
        node: &Node,
        row: usize,
        peers: &Peers<'_>,
        context: &[usize],
    ) -> Result<OutputObject, MappingError> {
        let mut object = OutputObject::new(node.name());

        for field in node.fields() {
            let value = match field.kind() {
                FieldKind::Scalar => self.scalar(node, field, row, peers)?,
                FieldKind::Object(sub) => {
                    OutputValue::Object(self.nested_from_row(sub, row, peers, context)?)
                }
                FieldKind::ObjectUnion { node: sub, fallback } => {
                    let candidate = self.nested_from_row(sub, row, peers, context)?;
                    resolve_union(sub, candidate, fallback)
                }
                FieldKind::ScalarList | FieldKind::ObjectList(_) => {
                    return Err(MappingError::ListFieldOnUngroupedNode {
                        node: node.name().to_string(),
                        field: field.name().to_string(),
                    });
                }
            };
            object.push(field.name(), value);
        }

        Ok(object)
    }

    fn grouped(&mut self, node: &Node, group: &[usize]) -> Result<OutputObject, MappingError> {
        let Some(&first) = group.first() else {
            return Err(MappingError::EmptyGroup {
                node: node.name().to_string(),
            });
        };
        let peers = Peers {
            rows: group,
            owner: node,
        };
        let mut object = OutputObject::new(node.name());

        for field in node.fields() {
            let value = match field.kind() {
                FieldKind::Scalar => self.scalar(node, field, first, &peers)?,
                FieldKind::ScalarList => self.scalar_list(node, field, group)?,
                FieldKind::ObjectList(sub) => self.object_list(sub, group)?,
                FieldKind::Object(sub) => {
                    OutputValue::Object(self.nested_from_group(sub, first, group, &peers)?)
                }
                FieldKind::ObjectUnion { node: sub, fallback } => {
                    let candidate = self.nested_from_group(sub, first, group, &peers)?;
                    resolve_union(sub, candidate, fallback)
                }
            };
            object.push(field.name(), value);
        }

        Ok(object)
    }

    /// Singular nested object of an ungrouped parent.
    fn nested_from_row(
        &mut self,
        sub: &Node,
        row: usize,
        peers: &Peers<'_>,
        context: &[usize],
    ) -> Result<OutputObject, MappingError> {
        match sub.group_by() {
            None => self.ungrouped(sub, row, peers, context),
            Some(key) => {
                let subset = self.reverse_partition(sub, key, row, context)?;
                self.grouped(sub, &subset)
            }
        }
    }

    /// Singular nested object of a grouped parent.
    fn nested_from_group(
        &mut self,
        sub: &Node,
        first: usize,
        group: &[usize],
        peers: &Peers<'_>,
    ) -> Result<OutputObject, MappingError> {
        if sub.is_grouped() {
            self.grouped(sub, group)
        } else {
            self.ungrouped(sub, first, peers, group)
        }
    }

    /// Split `rows` by the key's bound value, in first-appearance order.
    /// Unbound keys form a group of their own.
    fn partition(
        &self,
        node: &Node,
        key: &FieldSpec,
        rows: &[usize],
    ) -> Result<Vec<Vec<usize>>, MappingError> {
        // an empty result may carry no columns at all
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.table;
        let Some(column) = table.column_index(key.binding()) else {
            return if key.default_value().is_some() {
                // every row falls back to the same default key
                Ok(vec![rows.to_vec()])
            } else {
                Err(missing_binding(node, key))
            };
        };

        let mut groups: Vec<(Option<&BindingValue>, Vec<usize>)> = Vec::new();
        for &row in rows {
            let value = table.value(row, column);
            match groups.iter_mut().find(|(seen, _)| *seen == value) {
                Some((_, members)) => members.push(row),
                None => groups.push((value, vec![row])),
            }
        }

        Ok(groups.into_iter().map(|(_, members)| members).collect())
    }

    /// Rows of `context` sharing `row`'s value for the key binding.
    fn reverse_partition(
        &self,
        node: &Node,
        key: &FieldSpec,
        row: usize,
        context: &[usize],
    ) -> Result<Vec<usize>, MappingError> {
        let table = self.table;
        let Some(column) = table.column_index(key.binding()) else {
            return if key.default_value().is_some() {
                Ok(context.to_vec())
            } else {
                Err(missing_binding(node, key))
            };
        };

        let target = table.value(row, column);
        Ok(context
            .iter()
            .copied()
            .filter(|&candidate| table.value(candidate, column) == target)
            .collect())
    }

    fn scalar(
        &mut self,
        node: &Node,
        field: &FieldSpec,
        row: usize,
        peers: &Peers<'_>,
    ) -> Result<OutputValue, MappingError> {
        let Some(column) = self.table.column_index(field.binding()) else {
            return field
                .default_value()
                .cloned()
                .ok_or_else(|| missing_binding(node, field));
        };

        self.checker.check(node, field, self.table, column, peers)?;

        Ok(match self.table.value(row, column) {
            Some(value) => OutputValue::Scalar(value.clone()),
            None => field.default_value().cloned().unwrap_or_default(),
        })
    }

    fn scalar_list(
        &self,
        node: &Node,
        field: &FieldSpec,
        group: &[usize],
    ) -> Result<OutputValue, MappingError> {
        let Some(column) = self.table.column_index(field.binding()) else {
            return field
                .default_value()
                .cloned()
                .ok_or_else(|| missing_binding(node, field));
        };

        let mut values: Vec<&BindingValue> = Vec::new();
        for &row in group {
            if let Some(value) = self.table.value(row, column) {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }

        Ok(OutputValue::List(
            values.into_iter().cloned().map(OutputValue::Scalar).collect(),
        ))
    }

    fn object_list(&mut self, sub: &Node, group: &[usize]) -> Result<OutputValue, MappingError> {
        let mut items: Vec<OutputValue> = Vec::new();

        for object in self.instantiate(sub, group)? {
            if !is_truthy(&object, sub.truthiness()) {
                continue;
            }
            let item = OutputValue::Object(object);
            if !items.contains(&item) {
                items.push(item);
            }
        }

        Ok(OutputValue::List(items))
    }
}

fn resolve_union(sub: &Node, candidate: OutputObject, fallback: &OutputValue) -> OutputValue {
    if is_truthy(&candidate, sub.truthiness()) {
        OutputValue::Object(candidate)
    } else {
        fallback.clone()
    }
}

fn missing_binding(node: &Node, field: &FieldSpec) -> MappingError {
    MappingError::MissingBinding {
        node: node.name().to_string(),
        field: field.name().to_string(),
        binding: field.binding().to_string(),
    }
}
