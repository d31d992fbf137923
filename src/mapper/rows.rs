//! Row tables
//!
//! A `RowTable` is the flat result of one executed query. Columns are the
//! union of all bindings seen, in first-appearance order; every row holds one
//! slot per column so a binding lookup resolves to a column index once and is
//! then a plain index into each row.

use serde_json::Value;

use super::value::BindingValue;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<BindingValue>>>,
}

impl RowTable {
    pub fn new(columns: Vec<String>) -> Self {
        RowTable {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from ordered binding maps. Bindings missing from a row are null.
    pub fn from_bindings<R, K>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = (K, Option<BindingValue>)>,
        K: Into<String>,
    {
        let mut table = RowTable::default();
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Build a table from JSON objects, e.g. `[{"x": 1, "y": "a"}]`.
    ///
    /// Non-object entries are skipped. JSON null becomes an unbound cell.
    pub fn from_json_rows(rows: &[Value]) -> Self {
        let mut table = RowTable::default();
        for row in rows {
            match row {
                Value::Object(map) => table.push_row(
                    map.iter()
                        .map(|(key, value)| (key.clone(), BindingValue::from_json(value))),
                ),
                other => log::debug!("Skipping non-object row in JSON table: {}", other),
            }
        }
        table
    }

    /// Append a row, adding columns for bindings not seen before.
    pub fn push_row<K: Into<String>>(
        &mut self,
        bindings: impl IntoIterator<Item = (K, Option<BindingValue>)>,
    ) {
        let mut row = vec![None; self.columns.len()];
        for (binding, value) in bindings {
            let binding = binding.into();
            let index = match self.column_index(&binding) {
                Some(index) => index,
                None => {
                    self.columns.push(binding);
                    for existing in &mut self.rows {
                        existing.push(None);
                    }
                    row.push(None);
                    self.columns.len() - 1
                }
            };
            row[index] = value;
        }
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, binding: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == binding)
    }

    pub fn has_column(&self, binding: &str) -> bool {
        self.column_index(binding).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (`row`, `column`); `None` for unbound cells or out-of-range indices.
    pub fn value(&self, row: usize, column: usize) -> Option<&BindingValue> {
        self.rows.get(row).and_then(|cells| cells.get(column)).and_then(Option::as_ref)
    }

    /// Cell for a binding name in one row.
    pub fn get(&self, row: usize, binding: &str) -> Option<&BindingValue> {
        self.column_index(binding)
            .and_then(|column| self.value(row, column))
    }

    /// Rows as (binding, value) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = Vec<(&str, Option<&BindingValue>)>> + '_ {
        self.rows.iter().map(move |cells| {
            self.columns
                .iter()
                .zip(cells)
                .map(|(column, cell)| (column.as_str(), cell.as_ref()))
                .collect()
        })
    }
}
