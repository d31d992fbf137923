//! Grouping-Consistency Checker
//!
//! Rows that share a group key (and every ancestor's group key) must agree on
//! every value read as a non-aggregated field. A node with
//! `enforce_grouping_consistency` turns a disagreement into an error; a
//! relaxed node logs it, records a [`GroupingWarning`] and keeps the first
//! row's value.

use std::fmt;

use super::errors::{describe, MappingError};
use super::rows::RowTable;
use crate::model::node::{FieldSpec, Node};

/// Rows a non-aggregated value must be identical across, and the grouped
/// node that owns them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Peers<'a> {
    pub rows: &'a [usize],
    pub owner: &'a Node,
}

/// A tolerated grouping-consistency violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingWarning {
    pub node: String,
    pub field: String,
    pub binding: String,
    pub first: String,
    pub conflicting: String,
}

impl fmt::Display for GroupingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Inconsistent values for field '{}' of node '{}' (binding '{}'): {} vs {}; using {}",
            self.field, self.node, self.binding, self.first, self.conflicting, self.first
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct ConsistencyChecker {
    warnings: Vec<GroupingWarning>,
}

impl ConsistencyChecker {
    /// Compare `column` across all peer rows against the first peer row.
    pub fn check(
        &mut self,
        node: &Node,
        field: &FieldSpec,
        table: &RowTable,
        column: usize,
        peers: &Peers<'_>,
    ) -> Result<(), MappingError> {
        let mut values = peers.rows.iter().map(|&row| table.value(row, column));
        let Some(first) = values.next() else {
            return Ok(());
        };
        let Some(conflicting) = values.find(|value| *value != first) else {
            return Ok(());
        };

        if peers.owner.enforces_grouping_consistency() {
            return Err(MappingError::InconsistentGrouping {
                node: node.name().to_string(),
                field: field.name().to_string(),
                binding: field.binding().to_string(),
                first: describe(first),
                conflicting: describe(conflicting),
            });
        }

        let warning = GroupingWarning {
            node: node.name().to_string(),
            field: field.name().to_string(),
            binding: field.binding().to_string(),
            first: describe(first),
            conflicting: describe(conflicting),
        };
        log::warn!("{}", warning);
        self.warnings.push(warning);
        Ok(())
    }

    pub fn into_warnings(self) -> Vec<GroupingWarning> {
        self.warnings
    }
}
