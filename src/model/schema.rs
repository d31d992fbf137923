use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::bindings::{FieldsBindingsMap, OrderableFieldsMap};
use super::errors::SchemaError;
use super::node::Node;

/// What to do when the root node declares a truthiness rule.
///
/// Root presence is decided by the query result set, so the rule can never
/// apply there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootTruthinessPolicy {
    /// Fail schema construction
    #[default]
    Reject,
    /// Log a warning and drop the rule from the root
    Warn,
}

impl FromStr for RootTruthinessPolicy {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(RootTruthinessPolicy::Reject),
            "warn" => Ok(RootTruthinessPolicy::Warn),
            other => Err(SchemaError::invalid_definition(format!(
                "unknown root truthiness policy '{}', expected 'reject' or 'warn'",
                other
            ))),
        }
    }
}

/// A node checked for use as the root of a result set.
#[derive(Debug, Clone)]
pub struct Schema {
    root: Arc<Node>,
}

impl Schema {
    /// Check `root` with the default [`RootTruthinessPolicy::Reject`].
    pub fn new(root: impl Into<Arc<Node>>) -> Result<Self, SchemaError> {
        Self::with_policy(root, RootTruthinessPolicy::default())
    }

    pub fn with_policy(
        root: impl Into<Arc<Node>>,
        policy: RootTruthinessPolicy,
    ) -> Result<Self, SchemaError> {
        let root = root.into();

        if !root.has_truthiness_rule() {
            return Ok(Schema { root });
        }

        match policy {
            RootTruthinessPolicy::Reject => Err(SchemaError::RootTruthiness {
                node: root.name().to_string(),
            }),
            RootTruthinessPolicy::Warn => {
                log::warn!(
                    "Ignoring truthiness rule on root node '{}': root presence is controlled by the query.",
                    root.name()
                );
                Ok(Schema {
                    root: Arc::new(root.without_truthiness()),
                })
            }
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn is_grouped(&self) -> bool {
        self.root.is_grouped()
    }

    /// Binding of the root grouping key; drives pagination by group.
    pub fn group_by_binding(&self) -> Option<&str> {
        self.root.group_by_binding()
    }

    pub fn bindings(&self) -> FieldsBindingsMap {
        FieldsBindingsMap::new(&self.root)
    }

    pub fn orderable_fields(&self) -> OrderableFieldsMap {
        OrderableFieldsMap::new(&self.root)
    }
}
