//! Schema descriptor nodes
//!
//! A [`Node`] describes one output object type: its ordered fields, how each
//! field is sourced from row bindings, an optional grouping key and an optional
//! truthiness rule. Nodes are validated when built and immutable afterwards;
//! nested nodes are shared through `Arc` so one node can appear under several
//! parents.
//!
//! ```ignore
//! let work = Node::builder("Work")
//!     .group_by("name")
//!     .field(FieldSpec::scalar("name").with_binding("work_name"))
//!     .field(FieldSpec::scalar_list("viafs").with_binding("viaf"))
//!     .build()?;
//!
//! let author = Node::builder("Author")
//!     .group_by("surname")
//!     .field(FieldSpec::scalar("surname"))
//!     .field(FieldSpec::object_list("works", work))
//!     .build()?;
//! ```

use std::fmt;
use std::sync::Arc;

use super::errors::SchemaError;
use crate::mapper::value::{OutputObject, OutputValue};

/// Predicate deciding whether an object counts as present.
pub type TruthinessPredicate = Arc<dyn Fn(&OutputObject) -> bool + Send + Sync>;

/// Policy deciding whether a constructed object counts as "present".
#[derive(Clone, Default)]
pub enum TruthinessRule {
    /// At least one field value is truthy
    #[default]
    AnyField,
    /// The named field is truthy
    Field(String),
    /// All named fields are truthy
    AllFields(Vec<String>),
    Custom(TruthinessPredicate),
}

pub(crate) static DEFAULT_TRUTHINESS: TruthinessRule = TruthinessRule::AnyField;

impl TruthinessRule {
    pub fn custom(predicate: impl Fn(&OutputObject) -> bool + Send + Sync + 'static) -> Self {
        TruthinessRule::Custom(Arc::new(predicate))
    }

    /// Field names the rule depends on.
    pub fn referenced_fields(&self) -> &[String] {
        match self {
            TruthinessRule::Field(field) => std::slice::from_ref(field),
            TruthinessRule::AllFields(fields) => fields,
            TruthinessRule::AnyField | TruthinessRule::Custom(_) => &[],
        }
    }
}

impl fmt::Debug for TruthinessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TruthinessRule::AnyField => f.write_str("AnyField"),
            TruthinessRule::Field(field) => f.debug_tuple("Field").field(field).finish(),
            TruthinessRule::AllFields(fields) => f.debug_tuple("AllFields").field(fields).finish(),
            TruthinessRule::Custom(_) => f.write_str("Custom(<predicate>)"),
        }
    }
}

/// Storage kind of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Single bound value
    Scalar,
    /// Singular nested object
    Object(Arc<Node>),
    /// Nested object if truthy, otherwise `fallback`
    ObjectUnion {
        node: Arc<Node>,
        fallback: OutputValue,
    },
    /// Aggregated distinct values of the field's binding
    ScalarList,
    /// Aggregated distinct truthy objects
    ObjectList(Arc<Node>),
}

impl FieldKind {
    pub fn is_list(&self) -> bool {
        matches!(self, FieldKind::ScalarList | FieldKind::ObjectList(_))
    }

    pub fn nested_node(&self) -> Option<&Arc<Node>> {
        match self {
            FieldKind::Object(node)
            | FieldKind::ObjectUnion { node, .. }
            | FieldKind::ObjectList(node) => Some(node),
            FieldKind::Scalar | FieldKind::ScalarList => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FieldKind::Scalar => "scalar",
            FieldKind::Object(_) => "object",
            FieldKind::ObjectUnion { .. } => "object union",
            FieldKind::ScalarList => "scalar list",
            FieldKind::ObjectList(_) => "object list",
        }
    }
}

/// One output field and the binding it is read from.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    binding: String,
    kind: FieldKind,
    default: Option<OutputValue>,
}

impl FieldSpec {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        FieldSpec {
            binding: name.clone(),
            name,
            kind,
            default: None,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar)
    }

    pub fn scalar_list(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::ScalarList)
    }

    pub fn object(name: impl Into<String>, node: impl Into<Arc<Node>>) -> Self {
        Self::new(name, FieldKind::Object(node.into()))
    }

    pub fn object_union(
        name: impl Into<String>,
        node: impl Into<Arc<Node>>,
        fallback: OutputValue,
    ) -> Self {
        Self::new(
            name,
            FieldKind::ObjectUnion {
                node: node.into(),
                fallback,
            },
        )
    }

    pub fn object_list(name: impl Into<String>, node: impl Into<Arc<Node>>) -> Self {
        Self::new(name, FieldKind::ObjectList(node.into()))
    }

    /// Read the field from `binding` instead of the binding named like the field.
    pub fn with_binding(mut self, binding: impl Into<String>) -> Self {
        self.binding = binding.into();
        self
    }

    pub fn with_default(mut self, default: impl Into<OutputValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> &str {
        &self.binding
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default_value(&self) -> Option<&OutputValue> {
        self.default.as_ref()
    }
}

/// Validated description of an output object type.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    fields: Vec<FieldSpec>,
    group_by: Option<usize>,
    truthiness: Option<TruthinessRule>,
    enforce_grouping_consistency: bool,
}

impl Node {
    pub fn builder(name: impl Into<String>) -> NodeBuilder {
        NodeBuilder {
            name: name.into(),
            fields: Vec::new(),
            group_by: None,
            truthiness: None,
            enforce_grouping_consistency: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in output order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The grouping key field, if the node is grouped.
    pub fn group_by(&self) -> Option<&FieldSpec> {
        self.group_by.map(|index| &self.fields[index])
    }

    /// Binding of the grouping key field.
    pub fn group_by_binding(&self) -> Option<&str> {
        self.group_by().map(FieldSpec::binding)
    }

    pub fn is_grouped(&self) -> bool {
        self.group_by.is_some()
    }

    /// Effective truthiness rule; the default rule when none was declared.
    pub fn truthiness(&self) -> &TruthinessRule {
        self.truthiness.as_ref().unwrap_or(&DEFAULT_TRUTHINESS)
    }

    pub fn has_truthiness_rule(&self) -> bool {
        self.truthiness.is_some()
    }

    pub fn enforces_grouping_consistency(&self) -> bool {
        self.enforce_grouping_consistency
    }

    /// Copy of this node with its declared truthiness rule removed.
    pub(crate) fn without_truthiness(&self) -> Node {
        Node {
            truthiness: None,
            ..self.clone()
        }
    }
}

/// Builder for [`Node`]; `build` runs all structural checks.
#[derive(Debug)]
pub struct NodeBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    group_by: Option<String>,
    truthiness: Option<TruthinessRule>,
    enforce_grouping_consistency: Option<bool>,
}

impl NodeBuilder {
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    pub fn truthiness(mut self, rule: TruthinessRule) -> Self {
        self.truthiness = Some(rule);
        self
    }

    pub fn enforce_grouping_consistency(mut self, enforce: bool) -> Self {
        self.enforce_grouping_consistency = Some(enforce);
        self
    }

    pub fn build(self) -> Result<Node, SchemaError> {
        for (index, field) in self.fields.iter().enumerate() {
            if self.fields[..index].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    node: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        let group_by = self.check_group_by()?;
        self.check_list_items()?;
        self.check_truthiness()?;

        if self.enforce_grouping_consistency.is_some() && group_by.is_none() {
            log::warn!(
                "Node '{}' sets 'enforce_grouping_consistency' without 'group_by'; the setting has no effect.",
                self.name
            );
        }

        Ok(Node {
            name: self.name,
            fields: self.fields,
            group_by,
            truthiness: self.truthiness,
            enforce_grouping_consistency: self.enforce_grouping_consistency.unwrap_or(true),
        })
    }

    /// List fields and `group_by` require each other; the key must be a scalar field.
    fn check_group_by(&self) -> Result<Option<usize>, SchemaError> {
        let list_field = self.fields.iter().find(|field| field.kind.is_list());

        match (&self.group_by, list_field) {
            (None, None) => Ok(None),
            (None, Some(field)) => Err(SchemaError::MissingGroupBy {
                node: self.name.clone(),
                field: field.name.clone(),
            }),
            (Some(_), None) => Err(SchemaError::GroupByWithoutListField {
                node: self.name.clone(),
            }),
            (Some(key), Some(_)) => {
                let position = self
                    .fields
                    .iter()
                    .position(|field| &field.name == key && matches!(field.kind, FieldKind::Scalar));

                position.map(Some).ok_or_else(|| {
                    let applicable: Vec<&str> = self
                        .fields
                        .iter()
                        .filter(|field| matches!(field.kind, FieldKind::Scalar))
                        .map(|field| field.name.as_str())
                        .collect();

                    let applicable = if applicable.is_empty() {
                        "No applicable fields.".to_string()
                    } else {
                        format!("Applicable grouping field(s): {}", applicable.join(", "))
                    };

                    if let Some(field) = self.fields.iter().find(|field| &field.name == key) {
                        log::debug!(
                            "Rejecting {} field '{}' as grouping key of '{}'",
                            field.kind.label(),
                            key,
                            self.name
                        );
                    }

                    SchemaError::InvalidGroupBy {
                        node: self.name.clone(),
                        key: key.clone(),
                        applicable,
                    }
                })
            }
        }
    }

    /// Objects of an object list are aggregated per key, so their node must be grouped.
    fn check_list_items(&self) -> Result<(), SchemaError> {
        for field in &self.fields {
            if let FieldKind::ObjectList(sub) = &field.kind {
                if !sub.is_grouped() {
                    return Err(SchemaError::UngroupedListItem {
                        node: self.name.clone(),
                        field: field.name.clone(),
                        model: sub.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_truthiness(&self) -> Result<(), SchemaError> {
        let Some(rule) = &self.truthiness else {
            return Ok(());
        };

        for referenced in rule.referenced_fields() {
            if !self.fields.iter().any(|field| &field.name == referenced) {
                return Err(SchemaError::UnknownTruthinessField {
                    node: self.name.clone(),
                    field: referenced.clone(),
                });
            }
        }

        Ok(())
    }
}
