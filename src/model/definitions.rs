//! Declarative model and endpoint definitions.
//!
//! Schema descriptors can be declared in YAML (or JSON) instead of being built
//! in code. Models reference each other by name; every endpoint pairs a base
//! query with the root model its rows are reconstructed into.
//!
//! ```yaml
//! models:
//!   Author:
//!     group_by: surname
//!     fields:
//!       - name: surname
//!       - name: works
//!         kind: object_list
//!         model: Work
//!   Work:
//!     group_by: name
//!     fields:
//!       - name: name
//!         binding: work_name
//!       - name: viafs
//!         kind: scalar_list
//!         binding: viaf
//!
//! endpoints:
//!   - name: authors
//!     model: Author
//!     query: |
//!       select * where { ?author <urn:surname> ?surname ... }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::SchemaError;
use super::node::{FieldSpec, Node, TruthinessRule};
use super::schema::{RootTruthinessPolicy, Schema};
use crate::mapper::value::OutputValue;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub models: BTreeMap<String, ModelDefinition>,
    #[serde(default)]
    pub endpoints: Vec<EndpointDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub truthiness: Option<TruthinessDefinition>,
    #[serde(default)]
    pub enforce_grouping_consistency: Option<bool>,
    pub fields: Vec<FieldDefinition>,
}

/// A single field name, or a list of field names that must all be truthy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TruthinessDefinition {
    Field(String),
    AllFields(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKindDefinition {
    #[default]
    Scalar,
    Object,
    ObjectUnion,
    ScalarList,
    ObjectList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Row binding; defaults to the field name
    #[serde(default)]
    pub binding: Option<String>,
    #[serde(default)]
    pub kind: FieldKindDefinition,
    /// Referenced model for object kinds
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    /// Value of an object union field when the nested object is not truthy
    #[serde(default)]
    pub fallback: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub name: String,
    pub model: String,
    pub query: String,
    /// Overrides the server-wide SPARQL endpoint for this endpoint only
    #[serde(default)]
    pub sparql_endpoint: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Definitions {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let contents = fs::read_to_string(path).map_err(|e| SchemaError::ConfigReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(yaml).map_err(|e| SchemaError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Structural checks that do not need node construction.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = std::collections::HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(&endpoint.name) {
                return Err(SchemaError::invalid_definition(format!(
                    "Duplicate endpoint name: {}",
                    endpoint.name
                )));
            }
            if !self.models.contains_key(&endpoint.model) {
                return Err(SchemaError::UnknownNode {
                    field: format!("endpoint '{}'", endpoint.name),
                    model: endpoint.model.clone(),
                });
            }
        }
        Ok(())
    }

    /// Build the node for `model` and all nodes it references.
    pub fn build_node(&self, model: &str) -> Result<Arc<Node>, SchemaError> {
        let mut builder = NodeResolver {
            definitions: self,
            built: HashMap::new(),
            path: Vec::new(),
        };
        builder.resolve(model, "<root>")
    }

    /// Build and root-check the schema for `model`.
    pub fn build_schema(
        &self,
        model: &str,
        policy: RootTruthinessPolicy,
    ) -> Result<Schema, SchemaError> {
        Schema::with_policy(self.build_node(model)?, policy)
    }
}

/// Resolves model references depth-first, sharing nodes referenced more than once.
struct NodeResolver<'a> {
    definitions: &'a Definitions,
    built: HashMap<String, Arc<Node>>,
    path: Vec<String>,
}

impl NodeResolver<'_> {
    fn resolve(&mut self, model: &str, referenced_by: &str) -> Result<Arc<Node>, SchemaError> {
        if let Some(node) = self.built.get(model) {
            return Ok(node.clone());
        }

        if self.path.iter().any(|m| m == model) {
            let mut cycle = self.path.clone();
            cycle.push(model.to_string());
            return Err(SchemaError::CyclicNode {
                model: model.to_string(),
                path: cycle.join(" -> "),
            });
        }

        let definition =
            self.definitions
                .models
                .get(model)
                .ok_or_else(|| SchemaError::UnknownNode {
                    field: referenced_by.to_string(),
                    model: model.to_string(),
                })?;

        self.path.push(model.to_string());

        let mut builder = Node::builder(model);
        if let Some(group_by) = &definition.group_by {
            builder = builder.group_by(group_by.clone());
        }
        if let Some(enforce) = definition.enforce_grouping_consistency {
            builder = builder.enforce_grouping_consistency(enforce);
        }
        if let Some(truthiness) = &definition.truthiness {
            builder = builder.truthiness(match truthiness {
                TruthinessDefinition::Field(field) => TruthinessRule::Field(field.clone()),
                TruthinessDefinition::AllFields(fields) => TruthinessRule::AllFields(fields.clone()),
            });
        }

        for field in &definition.fields {
            builder = builder.field(self.field_spec(model, field)?);
        }

        let node = Arc::new(builder.build()?);
        self.path.pop();
        self.built.insert(model.to_string(), node.clone());
        Ok(node)
    }

    fn field_spec(&mut self, model: &str, field: &FieldDefinition) -> Result<FieldSpec, SchemaError> {
        let qualified = format!("{}.{}", model, field.name);

        let mut spec = match field.kind {
            FieldKindDefinition::Scalar => FieldSpec::scalar(&field.name),
            FieldKindDefinition::ScalarList => FieldSpec::scalar_list(&field.name),
            FieldKindDefinition::Object => {
                FieldSpec::object(&field.name, self.nested(&qualified, field)?)
            }
            FieldKindDefinition::ObjectList => {
                FieldSpec::object_list(&field.name, self.nested(&qualified, field)?)
            }
            FieldKindDefinition::ObjectUnion => {
                let fallback = field
                    .fallback
                    .as_ref()
                    .map(OutputValue::from_json)
                    .unwrap_or_default();
                FieldSpec::object_union(&field.name, self.nested(&qualified, field)?, fallback)
            }
        };

        if field.model.is_some()
            && matches!(
                field.kind,
                FieldKindDefinition::Scalar | FieldKindDefinition::ScalarList
            )
        {
            return Err(SchemaError::invalid_definition(format!(
                "Scalar field '{}' must not reference a model",
                qualified
            )));
        }

        if let Some(binding) = &field.binding {
            spec = spec.with_binding(binding.clone());
        }
        if let Some(default) = &field.default {
            spec = spec.with_default(OutputValue::from_json(default));
        }

        Ok(spec)
    }

    fn nested(&mut self, qualified: &str, field: &FieldDefinition) -> Result<Arc<Node>, SchemaError> {
        let model = field.model.as_deref().ok_or_else(|| {
            SchemaError::invalid_definition(format!(
                "Object field '{}' requires a 'model' reference",
                qualified
            ))
        })?;
        self.resolve(model, qualified)
    }
}
