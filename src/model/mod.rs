pub mod bindings;
pub mod definitions;
pub mod errors;
pub mod node;
pub mod schema;

// Re-export commonly used types
pub use bindings::{FieldsBindingsMap, OrderableFieldsMap};
pub use definitions::{Definitions, EndpointDefinition, ModelDefinition};
pub use errors::SchemaError;
pub use node::{FieldKind, FieldSpec, Node, NodeBuilder, TruthinessRule};
pub use schema::{RootTruthinessPolicy, Schema};
