//! Truthiness Evaluator
//!
//! Decides whether a constructed object counts as present. Object lists drop
//! objects that are not truthy; object unions fall back to their default.

use super::value::OutputObject;
use crate::model::node::TruthinessRule;

pub fn is_truthy(object: &OutputObject, rule: &TruthinessRule) -> bool {
    match rule {
        TruthinessRule::AnyField => object.fields().any(|(_, value)| value.is_truthy()),
        TruthinessRule::Field(field) => field_is_truthy(object, field),
        TruthinessRule::AllFields(fields) => fields.iter().all(|f| field_is_truthy(object, f)),
        TruthinessRule::Custom(predicate) => predicate(object),
    }
}

fn field_is_truthy(object: &OutputObject, field: &str) -> bool {
    object.get(field).is_some_and(|value| value.is_truthy())
}
