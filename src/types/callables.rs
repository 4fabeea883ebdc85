//! Callable kinds. They only carry a representation; calling and awaiting
//! them is handled by the interpreter.

use super::Type;
use crate::entity::Entity;

fn callable_name(value: &Entity) -> String {
    match value {
        Entity::MemberFunction(f) => f.name.to_string(),
        Entity::FreeFunction(f) => f.name.to_string(),
        Entity::WorkflowDefinition(w) => w.name().to_string(),
        Entity::WorkflowInvocation(w) => w.definition.name.name.clone(),
        _ => String::new(),
    }
}

fn callable(name: &'static str) -> Type {
    let mut t = Type::new(name);
    t.representation = Some(|value| format!("{}({})", value.type_name(), callable_name(value)));
    t
}

pub(super) fn member_function_type() -> Type {
    callable("member_function")
}

pub(super) fn free_function_type() -> Type {
    callable("free_function")
}

pub(super) fn workflow_type() -> Type {
    callable("workflow")
}

pub(super) fn workflow_invocation_type() -> Type {
    callable("workflow_invocation")
}
