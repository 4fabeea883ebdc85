//! array, dictionary and the dictionary-shaped host kinds

use std::collections::BTreeMap;

use super::{
    argument, construct_with, equals, invalid_assignment, invalid_construction, same_type,
    MemberFn, PropertyFn, Type,
};
use crate::entity::{CallArguments, Dictionary, Entity, HostKind};
use crate::errors::{EvalResult, EvaluationError};

fn size_of(value: &Entity) -> EvalResult {
    let size = match value {
        Entity::Array(items) => items.borrow().len(),
        _ => value
            .as_dictionary()
            .map(|d| d.borrow().len())
            .unwrap_or_default(),
    };
    Ok(Entity::integer(size as i64))
}

/* ===================== array ===================== */

fn array_push(receiver: &Entity, arguments: &CallArguments) -> EvalResult {
    let value = argument(arguments, "value", 0)?.detach();
    let items = receiver
        .as_array()
        .ok_or_else(|| EvaluationError::invalid_argument("push expects an array"))?;
    items.borrow_mut().push(value);
    Ok(Entity::Void)
}

fn array_equals(lhs: &Entity, rhs: &Entity) -> Option<bool> {
    let (a, b) = (lhs.as_array()?, rhs.as_array()?);
    if a.borrow().len() != b.borrow().len() {
        return Some(false);
    }
    let (a, b) = (a.borrow().clone(), b.borrow().clone());
    Some(a.iter().zip(b.iter()).all(|(x, y)| equals(x, y)))
}

pub(super) fn array_type() -> Type {
    let mut t = Type::new("array");
    t.construct = Some(|target, argument| construct_with(target, argument, || Entity::array(Vec::new())));
    t.representation = Some(|value| {
        let items = value
            .as_array()
            .map(|items| items.borrow().clone())
            .unwrap_or_default();
        let items: Vec<String> = items.iter().map(Entity::representation).collect();
        format!("[{}]", items.join(", "))
    });
    t.convert = Some(|value, target| {
        let items = value.as_array()?;
        if same_type(target, super::boolean()) {
            return Some(Entity::boolean(!items.borrow().is_empty()));
        }
        None
    });
    t.static_properties = BTreeMap::from([("size", size_of as PropertyFn)]);
    t.member_functions = BTreeMap::from([("push", array_push as MemberFn)]);
    t.binary.contains = Some(|container, element| {
        let items = container.as_array()?.borrow().clone();
        Some(Ok(Entity::boolean(items.iter().any(|item| equals(item, element)))))
    });
    t.binary.eq = Some(|l, r| array_equals(l, r).map(|v| Ok(Entity::boolean(v))));
    t.binary.not_eq = Some(|l, r| array_equals(l, r).map(|v| Ok(Entity::boolean(!v))));
    t
}

/* ===================== dictionary-shaped kinds ===================== */

fn dictionary_insert(receiver: &Entity, arguments: &CallArguments) -> EvalResult {
    let key = argument(arguments, "key", 0)?
        .as_string()
        .ok_or_else(|| EvaluationError::invalid_argument("Dictionary keys must be strings"))?;
    let value = argument(arguments, "value", 1)?.detach();
    let storage = receiver
        .as_dictionary()
        .ok_or_else(|| EvaluationError::invalid_argument("insert expects a dictionary"))?;
    storage.borrow_mut().insert(key, value);
    Ok(Entity::Void)
}

/// Keys resolve to aliases of the stored values, so writes through a
/// property path land in the dictionary
fn dictionary_property(value: &Entity, name: &str) -> Option<Entity> {
    value.as_dictionary()?.borrow().get(name).cloned()
}

fn dictionary_equals(lhs: &Entity, rhs: &Entity) -> Option<bool> {
    let (a, b) = (lhs.as_dictionary()?.borrow().clone(), rhs.as_dictionary()?.borrow().clone());
    Some(
        a.len() == b.len()
            && a.iter()
                .all(|(key, value)| b.get(key).is_some_and(|other| equals(value, other))),
    )
}

/// Wrap dictionary contents as the kind described by `target`
fn retag(target: &Type, contents: Dictionary) -> Entity {
    match HostKind::from_name(target.name) {
        Some(kind) => Entity::host(kind, contents),
        None => Entity::dictionary(contents),
    }
}

fn dictionary_construct(target: &'static Type, argument: Entity) -> EvalResult {
    match &argument {
        Entity::Void => Ok(retag(target, Dictionary::new())),
        Entity::Error(_) => Ok(argument),
        other => match other.detach().as_dictionary() {
            Some(contents) => Ok(retag(target, contents.borrow().clone())),
            None => Err(invalid_construction(target, other)),
        },
    }
}

/// Any dictionary-shaped value may be assigned; the target keeps its kind
fn dictionary_assign(lhs: &Entity, rhs: &Entity) -> EvalResult {
    if rhs.is_error() {
        return Ok(rhs.clone());
    }
    let detached = rhs.detach();
    let (Some(target), Some(source)) = (lhs.as_dictionary(), detached.as_dictionary()) else {
        return Err(invalid_assignment(lhs, rhs));
    };
    let contents = source.borrow().clone();
    *target.borrow_mut() = contents;
    Ok(lhs.clone())
}

fn dictionary_like(name: &'static str) -> Type {
    let mut t = Type::new(name);
    t.construct = Some(dictionary_construct);
    t.assign = Some(dictionary_assign);
    t.representation = Some(|value| {
        let Some(storage) = value.as_dictionary() else {
            return String::new();
        };
        let contents = storage.borrow().clone();
        let entries: Vec<String> = contents
            .iter()
            .map(|(key, value)| format!("{}={}", key, value.representation()))
            .collect();
        format!("({})", entries.join(", "))
    });
    t.convert = Some(|value, target| {
        let storage = value.as_dictionary()?;
        if same_type(target, super::boolean()) {
            return Some(Entity::boolean(!storage.borrow().is_empty()));
        }
        None
    });
    t.static_properties = BTreeMap::from([("size", size_of as PropertyFn)]);
    t.member_functions = BTreeMap::from([("insert", dictionary_insert as MemberFn)]);
    t.dynamic_properties = Some(dictionary_property);
    t.binary.contains = Some(|container, element| {
        let key = element.as_string()?;
        let found = container.as_dictionary()?.borrow().contains_key(&key);
        Some(Ok(Entity::boolean(found)))
    });
    t.binary.eq = Some(|l, r| dictionary_equals(l, r).map(|v| Ok(Entity::boolean(v))));
    t.binary.not_eq = Some(|l, r| dictionary_equals(l, r).map(|v| Ok(Entity::boolean(!v))));
    t
}

pub(super) fn dictionary_type() -> Type {
    dictionary_like("dictionary")
}

pub(super) fn host_type(kind: HostKind) -> Type {
    dictionary_like(kind.name())
}
