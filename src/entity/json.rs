//! Conversion between entities and JSON
//!
//! Host delegates speak JSON objects; these helpers translate dictionary-shaped
//! entities to and from them.

use serde_json::{Map, Number, Value};

use super::{Dictionary, Entity};

pub type JsonObject = Map<String, Value>;

/// Convert any entity to JSON.
///
/// Durations become their millisecond count, time points an RFC 3339 string,
/// errors `{"error": message}`; callables have no JSON form and map to null.
pub fn to_json(entity: &Entity) -> Value {
    match entity {
        Entity::Void => Value::Null,
        Entity::Boolean(v) => Value::Bool(*v.borrow()),
        Entity::Integer(v) => Value::Number(Number::from(*v.borrow())),
        Entity::Real(v) => Number::from_f64(*v.borrow())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Entity::String(v) => Value::String(v.borrow().clone()),
        Entity::Duration(v) => Value::Number(Number::from(v.borrow().millis())),
        Entity::TimePoint(v) => Value::String(v.borrow().to_rfc3339()),
        Entity::Array(v) => Value::Array(v.borrow().iter().map(to_json).collect()),
        Entity::Dictionary(v) | Entity::Host(_, v) => Value::Object(dictionary_to_json(&v.borrow())),
        Entity::Error(e) => {
            let mut object = Map::new();
            object.insert("error".to_string(), Value::String(e.message.clone()));
            Value::Object(object)
        }
        Entity::MemberFunction(_)
        | Entity::FreeFunction(_)
        | Entity::WorkflowDefinition(_)
        | Entity::WorkflowInvocation(_) => Value::Null,
    }
}

/// JSON object for a dictionary-shaped entity, `None` for anything else
pub fn to_json_object(entity: &Entity) -> Option<JsonObject> {
    entity
        .as_dictionary()
        .map(|dictionary| dictionary_to_json(&dictionary.borrow()))
}

fn dictionary_to_json(dictionary: &Dictionary) -> JsonObject {
    dictionary
        .iter()
        .map(|(key, value)| (key.to_string(), to_json(value)))
        .collect()
}

/// Convert JSON to an entity. Integral numbers that fit `i64` become integers,
/// every other number a real.
pub fn from_json(value: &Value) -> Entity {
    match value {
        Value::Null => Entity::Void,
        Value::Bool(b) => Entity::boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Entity::integer(i),
            None => Entity::real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Entity::string(s.clone()),
        Value::Array(items) => Entity::array(items.iter().map(from_json).collect()),
        Value::Object(object) => Entity::dictionary(from_json_object(object)),
    }
}

pub fn from_json_object(object: &JsonObject) -> Dictionary {
    object
        .iter()
        .map(|(key, value)| (key.clone(), from_json(value)))
        .collect()
}
