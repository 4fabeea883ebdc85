//! void, boolean, integer, real, string and error

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{construct_with, invalid_assignment, invalid_construction, same_type, PropertyFn, Type};
use crate::ast::BinaryOperator;
use crate::entity::Entity;
use crate::errors::{EvalResult, EvaluationError, EvaluationErrorKind};

fn boolean_result(value: bool) -> Option<EvalResult> {
    Some(Ok(Entity::boolean(value)))
}

/// Result of an ordering operator, `None` for incomparable values
pub(super) fn ordering_result(op: BinaryOperator, ordering: Option<Ordering>) -> Option<EvalResult> {
    let ordering = ordering?;
    let value = match op {
        BinaryOperator::Less => ordering == Ordering::Less,
        BinaryOperator::LessEq => ordering != Ordering::Greater,
        BinaryOperator::Greater => ordering == Ordering::Greater,
        BinaryOperator::GreaterEq => ordering != Ordering::Less,
        BinaryOperator::Eq => ordering == Ordering::Equal,
        BinaryOperator::NotEq => ordering != Ordering::Equal,
        _ => return None,
    };
    boolean_result(value)
}

/* ===================== void ===================== */

pub(super) fn void_type() -> Type {
    let mut t = Type::new("void");
    t.construct = Some(|target, argument| match argument {
        Entity::Void => Ok(Entity::Void),
        other => Err(invalid_construction(target, &other)),
    });
    t.representation = Some(|_| "void".to_string());
    t.binary.eq = Some(|_, rhs| boolean_result(rhs.is_void()));
    t.binary.not_eq = Some(|_, rhs| boolean_result(!rhs.is_void()));
    t
}

/* ===================== boolean ===================== */

fn logical(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let (a, b) = (lhs.as_boolean()?, rhs.as_boolean()?);
    let value = match op {
        BinaryOperator::And => a && b,
        BinaryOperator::Or => a || b,
        BinaryOperator::Eq => a == b,
        BinaryOperator::NotEq => a != b,
        _ => return None,
    };
    boolean_result(value)
}

pub(super) fn boolean_type() -> Type {
    let mut t = Type::new("boolean");
    t.construct = Some(|target, argument| construct_with(target, argument, || Entity::boolean(false)));
    t.representation = Some(|value| value.as_boolean().unwrap_or_default().to_string());
    t.convert = Some(|value, target| {
        let v = value.as_boolean()?;
        if same_type(target, super::string()) {
            return Some(Entity::string(v.to_string()));
        }
        None
    });
    t.unary.not = Some(|operand| {
        operand
            .as_boolean()
            .map(|v| Entity::boolean(!v))
            .ok_or_else(|| invalid_operand("not", operand))
    });
    t.binary.and = Some(|l, r| logical(BinaryOperator::And, l, r));
    t.binary.or = Some(|l, r| logical(BinaryOperator::Or, l, r));
    t.binary.eq = Some(|l, r| logical(BinaryOperator::Eq, l, r));
    t.binary.not_eq = Some(|l, r| logical(BinaryOperator::NotEq, l, r));
    t
}

fn invalid_operand(symbol: &str, operand: &Entity) -> EvaluationError {
    EvaluationError::new(
        EvaluationErrorKind::NoMatchingOperator,
        format!(
            "No matching operator '{}' for type '{}'",
            symbol,
            operand.type_name()
        ),
    )
}

/* ===================== integer / real ===================== */

#[derive(Debug, Clone, Copy)]
enum Number {
    Integer(i64),
    Real(f64),
}

impl Number {
    fn of(value: &Entity) -> Option<Self> {
        match value {
            Entity::Integer(v) => Some(Number::Integer(*v.borrow())),
            Entity::Real(v) => Some(Number::Real(*v.borrow())),
            _ => None,
        }
    }

    fn real(self) -> f64 {
        match self {
            Number::Integer(v) => v as f64,
            Number::Real(v) => v,
        }
    }
}

fn integer_arithmetic(op: BinaryOperator, a: i64, b: i64) -> EvalResult {
    if op == BinaryOperator::Div && b == 0 {
        return Err(EvaluationError::invalid_argument("Division by zero"));
    }
    let value = match op {
        BinaryOperator::Mult => a.checked_mul(b),
        BinaryOperator::Div => a.checked_div(b),
        BinaryOperator::Plus => a.checked_add(b),
        BinaryOperator::Minus => a.checked_sub(b),
        _ => None,
    };
    value
        .map(Entity::integer)
        .ok_or_else(|| EvaluationError::invalid_argument("Integer overflow"))
}

/// Integer with integer stays integer, any real operand makes a real
fn arithmetic(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let (a, b) = (Number::of(lhs)?, Number::of(rhs)?);
    if let (Number::Integer(a), Number::Integer(b)) = (a, b) {
        return Some(integer_arithmetic(op, a, b));
    }
    let (a, b) = (a.real(), b.real());
    let value = match op {
        BinaryOperator::Mult => a * b,
        BinaryOperator::Div => a / b,
        BinaryOperator::Plus => a + b,
        BinaryOperator::Minus => a - b,
        _ => return None,
    };
    Some(Ok(Entity::real(value)))
}

fn compare(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let ordering = match (Number::of(lhs)?, Number::of(rhs)?) {
        (Number::Integer(a), Number::Integer(b)) => Some(a.cmp(&b)),
        (a, b) => a.real().partial_cmp(&b.real()),
    };
    match ordering {
        Some(_) => ordering_result(op, ordering),
        // NaN compares unequal to everything
        None => boolean_result(op == BinaryOperator::NotEq),
    }
}

fn negate(operand: &Entity) -> EvalResult {
    match Number::of(operand) {
        Some(Number::Integer(v)) => v
            .checked_neg()
            .map(Entity::integer)
            .ok_or_else(|| EvaluationError::invalid_argument("Integer overflow")),
        Some(Number::Real(v)) => Ok(Entity::real(-v)),
        None => Err(invalid_operand("-", operand)),
    }
}

fn numeric_convert(value: &Entity, target: &'static Type) -> Option<Entity> {
    let number = Number::of(value)?;
    if same_type(target, super::boolean()) {
        return Some(Entity::boolean(number.real() != 0.0));
    }
    if same_type(target, super::real()) {
        return Some(Entity::real(number.real()));
    }
    if same_type(target, super::integer()) {
        return Some(Entity::integer(number.real() as i64));
    }
    if same_type(target, super::string()) {
        return Some(Entity::string(value.representation()));
    }
    None
}

/// Accepts either numeric kind; the binding keeps the target's kind
fn numeric_assign(lhs: &Entity, rhs: &Entity) -> EvalResult {
    if rhs.is_error() {
        return Ok(rhs.clone());
    }
    let number = Number::of(rhs).ok_or_else(|| invalid_assignment(lhs, rhs))?;
    match lhs {
        Entity::Integer(storage) => {
            *storage.borrow_mut() = match number {
                Number::Integer(v) => v,
                Number::Real(v) => v as i64,
            };
            Ok(lhs.clone())
        }
        Entity::Real(storage) => {
            *storage.borrow_mut() = number.real();
            Ok(lhs.clone())
        }
        _ => Err(invalid_assignment(lhs, rhs)),
    }
}

fn numeric_construct(target: &'static Type, argument: Entity) -> EvalResult {
    if argument.is_void() || argument.is_error() {
        let default: fn() -> Entity = if same_type(target, super::integer()) {
            || Entity::integer(0)
        } else {
            || Entity::real(0.0)
        };
        return construct_with(target, argument, default);
    }
    match Number::of(&argument) {
        Some(_) => numeric_convert(&argument, target)
            .ok_or_else(|| invalid_construction(target, &argument)),
        None => Err(invalid_construction(target, &argument)),
    }
}

pub(super) fn format_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn numeric_type(name: &'static str) -> Type {
    let mut t = Type::new(name);
    t.construct = Some(numeric_construct);
    t.assign = Some(numeric_assign);
    t.convert = Some(numeric_convert);
    t.representation = Some(|value| match Number::of(value) {
        Some(Number::Integer(v)) => v.to_string(),
        Some(Number::Real(v)) => format_real(v),
        None => String::new(),
    });
    t.unary.plus = Some(|operand| match Number::of(operand) {
        Some(_) => Ok(operand.detach()),
        None => Err(invalid_operand("+", operand)),
    });
    t.unary.minus = Some(negate);
    t.binary.mult = Some(|l, r| arithmetic(BinaryOperator::Mult, l, r));
    t.binary.div = Some(|l, r| arithmetic(BinaryOperator::Div, l, r));
    t.binary.plus = Some(|l, r| arithmetic(BinaryOperator::Plus, l, r));
    t.binary.minus = Some(|l, r| arithmetic(BinaryOperator::Minus, l, r));
    t.binary.less = Some(|l, r| compare(BinaryOperator::Less, l, r));
    t.binary.less_eq = Some(|l, r| compare(BinaryOperator::LessEq, l, r));
    t.binary.greater = Some(|l, r| compare(BinaryOperator::Greater, l, r));
    t.binary.greater_eq = Some(|l, r| compare(BinaryOperator::GreaterEq, l, r));
    t.binary.eq = Some(|l, r| compare(BinaryOperator::Eq, l, r));
    t.binary.not_eq = Some(|l, r| compare(BinaryOperator::NotEq, l, r));
    t
}

pub(super) fn integer_type() -> Type {
    numeric_type("integer")
}

pub(super) fn real_type() -> Type {
    numeric_type("real")
}

/* ===================== string ===================== */

fn string_compare(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let (a, b) = (lhs.as_string()?, rhs.as_string()?);
    ordering_result(op, Some(a.cmp(&b)))
}

fn string_size(value: &Entity) -> EvalResult {
    let size = value.as_string().map(|s| s.chars().count()).unwrap_or_default();
    Ok(Entity::integer(size as i64))
}

pub(super) fn string_type() -> Type {
    let mut t = Type::new("string");
    t.construct = Some(|target, argument| construct_with(target, argument, || Entity::string("")));
    t.representation = Some(|value| value.as_string().unwrap_or_default());
    t.static_properties = BTreeMap::from([("size", string_size as PropertyFn)]);
    t.convert = Some(|value, target| {
        let s = value.as_string()?;
        if same_type(target, super::boolean()) {
            return Some(Entity::boolean(!s.is_empty()));
        }
        None
    });
    t.binary.plus = Some(|lhs, rhs| {
        let (a, b) = (lhs.as_string()?, rhs.as_string()?);
        Some(Ok(Entity::string(a + &b)))
    });
    t.binary.less = Some(|l, r| string_compare(BinaryOperator::Less, l, r));
    t.binary.less_eq = Some(|l, r| string_compare(BinaryOperator::LessEq, l, r));
    t.binary.greater = Some(|l, r| string_compare(BinaryOperator::Greater, l, r));
    t.binary.greater_eq = Some(|l, r| string_compare(BinaryOperator::GreaterEq, l, r));
    t.binary.eq = Some(|l, r| string_compare(BinaryOperator::Eq, l, r));
    t.binary.not_eq = Some(|l, r| string_compare(BinaryOperator::NotEq, l, r));
    t.binary.contains = Some(|container, element| {
        let (haystack, needle) = (container.as_string()?, element.as_string()?);
        boolean_result(haystack.contains(&needle))
    });
    t
}

/* ===================== error ===================== */

fn error_message(value: &Entity) -> EvalResult {
    Ok(Entity::string(
        value.as_error().map(|e| e.message.clone()).unwrap_or_default(),
    ))
}

fn error_equals(lhs: &Entity, rhs: &Entity) -> Option<bool> {
    Some(lhs.as_error()?.message == rhs.as_error()?.message)
}

pub(super) fn error_type() -> Type {
    let mut t = Type::new("error");
    t.construct = Some(|target, argument| match argument {
        Entity::Void => Ok(Entity::error("", None)),
        Entity::Error(_) => Ok(argument),
        Entity::String(message) => Ok(Entity::error(message.borrow().clone(), None)),
        other => Err(invalid_construction(target, &other)),
    });
    t.representation = Some(|value| {
        value
            .as_error()
            .map(|e| e.message.clone())
            .unwrap_or_default()
    });
    t.static_properties = BTreeMap::from([("message", error_message as PropertyFn)]);
    t.binary.eq = Some(|l, r| error_equals(l, r).map(|v| Ok(Entity::boolean(v))));
    t.binary.not_eq = Some(|l, r| error_equals(l, r).map(|v| Ok(Entity::boolean(!v))));
    t
}
