//! duration and time_point

use chrono::{DateTime, TimeDelta, Utc};

use super::scalars::ordering_result;
use super::{construct_with, invalid_construction, same_type, Type};
use crate::ast::{BinaryOperator, DurationUnit};
use crate::entity::{DurationValue, Entity};
use crate::errors::{EvalResult, EvaluationError};

/* ===================== duration ===================== */

fn negative_duration() -> EvaluationError {
    EvaluationError::invalid_argument("Negative duration")
}

/// Sum or difference, expressed in the finer of the two units, or in
/// milliseconds when that unit does not divide both operands
fn duration_arithmetic(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let (a, b) = (lhs.as_duration()?, rhs.as_duration()?);
    let finer = a.unit.min(b.unit);
    let unit = if a.millis() % finer.millis() == 0 && b.millis() % finer.millis() == 0 {
        finer
    } else {
        DurationUnit::Ms
    };
    let (x, y) = (a.millis() / unit.millis(), b.millis() / unit.millis());
    let count = match op {
        BinaryOperator::Plus => x.checked_add(y),
        BinaryOperator::Minus => x.checked_sub(y),
        _ => None,
    };
    Some(
        count
            .map(|count| Entity::duration(count, unit))
            .ok_or_else(negative_duration),
    )
}

fn duration_scale(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let (d, factor) = (lhs.as_duration()?, rhs.as_integer()?);
    let factor = match u64::try_from(factor) {
        Ok(factor) => factor,
        Err(_) => return Some(Err(negative_duration())),
    };
    let result = match op {
        BinaryOperator::Mult => d
            .count
            .checked_mul(factor)
            .map(|count| DurationValue::new(count, d.unit))
            .ok_or_else(|| EvaluationError::invalid_argument("Duration overflow")),
        BinaryOperator::Div if factor == 0 => {
            Err(EvaluationError::invalid_argument("Division by zero"))
        }
        // Keep the unit when it divides evenly, fall back to milliseconds
        BinaryOperator::Div if d.count % factor == 0 => {
            Ok(DurationValue::new(d.count / factor, d.unit))
        }
        BinaryOperator::Div => Ok(DurationValue::new(d.millis() / factor, DurationUnit::Ms)),
        _ => return None,
    };
    Some(result.map(|v| Entity::duration(v.count, v.unit)))
}

fn duration_compare(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let (a, b) = (lhs.as_duration()?, rhs.as_duration()?);
    ordering_result(op, Some(a.millis().cmp(&b.millis())))
}

pub(super) fn duration_type() -> Type {
    let mut t = Type::new("duration");
    t.construct = Some(|target, argument| match argument {
        Entity::Integer(ms) => {
            let ms = *ms.borrow();
            u64::try_from(ms)
                .map(|ms| Entity::duration(ms, DurationUnit::Ms))
                .map_err(|_| negative_duration())
        }
        other => construct_with(target, other, || Entity::duration(0, DurationUnit::Ms)),
    });
    t.representation = Some(|value| {
        value
            .as_duration()
            .map(|d| d.to_string())
            .unwrap_or_default()
    });
    t.convert = Some(|value, target| {
        let d = value.as_duration()?;
        if same_type(target, super::boolean()) {
            return Some(Entity::boolean(d.count != 0));
        }
        None
    });
    t.binary.plus = Some(|l, r| duration_arithmetic(BinaryOperator::Plus, l, r));
    t.binary.minus = Some(|l, r| duration_arithmetic(BinaryOperator::Minus, l, r));
    t.binary.mult = Some(|l, r| duration_scale(BinaryOperator::Mult, l, r));
    t.binary.div = Some(|l, r| duration_scale(BinaryOperator::Div, l, r));
    t.binary.less = Some(|l, r| duration_compare(BinaryOperator::Less, l, r));
    t.binary.less_eq = Some(|l, r| duration_compare(BinaryOperator::LessEq, l, r));
    t.binary.greater = Some(|l, r| duration_compare(BinaryOperator::Greater, l, r));
    t.binary.greater_eq = Some(|l, r| duration_compare(BinaryOperator::GreaterEq, l, r));
    t.binary.eq = Some(|l, r| duration_compare(BinaryOperator::Eq, l, r));
    t.binary.not_eq = Some(|l, r| duration_compare(BinaryOperator::NotEq, l, r));
    t
}

/* ===================== time_point ===================== */

fn delta(d: DurationValue) -> EvalResult<TimeDelta> {
    i64::try_from(d.millis())
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .ok_or_else(|| EvaluationError::invalid_argument("Duration overflow"))
}

fn shift(op: BinaryOperator, at: DateTime<Utc>, d: DurationValue) -> EvalResult {
    let delta = delta(d)?;
    let shifted = match op {
        BinaryOperator::Plus => at.checked_add_signed(delta),
        _ => at.checked_sub_signed(delta),
    };
    shifted
        .map(Entity::time_point)
        .ok_or_else(|| EvaluationError::invalid_argument("Time point out of range"))
}

fn time_point_plus(lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let (at, d) = (lhs.as_time_point()?, rhs.as_duration()?);
    Some(shift(BinaryOperator::Plus, at, d))
}

/// `time_point - duration` or the elapsed time between two time points
fn time_point_minus(lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let at = lhs.as_time_point()?;
    if let Some(d) = rhs.as_duration() {
        return Some(shift(BinaryOperator::Minus, at, d));
    }
    let earlier = rhs.as_time_point()?;
    let elapsed = (at - earlier).num_milliseconds();
    Some(
        u64::try_from(elapsed)
            .map(|ms| Entity::duration(ms, DurationUnit::Ms))
            .map_err(|_| negative_duration()),
    )
}

fn time_point_compare(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> Option<EvalResult> {
    let (a, b) = (lhs.as_time_point()?, rhs.as_time_point()?);
    ordering_result(op, Some(a.cmp(&b)))
}

pub(super) fn time_point_type() -> Type {
    let mut t = Type::new("time_point");
    t.construct = Some(|target, argument| match argument {
        Entity::String(text) => {
            let text = text.borrow().clone();
            DateTime::parse_from_rfc3339(&text)
                .map(|at| Entity::time_point(at.with_timezone(&Utc)))
                .map_err(|_| {
                    EvaluationError::invalid_argument(format!("Invalid time point '{}'", text))
                })
        }
        Entity::Void => Ok(Entity::time_point(Utc::now())),
        other if other.is_error() || same_type(other.type_(), target) => {
            construct_with(target, other, || Entity::time_point(Utc::now()))
        }
        other => Err(invalid_construction(target, &other)),
    });
    t.representation = Some(|value| {
        value
            .as_time_point()
            .map(|at| at.to_rfc3339())
            .unwrap_or_default()
    });
    t.binary.plus = Some(time_point_plus);
    t.binary.minus = Some(time_point_minus);
    t.binary.less = Some(|l, r| time_point_compare(BinaryOperator::Less, l, r));
    t.binary.less_eq = Some(|l, r| time_point_compare(BinaryOperator::LessEq, l, r));
    t.binary.greater = Some(|l, r| time_point_compare(BinaryOperator::Greater, l, r));
    t.binary.greater_eq = Some(|l, r| time_point_compare(BinaryOperator::GreaterEq, l, r));
    t.binary.eq = Some(|l, r| time_point_compare(BinaryOperator::Eq, l, r));
    t.binary.not_eq = Some(|l, r| time_point_compare(BinaryOperator::NotEq, l, r));
    t
}
