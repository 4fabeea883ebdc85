//! Type descriptors
//!
//! One [`Type`] per value kind, built once and shared as a `&'static`. A
//! descriptor is a table of operation slots; an empty slot means the operation
//! is not supported and dispatch produces the matching failure. Binary slots
//! are looked up on the left operand's type and decide themselves which right
//! operand kinds they accept, returning `None` for combinations they do not
//! define.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::entity::{CallArguments, Entity, HostKind, MemberFn, MemberFunction};
use crate::errors::{EvalResult, EvaluationError, EvaluationErrorKind};

mod callables;
mod containers;
mod scalars;
mod time;

#[cfg(test)]
mod tests;

/* ===================== Slot Signatures ===================== */

pub type ConstructFn = fn(&'static Type, Entity) -> EvalResult;
/// Returns the value to bind after the assignment
pub type AssignFn = fn(&Entity, &Entity) -> EvalResult;
pub type ConvertFn = fn(&Entity, &'static Type) -> Option<Entity>;
pub type RepresentFn = fn(&Entity) -> String;
pub type UnaryFn = fn(&Entity) -> EvalResult;
/// `None` when the right operand's kind is not supported
pub type BinaryFn = fn(&Entity, &Entity) -> Option<EvalResult>;
pub type PropertyFn = fn(&Entity) -> EvalResult;
pub type DynamicPropertyFn = fn(&Entity, &str) -> Option<Entity>;

#[derive(Default)]
pub struct UnarySlots {
    pub plus: Option<UnaryFn>,
    pub minus: Option<UnaryFn>,
    pub not: Option<UnaryFn>,
}

#[derive(Default)]
pub struct BinarySlots {
    pub mult: Option<BinaryFn>,
    pub div: Option<BinaryFn>,
    pub plus: Option<BinaryFn>,
    pub minus: Option<BinaryFn>,
    pub less: Option<BinaryFn>,
    pub less_eq: Option<BinaryFn>,
    pub greater: Option<BinaryFn>,
    pub greater_eq: Option<BinaryFn>,
    pub eq: Option<BinaryFn>,
    pub not_eq: Option<BinaryFn>,
    /// `container.contains(element)`, used by `element in container`
    pub contains: Option<BinaryFn>,
    pub and: Option<BinaryFn>,
    pub or: Option<BinaryFn>,
}

/* ===================== Type ===================== */

pub struct Type {
    pub id: &'static str,
    pub name: &'static str,
    pub member_functions: BTreeMap<&'static str, MemberFn>,
    pub static_properties: BTreeMap<&'static str, PropertyFn>,
    pub dynamic_properties: Option<DynamicPropertyFn>,
    pub construct: Option<ConstructFn>,
    pub assign: Option<AssignFn>,
    pub convert: Option<ConvertFn>,
    pub representation: Option<RepresentFn>,
    pub unary: UnarySlots,
    pub binary: BinarySlots,
}

impl std::fmt::Debug for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Type").field("id", &self.id).finish()
    }
}

impl Type {
    /// Descriptor with every slot empty
    pub fn new(name: &'static str) -> Self {
        Self {
            id: name,
            name,
            member_functions: BTreeMap::new(),
            static_properties: BTreeMap::new(),
            dynamic_properties: None,
            construct: None,
            assign: None,
            convert: None,
            representation: None,
            unary: UnarySlots::default(),
            binary: BinarySlots::default(),
        }
    }

    /// Build a value of this type from an initializer (`Void` when absent)
    pub fn construct(&'static self, argument: Entity) -> EvalResult {
        match self.construct {
            Some(construct) => construct(self, argument),
            None => Err(EvaluationError::new(
                EvaluationErrorKind::NotConstructible,
                format!("Type '{}' is not constructible", self.name),
            )),
        }
    }

    /// Assign `rhs` to `lhs`. Writes through `lhs`'s storage when kinds allow
    /// and returns the value the binding should hold afterwards.
    pub fn assign(&self, lhs: &Entity, rhs: &Entity) -> EvalResult {
        match self.assign {
            Some(assign) => assign(lhs, rhs),
            None => default_assign(lhs, rhs),
        }
    }

    pub fn convert(&self, value: &Entity, target: &'static Type) -> EvalResult {
        if same_type(value.type_(), target) {
            return Ok(value.clone());
        }
        self.convert
            .and_then(|convert| convert(value, target))
            .ok_or_else(|| {
                EvaluationError::new(
                    EvaluationErrorKind::NotConvertible,
                    format!("Type '{}' not convertible to '{}'", self.name, target.name),
                )
            })
    }

    pub fn represent(&self, value: &Entity) -> String {
        match self.representation {
            Some(represent) => represent(value),
            None => format!("{}(...)", self.name),
        }
    }

    pub fn unary(&self, op: UnaryOperator, operand: &Entity) -> EvalResult {
        let slot = match op {
            UnaryOperator::Plus => self.unary.plus,
            UnaryOperator::Minus => self.unary.minus,
            UnaryOperator::Not => self.unary.not,
        };
        match slot {
            Some(call) => call(operand),
            None => Err(EvaluationError::new(
                EvaluationErrorKind::NoMatchingOperator,
                format!(
                    "No matching operator '{}' for type '{}'",
                    op.symbol(),
                    self.name
                ),
            )),
        }
    }

    /// Dispatch a binary operator with this type on the left.
    ///
    /// `in` is looked up on the container, so for [`BinaryOperator::In`] `lhs`
    /// is the container and `rhs` the element. `is` is not an operator slot.
    pub fn binary(&self, op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> EvalResult {
        let slot = match op {
            BinaryOperator::Mult => self.binary.mult,
            BinaryOperator::Div => self.binary.div,
            BinaryOperator::Plus => self.binary.plus,
            BinaryOperator::Minus => self.binary.minus,
            BinaryOperator::Less => self.binary.less,
            BinaryOperator::LessEq => self.binary.less_eq,
            BinaryOperator::Greater => self.binary.greater,
            BinaryOperator::GreaterEq => self.binary.greater_eq,
            BinaryOperator::Eq => self.binary.eq,
            BinaryOperator::NotEq => self.binary.not_eq,
            BinaryOperator::In => self.binary.contains,
            BinaryOperator::And => self.binary.and,
            BinaryOperator::Or => self.binary.or,
            BinaryOperator::Is => None,
        };
        slot.and_then(|call| call(lhs, rhs))
            .unwrap_or_else(|| Err(no_matching_operator(op, lhs, rhs)))
    }

    /// Property lookup: static properties, then member functions, then the
    /// dynamic resolver
    pub fn get_property(&self, value: &Entity, name: &str) -> EvalResult {
        if let Some(property) = self.static_properties.get(name) {
            return property(value);
        }
        if let Some((name, call)) = self.member_functions.get_key_value(name) {
            return Ok(Entity::MemberFunction(MemberFunction {
                name,
                receiver: Box::new(value.clone()),
                call: *call,
            }));
        }
        if let Some(resolve) = self.dynamic_properties {
            if let Some(found) = resolve(value, name) {
                return Ok(found);
            }
        }
        Err(EvaluationError::property_not_found(name))
    }
}

/* ===================== Shared Helpers ===================== */

/// Identity comparison of two descriptors
pub fn same_type(a: &Type, b: &Type) -> bool {
    std::ptr::eq(a, b) || a.id == b.id
}

pub fn no_matching_operator(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> EvaluationError {
    EvaluationError::new(
        EvaluationErrorKind::NoMatchingOperator,
        format!(
            "No matching operator '{}' for types '{}' and '{}'",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ),
    )
}

/// Same kind writes in place; an error may replace any value
pub fn default_assign(lhs: &Entity, rhs: &Entity) -> EvalResult {
    if rhs.is_error() {
        return Ok(rhs.clone());
    }
    if same_type(lhs.type_(), rhs.type_()) {
        if lhs.overwrite(rhs) {
            return Ok(lhs.clone());
        }
        return Ok(rhs.detach());
    }
    Err(invalid_assignment(lhs, rhs))
}

pub fn invalid_assignment(lhs: &Entity, rhs: &Entity) -> EvaluationError {
    EvaluationError::new(
        EvaluationErrorKind::InvalidAssignment,
        format!(
            "Invalid assignment. Expected '{}' while provided a '{}'",
            lhs.type_name(),
            rhs.type_name()
        ),
    )
}

pub fn invalid_construction(target: &Type, argument: &Entity) -> EvaluationError {
    EvaluationError::new(
        EvaluationErrorKind::NotConstructible,
        format!(
            "Cannot construct a '{}' from a '{}'",
            target.name,
            argument.type_name()
        ),
    )
}

/// Constructor shared by most kinds: `Void` gives the default value, the same
/// kind is copied, an error passes through
fn construct_with(target: &'static Type, argument: Entity, default: fn() -> Entity) -> EvalResult {
    match argument {
        Entity::Void => Ok(default()),
        Entity::Error(_) => Ok(argument),
        other if same_type(other.type_(), target) => Ok(other.detach()),
        other => Err(invalid_construction(target, &other)),
    }
}

/// Equality through the `==` slot; unsupported combinations compare unequal
pub fn equals(lhs: &Entity, rhs: &Entity) -> bool {
    lhs.type_()
        .binary(BinaryOperator::Eq, lhs, rhs)
        .ok()
        .and_then(|result| result.as_boolean())
        .unwrap_or(false)
}

/// Required argument of a builtin or member function
pub(crate) fn argument<'a>(
    arguments: &'a CallArguments,
    name: &str,
    index: usize,
) -> EvalResult<&'a Entity> {
    arguments
        .named_or_positional(name, index)
        .map(|arg| &arg.value)
        .ok_or_else(|| {
            EvaluationError::new(
                EvaluationErrorKind::ArityMismatch,
                format!("Missing argument '{}'", name),
            )
        })
}

/* ===================== Registry ===================== */

macro_rules! singleton {
    ($($accessor:ident => $builder:path),* $(,)?) => {
        $(
            pub fn $accessor() -> &'static Type {
                static TYPE: OnceLock<Type> = OnceLock::new();
                TYPE.get_or_init($builder)
            }
        )*
    };
}

singleton! {
    error => scalars::error_type,
    void => scalars::void_type,
    boolean => scalars::boolean_type,
    integer => scalars::integer_type,
    real => scalars::real_type,
    string => scalars::string_type,
    duration => time::duration_type,
    time_point => time::time_point_type,
    array => containers::array_type,
    dictionary => containers::dictionary_type,
    member_function => callables::member_function_type,
    free_function => callables::free_function_type,
    workflow => callables::workflow_type,
    workflow_invocation => callables::workflow_invocation_type,
}

/// Descriptor of a host request/reply kind
pub fn host(kind: HostKind) -> &'static Type {
    static TYPES: OnceLock<Vec<(HostKind, Type)>> = OnceLock::new();
    let types = TYPES.get_or_init(|| {
        HostKind::ALL
            .into_iter()
            .map(|kind| (kind, containers::host_type(kind)))
            .collect()
    });
    types
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, t)| t)
        .unwrap_or_else(dictionary)
}

/// Every registered descriptor
pub fn all() -> Vec<&'static Type> {
    let mut types = vec![
        error(),
        void(),
        boolean(),
        integer(),
        real(),
        string(),
        duration(),
        time_point(),
        array(),
        dictionary(),
        member_function(),
        free_function(),
        workflow(),
        workflow_invocation(),
    ];
    types.extend(HostKind::ALL.into_iter().map(host));
    types
}

/// Look a type up by its script-visible name
pub fn find(name: &str) -> Option<&'static Type> {
    static BY_NAME: OnceLock<BTreeMap<&'static str, &'static Type>> = OnceLock::new();
    BY_NAME
        .get_or_init(|| all().into_iter().map(|t| (t.name, t)).collect())
        .get(name)
        .copied()
}
