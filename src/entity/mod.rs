//! Runtime values
//!
//! [`Entity`] is a closed tagged union over every value kind the interpreter
//! handles. Payloads live behind `Rc<RefCell<_>>`, so cloning an entity aliases
//! its storage: a write through one handle is visible through all of them.
//! [`Entity::detach`] is the explicit deep copy; the interpreter calls it at
//! every binding boundary (declaration, assignment, parameter binding and
//! container insertion).

use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::ast::{self, DurationUnit, Span};
use crate::types::{self, Type};

mod arguments;
mod json;

pub use arguments::{CallArgument, CallArguments};
pub use json::{from_json, from_json_object, to_json, to_json_object, JsonObject};


/// Shared, mutable payload storage
pub type Shared<T> = Rc<RefCell<T>>;

fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/* ===================== Payloads ===================== */

/// Script-level business error: a value, not a failure of the interpreter
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub message: String,
    pub location: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationValue {
    pub count: u64,
    pub unit: DurationUnit,
}

impl DurationValue {
    pub fn new(count: u64, unit: DurationUnit) -> Self {
        Self { count, unit }
    }

    pub fn millis(&self) -> u64 {
        self.count.saturating_mul(self.unit.millis())
    }

    pub fn to_std(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.millis())
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit)
    }
}

/// String-keyed map that keeps insertion order; keys are unique
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<(String, Entity)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Entity> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn insert(&mut self, key: impl Into<String>, value: Entity) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entity)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn detach(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.detach()))
                .collect(),
        }
    }
}

impl FromIterator<(String, Entity)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, Entity)>>(iter: I) -> Self {
        let mut dictionary = Dictionary::new();
        for (key, value) in iter {
            dictionary.insert(key, value);
        }
        dictionary
    }
}

/// Dictionary-shaped kinds exchanged with the host delegates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    Action,
    ActionReply,
    Campaign,
    CampaignReply,
    DeviceInfoRequest,
    DeviceInfoReply,
    HttpRequest,
    HttpReply,
}

impl HostKind {
    pub const ALL: [HostKind; 8] = [
        HostKind::Action,
        HostKind::ActionReply,
        HostKind::Campaign,
        HostKind::CampaignReply,
        HostKind::DeviceInfoRequest,
        HostKind::DeviceInfoReply,
        HostKind::HttpRequest,
        HostKind::HttpReply,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HostKind::Action => "action",
            HostKind::ActionReply => "action_reply",
            HostKind::Campaign => "campaign",
            HostKind::CampaignReply => "campaign_reply",
            HostKind::DeviceInfoRequest => "device_info_request",
            HostKind::DeviceInfoReply => "device_info_reply",
            HostKind::HttpRequest => "http_request",
            HostKind::HttpReply => "http_reply",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Reply kind produced when a request kind is awaited
    pub fn reply(&self) -> Option<HostKind> {
        match self {
            HostKind::Action => Some(HostKind::ActionReply),
            HostKind::Campaign => Some(HostKind::CampaignReply),
            HostKind::DeviceInfoRequest => Some(HostKind::DeviceInfoReply),
            HostKind::HttpRequest => Some(HostKind::HttpReply),
            _ => None,
        }
    }
}

pub type MemberFn = fn(&Entity, &CallArguments) -> crate::errors::EvalResult;
pub type FreeFn = fn(&CallArguments) -> crate::errors::EvalResult;

/// Member function bound to the value it was looked up on
#[derive(Debug, Clone)]
pub struct MemberFunction {
    pub name: &'static str,
    pub receiver: Box<Entity>,
    pub call: MemberFn,
}

#[derive(Debug, Clone, Copy)]
pub struct FreeFunction {
    pub name: &'static str,
    pub call: FreeFn,
}

#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    pub definition: Arc<ast::WorkflowDefinition>,
}

impl WorkflowDefinition {
    pub fn name(&self) -> &str {
        &self.definition.name.name
    }
}

/// Deferred call to a workflow; runs only when awaited
#[derive(Debug, Clone)]
pub struct WorkflowInvocation {
    pub definition: Arc<ast::WorkflowDefinition>,
    pub arguments: CallArguments,
    /// Where the invocation was created
    pub location: Span,
}

/* ===================== Entity ===================== */

#[derive(Debug, Clone, Default)]
pub enum Entity {
    Error(Rc<ErrorValue>),
    #[default]
    Void,
    Boolean(Shared<bool>),
    Integer(Shared<i64>),
    Real(Shared<f64>),
    String(Shared<String>),
    Duration(Shared<DurationValue>),
    TimePoint(Shared<DateTime<Utc>>),
    Array(Shared<Vec<Entity>>),
    Dictionary(Shared<Dictionary>),
    MemberFunction(MemberFunction),
    FreeFunction(FreeFunction),
    WorkflowDefinition(WorkflowDefinition),
    WorkflowInvocation(Rc<WorkflowInvocation>),
    Host(HostKind, Shared<Dictionary>),
}

impl Entity {
    /* ----- constructors ----- */

    pub fn error(message: impl Into<String>, location: Option<Span>) -> Self {
        Entity::Error(Rc::new(ErrorValue {
            message: message.into(),
            location,
        }))
    }

    pub fn boolean(value: bool) -> Self {
        Entity::Boolean(shared(value))
    }

    pub fn integer(value: i64) -> Self {
        Entity::Integer(shared(value))
    }

    pub fn real(value: f64) -> Self {
        Entity::Real(shared(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Entity::String(shared(value.into()))
    }

    pub fn duration(count: u64, unit: DurationUnit) -> Self {
        Entity::Duration(shared(DurationValue::new(count, unit)))
    }

    pub fn time_point(value: DateTime<Utc>) -> Self {
        Entity::TimePoint(shared(value))
    }

    pub fn array(values: Vec<Entity>) -> Self {
        Entity::Array(shared(values))
    }

    pub fn dictionary(values: Dictionary) -> Self {
        Entity::Dictionary(shared(values))
    }

    pub fn host(kind: HostKind, values: Dictionary) -> Self {
        Entity::Host(kind, shared(values))
    }

    pub fn free_function(name: &'static str, call: FreeFn) -> Self {
        Entity::FreeFunction(FreeFunction { name, call })
    }

    pub fn workflow(definition: Arc<ast::WorkflowDefinition>) -> Self {
        Entity::WorkflowDefinition(WorkflowDefinition { definition })
    }

    pub fn invocation(invocation: WorkflowInvocation) -> Self {
        Entity::WorkflowInvocation(Rc::new(invocation))
    }

    /* ----- type information ----- */

    /// Descriptor of this value's kind
    pub fn type_(&self) -> &'static Type {
        match self {
            Entity::Error(_) => types::error(),
            Entity::Void => types::void(),
            Entity::Boolean(_) => types::boolean(),
            Entity::Integer(_) => types::integer(),
            Entity::Real(_) => types::real(),
            Entity::String(_) => types::string(),
            Entity::Duration(_) => types::duration(),
            Entity::TimePoint(_) => types::time_point(),
            Entity::Array(_) => types::array(),
            Entity::Dictionary(_) => types::dictionary(),
            Entity::MemberFunction(_) => types::member_function(),
            Entity::FreeFunction(_) => types::free_function(),
            Entity::WorkflowDefinition(_) => types::workflow(),
            Entity::WorkflowInvocation(_) => types::workflow_invocation(),
            Entity::Host(kind, _) => types::host(*kind),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_().name
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Entity::Error(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Entity::Void)
    }

    /// Human readable rendering through the type's representation slot
    pub fn representation(&self) -> String {
        self.type_().represent(self)
    }

    /* ----- payload access ----- */

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Entity::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Entity::Boolean(v) => Some(*v.borrow()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Entity::Integer(v) => Some(*v.borrow()),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Entity::Real(v) => Some(*v.borrow()),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Entity::String(v) => Some(v.borrow().clone()),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<DurationValue> {
        match self {
            Entity::Duration(v) => Some(*v.borrow()),
            _ => None,
        }
    }

    pub fn as_time_point(&self) -> Option<DateTime<Utc>> {
        match self {
            Entity::TimePoint(v) => Some(*v.borrow()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Shared<Vec<Entity>>> {
        match self {
            Entity::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Storage of any dictionary-shaped value (plain or host kind)
    pub fn as_dictionary(&self) -> Option<&Shared<Dictionary>> {
        match self {
            Entity::Dictionary(v) | Entity::Host(_, v) => Some(v),
            _ => None,
        }
    }

    /* ----- aliasing ----- */

    /// Deep copy with storage owned by nobody else
    pub fn detach(&self) -> Entity {
        match self {
            Entity::Error(e) => Entity::Error(e.clone()),
            Entity::Void => Entity::Void,
            Entity::Boolean(v) => Entity::boolean(*v.borrow()),
            Entity::Integer(v) => Entity::integer(*v.borrow()),
            Entity::Real(v) => Entity::real(*v.borrow()),
            Entity::String(v) => Entity::string(v.borrow().clone()),
            Entity::Duration(v) => Entity::Duration(shared(*v.borrow())),
            Entity::TimePoint(v) => Entity::time_point(*v.borrow()),
            Entity::Array(v) => Entity::array(v.borrow().iter().map(Entity::detach).collect()),
            Entity::Dictionary(v) => Entity::dictionary(v.borrow().detach()),
            Entity::Host(kind, v) => Entity::host(*kind, v.borrow().detach()),
            Entity::MemberFunction(f) => Entity::MemberFunction(f.clone()),
            Entity::FreeFunction(f) => Entity::FreeFunction(*f),
            Entity::WorkflowDefinition(w) => Entity::WorkflowDefinition(w.clone()),
            Entity::WorkflowInvocation(w) => Entity::WorkflowInvocation(w.clone()),
        }
    }

    /// True when both handles point at the same storage
    pub fn shares_storage(&self, other: &Entity) -> bool {
        match (self, other) {
            (Entity::Error(a), Entity::Error(b)) => Rc::ptr_eq(a, b),
            (Entity::Boolean(a), Entity::Boolean(b)) => Rc::ptr_eq(a, b),
            (Entity::Integer(a), Entity::Integer(b)) => Rc::ptr_eq(a, b),
            (Entity::Real(a), Entity::Real(b)) => Rc::ptr_eq(a, b),
            (Entity::String(a), Entity::String(b)) => Rc::ptr_eq(a, b),
            (Entity::Duration(a), Entity::Duration(b)) => Rc::ptr_eq(a, b),
            (Entity::TimePoint(a), Entity::TimePoint(b)) => Rc::ptr_eq(a, b),
            (Entity::Array(a), Entity::Array(b)) => Rc::ptr_eq(a, b),
            (Entity::Dictionary(a), Entity::Dictionary(b)) => Rc::ptr_eq(a, b),
            (Entity::Host(_, a), Entity::Host(_, b)) => Rc::ptr_eq(a, b),
            (Entity::WorkflowInvocation(a), Entity::WorkflowInvocation(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Replace this value's payload in place with a detached copy of `source`.
    ///
    /// Returns false when the two kinds differ; nothing is written then.
    pub fn overwrite(&self, source: &Entity) -> bool {
        // Read fully before borrowing mutably: `source` may alias `self`
        match (self, source) {
            (Entity::Boolean(dst), Entity::Boolean(src)) => {
                let value = *src.borrow();
                *dst.borrow_mut() = value;
            }
            (Entity::Integer(dst), Entity::Integer(src)) => {
                let value = *src.borrow();
                *dst.borrow_mut() = value;
            }
            (Entity::Real(dst), Entity::Real(src)) => {
                let value = *src.borrow();
                *dst.borrow_mut() = value;
            }
            (Entity::String(dst), Entity::String(src)) => {
                let value = src.borrow().clone();
                *dst.borrow_mut() = value;
            }
            (Entity::Duration(dst), Entity::Duration(src)) => {
                let value = *src.borrow();
                *dst.borrow_mut() = value;
            }
            (Entity::TimePoint(dst), Entity::TimePoint(src)) => {
                let value = *src.borrow();
                *dst.borrow_mut() = value;
            }
            (Entity::Array(dst), Entity::Array(src)) => {
                let value: Vec<Entity> = src.borrow().iter().map(Entity::detach).collect();
                *dst.borrow_mut() = value;
            }
            (Entity::Dictionary(dst), Entity::Dictionary(src)) => {
                let value = src.borrow().detach();
                *dst.borrow_mut() = value;
            }
            (Entity::Host(a, dst), Entity::Host(b, src)) if a == b => {
                let value = src.borrow().detach();
                *dst.borrow_mut() = value;
            }
            (Entity::Void, Entity::Void) => {}
            _ => return false,
        }
        true
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.representation())
    }
}
