//! Evaluation scopes and flow control
//!
//! Every `{ ... }` block runs in its own [`Scope`]. Function scopes own a fresh
//! return slot; local and loop scopes share their parent's. When a scope is
//! popped its flow signal travels outwards: `Return` up to the nearest
//! function scope, `Break` up to the nearest loop scope.

use std::cell::RefCell;
use std::rc::Rc;

use crate::entity::Entity;
use crate::errors::{EvalResult, EvaluationError, EvaluationErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Local,
    Loop,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    #[default]
    Continue,
    Return,
    Break,
}

type ReturnSlot = Rc<RefCell<Option<Entity>>>;

#[derive(Debug)]
pub struct Scope {
    kind: ScopeKind,
    variables: Vec<(String, Entity)>,
    return_value: ReturnSlot,
    flow: FlowControl,
}

impl Scope {
    fn new(kind: ScopeKind, return_value: ReturnSlot) -> Self {
        Self {
            kind,
            variables: Vec::new(),
            return_value,
            flow: FlowControl::Continue,
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|(n, _)| n == name)
    }
}

/// Stack of nested scopes; the bottom one is the program's function scope
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Function, ReturnSlot::default())],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn current(&self) -> &Scope {
        // The root scope is never popped
        &self.scopes[self.scopes.len() - 1]
    }

    fn current_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn push(&mut self, kind: ScopeKind) {
        let return_value = match kind {
            ScopeKind::Function => ReturnSlot::default(),
            ScopeKind::Local | ScopeKind::Loop => self.current().return_value.clone(),
        };
        self.scopes.push(Scope::new(kind, return_value));
    }

    /// Leave the current scope, handing its signal to the parent when the
    /// scope does not stop it. Returns the popped scope's signal.
    pub fn pop(&mut self) -> FlowControl {
        if self.scopes.len() <= 1 {
            return self.flow();
        }
        let Some(scope) = self.scopes.pop() else {
            return FlowControl::Continue;
        };
        let stops_here = match scope.flow {
            FlowControl::Continue => true,
            FlowControl::Return => scope.kind == ScopeKind::Function,
            // A break never escapes the workflow it was raised in
            FlowControl::Break => scope.kind != ScopeKind::Local,
        };
        if !stops_here {
            self.current_mut().flow = scope.flow;
        }
        scope.flow
    }

    /// Drop every scope above `depth`, signals included
    pub fn truncate(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    pub fn flow(&self) -> FlowControl {
        self.current().flow
    }

    pub fn set_flow(&mut self, flow: FlowControl) {
        self.current_mut().flow = flow;
    }

    /// Store the enclosing function's result and start unwinding towards it
    pub fn set_return(&mut self, value: Entity) {
        *self.current().return_value.borrow_mut() = Some(value);
        self.set_flow(FlowControl::Return);
    }

    pub fn return_value(&self) -> Option<Entity> {
        self.current().return_value.borrow().clone()
    }

    pub fn declare(&mut self, name: &str, value: Entity) -> EvalResult<()> {
        let scope = self.current_mut();
        if scope.find(name).is_some() {
            return Err(EvaluationError::new(
                EvaluationErrorKind::AlreadyDeclared,
                format!("'{}' already declared in the current scope", name),
            ));
        }
        scope.variables.push((name.to_string(), value));
        Ok(())
    }

    /// Innermost binding of `name`
    pub fn lookup(&self, name: &str) -> Option<&Entity> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.find(name).map(|i| &scope.variables[i].1))
    }

    /// Rebind the innermost binding of `name`
    pub fn rebind(&mut self, name: &str, value: Entity) -> EvalResult<()> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(i) = scope.find(name) {
                scope.variables[i].1 = value;
                return Ok(());
            }
        }
        Err(EvaluationError::undeclared(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut scopes = ScopeStack::new();
        scopes.declare("x", Entity::integer(1)).unwrap();
        scopes.push(ScopeKind::Local);
        scopes.declare("x", Entity::integer(2)).unwrap();
        assert_eq!(scopes.lookup("x").and_then(Entity::as_integer), Some(2));

        scopes.pop();
        assert_eq!(scopes.lookup("x").and_then(Entity::as_integer), Some(1));
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let mut scopes = ScopeStack::new();
        scopes.declare("x", Entity::integer(1)).unwrap();
        let err = scopes.declare("x", Entity::integer(2)).unwrap_err();
        assert_eq!(err.message, "'x' already declared in the current scope");
    }

    #[test]
    fn test_return_propagates_to_function_scope() {
        let mut scopes = ScopeStack::new();
        scopes.push(ScopeKind::Function);
        scopes.push(ScopeKind::Loop);
        scopes.push(ScopeKind::Local);
        scopes.set_return(Entity::integer(7));

        assert_eq!(scopes.pop(), FlowControl::Return);
        assert_eq!(scopes.flow(), FlowControl::Return);
        assert_eq!(scopes.pop(), FlowControl::Return);
        assert_eq!(scopes.flow(), FlowControl::Return);
        assert_eq!(scopes.return_value().and_then(|v| v.as_integer()), Some(7));

        assert_eq!(scopes.pop(), FlowControl::Return);
        assert_eq!(scopes.flow(), FlowControl::Continue);
        assert!(scopes.return_value().is_none());
    }

    #[test]
    fn test_break_stops_at_loop_scope() {
        let mut scopes = ScopeStack::new();
        scopes.push(ScopeKind::Loop);
        scopes.push(ScopeKind::Local);
        scopes.set_flow(FlowControl::Break);

        scopes.pop();
        assert_eq!(scopes.flow(), FlowControl::Break);
        assert_eq!(scopes.pop(), FlowControl::Break);
        assert_eq!(scopes.flow(), FlowControl::Continue);
    }

    #[test]
    fn test_truncate_keeps_root() {
        let mut scopes = ScopeStack::new();
        scopes.push(ScopeKind::Function);
        scopes.push(ScopeKind::Local);
        scopes.truncate(0);
        assert_eq!(scopes.depth(), 1);
    }
}
