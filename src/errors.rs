//! Evaluation errors
//!
//! Failures that abort a running instance. Type operations produce them without
//! a location; the interpreter attaches the span of the node that needed the
//! value before propagating.
//!
//! Business errors raised by scripts are *values* (`Entity::Error`), not these.

use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationErrorKind {
    UndeclaredIdentifier,
    AlreadyDeclared,
    UnknownType,
    PropertyNotFound,
    NotCallable,
    NotAwaitable,
    ArityMismatch,
    TypeMismatch,
    NoMatchingOperator,
    InvalidAssignment,
    NotConstructible,
    NotConvertible,
    InvalidArgument,
    MissingReturnValue,
    InvalidReturnType,
    MissingDelegate,
    Panic,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EvaluationError {
    pub kind: EvaluationErrorKind,
    pub message: String,
    pub location: Option<Span>,
}

impl EvaluationError {
    pub fn new(kind: EvaluationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a location unless one is already known
    pub fn at(mut self, span: Span) -> Self {
        if self.location.is_none() {
            self.location = Some(span);
        }
        self
    }

    pub fn undeclared(name: &str) -> Self {
        Self::new(
            EvaluationErrorKind::UndeclaredIdentifier,
            format!("Use of undeclared identifier '{}'", name),
        )
    }

    pub fn unknown_type(name: &str) -> Self {
        Self::new(
            EvaluationErrorKind::UnknownType,
            format!("Unknown type '{}'", name),
        )
    }

    pub fn property_not_found(name: &str) -> Self {
        Self::new(
            EvaluationErrorKind::PropertyNotFound,
            format!("Property '{}' not found", name),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvaluationErrorKind::InvalidArgument, message)
    }
}

pub type EvalResult<T = crate::entity::Entity> = Result<T, EvaluationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_keeps_first_location() {
        let first = Span::new(1, 2, 0, 1, 0, 2);
        let second = Span::new(5, 6, 0, 5, 0, 6);
        let err = EvaluationError::undeclared("x").at(first).at(second);
        assert_eq!(err.location, Some(first));
        assert_eq!(err.to_string(), "Use of undeclared identifier 'x'");
    }
}
