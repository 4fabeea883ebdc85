//! Workflow invocation

use std::collections::HashSet;

use tracing::debug;

use super::scope::ScopeKind;
use super::{Interpreter, LocalBoxFuture};
use crate::ast::{Span, WorkflowDefinition};
use crate::entity::{CallArguments, Entity, WorkflowInvocation};
use crate::errors::{EvalResult, EvaluationError, EvaluationErrorKind};
use crate::program::Statement;
use crate::types;

impl Interpreter {
    /// Run an invocation in its own function scope and yield its result
    pub(super) fn invoke<'a>(&'a mut self, invocation: &'a WorkflowInvocation) -> LocalBoxFuture<'a, EvalResult> {
        Box::pin(async move {
            debug!(workflow = %invocation.definition.name.name, "invoke");
            let depth = self.scopes.depth();
            self.scopes.push(ScopeKind::Function);
            let result = self.run_workflow(invocation).await;
            self.scopes.truncate(depth);
            result
        })
    }

    async fn run_workflow(&mut self, invocation: &WorkflowInvocation) -> EvalResult {
        let definition = invocation.definition.clone();
        self.bind_parameters(&definition, &invocation.arguments, invocation.location)?;

        let program = self.program.clone();
        let body = Statement::new(&*program, &definition.body.statements[..]);
        self.execute_statements(body).await?;

        check_result(&definition, self.scopes.return_value(), invocation.location)
    }

    /// Named arguments bind to their parameter, the rest fill the remaining
    /// parameters in order. Every value is checked against the declared type
    /// and bound as a detached copy.
    fn bind_parameters(
        &mut self,
        definition: &WorkflowDefinition,
        arguments: &CallArguments,
        location: Span,
    ) -> EvalResult<()> {
        let parameters = definition.parameters();
        if arguments.len() != parameters.len() {
            return Err(EvaluationError::new(
                EvaluationErrorKind::ArityMismatch,
                format!(
                    "Invalid argument count: expected {} arguments",
                    parameters.len()
                ),
            )
            .at(location));
        }

        let names: HashSet<&str> = parameters.iter().map(|p| p.name.name.as_str()).collect();
        if let Some(unknown) = arguments
            .iter()
            .find(|arg| arg.name.as_deref().is_some_and(|name| !names.contains(name)))
        {
            return Err(EvaluationError::invalid_argument(format!(
                "Unknown argument '{}'",
                unknown.name.as_deref().unwrap_or_default()
            ))
            .at(unknown.location));
        }

        let mut positional = arguments.iter().filter(|arg| arg.name.is_none());
        for parameter in parameters {
            let expected = types::find(&parameter.type_name.name).ok_or_else(|| {
                EvaluationError::unknown_type(&parameter.type_name.name).at(parameter.type_name.span)
            })?;
            let argument = arguments
                .find(&parameter.name.name)
                .or_else(|| positional.next())
                .ok_or_else(|| {
                    EvaluationError::new(
                        EvaluationErrorKind::ArityMismatch,
                        format!("Missing argument '{}'", parameter.name.name),
                    )
                    .at(location)
                })?;
            if !types::same_type(argument.value.type_(), expected) {
                return Err(EvaluationError::new(
                    EvaluationErrorKind::TypeMismatch,
                    format!(
                        "Type mismatch for argument '{}': expected a '{}' while got a '{}'",
                        parameter.name.name,
                        expected.name,
                        argument.value.type_name()
                    ),
                )
                .at(argument.location));
            }
            self.scopes
                .declare(&parameter.name.name, argument.value.detach())
                .map_err(|e| e.at(parameter.span))?;
        }
        Ok(())
    }
}

/// A workflow without a declared return type returns void. Without a value
/// the return type must be void; a value must match it unless it is an error.
fn check_result(definition: &WorkflowDefinition, value: Option<Entity>, location: Span) -> EvalResult {
    let declared = match definition.return_type() {
        Some(name) => types::find(&name.name)
            .ok_or_else(|| EvaluationError::unknown_type(&name.name).at(name.span))?,
        None => types::void(),
    };

    match value {
        None if types::same_type(declared, types::void()) => Ok(Entity::Void),
        None => Err(EvaluationError::new(
            EvaluationErrorKind::MissingReturnValue,
            "Workflow did not return any value",
        )
        .at(location)),
        Some(value) if value.is_error() || types::same_type(value.type_(), declared) => Ok(value),
        Some(value) => Err(EvaluationError::new(
            EvaluationErrorKind::InvalidReturnType,
            format!(
                "Invalid return type: expected a {}, got a {}",
                declared.name,
                value.type_name()
            ),
        )
        .at(location)),
    }
}
