//! `await <expr> for <duration>`
//!
//! The awaited operation races a timer. Whichever finishes first wins; on
//! timeout the operation's future is dropped and the expression yields an
//! `Operation timeout` error value.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

use super::statements::expected_duration;
use super::Interpreter;
use crate::ast::{AwaitExpression, Located, Span};
use crate::entity::{
    from_json_object, to_json_object, CallArguments, Entity, HostKind, WorkflowInvocation,
};
use crate::errors::{EvalResult, EvaluationError, EvaluationErrorKind};
use crate::program::Statement;

/// Shortest timeout an await may use
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

fn timeout_error(location: Span) -> Entity {
    Entity::error("Operation timeout", Some(location))
}

impl Interpreter {
    pub(super) async fn evaluate_await(&mut self, node: Statement<'_, AwaitExpression>) -> EvalResult {
        let ast = node.ast();
        let awaited = self.evaluate(node.then(&*ast.expression)).await?;
        let duration = self.evaluate(node.then(&*ast.duration)).await?;
        let timeout = duration
            .as_duration()
            .ok_or_else(|| expected_duration(&duration).at(ast.duration.span()))?
            .to_std()
            .max(MIN_TIMEOUT);

        match awaited {
            Entity::WorkflowInvocation(invocation) => {
                self.await_invocation(invocation, timeout, ast.span).await
            }
            // A bare workflow is awaited as a call without arguments
            Entity::WorkflowDefinition(workflow) => {
                let invocation = Rc::new(WorkflowInvocation {
                    definition: workflow.definition,
                    arguments: CallArguments::new(ast.span),
                    location: ast.span,
                });
                self.await_invocation(invocation, timeout, ast.span).await
            }
            Entity::Host(kind, _) if kind.reply().is_some() => {
                self.await_host(kind, &awaited, timeout, ast.span).await
            }
            other => Err(EvaluationError::new(
                EvaluationErrorKind::NotAwaitable,
                format!("Expression of type '{}' is not an awaitable", other.type_name()),
            )
            .at(ast.expression.span())),
        }
    }

    async fn await_invocation(
        &mut self,
        invocation: Rc<WorkflowInvocation>,
        timeout: Duration,
        location: Span,
    ) -> EvalResult {
        let depth = self.scopes.depth();
        let outcome = tokio::time::timeout(timeout, self.invoke(&invocation)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                // The abandoned invocation may have left scopes behind
                self.scopes.truncate(depth);
                debug!(workflow = %invocation.definition.name.name, "await timed out");
                Ok(timeout_error(location))
            }
        }
    }

    /// Hand the request to the host and wrap the reply in the matching kind
    async fn await_host(
        &mut self,
        kind: HostKind,
        request: &Entity,
        timeout: Duration,
        location: Span,
    ) -> EvalResult {
        let missing = || {
            EvaluationError::new(
                EvaluationErrorKind::MissingDelegate,
                format!("No delegate registered for '{}'", kind.name()),
            )
            .at(location)
        };
        let delegate = self.extensions.for_request(kind).ok_or_else(missing)?;
        let reply_kind = kind.reply().ok_or_else(missing)?;
        let payload = to_json_object(request).unwrap_or_default();

        debug!(request = kind.name(), "await host operation");
        match tokio::time::timeout(timeout, delegate(payload)).await {
            Ok(Ok(reply)) => Ok(Entity::host(reply_kind, from_json_object(&reply))),
            Ok(Err(reason)) => {
                warn!(request = kind.name(), error = %reason, "host operation failed");
                Ok(Entity::error(reason.to_string(), Some(location)))
            }
            Err(_) => {
                debug!(request = kind.name(), "await timed out");
                Ok(timeout_error(location))
            }
        }
    }
}
