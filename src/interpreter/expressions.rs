//! Expression evaluation

use tracing::trace;

use super::{Interpreter, LocalBoxFuture};
use crate::ast::{
    ArrayLiteral, BinaryChain, BinaryOperator, DictionaryLiteral, Expr, FunctionCall, Identifier,
    Literal, LiteralValue, Located, TryExpression, UnaryExpression,
};
use crate::entity::{CallArguments, Dictionary, Entity, WorkflowInvocation};
use crate::errors::{EvalResult, EvaluationError, EvaluationErrorKind};
use crate::program::Statement;
use crate::types;

fn literal(literal: &Literal) -> Entity {
    match &literal.value {
        LiteralValue::String(s) => Entity::string(s.clone()),
        LiteralValue::Boolean(b) => Entity::boolean(*b),
        LiteralValue::Integer(i) => Entity::integer(*i),
        LiteralValue::Real(r) => Entity::real(*r),
        LiteralValue::Duration { count, unit } => Entity::duration(*count, *unit),
    }
}

impl Interpreter {
    pub(super) fn evaluate<'a>(&'a mut self, expr: Statement<'a, Expr>) -> LocalBoxFuture<'a, EvalResult> {
        Box::pin(async move {
            match expr.ast() {
                Expr::Literal(lit) => Ok(literal(lit)),
                Expr::Path(path) => self.resolve(&path.segments),
                Expr::Call(call) => self.evaluate_call(expr.then(call)).await,
                Expr::Array(array) => self.evaluate_array(expr.then(array)).await,
                Expr::Dictionary(dict) => self.evaluate_dictionary(expr.then(dict)).await,
                Expr::Unary(unary) => self.evaluate_unary(expr.then(unary)).await,
                Expr::Binary(chain) => self.evaluate_binary(expr.then(chain)).await,
                Expr::Await(node) => self.evaluate_await(expr.then(node)).await,
                Expr::Try(node) => self.evaluate_try(expr.then(node)).await,
            }
        })
    }

    /// Look up the first segment in scope, then walk the properties
    pub(super) fn resolve(&self, segments: &[Identifier]) -> EvalResult {
        let Some((head, tail)) = segments.split_first() else {
            return Err(EvaluationError::undeclared(""));
        };
        let mut value = self
            .scopes
            .lookup(&head.name)
            .cloned()
            .ok_or_else(|| EvaluationError::undeclared(&head.name).at(head.span))?;
        for segment in tail {
            value = value
                .type_()
                .get_property(&value, &segment.name)
                .map_err(|e| e.at(segment.span))?;
        }
        Ok(value)
    }

    async fn evaluate_call(&mut self, call: Statement<'_, FunctionCall>) -> EvalResult {
        let node = call.ast();
        let callee = self.resolve(&node.path.segments)?;

        let mut arguments = CallArguments::new(node.arguments_span);
        for argument in &node.arguments {
            let value = self.evaluate(call.then(&argument.value)).await?;
            let name = argument.name.as_ref().map(|n| n.name.clone());
            arguments.push(name, value, argument.span);
        }

        match callee {
            Entity::FreeFunction(function) => {
                trace!(function = function.name, "call");
                (function.call)(&arguments).map_err(|e| e.at(node.span))
            }
            Entity::MemberFunction(function) => {
                trace!(function = function.name, "call member");
                (function.call)(&function.receiver, &arguments).map_err(|e| e.at(node.span))
            }
            // Runs only once awaited
            Entity::WorkflowDefinition(workflow) => Ok(Entity::invocation(WorkflowInvocation {
                definition: workflow.definition,
                arguments,
                location: node.span,
            })),
            _ => Err(EvaluationError::new(
                EvaluationErrorKind::NotCallable,
                format!("'{}' is not a callable", node.path),
            )
            .at(node.path.span)),
        }
    }

    async fn evaluate_array(&mut self, array: Statement<'_, ArrayLiteral>) -> EvalResult {
        let mut items = Vec::with_capacity(array.ast().elements.len());
        for element in &array.ast().elements {
            items.push(self.evaluate(array.then(element)).await?.detach());
        }
        Ok(Entity::array(items))
    }

    async fn evaluate_dictionary(&mut self, dict: Statement<'_, DictionaryLiteral>) -> EvalResult {
        let mut contents = Dictionary::new();
        for entry in &dict.ast().entries {
            let value = self.evaluate(dict.then(&entry.value)).await?;
            contents.insert(entry.key.name.clone(), value.detach());
        }
        Ok(Entity::dictionary(contents))
    }

    async fn evaluate_unary(&mut self, unary: Statement<'_, UnaryExpression>) -> EvalResult {
        let node = unary.ast();
        let operand = self.evaluate(unary.then(&*node.operand)).await?;
        operand
            .type_()
            .unary(node.op, &operand)
            .map_err(|e| e.at(node.span))
    }

    /// Left fold over the chain. Every operand is evaluated, `and`/`or`
    /// included.
    async fn evaluate_binary(&mut self, chain: Statement<'_, BinaryChain>) -> EvalResult {
        let node = chain.ast();
        let mut lhs = self.evaluate(chain.then(&*node.first)).await?;

        for operation in &node.operations {
            let operand = chain.then(&operation.operand);
            let result = match operation.op {
                BinaryOperator::Is => type_test(&lhs, operand),
                // Dispatched on the container
                BinaryOperator::In => {
                    let rhs = self.evaluate(operand).await?;
                    rhs.type_().binary(BinaryOperator::In, &rhs, &lhs)
                }
                op => {
                    let rhs = self.evaluate(operand).await?;
                    lhs.type_().binary(op, &lhs, &rhs)
                }
            };
            lhs = result.map_err(|e| e.at(operation.span))?;
        }
        Ok(lhs)
    }

    /// An error result makes the enclosing function return it
    async fn evaluate_try(&mut self, node: Statement<'_, TryExpression>) -> EvalResult {
        let value = self.evaluate(node.then(&*node.ast().expression)).await?;
        if value.is_error() {
            trace!(code = node.code(), "try caught an error, returning");
            self.scopes.set_return(value.clone());
        }
        Ok(value)
    }
}

/// `value is <type name>`: identity of the value's type descriptor
fn type_test(value: &Entity, operand: Statement<'_, Expr>) -> EvalResult {
    let name = match operand.ast() {
        Expr::Path(path) if path.tail().is_empty() => path.head().name.as_str(),
        _ => operand.code(),
    };
    let target = types::find(name).ok_or_else(|| {
        EvaluationError::new(
            EvaluationErrorKind::UnknownType,
            format!("'{}' is not a type", name),
        )
        .at(operand.ast().span())
    })?;
    Ok(Entity::boolean(types::same_type(value.type_(), target)))
}
