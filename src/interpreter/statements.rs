//! Statement execution and flow control

use std::iter;

use tracing::{debug, trace, warn};

use super::scope::{FlowControl, ScopeKind};
use super::{Interpreter, LocalBoxFuture};
use crate::ast::{
    Assignment, Block, Delay, Expr, IfStatement, Located, Raise, RepeatStatement, Stmt,
    VariableDeclaration,
};
use crate::entity::Entity;
use crate::errors::{EvalResult, EvaluationError, EvaluationErrorKind};
use crate::program::Statement;
use crate::types;

pub(super) fn expected_duration(value: &Entity) -> EvaluationError {
    EvaluationError::new(
        EvaluationErrorKind::TypeMismatch,
        format!("Expected a 'duration' got a '{}'", value.type_name()),
    )
}

impl Interpreter {
    /// Run statements top to bottom until one raises a flow signal
    pub(super) async fn execute_statements(&mut self, statements: Statement<'_, [Stmt]>) -> EvalResult<()> {
        for stmt in statements.ast() {
            self.execute(statements.then(stmt)).await?;
            if self.scopes.flow() != FlowControl::Continue {
                break;
            }
        }
        Ok(())
    }

    /// Run a block in a fresh scope and report the signal it ended with
    async fn execute_block(&mut self, block: Statement<'_, Block>, kind: ScopeKind) -> EvalResult<FlowControl> {
        let depth = self.scopes.depth();
        self.scopes.push(kind);
        let result = self
            .execute_statements(block.then(&block.ast().statements[..]))
            .await;
        match result {
            Ok(()) => Ok(self.scopes.pop()),
            Err(err) => {
                self.scopes.truncate(depth);
                Err(err)
            }
        }
    }

    fn execute<'a>(&'a mut self, stmt: Statement<'a, Stmt>) -> LocalBoxFuture<'a, EvalResult<()>> {
        Box::pin(async move {
            trace!(code = stmt.code(), "execute");
            match stmt.ast() {
                Stmt::Import(import) => {
                    warn!(path = %import.path, "import is not supported, statement ignored");
                    Ok(())
                }
                Stmt::Declaration(decl) => self.declare_variable(stmt.then(decl)).await,
                Stmt::Assignment(assignment) => self.assign(stmt.then(assignment)).await,
                Stmt::Delay(delay) => self.delay(stmt.then(delay)).await,
                Stmt::Return(ret) => {
                    let value = self.evaluate(stmt.then(&ret.value)).await?;
                    self.scopes.set_return(value);
                    Ok(())
                }
                Stmt::Raise(raise) => self.raise(stmt.then(raise)).await,
                Stmt::Break(_) => {
                    self.scopes.set_flow(FlowControl::Break);
                    Ok(())
                }
                Stmt::Expression(expression) => {
                    self.evaluate(stmt.then(&expression.expression)).await?;
                    Ok(())
                }
                Stmt::If(node) => self.execute_if(stmt.then(&**node)).await,
                Stmt::Repeat(node) => self.execute_repeat(stmt.then(&**node)).await,
                Stmt::Workflow(definition) => self
                    .scopes
                    .declare(&definition.name.name, Entity::workflow(definition.clone()))
                    .map_err(|e| e.at(definition.name.span)),
            }
        })
    }

    async fn declare_variable(&mut self, decl: Statement<'_, VariableDeclaration>) -> EvalResult<()> {
        let node = decl.ast();
        let target = types::find(&node.type_name.name)
            .ok_or_else(|| EvaluationError::unknown_type(&node.type_name.name).at(node.type_name.span))?;
        let initializer = match &node.value {
            Some(value) => self.evaluate(decl.then(value)).await?,
            None => Entity::Void,
        };
        let value = target.construct(initializer).map_err(|e| e.at(node.span))?;
        self.scopes
            .declare(&node.name.name, value)
            .map_err(|e| e.at(node.name.span))
    }

    /// Writes go through the target type's assign slot. A dotted target must
    /// name an existing key of a dictionary-shaped value.
    async fn assign(&mut self, assignment: Statement<'_, Assignment>) -> EvalResult<()> {
        let node = assignment.ast();
        let rhs = self.evaluate(assignment.then(&node.value)).await?;

        let segments = &node.target.segments;
        let Some((last, parents)) = segments.split_last() else {
            return Ok(());
        };

        if parents.is_empty() {
            let current = self.resolve(segments)?;
            let value = current
                .type_()
                .assign(&current, &rhs)
                .map_err(|e| e.at(node.span))?;
            return self.scopes.rebind(&last.name, value).map_err(|e| e.at(last.span));
        }

        let parent = self.resolve(parents)?;
        let Some(storage) = parent.as_dictionary() else {
            return Err(EvaluationError::property_not_found(&last.name).at(last.span));
        };
        let current = storage
            .borrow()
            .get(&last.name)
            .cloned()
            .ok_or_else(|| EvaluationError::property_not_found(&last.name).at(last.span))?;
        let value = current
            .type_()
            .assign(&current, &rhs)
            .map_err(|e| e.at(node.span))?;
        storage.borrow_mut().insert(last.name.clone(), value);
        Ok(())
    }

    async fn delay(&mut self, delay: Statement<'_, Delay>) -> EvalResult<()> {
        let value = self.evaluate(delay.then(&delay.ast().duration)).await?;
        let duration = value
            .as_duration()
            .ok_or_else(|| expected_duration(&value).at(delay.ast().duration.span()))?;
        debug!(%duration, "delay");
        tokio::time::sleep(duration.to_std()).await;
        Ok(())
    }

    /// `raise` stores an error value as the function's result
    async fn raise(&mut self, raise: Statement<'_, Raise>) -> EvalResult<()> {
        let node = raise.ast();
        let value = self.evaluate(raise.then(&node.value)).await?;
        let error = match &value {
            Entity::Error(_) => value.clone(),
            Entity::String(message) => Entity::error(message.borrow().clone(), Some(node.span)),
            _ => {
                return Err(EvaluationError::new(
                    EvaluationErrorKind::TypeMismatch,
                    "Expecting a string or error expression",
                )
                .at(node.value.span()))
            }
        };
        self.scopes.set_return(error);
        Ok(())
    }

    /// Non-boolean conditions go through the type's boolean conversion
    async fn condition(&mut self, condition: Statement<'_, Expr>) -> EvalResult<bool> {
        let value = self.evaluate(condition).await?;
        if let Some(b) = value.as_boolean() {
            return Ok(b);
        }
        value
            .type_()
            .convert(&value, types::boolean())
            .map(|converted| converted.as_boolean().unwrap_or(false))
            .map_err(|e| e.at(condition.span()))
    }

    async fn execute_if(&mut self, stmt: Statement<'_, IfStatement>) -> EvalResult<()> {
        let node = stmt.ast();
        for branch in iter::once(&node.if_block).chain(&node.elif_blocks) {
            if self.condition(stmt.then(&branch.condition)).await? {
                self.execute_block(stmt.then(&branch.body), ScopeKind::Local)
                    .await?;
                return Ok(());
            }
        }
        if let Some(else_block) = &node.else_block {
            self.execute_block(stmt.then(else_block), ScopeKind::Local)
                .await?;
        }
        Ok(())
    }

    async fn execute_repeat(&mut self, stmt: Statement<'_, RepeatStatement>) -> EvalResult<()> {
        let max = self.options.max_loop_count;
        for _ in 0..max {
            let flow = self
                .execute_block(stmt.then(&stmt.ast().body), ScopeKind::Loop)
                .await?;
            if flow != FlowControl::Continue {
                return Ok(());
            }
        }
        debug!(max_loop_count = max, "repeat stopped at the iteration cap");
        Ok(())
    }
}
