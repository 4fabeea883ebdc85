//! Tree-walking interpreter
//!
//! An [`Interpreter`] runs one program instance. It walks the AST through
//! [`Statement`](crate::program::Statement) views, keeps variables and flow
//! signals on its own [`ScopeStack`], and suspends only at `await` and `delay`.
//!
//! Values are `Rc`-based, so an interpreter and the futures it produces stay
//! on one thread; hosts drive them with `tokio::task::spawn_local`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::InterpreterOptions;
use crate::entity::Entity;
use crate::errors::EvalResult;
use crate::extensions::Extensions;
use crate::program::Program;

mod awaitable;
mod builtins;
mod expressions;
pub mod scope;
mod statements;
mod workflow;

pub use scope::{FlowControl, ScopeKind, ScopeStack};

#[cfg(test)]
mod tests;

/// Boxed future used where evaluation recurses
pub(crate) type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/* ===================== Interpreter ===================== */

pub struct Interpreter {
    program: Arc<Program>,
    scopes: ScopeStack,
    extensions: Extensions,
    options: InterpreterOptions,
    instance_id: i64,
}

impl Interpreter {
    /// Prepare an instance: the root scope gets the builtins and `instance_id`
    pub fn new(
        program: Arc<Program>,
        extensions: Extensions,
        options: InterpreterOptions,
        instance_id: i64,
    ) -> EvalResult<Self> {
        let mut scopes = ScopeStack::new();
        builtins::inject_builtins(&mut scopes, instance_id)?;
        Ok(Self {
            program,
            scopes,
            extensions,
            options,
            instance_id,
        })
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn instance_id(&self) -> i64 {
        self.instance_id
    }

    /// Execute the top-level statements. Yields the value stored by a
    /// top-level `return`, `raise` or failed `try`, if any.
    pub async fn run(&mut self) -> EvalResult<Option<Entity>> {
        let program = self.program.clone();
        let root = program.root();
        self.execute_statements(root.then(&root.ast().statements[..]))
            .await?;
        Ok(self.scopes.return_value())
    }
}
