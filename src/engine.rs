//! Program instances
//!
//! [`Engine`] parses a source text and runs it on a fresh [`Interpreter`].
//! Every instance is isolated: a parse failure or evaluation error is logged
//! and ends that instance only.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, Instrument};

use crate::config::FlowConfig;
use crate::entity::Entity;
use crate::errors::{EvaluationError, EvaluationErrorKind};
use crate::extensions::Extensions;
use crate::interpreter::Interpreter;
use crate::program::Program;

/// How one instance ended
#[derive(Debug)]
pub enum Outcome {
    /// Ran to the end; holds the value of a top-level `return`, `raise` or
    /// failed `try`
    Completed(Option<Entity>),
    /// Carries the caret diagnostic
    ParseFailed(String),
    Failed(EvaluationError),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn into_result(self) -> anyhow::Result<Option<Entity>> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::ParseFailed(message) => Err(anyhow!(message)),
            Outcome::Failed(err) => Err(err.into()),
        }
    }
}

#[derive(Clone, Default)]
pub struct Engine {
    config: FlowConfig,
    extensions: Extensions,
}

impl Engine {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            extensions: Extensions::default(),
        }
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Start an instance on the current `LocalSet`
    pub fn spawn(
        &self,
        code: impl Into<String>,
        file_name: impl Into<String>,
        instance_id: i64,
    ) -> JoinHandle<Outcome> {
        let engine = self.clone();
        let (code, file_name) = (code.into(), file_name.into());
        tokio::task::spawn_local(async move { engine.run(&code, &file_name, instance_id).await })
    }

    /// Parse and evaluate one instance to completion
    pub async fn run(&self, code: &str, file_name: &str, instance_id: i64) -> Outcome {
        let span = info_span!("instance", instance_id, file_name);
        self.run_instance(code, file_name, instance_id)
            .instrument(span)
            .await
    }

    async fn run_instance(&self, code: &str, file_name: &str, instance_id: i64) -> Outcome {
        let program = Arc::new(Program::parse(code, file_name));
        if !program.valid() {
            error!(
                instance_id,
                file_name,
                "Failed to parse program:\n{}",
                program.error_message()
            );
            return Outcome::ParseFailed(program.error_message().to_string());
        }

        let result = match Interpreter::new(
            program.clone(),
            self.extensions.clone(),
            self.config.interpreter.clone(),
            instance_id,
        ) {
            Ok(mut interpreter) => interpreter.run().await,
            Err(err) => Err(err),
        };

        match result {
            Ok(value) => {
                debug!(instance_id, "instance completed");
                Outcome::Completed(value)
            }
            Err(err) => {
                report(&program, &err, instance_id);
                Outcome::Failed(err)
            }
        }
    }
}

fn report(program: &Program, err: &EvaluationError, instance_id: i64) {
    let file_name = program.file_name();
    if err.kind == EvaluationErrorKind::Panic {
        error!(instance_id, file_name, "Panic: {}", err.message);
        return;
    }
    match err.location {
        Some(location) => error!(
            instance_id,
            file_name,
            "Evaluation error: {}\n{}",
            err.message,
            program.annotate(location)
        ),
        None => error!(instance_id, file_name, "Evaluation error: {}", err.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let outcome = Engine::default().run("return 1 + 1;", "sum.flow", 1).await;
        assert!(outcome.is_completed());
        let value = outcome.into_result().unwrap().unwrap();
        assert_eq!(value.as_integer(), Some(2));
    }

    #[tokio::test]
    async fn test_parse_failure_is_reported() {
        let outcome = Engine::default().run("x : integer = ;", "broken.flow", 1).await;
        match outcome {
            Outcome::ParseFailed(message) => {
                assert!(message.starts_with("Parsing error !!"), "{}", message)
            }
            other => panic!("Expected a parse failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_evaluation_failure_is_reported() {
        let outcome = Engine::default().run("return missing;", "fail.flow", 1).await;
        match outcome {
            Outcome::Failed(err) => {
                assert_eq!(err.kind, EvaluationErrorKind::UndeclaredIdentifier)
            }
            other => panic!("Expected an evaluation failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_configured_loop_cap() {
        let config = FlowConfig::builder().max_loop_count(Some(3)).build().unwrap();
        let engine = Engine::new(config);
        let source = "n : integer = 0; repeat { n = n + 1; } return n;";
        let value = engine.run(source, "cap.flow", 1).await.into_result().unwrap().unwrap();
        assert_eq!(value.as_integer(), Some(3));
    }

    #[tokio::test]
    async fn test_instances_run_side_by_side() {
        let engine = Engine::default();
        let local = tokio::task::LocalSet::new();
        let results = local
            .run_until(async move {
                let slow = engine.spawn("delay 20ms; return instance_id;", "slow.flow", 1);
                let fast = engine.spawn("return instance_id;", "fast.flow", 2);
                let broken = engine.spawn("return nope;", "broken.flow", 3);
                (slow.await, fast.await, broken.await)
            })
            .await;

        let (slow, fast, broken) = results;
        let slow = slow.unwrap().into_result().unwrap().unwrap();
        let fast = fast.unwrap().into_result().unwrap().unwrap();
        assert_eq!(slow.as_integer(), Some(1));
        assert_eq!(fast.as_integer(), Some(2));
        assert!(!broken.unwrap().is_completed());
    }
}
