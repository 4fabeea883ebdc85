//! Test helpers for interpreter tests
//!
//! Parse a script, build an interpreter and run it to completion

use std::sync::Arc;

use crate::config::InterpreterOptions;
use crate::entity::Entity;
use crate::errors::{EvalResult, EvaluationError};
use crate::extensions::Extensions;
use crate::interpreter::Interpreter;
use crate::program::Program;

pub const INSTANCE_ID: i64 = 7;

/// Parse `source`, failing the test with the diagnostic if it is invalid
pub fn program(source: &str) -> Arc<Program> {
    let program = Program::parse(source, "test.flow");
    assert!(program.valid(), "{}", program.error_message());
    Arc::new(program)
}

pub async fn run_with(
    source: &str,
    extensions: Extensions,
    options: InterpreterOptions,
) -> EvalResult<Option<Entity>> {
    let mut interpreter = Interpreter::new(program(source), extensions, options, INSTANCE_ID)?;
    interpreter.run().await
}

pub async fn run(source: &str) -> EvalResult<Option<Entity>> {
    run_with(source, Extensions::default(), InterpreterOptions::default()).await
}

/// Value of the script's top-level `return`
pub async fn returns(source: &str) -> Entity {
    run(source)
        .await
        .expect("Evaluation failed")
        .expect("Script returned no value")
}

pub async fn fails(source: &str) -> EvaluationError {
    run(source).await.expect_err("Expected an evaluation error")
}

/// Byte offset of the first occurrence of `needle`
pub fn offset_of(source: &str, needle: &str) -> usize {
    source.find(needle).expect("Needle not in source")
}
