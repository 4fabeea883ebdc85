//! Scenario tests for the interpreter
//!
//! Organized by feature area

mod await_tests;
mod helpers;
mod statement_tests;
mod workflow_tests;
