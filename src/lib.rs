//! Flow: an embedded workflow automation language
//!
//! A host hands script text to the [`Engine`](engine::Engine), which parses it
//! into a [`Program`](program::Program) and evaluates it with a tree-walking
//! [`Interpreter`](interpreter::Interpreter). Scripts reach the outside world
//! only by awaiting host requests, served by the delegates in
//! [`Extensions`](extensions::Extensions).

pub mod ast;
pub mod cli;
pub mod config;
pub mod engine;
pub mod entity;
pub mod errors;
pub mod extensions;
pub mod interpreter;
pub mod parser;
pub mod program;
pub mod types;

pub use config::FlowConfig;
pub use engine::{Engine, Outcome};
pub use entity::Entity;
pub use errors::{EvalResult, EvaluationError, EvaluationErrorKind};
pub use extensions::Extensions;
pub use program::{Program, Statement};
