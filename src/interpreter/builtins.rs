//! Free functions bound in the root scope

use tracing::info;

use super::scope::ScopeStack;
use crate::entity::{CallArguments, Entity, FreeFn};
use crate::errors::{EvalResult, EvaluationError, EvaluationErrorKind};

/* ===================== Registry ===================== */

const BUILTINS: [(&str, FreeFn); 4] = [
    ("print", print),
    ("println", print),
    ("panic", panic),
    ("str_format", str_format),
];

/// Bind the builtins and the instance id in the root scope
pub(super) fn inject_builtins(scopes: &mut ScopeStack, instance_id: i64) -> EvalResult<()> {
    for (name, call) in BUILTINS {
        scopes.declare(name, Entity::free_function(name, call))?;
    }
    scopes.declare("instance_id", Entity::integer(instance_id))
}

/* ===================== Implementations ===================== */

fn joined(arguments: &CallArguments) -> String {
    arguments
        .iter()
        .map(|arg| arg.value.representation())
        .collect::<Vec<_>>()
        .join(" ")
}

fn print(arguments: &CallArguments) -> EvalResult {
    info!(target: "flow::script", "[FLOW] {}", joined(arguments));
    Ok(Entity::Void)
}

fn panic(arguments: &CallArguments) -> EvalResult {
    Err(EvaluationError::new(
        EvaluationErrorKind::Panic,
        joined(arguments),
    ))
}

/// `{}` takes the next positional argument, `{name}` the named one
fn str_format(arguments: &CallArguments) -> EvalResult {
    let format = arguments
        .get(0)
        .filter(|arg| arg.name.is_none())
        .and_then(|arg| arg.value.as_string())
        .ok_or_else(|| EvaluationError::invalid_argument("str_format expects a format string"))?;
    let mut positional = arguments.iter().skip(1).filter(|arg| arg.name.is_none());

    let mut out = String::with_capacity(format.len());
    let mut rest = format.as_str();
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let key = after[..close].trim();
        let value = if key.is_empty() {
            positional.next().map(|arg| &arg.value).ok_or_else(|| {
                EvaluationError::invalid_argument("Not enough arguments for str_format")
            })?
        } else {
            arguments.find(key).map(|arg| &arg.value).ok_or_else(|| {
                EvaluationError::invalid_argument(format!("Missing argument '{}'", key))
            })?
        };
        out.push_str(&value.representation());
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(Entity::string(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn arguments(values: Vec<(Option<&str>, Entity)>) -> CallArguments {
        let mut args = CallArguments::new(Span::default());
        for (name, value) in values {
            args.push(name.map(str::to_string), value, Span::default());
        }
        args
    }

    #[test]
    fn test_str_format_positional_and_named() {
        let args = arguments(vec![
            (None, Entity::string("{} has {count} items")),
            (None, Entity::string("cart")),
            (Some("count"), Entity::integer(3)),
        ]);
        let result = str_format(&args).unwrap();
        assert_eq!(result.as_string().as_deref(), Some("cart has 3 items"));
    }

    #[test]
    fn test_str_format_missing_argument() {
        let args = arguments(vec![(None, Entity::string("{} and {}")), (None, Entity::integer(1))]);
        let err = str_format(&args).unwrap_err();
        assert_eq!(err.kind, EvaluationErrorKind::InvalidArgument);
    }

    #[test]
    fn test_panic_is_an_evaluation_error() {
        let args = arguments(vec![(None, Entity::string("boom")), (None, Entity::integer(2))]);
        let err = panic(&args).unwrap_err();
        assert_eq!(err.kind, EvaluationErrorKind::Panic);
        assert_eq!(err.message, "boom 2");
    }

    #[test]
    fn test_builtins_are_bound() {
        let mut scopes = ScopeStack::new();
        inject_builtins(&mut scopes, 42).unwrap();
        assert!(matches!(scopes.lookup("print"), Some(Entity::FreeFunction(_))));
        assert_eq!(scopes.lookup("instance_id").and_then(Entity::as_integer), Some(42));
    }
}
