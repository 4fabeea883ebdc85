//! Tests for workflow definitions and invocation

use super::helpers::{fails, offset_of, returns};
use crate::errors::EvaluationErrorKind;

const SUBTRACT: &str = "sub : workflow = (a : integer, b : integer) -> integer { return a - b; }\n";

#[tokio::test]
async fn test_invocation() {
    let source = format!("{SUBTRACT}return await sub(10, 4) for 1sec;");
    assert_eq!(returns(&source).await.as_integer(), Some(6));
}

#[tokio::test]
async fn test_alternative_definition_syntax() {
    let source = "
        double : workflow (x : integer) -> integer = { return x * 2; }
        return await double(21) for 1sec;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(42));
}

#[tokio::test]
async fn test_call_without_await_does_not_run() {
    let source = "
        count : dictionary = (n = 0);
        bump : workflow = (c : dictionary) { c.n = 1; }
        return bump(count) is workflow_invocation and count.n == 0;
    ";
    assert_eq!(returns(source).await.as_boolean(), Some(true));
}

#[tokio::test]
async fn test_named_arguments() {
    let source = format!("{SUBTRACT}return await sub(b = 1, a = 10) for 1sec;");
    assert_eq!(returns(&source).await.as_integer(), Some(9));

    let source = format!("{SUBTRACT}return await sub(20, a = 25) for 1sec;");
    assert_eq!(returns(&source).await.as_integer(), Some(5));
}

#[tokio::test]
async fn test_unknown_named_argument() {
    let source = format!("{SUBTRACT}return await sub(c = 1, a = 2) for 1sec;");
    let err = fails(&source).await;
    assert_eq!(err.kind, EvaluationErrorKind::InvalidArgument);
    assert_eq!(err.message, "Unknown argument 'c'");
}

#[tokio::test]
async fn test_argument_count_mismatch() {
    let source = format!("{SUBTRACT}return await sub(1) for 1sec;");
    let err = fails(&source).await;
    assert_eq!(err.kind, EvaluationErrorKind::ArityMismatch);
    assert_eq!(err.message, "Invalid argument count: expected 2 arguments");
    assert_eq!(err.location.map(|l| l.start), Some(offset_of(&source, "sub(1)")));
}

#[tokio::test]
async fn test_argument_type_mismatch() {
    let source = format!("{SUBTRACT}return await sub('x', 2) for 1sec;");
    let err = fails(&source).await;
    assert_eq!(err.kind, EvaluationErrorKind::TypeMismatch);
    assert_eq!(
        err.message,
        "Type mismatch for argument 'a': expected a 'integer' while got a 'string'"
    );
    assert_eq!(err.location.map(|l| l.start), Some(offset_of(&source, "'x'")));
}

#[tokio::test]
async fn test_missing_return_value() {
    let source = "
        pick : workflow = (x : integer) -> integer {
            if x == 1 { return 10; } elif x == 2 { return 20; }
        }
        return await pick(3) for 1sec;
    ";
    let err = fails(source).await;
    assert_eq!(err.kind, EvaluationErrorKind::MissingReturnValue);
    assert_eq!(err.message, "Workflow did not return any value");
    assert_eq!(err.location.map(|l| l.start), Some(offset_of(source, "pick(3)")));
}

#[tokio::test]
async fn test_invalid_return_type() {
    let source = "
        name : workflow = () -> integer { return 'lamp'; }
        return await name() for 1sec;
    ";
    let err = fails(source).await;
    assert_eq!(err.kind, EvaluationErrorKind::InvalidReturnType);
    assert_eq!(err.message, "Invalid return type: expected a integer, got a string");
}

#[tokio::test]
async fn test_workflow_without_signature() {
    let source = "
        noop : workflow = { x : integer = 1; }
        return await noop() for 1sec;
    ";
    assert!(returns(source).await.is_void());

    let source = "
        stop : workflow = { raise 'stopped'; }
        return await stop for 1sec;
    ";
    assert!(returns(source).await.is_error());
}

#[tokio::test]
async fn test_workflow_without_return_type_must_not_return_a_value() {
    let source = "
        answer : workflow = () { return 42; }
        return await answer() for 1sec;
    ";
    let err = fails(source).await;
    assert_eq!(err.kind, EvaluationErrorKind::InvalidReturnType);
    assert_eq!(err.message, "Invalid return type: expected a void, got a integer");
    assert_eq!(err.location.map(|l| l.start), Some(offset_of(source, "answer()")));

    let source = "
        any : workflow = { return 'anything'; }
        return await any for 1sec;
    ";
    assert_eq!(fails(source).await.kind, EvaluationErrorKind::InvalidReturnType);
}

#[tokio::test]
async fn test_arguments_are_detached() {
    let source = "
        grow : workflow = (xs : array) { xs.push(1); }
        items : array = [];
        await grow(items) for 1sec;
        return items.size;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(0));
}

#[tokio::test]
async fn test_raised_error_bypasses_return_type() {
    let source = "
        fail : workflow = () -> integer { raise 'bad'; }
        return await fail() for 1sec;
    ";
    let value = returns(source).await;
    assert!(value.is_error());
    assert_eq!(value.as_error().map(|e| e.message.as_str()), Some("bad"));
}

#[tokio::test]
async fn test_return_inside_repeat_leaves_workflow() {
    let source = "
        find : workflow = () -> integer {
            i : integer = 0;
            repeat {
                i = i + 1;
                if i == 50 { return i; }
            }
            return -1;
        }
        return await find() for 1sec;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(50));
}

#[tokio::test]
async fn test_break_does_not_escape_workflow() {
    let source = "
        stop : workflow = () { break; }
        total : integer = 0;
        repeat {
            total = total + 1;
            await stop() for 1sec;
            if total == 3 { break; }
        }
        return total;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(3));
}

#[tokio::test]
async fn test_nested_invocation() {
    let source = "
        inc : workflow = (x : integer) -> integer { return x + 1; }
        twice : workflow = (x : integer) -> integer {
            once : integer = await inc(x) for 1sec;
            return await inc(once) for 1sec;
        }
        return await twice(1) for 1sec;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(3));
}
