//! Tests for statements, scopes and flow control

use super::helpers::{fails, returns, run, run_with};
use crate::config::InterpreterOptions;
use crate::errors::EvaluationErrorKind;
use crate::extensions::Extensions;

/* ===================== Declarations ===================== */

#[tokio::test]
async fn test_declaration_defaults() {
    assert_eq!(returns("x : integer; return x;").await.as_integer(), Some(0));
    assert_eq!(
        returns("s : string; return s.size;").await.as_integer(),
        Some(0)
    );
}

#[tokio::test]
async fn test_redeclaration_fails() {
    let err = fails("x : integer = 1; x : integer = 2;").await;
    assert_eq!(err.kind, EvaluationErrorKind::AlreadyDeclared);
    assert_eq!(err.message, "'x' already declared in the current scope");
}

#[tokio::test]
async fn test_unknown_type() {
    let err = fails("x : banana = 1;").await;
    assert_eq!(err.kind, EvaluationErrorKind::UnknownType);
    assert_eq!(err.message, "Unknown type 'banana'");
}

#[tokio::test]
async fn test_shadowing_in_nested_block() {
    let source = "
        x : integer = 1;
        if true {
            x : integer = 2;
        }
        return x;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(1));
}

#[tokio::test]
async fn test_block_variables_do_not_leak() {
    let err = fails("if true { y : integer = 1; } return y;").await;
    assert_eq!(err.kind, EvaluationErrorKind::UndeclaredIdentifier);
}

/* ===================== Assignment ===================== */

#[tokio::test]
async fn test_assignment_narrows_real() {
    assert_eq!(returns("x : integer = 1; x = 2.9; return x;").await.as_integer(), Some(2));
}

#[tokio::test]
async fn test_assignment_type_mismatch() {
    let err = fails("x : string = 'a'; x = 1;").await;
    assert_eq!(err.kind, EvaluationErrorKind::InvalidAssignment);
    assert_eq!(
        err.message,
        "Invalid assignment. Expected 'string' while provided a 'integer'"
    );
}

#[tokio::test]
async fn test_dotted_assignment_updates_in_place() {
    let source = "
        d : dictionary = (inner = (count = 1));
        d.inner.count = 5;
        return d.inner.count;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(5));
}

#[tokio::test]
async fn test_dotted_assignment_needs_existing_key() {
    let err = fails("d : dictionary = (); d.missing = 1;").await;
    assert_eq!(err.kind, EvaluationErrorKind::PropertyNotFound);
}

/* ===================== Aliasing ===================== */

#[tokio::test]
async fn test_declaration_detaches_containers() {
    let source = "
        a : array = [1, 2];
        b : array = a;
        b.push(3);
        return a.size;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(2));
}

#[tokio::test]
async fn test_assignment_detaches_containers() {
    let source = "
        a : array = [1];
        b : array = [];
        b = a;
        b.push(2);
        return a.size * 10 + b.size;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(12));
}

#[tokio::test]
async fn test_property_access_aliases() {
    let source = "
        d : dictionary = (items = [1]);
        d.items.push(2);
        return d.items.size;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(2));
}

#[tokio::test]
async fn test_insert_detaches_value() {
    let source = "
        xs : array = [1];
        d : dictionary = ();
        d.insert('xs', xs);
        xs.push(2);
        return d.xs.size;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(1));
}

/* ===================== Conditionals ===================== */

#[tokio::test]
async fn test_if_elif_else() {
    let source = "if false { return 1; } elif true { return 2; } else { return 3; }";
    assert_eq!(returns(source).await.as_integer(), Some(2));

    let source = "if false { return 1; } elif false { return 2; } else { return 3; }";
    assert_eq!(returns(source).await.as_integer(), Some(3));
}

#[tokio::test]
async fn test_condition_conversion() {
    assert_eq!(
        returns("if 0 { return 1; } else { return 2; }").await.as_integer(),
        Some(2)
    );
    assert_eq!(
        returns("if 'text' { return 1; } return 2;").await.as_integer(),
        Some(1)
    );

    let err = fails("t : time_point; if t { return 1; }").await;
    assert_eq!(err.kind, EvaluationErrorKind::NotConvertible);
}

#[tokio::test]
async fn test_return_skips_remaining_statements() {
    let result = run("x : integer = 1; return x; panic('unreachable');").await;
    assert_eq!(result.unwrap().and_then(|v| v.as_integer()), Some(1));
}

/* ===================== Repeat ===================== */

#[tokio::test]
async fn test_repeat_runs_until_cap() {
    let source = "count : integer = 0; repeat { count = count + 1; } return count;";
    assert_eq!(returns(source).await.as_integer(), Some(1000));

    let options = InterpreterOptions { max_loop_count: 25 };
    let value = run_with(source, Extensions::default(), options)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value.as_integer(), Some(25));
}

#[tokio::test]
async fn test_break_leaves_loop() {
    let source = "
        i : integer = 0;
        repeat {
            i = i + 1;
            if i == 3 { break; }
        }
        return i;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(3));
}

#[tokio::test]
async fn test_break_only_leaves_inner_loop() {
    let source = "
        total : integer = 0;
        outer : integer = 0;
        repeat {
            outer = outer + 1;
            repeat {
                total = total + 1;
                break;
            }
            if outer == 4 { break; }
        }
        return total;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(4));
}

/* ===================== Delay / Raise ===================== */

#[tokio::test]
async fn test_delay() {
    assert_eq!(returns("delay 1ms; return 1;").await.as_integer(), Some(1));

    let err = fails("delay 5;").await;
    assert_eq!(err.kind, EvaluationErrorKind::TypeMismatch);
    assert_eq!(err.message, "Expected a 'duration' got a 'integer'");
}

#[tokio::test]
async fn test_top_level_raise() {
    let value = returns("raise 'stop'; return 1;").await;
    assert!(value.is_error());
    assert_eq!(value.as_error().map(|e| e.message.as_str()), Some("stop"));
}

#[tokio::test]
async fn test_raise_needs_string_or_error() {
    let err = fails("raise 5;").await;
    assert_eq!(err.message, "Expecting a string or error expression");
}

#[tokio::test]
async fn test_error_values() {
    let source = "e : error = 'bad thing'; return e.message;";
    assert_eq!(returns(source).await.as_string().as_deref(), Some("bad thing"));

    let source = "e : error = 'bad'; return e is error;";
    assert_eq!(returns(source).await.as_boolean(), Some(true));
}

#[tokio::test]
async fn test_import_is_ignored() {
    assert_eq!(returns("import shared.helpers; return 1;").await.as_integer(), Some(1));
}
