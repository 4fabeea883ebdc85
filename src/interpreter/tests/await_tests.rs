//! Tests for `await ... for ...` on workflows and host delegates

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::anyhow;
use serde_json::json;

use super::helpers::{fails, returns, run_with};
use crate::config::InterpreterOptions;
use crate::entity::{Entity, JsonObject};
use crate::errors::EvaluationErrorKind;
use crate::extensions::Extensions;

fn error_message(value: &Entity) -> Option<&str> {
    value.as_error().map(|e| e.message.as_str())
}

async fn returns_with(source: &str, extensions: Extensions) -> Entity {
    run_with(source, extensions, InterpreterOptions::default())
        .await
        .expect("Evaluation failed")
        .expect("Script returned no value")
}

fn echo_actions() -> Extensions {
    Extensions::new().with_action(|request: JsonObject| async move { Ok(request) })
}

/* ===================== Workflows ===================== */

#[tokio::test]
async fn test_workflow_timeout() {
    let source = "
        forever : workflow = { repeat { delay 1sec; } }
        return await forever for 1ms;
    ";
    let value = returns(source).await;
    assert_eq!(error_message(&value), Some("Operation timeout"));
}

#[tokio::test]
async fn test_timeout_leaves_caller_usable() {
    let source = "
        forever : workflow = () { x : integer = 1; repeat { delay 1sec; } }
        outcome : error = await forever() for 5ms;
        x : integer = 2;
        return str_format('{} {}', outcome.message, x);
    ";
    let value = returns(source).await;
    assert_eq!(value.as_string().as_deref(), Some("Operation timeout 2"));
}

#[tokio::test]
async fn test_zero_timeout_still_completes_ready_work() {
    let source = "
        three : workflow = () -> integer { return 3; }
        return await three() for 0ms;
    ";
    assert_eq!(returns(source).await.as_integer(), Some(3));
}

#[tokio::test]
async fn test_timeout_must_be_a_duration() {
    let source = "
        three : workflow = () -> integer { return 3; }
        return await three() for 5;
    ";
    let err = fails(source).await;
    assert_eq!(err.kind, EvaluationErrorKind::TypeMismatch);
    assert_eq!(err.message, "Expected a 'duration' got a 'integer'");
}

#[tokio::test]
async fn test_not_awaitable() {
    let err = fails("return await 5 for 1sec;").await;
    assert_eq!(err.kind, EvaluationErrorKind::NotAwaitable);
    assert_eq!(err.message, "Expression of type 'integer' is not an awaitable");

    let err = fails("r : action_reply = (); return await r for 1sec;").await;
    assert_eq!(err.kind, EvaluationErrorKind::NotAwaitable);
}

/* ===================== Host delegates ===================== */

#[tokio::test]
async fn test_action_reply() {
    let source = "
        a : action = (name = 'lamp', on = true);
        reply : action_reply = await a for 1sec;
        return reply.name;
    ";
    let value = returns_with(source, echo_actions()).await;
    assert_eq!(value.as_string().as_deref(), Some("lamp"));
}

#[tokio::test]
async fn test_reply_kind() {
    let source = "
        a : action = (level = 3);
        reply : action_reply = await a for 1sec;
        return reply is action_reply and reply.level == 3;
    ";
    let value = returns_with(source, echo_actions()).await;
    assert_eq!(value.as_boolean(), Some(true));
}

#[tokio::test]
async fn test_delegate_receives_json_request() {
    let seen = Rc::new(Cell::new(false));
    let flag = seen.clone();
    let extensions = Extensions::new().with_http(move |request: JsonObject| {
        let flag = flag.clone();
        async move {
            flag.set(serde_json::Value::Object(request) == json!({"url": "http://lamp", "retries": 2}));
            let mut reply = JsonObject::new();
            reply.insert("status".to_string(), json!(200));
            Ok(reply)
        }
    });

    let source = "
        req : http_request = (url = 'http://lamp', retries = 2);
        reply : http_reply = await req for 1sec;
        return reply.status;
    ";
    let value = returns_with(source, extensions).await;
    assert_eq!(value.as_integer(), Some(200));
    assert!(seen.get());
}

#[tokio::test]
async fn test_delegate_failure_becomes_error_value() {
    let extensions = Extensions::new()
        .with_campaign(|_request: JsonObject| async move { Err(anyhow!("campaign rejected")) });
    let source = "
        c : campaign = (id = 4);
        return await c for 1sec;
    ";
    let value = returns_with(source, extensions).await;
    assert_eq!(error_message(&value), Some("campaign rejected"));
}

#[tokio::test]
async fn test_slow_delegate_times_out() {
    let extensions = Extensions::new().with_device_info(|request: JsonObject| async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(request)
    });
    let source = "
        d : device_info_request = (device = 'lamp');
        return await d for 10ms;
    ";
    let value = returns_with(source, extensions).await;
    assert_eq!(error_message(&value), Some("Operation timeout"));
}

#[tokio::test]
async fn test_missing_delegate() {
    let err = fails("a : action = (); return await a for 1sec;").await;
    assert_eq!(err.kind, EvaluationErrorKind::MissingDelegate);
    assert_eq!(err.message, "No delegate registered for 'action'");
}
