use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use warden_kernel::audit::{AuditCategory, AuditDraft, AuditLevel, AuditWriter};
use warden_kernel::capability::{CapabilityError, CapabilitySource};
use warden_kernel::gateway::{InvokeError, PrivilegedCallInvoker};
use warden_testing::audit::{FailingWriter, RecordingWriter};
use warden_testing::capability::{FailingCapabilitySource, StaticCapabilitySource};
use warden_testing::invoker::MockInvoker;

#[tokio::test]
async fn test_mock_invoker_responses() {
    let mock = MockInvoker::new()
        .with_response("greet", json!("Hello!"))
        .with_error("fs:delete", InvokeError::Backend("read-only volume".into()))
        .with_handler("math:double", |params| {
            params
                .as_i64()
                .map(|n| json!(n * 2))
                .ok_or_else(|| InvokeError::Backend("not a number".into()))
        });

    assert_eq!(mock.invoke("greet", json!({})).await.unwrap(), json!("Hello!"));
    assert_eq!(mock.invoke("math:double", json!(21)).await.unwrap(), json!(42));
    assert_eq!(
        mock.invoke("fs:delete", json!({"path": "a"})).await,
        Err(InvokeError::Backend("read-only volume".into()))
    );
    assert_eq!(
        mock.invoke("unknown", json!(null)).await,
        Err(InvokeError::UnknownCommand("unknown".into()))
    );

    warden_testing::assert_invoked!(mock, 4);
    warden_testing::assert_invoked!(mock, "greet", 1);
    assert_eq!(mock.last_params().await, Some(json!(null)));
}

#[tokio::test]
async fn test_mock_invoker_clones_share_history() {
    let mock = MockInvoker::new().echoing();
    let handle = mock.clone();

    assert_eq!(handle.invoke("any", json!([1])).await.unwrap(), json!([1]));
    assert_eq!(mock.history().await, vec![("any".to_string(), json!([1]))]);

    mock.clear_history().await;
    warden_testing::assert_invoked!(handle, 0);
}

#[tokio::test(start_paused = true)]
async fn test_mock_invoker_delay() {
    let mock = MockInvoker::new()
        .echoing()
        .with_delay(Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    mock.invoke("slow", json!(1)).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test]
async fn test_static_source_grant_and_revoke() {
    let source = StaticCapabilitySource::granting(["fs:read"]);
    assert!(source.query_grant("fs:read").await.unwrap());
    assert!(!source.query_grant("fs:write").await.unwrap());

    source.grant("fs:write");
    source.revoke("fs:read");
    assert!(source.query_grant("fs:write").await.unwrap());
    assert!(!source.query_grant("fs:read").await.unwrap());

    assert_eq!(source.query_count("fs:read"), 2);
    assert_eq!(source.total_queries(), 4);

    assert!(StaticCapabilitySource::allow_all().query_grant("x").await.unwrap());
    assert!(!StaticCapabilitySource::deny_all().query_grant("x").await.unwrap());
}

#[tokio::test]
async fn test_failing_source() {
    let source = FailingCapabilitySource::new("offline");
    assert_eq!(
        source.query_grant("fs:read").await,
        Err(CapabilityError::Unavailable("offline".into()))
    );
    assert_eq!(source.calls(), 1);
}

#[test]
fn test_writers() {
    let event = AuditDraft::new(AuditLevel::Info, AuditCategory::General, "hello", "test")
        .into_event(Utc::now());

    let recording = RecordingWriter::new();
    recording.write(&event).unwrap();
    assert_eq!(recording.messages(), vec!["hello"]);

    let failing = FailingWriter::new();
    assert!(failing.write(&event).is_err());
    assert_eq!(failing.attempts(), 1);
}
