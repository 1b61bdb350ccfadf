//! Tests for audit sink

use prometheus_pool_scheduler::config::PoolType;
use prometheus_pool_scheduler::core::{
    build_audit_event, AuditAction, AuditSink, InMemoryAuditSink, PoolId,
};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        AuditAction::Submit,
        Some("u1"),
        Some(PoolType::Cpu),
        Some(PoolId::new(0)),
        Some("2 task(s)".to_string()),
    );

    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(events[0].user_id.as_deref(), Some("u1"));
    assert_eq!(events[0].action, AuditAction::Submit);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(AuditAction::Register, Some("u1"), None, None, None));
    sink.record(build_audit_event(AuditAction::Register, Some("u2"), None, None, None));
    sink.record(build_audit_event(AuditAction::Register, Some("u3"), None, None, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].user_id.as_deref(), Some("u2")); // First one popped
    assert_eq!(events[1].user_id.as_deref(), Some("u3"));
}

#[test]
fn test_zero_capacity_sink_keeps_nothing() {
    let mut sink = InMemoryAuditSink::new(0);

    sink.record(build_audit_event(AuditAction::Register, Some("u1"), None, None, None));
    sink.record(build_audit_event(AuditAction::Terminate, None, None, None, None));

    assert!(sink.events().is_empty());
}

#[test]
fn test_clones_share_buffer() {
    let reader = InMemoryAuditSink::new(10);
    let mut writer = reader.clone();

    writer.record(build_audit_event(AuditAction::Bind, Some("u1"), Some(PoolType::Io), Some(PoolId::new(2)), None));
    writer.record(build_audit_event(AuditAction::Terminate, None, None, None, None));

    assert_eq!(reader.events().len(), 2);
    assert_eq!(reader.events_with(AuditAction::Bind).len(), 1);
    assert!(reader.events_with(AuditAction::Rebind).is_empty());
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        AuditAction::Rebind,
        Some("u1"),
        Some(PoolType::Gpu),
        Some(PoolId::new(4)),
        Some("from pool-3".to_string()),
    );

    assert_eq!(event.action, AuditAction::Rebind);
    assert_eq!(event.pool_type, Some(PoolType::Gpu));
    assert_eq!(event.pool_id, Some(PoolId::new(4)));
    assert_eq!(event.detail, Some("from pool-3".to_string()));
    assert!(!event.event_id.is_empty());
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_audit_event_serializes() {
    let event = build_audit_event(AuditAction::Submit, Some("u1"), Some(PoolType::Io), Some(PoolId::new(1)), None);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"], "submit");
    assert_eq!(json["pool_type"], "io");
    assert_eq!(json["pool_id"], 1);
}
