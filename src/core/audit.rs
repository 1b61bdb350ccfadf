//! Audit trail of scheduling decisions.
//!
//! The scheduler records registrations, (re)bindings, submissions and
//! termination into an optional [`AuditSink`].

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PoolType;
use crate::core::pool::PoolId;
use crate::util::clock::now_ms;

/// Kind of scheduling decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A user was seen for the first time.
    Register,
    /// A user received its first binding for a pool type.
    Bind,
    /// An idle user was moved to a different pool.
    Rebind,
    /// Tasks were handed to a pool.
    Submit,
    /// The scheduler was terminated.
    Terminate,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Decision taken.
    pub action: AuditAction,
    /// User concerned, if any.
    pub user_id: Option<String>,
    /// Pool type concerned, if any.
    pub pool_type: Option<PoolType>,
    /// Pool concerned, if any.
    pub pool_id: Option<PoolId>,
    /// Additional context.
    pub detail: Option<String>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Bounded in-memory sink. Clones share the same buffer, so a caller can keep
/// one handle and give another to the scheduler.
#[derive(Debug, Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a sink keeping at most `max_events`, dropping the oldest first.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Stored events with the given action.
    #[must_use]
    pub fn events_with(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    action: AuditAction,
    user_id: Option<&str>,
    pool_type: Option<PoolType>,
    pool_id: Option<PoolId>,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: Uuid::new_v4().to_string(),
        action,
        user_id: user_id.map(str::to_string),
        pool_type,
        pool_id,
        detail,
        created_at_ms: now_ms(),
    }
}
