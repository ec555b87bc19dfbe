//! Audit sink implementations.
//!
//! The harness emits one event per claim and per terminal commit, carrying
//! the resolved status and the recorded duration. Dashboards consume these
//! instead of polling the registry.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::{StatusMessage, TaskName};
use crate::util::clock::now_ms;

/// Lifecycle action recorded by an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// An entry was conditionally claimed into `processing`.
    Claimed,
    /// Domain logic finished and a status was committed.
    Committed,
    /// Domain logic failed and the failure status was committed.
    Failed,
    /// Entries were reset to `not processed` by the sweep or a requeue.
    Requeued,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier (UUID v4).
    pub event_id: String,
    /// Transient the event concerns.
    pub transient: String,
    /// Task the event concerns.
    pub task: TaskName,
    /// Action taken.
    pub action: AuditAction,
    /// Committed status, when the action carries one.
    pub status: Option<StatusMessage>,
    /// Recorded processing duration in seconds, when the action carries one.
    pub duration_s: Option<f64>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Postgres-backed audit sink (schema-only; DB I/O not wired).
pub struct PostgresAuditSink;

impl PostgresAuditSink {
    /// Returns SQL migration statements for the audit log.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r#"
CREATE TABLE IF NOT EXISTS tp_audit_events (
    event_id TEXT PRIMARY KEY,
    transient TEXT NOT NULL,
    task TEXT NOT NULL,
    action TEXT NOT NULL,
    status TEXT,
    duration_s DOUBLE PRECISION,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_tp_audit_events_transient_created ON tp_audit_events (transient, created_at);
CREATE INDEX IF NOT EXISTS idx_tp_audit_events_task ON tp_audit_events (task);
"#,
        ]
    }
}

impl AuditSink for PostgresAuditSink {
    fn record(&mut self, _event: AuditEvent) {
        // Not wired to a database client; events are dropped.
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    transient: impl Into<String>,
    task: TaskName,
    action: AuditAction,
    status: Option<StatusMessage>,
    duration_s: Option<f64>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        transient: transient.into(),
        task,
        action,
        status,
        duration_s,
        created_at_ms: now_ms(),
    }
}
