/// Audit trail for mutations
///
/// Every create, update, toggle and delete is reported to an [`AuditSink`]
/// as an [`AuditEvent`]. Recording never fails and never blocks the request.
///
/// - [`TracingAuditSink`] writes one structured line per event to the
///   `tasktrack::audit` target.
/// - [`MemoryAuditSink`] keeps events in memory so tests can inspect them.

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

use crate::auth::principal::Principal;

/// Target used for audit lines
pub const AUDIT_TARGET: &str = "tasktrack::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    TaskCreated,
    TaskUpdated,
    TaskToggled,
    TaskDeleted,
    UserRegistered,
    ProfileUpdated,
    UserDeleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::TaskCreated => "task_created",
            AuditAction::TaskUpdated => "task_updated",
            AuditAction::TaskToggled => "task_toggled",
            AuditAction::TaskDeleted => "task_deleted",
            AuditAction::UserRegistered => "user_registered",
            AuditAction::ProfileUpdated => "profile_updated",
            AuditAction::UserDeleted => "user_deleted",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub actor_id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub object_id: Uuid,

    /// Free-form context such as the new completion state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn new(actor: &Principal, action: AuditAction, object_id: Uuid) -> Self {
        Self {
            actor_id: actor.id,
            actor: actor.username.clone(),
            action,
            object_id,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Writes audit events as `tracing` lines
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: AUDIT_TARGET,
            actor_id = %event.actor_id,
            actor = %event.actor,
            action = %event.action,
            object_id = %event.object_id,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit"
        );
    }
}

/// Collects audit events in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.events().into_iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
    }
}
