//! Audit trail capture.
//!
//! Every state-changing service operation records who did what to which
//! entity. The [`AuditSink`] seam keeps the service layer decoupled from
//! wherever the trail is persisted; [`InMemoryAuditLog`] backs tests and
//! local development.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fieldbill_core::{TenantId, UserId};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit backend error: {0}")]
    Backend(String),
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub tenant_id: TenantId,
    pub actor: UserId,
    /// Dotted action name, e.g. `invoice.sent` or `payment.recorded`.
    pub action: String,
    /// Kind of entity the action touched (`invoice`, `payment`).
    pub entity_type: String,
    pub entity_id: Uuid,
    /// Free-form context: amounts, document numbers, reasons.
    pub metadata: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

impl<A> AuditSink for Arc<A>
where
    A: AuditSink + ?Sized,
{
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        (**self).record(entry)
    }
}

/// Audit sink that keeps records in memory, for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry recorded so far, in record order.
    pub fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuditError::Backend("lock poisoned".to_string()))?;
        Ok(entries.clone())
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditError::Backend("lock poisoned".to_string()))?;
        entries.push(entry);
        Ok(())
    }
}
