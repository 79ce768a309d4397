use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use fieldbill_core::{ExpectedVersion, InvoiceId, TenantId};
use fieldbill_invoicing::{Invoice, Payment};
use fieldbill_reminders::DueDateWindow;

/// Invoice store operation error.
///
/// These are infrastructure errors (storage, concurrency, isolation) as
/// opposed to domain errors (validation, invariants). `VersionConflict` is the
/// retryable one: the caller reloads and reapplies its operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invoice not found")]
    NotFound,

    #[error("optimistic concurrency check failed: {0}")]
    VersionConflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Tenant-scoped persistence boundary for invoices, payments, and document
/// number sequences.
///
/// ## Design Principles
///
/// - **No storage assumptions**: works with the in-memory implementation
///   (tests/dev) and the Postgres backend (production).
/// - **Tenant isolation**: every operation is keyed by tenant; a lookup with
///   the wrong tenant behaves exactly like a missing invoice.
/// - **Optimistic locking**: `save` takes an `ExpectedVersion` and refuses to
///   overwrite a row whose stored version differs. Lost updates on the balance
///   fields are the failure this prevents; callers retry on conflict.
///
/// ## Save Semantics
///
/// `save` persists the invoice as-is (the entity bumps its own version once
/// per mutating operation). A typical mutation is `load` at version `n`,
/// apply the domain operation (now `n + 1`), then `save` with
/// `ExpectedVersion::Exact(n)`. New invoices save with `Exact(0)` or `Any`;
/// a missing row counts as version 0.
pub trait InvoiceStore: Send + Sync {
    /// Load one invoice. `NotFound` covers both a missing id and a
    /// cross-tenant probe.
    fn load(&self, tenant_id: TenantId, invoice_id: InvoiceId) -> Result<Invoice, StoreError>;

    /// Persist the invoice, enforcing the optimistic version check.
    fn save(&self, invoice: &Invoice, expected_version: ExpectedVersion)
        -> Result<(), StoreError>;

    /// Append a payment record. Payments are immutable once inserted.
    fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;

    /// Sent, unarchived invoices with an outstanding balance whose due date
    /// falls inside `window`, ordered by due date, at most `limit`.
    fn find_reminder_candidates(
        &self,
        tenant_id: TenantId,
        window: DueDateWindow,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError>;

    /// Unarchived invoices eligible to be flagged overdue: status sent,
    /// viewed, or partial, balance outstanding, due date before `now`.
    fn find_overdue_candidates(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError>;

    /// Archived invoices whose permanent-delete schedule has elapsed.
    fn find_purge_due(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, StoreError>;

    /// Next value of the tenant's invoice number sequence (1-based,
    /// monotonic, no reuse).
    fn next_invoice_number(&self, tenant_id: TenantId) -> Result<u64, StoreError>;

    /// Next value of the tenant's payment number sequence.
    fn next_payment_number(&self, tenant_id: TenantId) -> Result<u64, StoreError>;
}

impl<S> InvoiceStore for Arc<S>
where
    S: InvoiceStore + ?Sized,
{
    fn load(&self, tenant_id: TenantId, invoice_id: InvoiceId) -> Result<Invoice, StoreError> {
        (**self).load(tenant_id, invoice_id)
    }

    fn save(
        &self,
        invoice: &Invoice,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        (**self).save(invoice, expected_version)
    }

    fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        (**self).insert_payment(payment)
    }

    fn find_reminder_candidates(
        &self,
        tenant_id: TenantId,
        window: DueDateWindow,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError> {
        (**self).find_reminder_candidates(tenant_id, window, limit)
    }

    fn find_overdue_candidates(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError> {
        (**self).find_overdue_candidates(tenant_id, now, limit)
    }

    fn find_purge_due(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, StoreError> {
        (**self).find_purge_due(tenant_id, now)
    }

    fn next_invoice_number(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        (**self).next_invoice_number(tenant_id)
    }

    fn next_payment_number(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        (**self).next_payment_number(tenant_id)
    }
}
