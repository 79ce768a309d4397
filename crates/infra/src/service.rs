//! Invoice application service (application-level orchestration).
//!
//! This module implements the **load, operate, save** pipeline that every
//! invoice mutation goes through. It composes the domain entity with the
//! infrastructure seams: store, delivery, directory, and audit.
//!
//! ## Operation Execution Flow
//!
//! `InvoiceService` implements this pipeline:
//!
//! ```text
//! Request (Actor + parameters)
//!   ↓
//! 1. Load invoice from store (tenant-scoped)
//!   ↓
//! 2. Run the entity operation (pure decision logic, mutates in memory)
//!   ↓
//! 3. Save with the loaded version expected (optimistic concurrency check)
//!   ↓
//! 4. Dependent writes and side effects (payment record, email/SMS, audit)
//! ```
//!
//! ## Why This Orchestration?
//!
//! - **Encapsulate the pattern**: every operation shares the
//!   load/operate/save shape, so it lives here rather than in every caller
//! - **Enforce invariants**: tenant isolation and optimistic concurrency are
//!   enforced on this path, not left to callers
//! - **Compose infrastructure**: the service works against the `InvoiceStore`,
//!   `EmailSender`, `SmsSender`, `CustomerDirectory`, and `AuditSink` traits,
//!   so tests run it over in-memory implementations
//!
//! ## Failure Ordering
//!
//! The invoice save commits before any dependent write or delivery runs.
//! Delivery failure after a committed status change is logged and reported
//! without rolling the status back; a failed payment-record insert after a
//! committed invoice save surfaces as [`ServiceError::Dependency`] carrying
//! the reconciliation context. Batch operations isolate failures per item and
//! report an aggregate [`BatchOutcome`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use fieldbill_core::{Actor, DomainError, ExpectedVersion, InvoiceId, Money, TenantId};
use fieldbill_invoicing::{
    format_invoice_number, format_payment_number, Channel, Invoice, LineItem, NewInvoice,
    Payment, PaymentRequest, ReminderType,
};
use fieldbill_reminders::{
    compose_email, compose_sms, DueDateWindow, ReminderContext, ReminderEvent,
    DEFAULT_BATCH_LIMIT,
};

use crate::audit::{AuditEntry, AuditSink};
use crate::comms::{CustomerDirectory, EmailSender, SmsSender};
use crate::store::{InvoiceStore, StoreError};

/// Aggregate result of a batch operation.
///
/// One item's failure never aborts the batch; failures are logged per item
/// and counted here.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub succeeded: u32,
    pub failed: u32,
}

#[derive(Debug)]
pub enum ServiceError {
    /// Optimistic concurrency failure (stale invoice version).
    Concurrency(String),
    /// The invoice belongs to a different tenant than the caller.
    TenantIsolation,
    /// Domain validation failure (deterministic).
    Validation(String),
    /// Domain invariant failure (deterministic).
    InvariantViolation(String),
    /// Domain-level not found (missing invoice or cross-tenant probe).
    NotFound,
    /// Lifecycle rejection that carries its own typed form (transition,
    /// balance, archival rules).
    Domain(DomainError),
    /// Persisting to the invoice store failed.
    Store(StoreError),
    /// The invoice write committed but a dependent step failed; the message
    /// carries the reconciliation context.
    Dependency(String),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::VersionConflict(msg) => ServiceError::Concurrency(msg),
            other => ServiceError::Store(other),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::Conflict(msg) => ServiceError::Concurrency(msg),
            DomainError::TenantMismatch => ServiceError::TenantIsolation,
            DomainError::NotFound => ServiceError::NotFound,
            other => ServiceError::Domain(other),
        }
    }
}

/// Orchestrates invoice operations over injected infrastructure seams.
///
/// ## Execution Guarantees
///
/// - **Consistency**: every mutation saves with the version the invoice was
///   loaded at; concurrent writers lose with `ServiceError::Concurrency` and
///   retry by reloading
/// - **Isolation**: every load and candidate query is tenant-scoped; the
///   entity re-checks the tenant on each operation
/// - **Commit before delivery**: status changes are persisted before any
///   message leaves the building, so a provider outage never loses a
///   state change
///
/// ## Generic Parameters
///
/// - `S`: invoice store
/// - `E`: email sender
/// - `M`: SMS sender
/// - `D`: customer/company directory
/// - `A`: audit sink
///
/// Tests compose the in-memory implementations; production composes the
/// Postgres store and real providers without changing this module.
#[derive(Debug)]
pub struct InvoiceService<S, E, M, D, A> {
    store: S,
    email: E,
    sms: M,
    directory: D,
    audit: A,
}

impl<S, E, M, D, A> InvoiceService<S, E, M, D, A> {
    pub fn new(store: S, email: E, sms: M, directory: D, audit: A) -> Self {
        Self {
            store,
            email,
            sms,
            directory,
            audit,
        }
    }
}

impl<S, E, M, D, A> InvoiceService<S, E, M, D, A>
where
    S: InvoiceStore,
    E: EmailSender,
    M: SmsSender,
    D: CustomerDirectory,
    A: AuditSink,
{
    /// Draft a new invoice with a tenant-sequential invoice number.
    ///
    /// The invoice number and tenant are always assigned here: whatever the
    /// caller put on `new.invoice_number` is replaced by the next number in
    /// the tenant's sequence, and `new.tenant_id` is forced to the actor's
    /// tenant.
    #[instrument(skip(self, new), fields(tenant_id = %actor.tenant_id.as_uuid(), user_id = %actor.user_id.as_uuid()), err(Debug))]
    pub fn create_invoice(
        &self,
        actor: Actor,
        mut new: NewInvoice,
        now: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let sequence = self.store.next_invoice_number(actor.tenant_id)?;
        new.invoice_number = format_invoice_number(sequence);
        new.tenant_id = actor.tenant_id;

        let invoice = Invoice::draft(new, now)?;
        self.store.save(&invoice, ExpectedVersion::Exact(0))?;

        self.record_audit(
            actor,
            "invoice.created",
            "invoice",
            invoice.id().as_uuid(),
            json!({
                "invoice_number": invoice.invoice_number(),
                "total_minor": invoice.total_amount().minor_units(),
            }),
            now,
        );
        info!(invoice_number = %invoice.invoice_number(), "invoice drafted");
        Ok(invoice)
    }

    /// Send a draft invoice to its customer.
    ///
    /// The status change commits first; email delivery is best-effort and a
    /// rejected or unreachable recipient leaves the invoice sent.
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id.as_uuid(), invoice_id = %invoice_id.as_uuid()), err(Debug))]
    pub fn send_invoice(
        &self,
        actor: Actor,
        invoice_id: InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self.store.load(actor.tenant_id, invoice_id)?;
        let expected = invoice.version();
        invoice.send(actor.tenant_id, now)?;
        self.store.save(&invoice, ExpectedVersion::Exact(expected))?;

        self.record_audit(
            actor,
            "invoice.sent",
            "invoice",
            invoice.id().as_uuid(),
            json!({ "invoice_number": invoice.invoice_number() }),
            now,
        );
        self.deliver_invoice_email(&invoice);
        Ok(invoice)
    }

    /// Record that the customer opened the invoice. Idempotent.
    ///
    /// Views come from the customer-facing link, so there is no acting user;
    /// the view mark on the invoice is the record.
    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid(), invoice_id = %invoice_id.as_uuid()), err(Debug))]
    pub fn mark_viewed(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self.store.load(tenant_id, invoice_id)?;
        let expected = invoice.version();
        invoice.mark_viewed(tenant_id, now)?;
        self.store.save(&invoice, ExpectedVersion::Exact(expected))?;
        Ok(invoice)
    }

    /// Replace the line items of a draft invoice and recompute totals.
    #[instrument(skip(self, line_items), fields(tenant_id = %actor.tenant_id.as_uuid(), invoice_id = %invoice_id.as_uuid()), err(Debug))]
    pub fn edit_draft_lines(
        &self,
        actor: Actor,
        invoice_id: InvoiceId,
        line_items: Vec<LineItem>,
        tax_rate_bps: u32,
        discount_amount: Money,
        now: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self.store.load(actor.tenant_id, invoice_id)?;
        let expected = invoice.version();
        invoice.edit_lines(actor.tenant_id, line_items, tax_rate_bps, discount_amount, now)?;
        self.store.save(&invoice, ExpectedVersion::Exact(expected))?;

        self.record_audit(
            actor,
            "invoice.updated",
            "invoice",
            invoice.id().as_uuid(),
            json!({
                "invoice_number": invoice.invoice_number(),
                "total_minor": invoice.total_amount().minor_units(),
            }),
            now,
        );
        Ok(invoice)
    }

    /// Apply a payment and persist the resulting payment record.
    ///
    /// The invoice save commits before the payment record insert. If the
    /// insert then fails, the error carries both document numbers so the
    /// record can be reconciled; the applied amounts are already durable on
    /// the invoice.
    #[instrument(skip(self, request), fields(tenant_id = %actor.tenant_id.as_uuid(), invoice_id = %invoice_id.as_uuid()), err(Debug))]
    pub fn apply_payment(
        &self,
        actor: Actor,
        invoice_id: InvoiceId,
        request: PaymentRequest,
        now: DateTime<Utc>,
    ) -> Result<(Invoice, Payment), ServiceError> {
        let mut invoice = self.store.load(actor.tenant_id, invoice_id)?;
        let expected = invoice.version();

        let sequence = self.store.next_payment_number(actor.tenant_id)?;
        let payment_number = format_payment_number(sequence);
        let payment = invoice.apply_payment(actor.tenant_id, payment_number, request, now)?;

        self.store.save(&invoice, ExpectedVersion::Exact(expected))?;
        if let Err(e) = self.store.insert_payment(&payment) {
            warn!(
                payment_number = %payment.payment_number,
                invoice_number = %invoice.invoice_number(),
                error = %e,
                "invoice saved but payment record insert failed"
            );
            return Err(ServiceError::Dependency(format!(
                "invoice {} saved but payment record {} was not inserted: {e}",
                invoice.invoice_number(),
                payment.payment_number
            )));
        }

        self.record_audit(
            actor,
            "payment.recorded",
            "payment",
            payment.id.as_uuid(),
            json!({
                "payment_number": payment.payment_number,
                "invoice_number": invoice.invoice_number(),
                "amount_minor": payment.amount.minor_units(),
                "method": payment.method.as_str(),
            }),
            now,
        );
        info!(
            payment_number = %payment.payment_number,
            status = invoice.status().as_str(),
            "payment applied"
        );
        Ok((invoice, payment))
    }

    /// Cancel an invoice. A reason is required once payments were recorded.
    #[instrument(skip(self, reason), fields(tenant_id = %actor.tenant_id.as_uuid(), invoice_id = %invoice_id.as_uuid()), err(Debug))]
    pub fn cancel_invoice(
        &self,
        actor: Actor,
        invoice_id: InvoiceId,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self.store.load(actor.tenant_id, invoice_id)?;
        let expected = invoice.version();
        invoice.cancel(actor.tenant_id, reason, now)?;
        self.store.save(&invoice, ExpectedVersion::Exact(expected))?;

        self.record_audit(
            actor,
            "invoice.cancelled",
            "invoice",
            invoice.id().as_uuid(),
            json!({
                "invoice_number": invoice.invoice_number(),
                "reason": reason.map(str::trim).filter(|r| !r.is_empty()),
            }),
            now,
        );
        Ok(invoice)
    }

    /// Mark one past-due invoice overdue.
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id.as_uuid(), invoice_id = %invoice_id.as_uuid()), err(Debug))]
    pub fn mark_overdue(
        &self,
        actor: Actor,
        invoice_id: InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self.store.load(actor.tenant_id, invoice_id)?;
        let expected = invoice.version();
        invoice.mark_overdue(actor.tenant_id, now)?;
        self.store.save(&invoice, ExpectedVersion::Exact(expected))?;

        let status = invoice.overdue_status(now);
        self.record_audit(
            actor,
            "invoice.marked_overdue",
            "invoice",
            invoice.id().as_uuid(),
            json!({
                "invoice_number": invoice.invoice_number(),
                "days_overdue": status.days_overdue,
                "tier": status.tier.label(),
            }),
            now,
        );
        Ok(invoice)
    }

    /// Sweep past-due invoices for one tenant and mark them overdue.
    ///
    /// Invoked by an external scheduler. Items fail independently; a failure
    /// is logged and counted without aborting the sweep.
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id.as_uuid()), err(Debug))]
    pub fn mark_overdue_batch(
        &self,
        actor: Actor,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<BatchOutcome, ServiceError> {
        let candidates = self.store.find_overdue_candidates(actor.tenant_id, now, limit)?;

        let mut outcome = BatchOutcome::default();
        for mut invoice in candidates {
            let expected = invoice.version();
            let result = invoice
                .mark_overdue(actor.tenant_id, now)
                .map_err(ServiceError::from)
                .and_then(|()| {
                    self.store
                        .save(&invoice, ExpectedVersion::Exact(expected))
                        .map_err(ServiceError::from)
                });
            match result {
                Ok(()) => {
                    self.record_audit(
                        actor,
                        "invoice.marked_overdue",
                        "invoice",
                        invoice.id().as_uuid(),
                        json!({ "invoice_number": invoice.invoice_number() }),
                        now,
                    );
                    outcome.succeeded += 1;
                }
                Err(e) => {
                    warn!(
                        invoice_id = %invoice.id().as_uuid(),
                        error = ?e,
                        "overdue sweep item failed"
                    );
                    outcome.failed += 1;
                }
            }
        }

        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "overdue sweep finished"
        );
        Ok(outcome)
    }

    /// Send one reminder for one invoice.
    ///
    /// Composes from the customer and company names in the directory, sends
    /// on the requested channel, and records the reminder on the invoice
    /// only after the provider accepted the message.
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id.as_uuid(), invoice_id = %invoice_id.as_uuid(), reminder_type = reminder_type.as_str()), err(Debug))]
    pub fn send_reminder(
        &self,
        actor: Actor,
        invoice_id: InvoiceId,
        reminder_type: ReminderType,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self.store.load(actor.tenant_id, invoice_id)?;
        let expected = invoice.version();
        let event =
            self.dispatch_reminder(actor.tenant_id, &mut invoice, reminder_type, channel, now)?;
        self.store.save(&invoice, ExpectedVersion::Exact(expected))?;

        self.record_audit(
            actor,
            "invoice.reminder_sent",
            "invoice",
            invoice.id().as_uuid(),
            json!({
                "invoice_number": invoice.invoice_number(),
                "reminder": event,
            }),
            now,
        );
        Ok(invoice)
    }

    /// Send reminders of one type to every candidate invoice of the tenant.
    ///
    /// Candidates are sent invoices with an outstanding balance whose due
    /// date falls in the window for `reminder_type`, not archived, capped at
    /// [`DEFAULT_BATCH_LIMIT`] per run. One recipient's failure never aborts
    /// the batch.
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id.as_uuid(), reminder_type = reminder_type.as_str()), err(Debug))]
    pub fn send_bulk_reminders(
        &self,
        actor: Actor,
        reminder_type: ReminderType,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, ServiceError> {
        let window = DueDateWindow::for_reminder(reminder_type, now);
        let candidates =
            self.store
                .find_reminder_candidates(actor.tenant_id, window, DEFAULT_BATCH_LIMIT)?;

        let mut outcome = BatchOutcome::default();
        for mut invoice in candidates {
            let expected = invoice.version();
            let result = self
                .dispatch_reminder(actor.tenant_id, &mut invoice, reminder_type, channel, now)
                .and_then(|event| {
                    self.store
                        .save(&invoice, ExpectedVersion::Exact(expected))?;
                    Ok(event)
                });
            match result {
                Ok(event) => {
                    self.record_audit(
                        actor,
                        "invoice.reminder_sent",
                        "invoice",
                        invoice.id().as_uuid(),
                        json!({
                            "invoice_number": invoice.invoice_number(),
                            "reminder": event,
                        }),
                        now,
                    );
                    outcome.succeeded += 1;
                }
                Err(e) => {
                    warn!(
                        invoice_id = %invoice.id().as_uuid(),
                        error = ?e,
                        "reminder dispatch failed"
                    );
                    outcome.failed += 1;
                }
            }
        }

        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "bulk reminders dispatched"
        );
        Ok(outcome)
    }

    /// Archive an invoice (soft delete with a scheduled purge).
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id.as_uuid(), invoice_id = %invoice_id.as_uuid()), err(Debug))]
    pub fn archive_invoice(
        &self,
        actor: Actor,
        invoice_id: InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self.store.load(actor.tenant_id, invoice_id)?;
        let expected = invoice.version();
        invoice.archive(actor.tenant_id, actor.user_id, now)?;
        self.store.save(&invoice, ExpectedVersion::Exact(expected))?;

        self.record_audit(
            actor,
            "invoice.archived",
            "invoice",
            invoice.id().as_uuid(),
            json!({
                "invoice_number": invoice.invoice_number(),
                "purge_scheduled_at": invoice.permanent_delete_scheduled_at(),
            }),
            now,
        );
        Ok(invoice)
    }

    /// Bring an archived invoice back; its pre-archive status is untouched.
    #[instrument(skip(self), fields(tenant_id = %actor.tenant_id.as_uuid(), invoice_id = %invoice_id.as_uuid()), err(Debug))]
    pub fn restore_invoice(
        &self,
        actor: Actor,
        invoice_id: InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self.store.load(actor.tenant_id, invoice_id)?;
        let expected = invoice.version();
        invoice.restore(actor.tenant_id, now)?;
        self.store.save(&invoice, ExpectedVersion::Exact(expected))?;

        self.record_audit(
            actor,
            "invoice.restored",
            "invoice",
            invoice.id().as_uuid(),
            json!({ "invoice_number": invoice.invoice_number() }),
            now,
        );
        Ok(invoice)
    }

    /// Compose, send, and record one reminder. Returns the dispatched event
    /// only after the provider accepted the message and the invoice counters
    /// were updated; the caller still owns the save.
    fn dispatch_reminder(
        &self,
        tenant_id: TenantId,
        invoice: &mut Invoice,
        reminder_type: ReminderType,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> Result<ReminderEvent, ServiceError> {
        let contact = self
            .directory
            .customer(tenant_id, invoice.customer_id())
            .ok_or_else(|| {
                ServiceError::Dependency("customer contact not found".to_string())
            })?;

        let overdue = invoice.overdue_status(now);
        let ctx = ReminderContext {
            customer_name: contact.name.clone(),
            company_name: self.company_name(tenant_id),
            invoice_number: invoice.invoice_number().to_string(),
            amount_due: invoice.balance_amount(),
            due_date: invoice.due_date(),
            days_overdue: overdue.days_overdue,
        };

        let receipt = match channel {
            Channel::Email => {
                let to = contact.email.as_deref().ok_or_else(|| {
                    ServiceError::Dependency("customer has no email address".to_string())
                })?;
                let content = compose_email(reminder_type, &ctx);
                let tags = vec![
                    ("invoice_id".to_string(), invoice.id().as_uuid().to_string()),
                    ("reminder_type".to_string(), reminder_type.as_str().to_string()),
                ];
                self.email.send_email(to, &content.subject, &content.body, &tags)
            }
            Channel::Sms => {
                let to = contact.phone.as_deref().ok_or_else(|| {
                    ServiceError::Dependency("customer has no phone number".to_string())
                })?;
                let body = compose_sms(reminder_type, &ctx);
                self.sms.send_sms(tenant_id, to, &body)
            }
        };
        if !receipt.accepted {
            return Err(ServiceError::Dependency(
                receipt
                    .error
                    .unwrap_or_else(|| "delivery rejected".to_string()),
            ));
        }

        invoice.record_reminder(tenant_id, reminder_type, channel, now)?;
        Ok(ReminderEvent {
            tenant_id,
            invoice_id: invoice.id(),
            reminder_type,
            channel,
            tier: overdue.is_overdue.then_some(overdue.tier),
            sent_at: now,
        })
    }

    fn company_name(&self, tenant_id: TenantId) -> String {
        self.directory
            .company_name(tenant_id)
            .unwrap_or_else(|| "Your service provider".to_string())
    }

    /// Best-effort delivery of a freshly sent invoice. The status change is
    /// already committed; an unreachable customer only produces a warning.
    fn deliver_invoice_email(&self, invoice: &Invoice) {
        let Some(contact) = self
            .directory
            .customer(invoice.tenant_id(), invoice.customer_id())
        else {
            warn!(
                invoice_number = %invoice.invoice_number(),
                "invoice sent but customer contact not found"
            );
            return;
        };
        let Some(to) = contact.email.as_deref() else {
            warn!(
                invoice_number = %invoice.invoice_number(),
                "invoice sent but customer has no email address"
            );
            return;
        };

        let company = self.company_name(invoice.tenant_id());
        let subject = format!("Invoice {} from {}", invoice.invoice_number(), company);
        let due_line = match invoice.due_date() {
            Some(due) => format!(" Payment is due by {}.", due.format("%B %d, %Y")),
            None => String::new(),
        };
        let body = format!(
            "Hi {},\n\nYour invoice {} for {} is ready.{}\n\nThank you,\n{}",
            contact.name,
            invoice.invoice_number(),
            invoice.total_amount(),
            due_line,
            company
        );
        let tags = vec![(
            "invoice_id".to_string(),
            invoice.id().as_uuid().to_string(),
        )];

        let receipt = self.email.send_email(to, &subject, &body, &tags);
        if !receipt.accepted {
            warn!(
                invoice_number = %invoice.invoice_number(),
                error = receipt.error.as_deref().unwrap_or("delivery rejected"),
                "invoice sent but email delivery failed"
            );
        }
    }

    fn record_audit(
        &self,
        actor: Actor,
        action: &str,
        entity_type: &str,
        entity_id: &Uuid,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let entry = AuditEntry {
            tenant_id: actor.tenant_id,
            actor: actor.user_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: *entity_id,
            metadata,
            recorded_at: now,
        };
        if let Err(e) = self.audit.record(entry) {
            warn!(action, error = %e, "audit record failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_promotes_to_concurrency() {
        let err = ServiceError::from(StoreError::VersionConflict("expected 3, found 4".to_string()));
        match err {
            ServiceError::Concurrency(msg) => assert!(msg.contains("expected 3")),
            _ => panic!("Expected concurrency error"),
        }
    }

    #[test]
    fn store_not_found_maps_to_not_found() {
        match ServiceError::from(StoreError::NotFound) {
            ServiceError::NotFound => {}
            _ => panic!("Expected not found"),
        }
    }

    #[test]
    fn domain_errors_map_to_service_variants() {
        match ServiceError::from(DomainError::validation("bad input")) {
            ServiceError::Validation(msg) => assert_eq!(msg, "bad input"),
            _ => panic!("Expected validation error"),
        }
        match ServiceError::from(DomainError::TenantMismatch) {
            ServiceError::TenantIsolation => {}
            _ => panic!("Expected tenant isolation error"),
        }
        match ServiceError::from(DomainError::EditNotAllowed) {
            ServiceError::Domain(DomainError::EditNotAllowed) => {}
            _ => panic!("Expected domain passthrough"),
        }
    }
}
