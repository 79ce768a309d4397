use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldbill_core::{
    CustomerId, DomainError, DomainResult, InvoiceId, JobId, Money, TenantId, UserId,
};

use crate::line_item::LineItem;
use crate::reminder::{Channel, ReminderType};
use crate::status::InvoiceStatus;

/// Invoice: ledger totals, lifecycle status, reminder counters, archival overlay.
///
/// Monetary fields are recomputed from line items and kept consistent by every
/// operation: `total = subtotal + tax - discount`, `balance = total - paid`.
/// The version field increments once per successful mutation; stores check it
/// on save for optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub(crate) id: InvoiceId,
    pub(crate) tenant_id: TenantId,
    pub(crate) customer_id: CustomerId,
    pub(crate) job_id: Option<JobId>,
    pub(crate) invoice_number: String,

    pub(crate) line_items: Vec<LineItem>,
    pub(crate) tax_rate_bps: u32,
    pub(crate) subtotal: Money,
    pub(crate) tax_amount: Money,
    pub(crate) discount_amount: Money,
    pub(crate) total_amount: Money,
    pub(crate) paid_amount: Money,
    pub(crate) balance_amount: Money,

    pub(crate) status: InvoiceStatus,
    pub(crate) due_date: Option<DateTime<Utc>>,
    pub(crate) notes: Option<String>,
    pub(crate) sent_at: Option<DateTime<Utc>>,
    pub(crate) viewed_at: Option<DateTime<Utc>>,
    pub(crate) paid_at: Option<DateTime<Utc>>,
    pub(crate) cancelled_at: Option<DateTime<Utc>>,

    pub(crate) deleted_at: Option<DateTime<Utc>>,
    pub(crate) deleted_by: Option<UserId>,
    pub(crate) archived_at: Option<DateTime<Utc>>,
    pub(crate) permanent_delete_scheduled_at: Option<DateTime<Utc>>,

    pub(crate) reminder_count: u32,
    pub(crate) sms_reminder_count: u32,
    pub(crate) last_reminder_sent_at: Option<DateTime<Utc>>,
    pub(crate) last_reminder_type: Option<ReminderType>,

    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: u64,
}

/// Inputs for drafting a new invoice.
///
/// Invoices are created by an external workflow that supplies validated line
/// items; from draft onward every change goes through the entity operations.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub id: InvoiceId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub job_id: Option<JobId>,
    pub invoice_number: String,
    pub line_items: Vec<LineItem>,
    pub tax_rate_bps: u32,
    pub discount_amount: Money,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Invoice {
    pub fn draft(new: NewInvoice, now: DateTime<Utc>) -> DomainResult<Self> {
        if new.invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice number must not be empty"));
        }

        let mut invoice = Self {
            id: new.id,
            tenant_id: new.tenant_id,
            customer_id: new.customer_id,
            job_id: new.job_id,
            invoice_number: new.invoice_number,
            line_items: new.line_items,
            tax_rate_bps: new.tax_rate_bps,
            subtotal: Money::ZERO,
            tax_amount: Money::ZERO,
            discount_amount: new.discount_amount,
            total_amount: Money::ZERO,
            paid_amount: Money::ZERO,
            balance_amount: Money::ZERO,
            status: InvoiceStatus::Draft,
            due_date: new.due_date,
            notes: new.notes,
            sent_at: None,
            viewed_at: None,
            paid_at: None,
            cancelled_at: None,
            deleted_at: None,
            deleted_by: None,
            archived_at: None,
            permanent_delete_scheduled_at: None,
            reminder_count: 0,
            sms_reminder_count: 0,
            last_reminder_sent_at: None,
            last_reminder_type: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        invoice.recompute_totals()?;
        Ok(invoice)
    }

    pub fn id(&self) -> InvoiceId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn tax_rate_bps(&self) -> u32 {
        self.tax_rate_bps
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax_amount(&self) -> Money {
        self.tax_amount
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn paid_amount(&self) -> Money {
        self.paid_amount
    }

    pub fn balance_amount(&self) -> Money {
        self.balance_amount
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn viewed_at(&self) -> Option<DateTime<Utc>> {
        self.viewed_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn deleted_by(&self) -> Option<UserId> {
        self.deleted_by
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    pub fn permanent_delete_scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.permanent_delete_scheduled_at
    }

    pub fn reminder_count(&self) -> u32 {
        self.reminder_count
    }

    pub fn sms_reminder_count(&self) -> u32 {
        self.sms_reminder_count
    }

    pub fn last_reminder_sent_at(&self) -> Option<DateTime<Utc>> {
        self.last_reminder_sent_at
    }

    pub fn last_reminder_type(&self) -> Option<ReminderType> {
        self.last_reminder_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn can_accept_payment(&self) -> bool {
        self.status.accepts_payment()
    }
}

impl Invoice {
    pub(crate) fn ensure_tenant(&self, tenant_id: TenantId) -> DomainResult<()> {
        if self.tenant_id != tenant_id {
            return Err(DomainError::TenantMismatch);
        }
        Ok(())
    }

    /// Bump version and stamp the mutation time. Called once per successful
    /// mutating operation; idempotent no-ops skip it.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }

    pub(crate) fn recompute_totals(&mut self) -> DomainResult<()> {
        if self.line_items.is_empty() {
            return Err(DomainError::validation(
                "invoice must have at least one line item",
            ));
        }
        if self.discount_amount.is_negative() {
            return Err(DomainError::validation(
                "discount amount must not be negative",
            ));
        }

        let mut subtotal = Money::ZERO;
        for item in &self.line_items {
            subtotal = subtotal.add(item.total())?;
        }

        let tax_amount = subtotal.apply_percentage(self.tax_rate_bps)?;
        let total_amount = subtotal.add(tax_amount)?.subtract(self.discount_amount)?;
        if total_amount.is_negative() {
            return Err(DomainError::validation(
                "discount amount exceeds subtotal plus tax",
            ));
        }

        self.subtotal = subtotal;
        self.tax_amount = tax_amount;
        self.total_amount = total_amount;
        self.balance_amount = total_amount.subtract(self.paid_amount)?;
        Ok(())
    }

    /// Send the invoice to the customer. Only drafts can be sent.
    ///
    /// Notification delivery is the caller's concern; a failed email never
    /// rolls back the status change.
    pub fn send(&mut self, tenant_id: TenantId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_tenant(tenant_id)?;
        if self.status != InvoiceStatus::Draft {
            return Err(DomainError::invalid_transition(self.status.as_str(), "sent"));
        }

        self.status = InvoiceStatus::Sent;
        self.sent_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Record that the customer viewed the invoice.
    ///
    /// Idempotent: `viewed_at` is set once; repeat calls are no-ops and do not
    /// bump the version.
    pub fn mark_viewed(&mut self, tenant_id: TenantId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_tenant(tenant_id)?;
        if self.viewed_at.is_some() {
            return Ok(());
        }
        if !self.status.view_eligible() {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                "viewed",
            ));
        }

        self.viewed_at = Some(now);
        if self.status == InvoiceStatus::Sent {
            self.status = InvoiceStatus::Viewed;
        }
        self.touch(now);
        Ok(())
    }

    /// Replace the line items, tax rate, and discount of a draft, recomputing
    /// all ledger totals. Any other status is rejected.
    pub fn edit_lines(
        &mut self,
        tenant_id: TenantId,
        line_items: Vec<LineItem>,
        tax_rate_bps: u32,
        discount_amount: Money,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_tenant(tenant_id)?;
        if self.status != InvoiceStatus::Draft {
            return Err(DomainError::EditNotAllowed);
        }

        let previous = (
            core::mem::replace(&mut self.line_items, line_items),
            self.tax_rate_bps,
            self.discount_amount,
        );
        self.tax_rate_bps = tax_rate_bps;
        self.discount_amount = discount_amount;

        if let Err(e) = self.recompute_totals() {
            (self.line_items, self.tax_rate_bps, self.discount_amount) = previous;
            return Err(e);
        }
        self.touch(now);
        Ok(())
    }

    /// Flag a past-due invoice as overdue. Requires an elapsed due date and an
    /// outstanding balance.
    pub fn mark_overdue(&mut self, tenant_id: TenantId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_tenant(tenant_id)?;
        if !self.status.overdue_eligible() {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                "overdue",
            ));
        }
        match self.due_date {
            Some(due) if due < now => {}
            _ => return Err(DomainError::NotYetDue),
        }
        if !self.balance_amount.is_positive() {
            return Err(DomainError::invariant(
                "cannot mark an invoice with no outstanding balance overdue",
            ));
        }

        self.status = InvoiceStatus::Overdue;
        self.touch(now);
        Ok(())
    }

    /// Cancel the invoice. Paid invoices cannot be cancelled (issue a refund
    /// instead); a reason is mandatory once payments have been recorded, and
    /// any reason given is appended to the invoice notes.
    pub fn cancel(
        &mut self,
        tenant_id: TenantId,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_tenant(tenant_id)?;
        if matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                "cancelled",
            ));
        }

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if self.paid_amount.is_positive() && reason.is_none() {
            return Err(DomainError::validation(
                "cancelling an invoice with recorded payments requires a reason",
            ));
        }

        if let Some(reason) = reason {
            let note = format!("[CANCELLED]: {reason}");
            self.notes = Some(match self.notes.take() {
                Some(existing) => format!("{existing}\n\n{note}"),
                None => note,
            });
        }

        self.status = InvoiceStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Record a sent reminder: bump the channel counter and remember when and
    /// what was last sent.
    pub fn record_reminder(
        &mut self,
        tenant_id: TenantId,
        reminder_type: ReminderType,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_tenant(tenant_id)?;

        match channel {
            Channel::Email => self.reminder_count += 1,
            Channel::Sms => self.sms_reminder_count += 1,
        }
        self.last_reminder_sent_at = Some(now);
        self.last_reminder_type = Some(reminder_type);
        self.touch(now);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use fieldbill_core::Quantity;

    #[test]
    fn draft_computes_totals_from_line_items() {
        let tenant_id = test_tenant_id();
        let invoice = Invoice::draft(
            NewInvoice {
                id: InvoiceId::new(),
                tenant_id,
                customer_id: CustomerId::new(),
                job_id: None,
                invoice_number: "INV-00042".to_string(),
                line_items: vec![
                    LineItem::new(
                        "Water heater install",
                        Quantity::from_whole(1),
                        Money::from_minor_units(85_000),
                    )
                    .unwrap(),
                    LineItem::new(
                        "Labor",
                        Quantity::from_thousandths(2_500),
                        Money::from_minor_units(9_500),
                    )
                    .unwrap(),
                ],
                tax_rate_bps: 825,
                discount_amount: Money::from_minor_units(5_000),
                due_date: Some(test_time()),
                notes: None,
            },
            test_time(),
        )
        .unwrap();

        // 85000 + 23750 = 108750; tax 8.25% = 8971.875 -> 8972
        assert_eq!(invoice.subtotal(), Money::from_minor_units(108_750));
        assert_eq!(invoice.tax_amount(), Money::from_minor_units(8_972));
        assert_eq!(invoice.total_amount(), Money::from_minor_units(112_722));
        assert_eq!(invoice.balance_amount(), Money::from_minor_units(112_722));
        assert_eq!(invoice.paid_amount(), Money::ZERO);
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.version(), 0);
    }

    #[test]
    fn draft_requires_line_items() {
        let err = Invoice::draft(
            NewInvoice {
                id: InvoiceId::new(),
                tenant_id: test_tenant_id(),
                customer_id: CustomerId::new(),
                job_id: None,
                invoice_number: "INV-00001".to_string(),
                line_items: vec![],
                tax_rate_bps: 0,
                discount_amount: Money::ZERO,
                due_date: None,
                notes: None,
            },
            test_time(),
        )
        .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("line item") => {}
            _ => panic!("Expected validation error for missing line items"),
        }
    }

    #[test]
    fn discount_cannot_exceed_subtotal_plus_tax() {
        let err = Invoice::draft(
            NewInvoice {
                id: InvoiceId::new(),
                tenant_id: test_tenant_id(),
                customer_id: CustomerId::new(),
                job_id: None,
                invoice_number: "INV-00001".to_string(),
                line_items: vec![single_line(1_000)],
                tax_rate_bps: 0,
                discount_amount: Money::from_minor_units(1_001),
                due_date: None,
                notes: None,
            },
            test_time(),
        )
        .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("discount") => {}
            _ => panic!("Expected validation error for oversized discount"),
        }
    }

    #[test]
    fn send_moves_draft_to_sent_and_stamps_sent_at() {
        let tenant_id = test_tenant_id();
        let mut invoice = test_invoice(tenant_id, 10_000);
        invoice.send(tenant_id, test_time()).unwrap();

        assert_eq!(invoice.status(), InvoiceStatus::Sent);
        assert_eq!(invoice.sent_at(), Some(test_time()));
        assert_eq!(invoice.version(), 1);
    }

    #[test]
    fn send_requires_draft() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        let err = invoice.send(tenant_id, test_time()).unwrap_err();
        match err {
            DomainError::InvalidTransition { from, to } => {
                assert_eq!(from, "sent");
                assert_eq!(to, "sent");
            }
            _ => panic!("Expected InvalidTransition"),
        }
    }

    #[test]
    fn mark_viewed_sets_viewed_at_once() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);

        invoice.mark_viewed(tenant_id, test_time()).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Viewed);
        assert_eq!(invoice.viewed_at(), Some(test_time()));
        let version_after_first = invoice.version();

        // Second call is a no-op, not an error, and does not bump the version.
        let later = test_time() + chrono::Duration::hours(1);
        invoice.mark_viewed(tenant_id, later).unwrap();
        assert_eq!(invoice.viewed_at(), Some(test_time()));
        assert_eq!(invoice.version(), version_after_first);
    }

    #[test]
    fn mark_viewed_on_draft_is_invalid() {
        let tenant_id = test_tenant_id();
        let mut invoice = test_invoice(tenant_id, 10_000);
        let err = invoice.mark_viewed(tenant_id, test_time()).unwrap_err();
        match err {
            DomainError::InvalidTransition { from, .. } => assert_eq!(from, "draft"),
            _ => panic!("Expected InvalidTransition"),
        }
    }

    #[test]
    fn edit_requires_draft() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        let err = invoice
            .edit_lines(
                tenant_id,
                vec![single_line(5_000)],
                0,
                Money::ZERO,
                test_time(),
            )
            .unwrap_err();
        assert_eq!(err, DomainError::EditNotAllowed);
    }

    #[test]
    fn edit_recomputes_totals_and_resets_balance() {
        let tenant_id = test_tenant_id();
        let mut invoice = test_invoice(tenant_id, 10_000);
        invoice
            .edit_lines(
                tenant_id,
                vec![single_line(20_000), single_line(5_000)],
                1_000,
                Money::from_minor_units(500),
                test_time(),
            )
            .unwrap();

        assert_eq!(invoice.subtotal(), Money::from_minor_units(25_000));
        assert_eq!(invoice.tax_amount(), Money::from_minor_units(2_500));
        assert_eq!(invoice.total_amount(), Money::from_minor_units(27_000));
        assert_eq!(invoice.balance_amount(), Money::from_minor_units(27_000));
    }

    #[test]
    fn rejected_edit_leaves_invoice_unchanged() {
        let tenant_id = test_tenant_id();
        let mut invoice = test_invoice(tenant_id, 10_000);
        let before = invoice.clone();

        let err = invoice
            .edit_lines(tenant_id, vec![], 0, Money::ZERO, test_time())
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected validation error"),
        }
        assert_eq!(invoice, before);
    }

    #[test]
    fn mark_overdue_requires_elapsed_due_date() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);

        // Due date is a week out; flagging now is premature.
        let err = invoice.mark_overdue(tenant_id, test_time()).unwrap_err();
        assert_eq!(err, DomainError::NotYetDue);

        let after_due = test_time() + chrono::Duration::days(8);
        invoice.mark_overdue(tenant_id, after_due).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Overdue);
    }

    #[test]
    fn mark_overdue_without_due_date_is_not_yet_due() {
        let tenant_id = test_tenant_id();
        let mut invoice = test_invoice(tenant_id, 10_000);
        invoice.due_date = None;
        invoice.send(tenant_id, test_time()).unwrap();

        let err = invoice.mark_overdue(tenant_id, test_time()).unwrap_err();
        assert_eq!(err, DomainError::NotYetDue);
    }

    #[test]
    fn mark_overdue_on_draft_is_invalid() {
        let tenant_id = test_tenant_id();
        let mut invoice = test_invoice(tenant_id, 10_000);
        let err = invoice
            .mark_overdue(tenant_id, test_time() + chrono::Duration::days(30))
            .unwrap_err();
        match err {
            DomainError::InvalidTransition { from, to } => {
                assert_eq!(from, "draft");
                assert_eq!(to, "overdue");
            }
            _ => panic!("Expected InvalidTransition"),
        }
    }

    #[test]
    fn cancel_without_reason_succeeds_when_nothing_paid() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        invoice.cancel(tenant_id, None, test_time()).unwrap();

        assert_eq!(invoice.status(), InvoiceStatus::Cancelled);
        assert_eq!(invoice.cancelled_at(), Some(test_time()));
        assert_eq!(invoice.notes(), None);
    }

    #[test]
    fn cancel_appends_reason_to_notes() {
        let tenant_id = test_tenant_id();
        let mut invoice = test_invoice(tenant_id, 10_000);
        invoice.notes = Some("Customer requested Saturday service".to_string());
        invoice.send(tenant_id, test_time()).unwrap();

        invoice
            .cancel(tenant_id, Some("Duplicate of INV-00002"), test_time())
            .unwrap();
        assert_eq!(
            invoice.notes(),
            Some(
                "Customer requested Saturday service\n\n[CANCELLED]: Duplicate of INV-00002"
            )
        );
    }

    #[test]
    fn cancel_twice_is_rejected() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        invoice.cancel(tenant_id, None, test_time()).unwrap();

        let err = invoice.cancel(tenant_id, None, test_time()).unwrap_err();
        match err {
            DomainError::InvalidTransition { from, .. } => assert_eq!(from, "cancelled"),
            _ => panic!("Expected InvalidTransition"),
        }
    }

    #[test]
    fn operations_reject_foreign_tenant() {
        let tenant_id = test_tenant_id();
        let other_tenant = test_tenant_id();
        let mut invoice = test_invoice(tenant_id, 10_000);

        assert_eq!(
            invoice.send(other_tenant, test_time()).unwrap_err(),
            DomainError::TenantMismatch
        );
        assert_eq!(
            invoice.mark_viewed(other_tenant, test_time()).unwrap_err(),
            DomainError::TenantMismatch
        );
        assert_eq!(
            invoice.cancel(other_tenant, None, test_time()).unwrap_err(),
            DomainError::TenantMismatch
        );
        // Nothing leaked through.
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.version(), 0);
    }

    #[test]
    fn record_reminder_tracks_per_channel_counters() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);

        invoice
            .record_reminder(tenant_id, ReminderType::Upcoming, Channel::Email, test_time())
            .unwrap();
        invoice
            .record_reminder(
                tenant_id,
                ReminderType::Overdue,
                Channel::Sms,
                test_time() + chrono::Duration::days(10),
            )
            .unwrap();

        assert_eq!(invoice.reminder_count(), 1);
        assert_eq!(invoice.sms_reminder_count(), 1);
        assert_eq!(
            invoice.last_reminder_sent_at(),
            Some(test_time() + chrono::Duration::days(10))
        );
        assert_eq!(invoice.last_reminder_type(), Some(ReminderType::Overdue));
    }
}
