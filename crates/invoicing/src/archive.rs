use chrono::{DateTime, Duration, Utc};

use fieldbill_core::{DomainError, DomainResult, TenantId, UserId};

use crate::invoice::Invoice;
use crate::status::InvoiceStatus;

/// Days an archived invoice is retained before it becomes eligible for
/// permanent deletion.
pub const PURGE_RETENTION_DAYS: i64 = 90;

const SECONDS_PER_DAY: i64 = 86_400;

impl Invoice {
    /// Soft-delete the invoice: stamp the archival overlay and schedule the
    /// permanent purge. The lifecycle status is left untouched; archival is an
    /// overlay, not a transition.
    pub fn archive(
        &mut self,
        tenant_id: TenantId,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_tenant(tenant_id)?;
        if self.status == InvoiceStatus::Paid {
            return Err(DomainError::CannotArchivePaid);
        }
        if self.is_archived() {
            return Err(DomainError::invariant("invoice is already archived"));
        }

        self.deleted_at = Some(now);
        self.deleted_by = Some(actor);
        self.archived_at = Some(now);
        self.permanent_delete_scheduled_at = Some(now + Duration::days(PURGE_RETENTION_DAYS));
        self.touch(now);
        Ok(())
    }

    /// Undo an archive by clearing the whole overlay. The lifecycle status
    /// comes back exactly as it was when the invoice was archived.
    pub fn restore(&mut self, tenant_id: TenantId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_tenant(tenant_id)?;
        if !self.is_archived() {
            return Err(DomainError::NotArchived);
        }

        self.deleted_at = None;
        self.deleted_by = None;
        self.archived_at = None;
        self.permanent_delete_scheduled_at = None;
        self.touch(now);
        Ok(())
    }

    /// True once the retention window has fully elapsed and the invoice may be
    /// permanently deleted.
    pub fn purge_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.permanent_delete_scheduled_at, Some(at) if at <= now)
    }

    /// Whole days until the scheduled purge, clamped at zero. `None` when the
    /// invoice is not archived.
    pub fn days_until_purge(&self, now: DateTime<Utc>) -> Option<i64> {
        let scheduled = self.permanent_delete_scheduled_at?;
        let secs = scheduled.signed_duration_since(now).num_seconds();
        let days = (secs + SECONDS_PER_DAY - 1).div_euclid(SECONDS_PER_DAY);
        Some(days.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::test_support::*;
    use crate::payment::{PaymentMethod, PaymentRequest};
    use fieldbill_core::Money;

    fn test_user_id() -> UserId {
        UserId::new()
    }

    #[test]
    fn archive_stamps_overlay_and_schedules_purge() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        let actor = test_user_id();

        invoice.archive(tenant_id, actor, test_time()).unwrap();

        assert!(invoice.is_archived());
        assert_eq!(invoice.deleted_at(), Some(test_time()));
        assert_eq!(invoice.deleted_by(), Some(actor));
        assert_eq!(invoice.archived_at(), Some(test_time()));
        assert_eq!(
            invoice.permanent_delete_scheduled_at(),
            Some(test_time() + Duration::days(90))
        );
        // Status is untouched; archival is only an overlay.
        assert_eq!(invoice.status(), crate::status::InvoiceStatus::Sent);
    }

    #[test]
    fn archive_of_paid_invoice_is_rejected() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        invoice
            .apply_payment(
                tenant_id,
                "PMT-00001".to_string(),
                PaymentRequest::new(Money::from_minor_units(10_000), PaymentMethod::Cash),
                test_time(),
            )
            .unwrap();

        let err = invoice
            .archive(tenant_id, test_user_id(), test_time())
            .unwrap_err();
        assert_eq!(err, DomainError::CannotArchivePaid);
        assert!(!invoice.is_archived());
    }

    #[test]
    fn archive_of_overdue_invoice_succeeds() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        let later = test_time() + Duration::days(10);
        invoice.mark_overdue(tenant_id, later).unwrap();

        invoice.archive(tenant_id, test_user_id(), later).unwrap();
        assert_eq!(invoice.status(), crate::status::InvoiceStatus::Overdue);
        assert_eq!(
            invoice.permanent_delete_scheduled_at(),
            Some(later + Duration::days(90))
        );
    }

    #[test]
    fn archive_twice_is_rejected() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        invoice
            .archive(tenant_id, test_user_id(), test_time())
            .unwrap();

        let err = invoice
            .archive(tenant_id, test_user_id(), test_time())
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => assert!(msg.contains("archived")),
            _ => panic!("Expected InvariantViolation"),
        }
    }

    #[test]
    fn restore_clears_overlay_and_preserves_status() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        let later = test_time() + Duration::days(10);
        invoice.mark_overdue(tenant_id, later).unwrap();
        invoice.archive(tenant_id, test_user_id(), later).unwrap();

        invoice.restore(tenant_id, later).unwrap();

        assert!(!invoice.is_archived());
        assert_eq!(invoice.deleted_at(), None);
        assert_eq!(invoice.deleted_by(), None);
        assert_eq!(invoice.archived_at(), None);
        assert_eq!(invoice.permanent_delete_scheduled_at(), None);
        assert_eq!(invoice.status(), crate::status::InvoiceStatus::Overdue);
    }

    #[test]
    fn restore_of_unarchived_invoice_is_rejected() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);

        let err = invoice.restore(tenant_id, test_time()).unwrap_err();
        assert_eq!(err, DomainError::NotArchived);
    }

    #[test]
    fn purge_due_after_retention_window() {
        let tenant_id = test_tenant_id();
        let mut invoice = sent_invoice(tenant_id, 10_000);
        invoice
            .archive(tenant_id, test_user_id(), test_time())
            .unwrap();

        assert!(!invoice.purge_due(test_time() + Duration::days(89)));
        assert!(invoice.purge_due(test_time() + Duration::days(90)));
        assert_eq!(
            invoice.days_until_purge(test_time() + Duration::days(89)),
            Some(1)
        );
        assert_eq!(
            invoice.days_until_purge(test_time() + Duration::days(91)),
            Some(0)
        );
        assert_eq!(sent_invoice(tenant_id, 10_000).days_until_purge(test_time()), None);
    }
}
