use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use fieldbill_core::{ExpectedVersion, InvoiceId, TenantId};
use fieldbill_invoicing::{Invoice, Payment};
use fieldbill_reminders::DueDateWindow;

use super::r#trait::{InvoiceStore, StoreError};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct InvoiceKey {
    tenant_id: TenantId,
    invoice_id: InvoiceId,
}

/// In-memory invoice store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<InvoiceKey, Invoice>>,
    payments: RwLock<Vec<Payment>>,
    invoice_sequences: RwLock<HashMap<TenantId, u64>>,
    payment_sequences: RwLock<HashMap<TenantId, u64>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every payment inserted so far, in insertion order.
    pub fn payments(&self) -> Result<Vec<Payment>, StoreError> {
        let payments = self
            .payments
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(payments.clone())
    }

    fn next_sequence(
        sequences: &RwLock<HashMap<TenantId, u64>>,
        tenant_id: TenantId,
    ) -> Result<u64, StoreError> {
        let mut sequences = sequences
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        let counter = sequences.entry(tenant_id).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn collect_sorted_by_due(
        invoices: &HashMap<InvoiceKey, Invoice>,
        tenant_id: TenantId,
        limit: usize,
        filter: impl Fn(&Invoice) -> bool,
    ) -> Vec<Invoice> {
        let mut matches: Vec<Invoice> = invoices
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id)
            .map(|(_, invoice)| invoice)
            .filter(|invoice| filter(invoice))
            .cloned()
            .collect();
        // HashMap iteration order is arbitrary; sort so batches are stable.
        matches.sort_by(|a, b| {
            a.due_date()
                .cmp(&b.due_date())
                .then_with(|| a.invoice_number().cmp(b.invoice_number()))
        });
        matches.truncate(limit);
        matches
    }
}

impl InvoiceStore for InMemoryInvoiceStore {
    fn load(&self, tenant_id: TenantId, invoice_id: InvoiceId) -> Result<Invoice, StoreError> {
        let invoices = self
            .invoices
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        invoices
            .get(&InvoiceKey {
                tenant_id,
                invoice_id,
            })
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn save(
        &self,
        invoice: &Invoice,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let key = InvoiceKey {
            tenant_id: invoice.tenant_id(),
            invoice_id: invoice.id(),
        };

        let mut invoices = self
            .invoices
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        // A missing row counts as version 0.
        let current = invoices.get(&key).map(|stored| stored.version()).unwrap_or(0);
        if !expected_version.matches(current) {
            return Err(StoreError::VersionConflict(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        invoices.insert(key, invoice.clone());
        Ok(())
    }

    fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut payments = self
            .payments
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        payments.push(payment.clone());
        Ok(())
    }

    fn find_reminder_candidates(
        &self,
        tenant_id: TenantId,
        window: DueDateWindow,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError> {
        let invoices = self
            .invoices
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(Self::collect_sorted_by_due(
            &invoices,
            tenant_id,
            limit,
            |invoice| fieldbill_reminders::is_candidate(invoice, &window),
        ))
    }

    fn find_overdue_candidates(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError> {
        let invoices = self
            .invoices
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(Self::collect_sorted_by_due(
            &invoices,
            tenant_id,
            limit,
            |invoice| {
                invoice.status().overdue_eligible()
                    && !invoice.is_archived()
                    && invoice.balance_amount().is_positive()
                    && invoice.due_date().is_some_and(|due| due < now)
            },
        ))
    }

    fn find_purge_due(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, StoreError> {
        let invoices = self
            .invoices
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(Self::collect_sorted_by_due(
            &invoices,
            tenant_id,
            usize::MAX,
            |invoice| invoice.purge_due(now),
        ))
    }

    fn next_invoice_number(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        Self::next_sequence(&self.invoice_sequences, tenant_id)
    }

    fn next_payment_number(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        Self::next_sequence(&self.payment_sequences, tenant_id)
    }
}
