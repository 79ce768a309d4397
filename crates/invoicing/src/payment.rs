use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldbill_core::{
    CustomerId, DomainError, DomainResult, InvoiceId, Money, PaymentId, TenantId,
};

use crate::invoice::Invoice;
use crate::status::InvoiceStatus;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    Card,
    BankTransfer,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Check => "check",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Other => "other",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// A request to apply money against an invoice.
///
/// `acknowledge_overpayment` lets a caller explicitly accept a payment larger
/// than the remaining balance (producing a credit); without it such payments
/// are rejected outright.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub acknowledge_overpayment: bool,
}

impl PaymentRequest {
    pub fn new(amount: Money, method: PaymentMethod) -> Self {
        Self {
            amount,
            method,
            reference: None,
            notes: None,
            acknowledge_overpayment: false,
        }
    }
}

/// Immutable record of an applied payment. One is produced per successful
/// `Invoice::apply_payment` and persisted alongside the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub payment_number: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub status: PaymentStatus,
    pub processed_at: DateTime<Utc>,
}

impl Invoice {
    /// Apply a payment to the invoice ledger.
    ///
    /// Settles `paid` and `balance`, derives the new status (`partial` while a
    /// balance remains, `paid` once it reaches zero or below), and returns the
    /// payment record to persist. Only cancelled invoices refuse payment; a
    /// deposit on a draft is legal and moves it straight to `partial`. An
    /// acknowledged overpayment drives the balance negative; the invoice is
    /// still considered paid.
    pub fn apply_payment(
        &mut self,
        tenant_id: TenantId,
        payment_number: String,
        request: PaymentRequest,
        now: DateTime<Utc>,
    ) -> DomainResult<Payment> {
        self.ensure_tenant(tenant_id)?;
        if !self.status.accepts_payment() {
            return Err(DomainError::invariant(
                "cannot record a payment on a cancelled invoice",
            ));
        }
        if !request.amount.is_positive() {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        if request.amount > self.balance_amount && !request.acknowledge_overpayment {
            return Err(DomainError::exceeds_balance(
                request.amount,
                self.balance_amount,
            ));
        }

        self.paid_amount = self.paid_amount.add(request.amount)?;
        self.balance_amount = self.total_amount.subtract(self.paid_amount)?;
        if self.balance_amount.is_positive() {
            self.status = InvoiceStatus::Partial;
        } else {
            self.status = InvoiceStatus::Paid;
            self.paid_at = Some(now);
        }
        self.touch(now);

        Ok(Payment {
            id: PaymentId::new(),
            tenant_id,
            invoice_id: self.id,
            customer_id: self.customer_id,
            payment_number,
            amount: request.amount,
            method: request.method,
            reference: request.reference,
            notes: request.notes,
            status: PaymentStatus::Completed,
            processed_at: now,
        })
    }
}
