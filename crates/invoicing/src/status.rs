//! Invoice status lifecycle.

use serde::{Deserialize, Serialize};

/// Invoice status.
///
/// Archival is an orthogonal overlay (`deleted_at`/`archived_at` on the
/// invoice), never a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Paid is terminal: no further status mutation is permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }

    /// Payments are rejected only on cancelled invoices.
    pub fn accepts_payment(&self) -> bool {
        !matches!(self, InvoiceStatus::Cancelled)
    }

    /// Statuses from which an invoice can be flagged overdue.
    pub fn overdue_eligible(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::Viewed | InvoiceStatus::Partial
        )
    }

    /// Statuses a customer view can be recorded against.
    pub fn view_eligible(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::Viewed | InvoiceStatus::Partial
        )
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&InvoiceStatus::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
        let back: InvoiceStatus = serde_json::from_str("\"overdue\"").unwrap();
        assert_eq!(back, InvoiceStatus::Overdue);
    }

    #[test]
    fn only_paid_is_terminal() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Viewed,
            InvoiceStatus::Partial,
            InvoiceStatus::Overdue,
            InvoiceStatus::Cancelled,
        ] {
            assert!(!status.is_terminal(), "{status} should not be terminal");
        }
        assert!(InvoiceStatus::Paid.is_terminal());
    }

    #[test]
    fn cancelled_rejects_payment() {
        assert!(!InvoiceStatus::Cancelled.accepts_payment());
        assert!(InvoiceStatus::Draft.accepts_payment());
        assert!(InvoiceStatus::Overdue.accepts_payment());
    }
}
