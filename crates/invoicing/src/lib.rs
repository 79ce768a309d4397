//! Invoicing domain module.
//!
//! This crate contains the invoice lifecycle and payment reconciliation rules,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod archive;
pub mod invoice;
pub mod line_item;
pub mod numbering;
pub mod overdue;
pub mod payment;
pub mod reminder;
pub mod status;

pub use archive::PURGE_RETENTION_DAYS;
pub use invoice::{Invoice, NewInvoice};
pub use line_item::LineItem;
pub use numbering::{format_invoice_number, format_payment_number};
pub use overdue::{classify, OverdueStatus, OverdueTier, Urgency};
pub use payment::{Payment, PaymentMethod, PaymentRequest, PaymentStatus};
pub use reminder::{Channel, ReminderType};
pub use status::InvoiceStatus;
