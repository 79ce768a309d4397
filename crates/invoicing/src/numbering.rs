//! Human-readable document numbers.
//!
//! Numbers are per-tenant sequential: the store owns the counters, this
//! module only owns the formatting.

pub fn format_invoice_number(sequence: u64) -> String {
    format!("INV-{sequence:05}")
}

pub fn format_payment_number(sequence: u64) -> String {
    format!("PMT-{sequence:05}")
}
