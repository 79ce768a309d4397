//! Invoice persistence boundary.
//!
//! This module defines a storage-agnostic store abstraction for tenant-scoped
//! invoices, payment records, and document number sequences, plus the two
//! implementations: in-memory for tests and Postgres for production.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryInvoiceStore;
pub use postgres::PostgresInvoiceStore;
pub use r#trait::{InvoiceStore, StoreError};
