//! `fieldbill-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod actor;
pub mod error;
pub mod id;
pub mod money;
pub mod version;

pub use actor::Actor;
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, InvoiceId, JobId, PaymentId, TenantId, UserId};
pub use money::{Money, Quantity};
pub use version::ExpectedVersion;
