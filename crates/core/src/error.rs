//! Domain error model.

use thiserror::Error;

use crate::money::Money;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, non-positive amount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A status transition the lifecycle does not permit.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Payment larger than the remaining balance, without an overpayment override.
    #[error("payment of {amount} exceeds remaining balance of {balance}")]
    ExceedsBalance { amount: Money, balance: Money },

    /// Overdue marking attempted before the due date has passed.
    #[error("invoice is not yet due")]
    NotYetDue,

    /// Line-item edit attempted outside draft.
    #[error("only draft invoices can be edited")]
    EditNotAllowed,

    /// Archival attempted on a paid invoice (paid invoices are retained for records).
    #[error("cannot archive a paid invoice")]
    CannotArchivePaid,

    /// Restore attempted on an invoice that is not archived.
    #[error("invoice is not archived")]
    NotArchived,

    /// The invoice belongs to a different company than the acting tenant.
    #[error("tenant mismatch")]
    TenantMismatch,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn exceeds_balance(amount: Money, balance: Money) -> Self {
        Self::ExceedsBalance { amount, balance }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
