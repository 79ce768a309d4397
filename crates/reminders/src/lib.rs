//! Payment reminder composition and dispatch rules.
//!
//! Pure message building and candidate-selection windows; actual delivery and
//! persistence live behind the infrastructure seams.

pub mod dispatch;
pub mod message;

pub use dispatch::{is_candidate, DueDateWindow, ReminderEvent, DEFAULT_BATCH_LIMIT};
pub use message::{compose_email, compose_sms, EmailContent, ReminderContext};
