use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use fieldbill_core::{InvoiceId, TenantId};
use fieldbill_invoicing::{Channel, Invoice, InvoiceStatus, OverdueTier, ReminderType};

/// Cap on how many invoices a single bulk reminder run will touch.
pub const DEFAULT_BATCH_LIMIT: usize = 50;

/// Half-open due-date window `[after, before)` used to select bulk reminder
/// candidates. A missing bound is unbounded on that side.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DueDateWindow {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl DueDateWindow {
    /// The window a bulk run of `reminder_type` scans on the UTC day
    /// containing `now`: anything already due for overdue and final notices,
    /// today for due-today, and today through three days out for upcoming.
    pub fn for_reminder(reminder_type: ReminderType, now: DateTime<Utc>) -> Self {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        match reminder_type {
            ReminderType::Overdue | ReminderType::FinalNotice => Self {
                after: None,
                before: Some(today),
            },
            ReminderType::DueToday => Self {
                after: Some(today),
                before: Some(today + Duration::days(1)),
            },
            ReminderType::Upcoming => Self {
                after: Some(today),
                before: Some(today + Duration::days(4)),
            },
        }
    }

    pub fn contains(&self, due_date: DateTime<Utc>) -> bool {
        if let Some(after) = self.after {
            if due_date < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if due_date >= before {
                return false;
            }
        }
        true
    }
}

/// Whether a bulk run should pick up this invoice at all: sent, unarchived,
/// still owing, due date inside the window. Per-invoice guards (tenant,
/// status) are re-checked by the entity operations at dispatch time.
pub fn is_candidate(invoice: &Invoice, window: &DueDateWindow) -> bool {
    invoice.status() == InvoiceStatus::Sent
        && !invoice.is_archived()
        && invoice.balance_amount().is_positive()
        && invoice.due_date().is_some_and(|due| window.contains(due))
}

/// Record of one dispatched reminder, emitted after the channel send
/// succeeded and the invoice counters were updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub reminder_type: ReminderType,
    pub channel: Channel,
    pub tier: Option<OverdueTier>,
    pub sent_at: DateTime<Utc>,
}
