use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldbill_core::Money;

use crate::invoice::Invoice;

const SECONDS_PER_DAY: i64 = 86_400;

/// Escalation bucket for an unpaid invoice, labelled by the age band it
/// covers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverdueTier {
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "1-day")]
    OneDay,
    #[serde(rename = "7-days")]
    SevenDays,
    #[serde(rename = "15-days")]
    FifteenDays,
    #[serde(rename = "30-days")]
    ThirtyDays,
    #[serde(rename = "60-days")]
    SixtyDays,
    #[serde(rename = "90-days")]
    NinetyDays,
}

impl OverdueTier {
    pub fn label(&self) -> &'static str {
        match self {
            OverdueTier::Current => "current",
            OverdueTier::OneDay => "1-day",
            OverdueTier::SevenDays => "7-days",
            OverdueTier::FifteenDays => "15-days",
            OverdueTier::ThirtyDays => "30-days",
            OverdueTier::SixtyDays => "60-days",
            OverdueTier::NinetyDays => "90-days",
        }
    }
}

impl std::fmt::Display for OverdueTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    None,
    Low,
    Medium,
    High,
    Critical,
    Severe,
}

/// Classification of an invoice's payment standing at a point in time.
///
/// `allow_payment` is always true today; no tier blocks payment. The field
/// exists so a tier could gate it without changing the shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueStatus {
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub tier: OverdueTier,
    pub urgency: Urgency,
    pub message: String,
    pub allow_payment: bool,
}

/// Classify an invoice's standing from its due date and outstanding balance.
///
/// Pure: no clock access, no invoice mutation. Days are counted with ceiling
/// division, so a due date even one second past counts as a full day overdue.
pub fn classify(due_date: Option<DateTime<Utc>>, balance: Money, now: DateTime<Utc>) -> OverdueStatus {
    if !balance.is_positive() {
        return current(0, "No outstanding balance.".to_string());
    }
    let Some(due_date) = due_date else {
        return current(0, "No due date set.".to_string());
    };

    let elapsed_secs = now.signed_duration_since(due_date).num_seconds();
    let days_overdue = (elapsed_secs + SECONDS_PER_DAY - 1).div_euclid(SECONDS_PER_DAY);

    if days_overdue <= 0 {
        let message = if days_overdue == 0 {
            "Due today.".to_string()
        } else {
            format!("Due in {} day(s).", -days_overdue)
        };
        return current(days_overdue, message);
    }

    let (tier, urgency) = match days_overdue {
        1 => (OverdueTier::OneDay, Urgency::Low),
        2..=7 => (OverdueTier::SevenDays, Urgency::Low),
        8..=15 => (OverdueTier::FifteenDays, Urgency::Medium),
        16..=30 => (OverdueTier::ThirtyDays, Urgency::High),
        31..=60 => (OverdueTier::SixtyDays, Urgency::Critical),
        _ => (OverdueTier::NinetyDays, Urgency::Severe),
    };

    let message = match tier {
        OverdueTier::OneDay => "Payment is 1 day overdue.".to_string(),
        OverdueTier::SevenDays => format!("Payment is {days_overdue} days overdue."),
        OverdueTier::FifteenDays => {
            format!("Payment is {days_overdue} days overdue. A reminder is recommended.")
        }
        OverdueTier::ThirtyDays => {
            format!("Payment is {days_overdue} days overdue. Escalation is recommended.")
        }
        OverdueTier::SixtyDays => {
            format!("Payment is {days_overdue} days overdue. Immediate follow-up is required.")
        }
        OverdueTier::NinetyDays | OverdueTier::Current => {
            format!("Payment is {days_overdue} days overdue. Consider collections.")
        }
    };

    OverdueStatus {
        is_overdue: true,
        days_overdue,
        tier,
        urgency,
        message,
        allow_payment: true,
    }
}

fn current(days_overdue: i64, message: String) -> OverdueStatus {
    OverdueStatus {
        is_overdue: false,
        days_overdue,
        tier: OverdueTier::Current,
        urgency: Urgency::None,
        message,
        allow_payment: true,
    }
}

impl Invoice {
    pub fn overdue_status(&self, now: DateTime<Utc>) -> OverdueStatus {
        classify(self.due_date, self.balance_amount, now)
    }
}
