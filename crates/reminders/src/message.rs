use chrono::{DateTime, Utc};

use fieldbill_core::Money;
use fieldbill_invoicing::ReminderType;

/// Everything a reminder template needs about the invoice and its customer.
///
/// `days_overdue` comes from the overdue classifier and is only read by the
/// overdue and final-notice templates.
#[derive(Debug, Clone)]
pub struct ReminderContext {
    pub customer_name: String,
    pub company_name: String,
    pub invoice_number: String,
    pub amount_due: Money,
    pub due_date: Option<DateTime<Utc>>,
    pub days_overdue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

pub fn compose_email(reminder_type: ReminderType, ctx: &ReminderContext) -> EmailContent {
    let ReminderContext {
        customer_name,
        company_name,
        invoice_number,
        amount_due,
        days_overdue,
        ..
    } = ctx;

    match reminder_type {
        ReminderType::Upcoming => EmailContent {
            subject: format!("Upcoming payment reminder: invoice {invoice_number}"),
            body: format!(
                "Hi {customer_name},\n\nThis is a friendly reminder that invoice \
                 {invoice_number} for {amount_due} is due {}.\n\nThank you,\n{company_name}",
                due_phrase(ctx)
            ),
        },
        ReminderType::DueToday => EmailContent {
            subject: format!("Payment due today: invoice {invoice_number}"),
            body: format!(
                "Hi {customer_name},\n\nInvoice {invoice_number} for {amount_due} is due \
                 today.\n\nThank you,\n{company_name}"
            ),
        },
        ReminderType::Overdue => EmailContent {
            subject: format!("Overdue notice: invoice {invoice_number}"),
            body: format!(
                "Hi {customer_name},\n\nInvoice {invoice_number} for {amount_due} is \
                 {days_overdue} day(s) past due. Please submit payment at your earliest \
                 convenience.\n\nThank you,\n{company_name}"
            ),
        },
        ReminderType::FinalNotice => EmailContent {
            subject: format!("Final notice: invoice {invoice_number}"),
            body: format!(
                "Hi {customer_name},\n\nThis is a final notice for invoice {invoice_number}. \
                 The balance of {amount_due} is {days_overdue} day(s) past due. Please \
                 contact us immediately to arrange payment.\n\n{company_name}"
            ),
        },
    }
}

/// SMS bodies stay under the 160-character single-segment limit for typical
/// inputs; carriers split longer company or customer names.
pub fn compose_sms(reminder_type: ReminderType, ctx: &ReminderContext) -> String {
    let ReminderContext {
        company_name,
        invoice_number,
        amount_due,
        days_overdue,
        ..
    } = ctx;

    match reminder_type {
        ReminderType::Upcoming => format!(
            "{company_name}: Reminder, invoice {invoice_number} for {amount_due} is due {}.",
            due_phrase(ctx)
        ),
        ReminderType::DueToday => {
            format!("{company_name}: Invoice {invoice_number} for {amount_due} is due today.")
        }
        ReminderType::Overdue => format!(
            "{company_name}: Invoice {invoice_number} for {amount_due} is {days_overdue} \
             day(s) overdue. Please call us to arrange payment."
        ),
        ReminderType::FinalNotice => format!(
            "{company_name}: FINAL NOTICE for invoice {invoice_number}. {amount_due} is \
             {days_overdue} day(s) overdue."
        ),
    }
}

fn due_phrase(ctx: &ReminderContext) -> String {
    match ctx.due_date {
        Some(due) => format!("on {}", due.format("%B %d, %Y")),
        None => "soon".to_string(),
    }
}
