//! Outbound delivery seams (email, SMS) and customer contact lookup.
//!
//! Invoice delivery and reminders reach customers through the [`EmailSender`]
//! and [`SmsSender`] traits so the service layer never couples to a concrete
//! provider. Production wires these to a transactional email API and an SMS
//! gateway; tests use the recording doubles in this module.
//!
//! Delivery failure is data, not an error: senders return a
//! [`DeliveryReceipt`] describing whether the provider accepted the message.
//! The service layer decides what a rejected receipt means for the operation
//! in flight (for invoice delivery it is non-fatal; for a reminder it makes
//! that item count as failed).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use fieldbill_core::{CustomerId, TenantId};

/// Outcome of handing a message to a delivery provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Whether the provider accepted the message for delivery.
    pub accepted: bool,
    /// Provider-assigned message identifier, when accepted.
    pub provider_id: Option<String>,
    /// Provider error description, when rejected.
    pub error: Option<String>,
}

impl DeliveryReceipt {
    pub fn accepted(provider_id: impl Into<String>) -> Self {
        Self {
            accepted: true,
            provider_id: Some(provider_id.into()),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            accepted: false,
            provider_id: None,
            error: Some(error.into()),
        }
    }
}

/// Email delivery seam.
pub trait EmailSender: Send + Sync {
    /// Hand a rendered email to the provider.
    ///
    /// `tags` carry provider-side metadata (invoice id, reminder type) for
    /// delivery tracking; providers without tagging support ignore them.
    fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        tags: &[(String, String)],
    ) -> DeliveryReceipt;
}

impl<S> EmailSender for Arc<S>
where
    S: EmailSender + ?Sized,
{
    fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        tags: &[(String, String)],
    ) -> DeliveryReceipt {
        (**self).send_email(to, subject, body, tags)
    }
}

/// SMS delivery seam.
pub trait SmsSender: Send + Sync {
    /// Hand an SMS body to the gateway.
    ///
    /// `tenant_id` selects the sending number when tenants have dedicated
    /// numbers provisioned.
    fn send_sms(&self, tenant_id: TenantId, to: &str, body: &str) -> DeliveryReceipt;
}

impl<S> SmsSender for Arc<S>
where
    S: SmsSender + ?Sized,
{
    fn send_sms(&self, tenant_id: TenantId, to: &str, body: &str) -> DeliveryReceipt {
        (**self).send_sms(tenant_id, to, body)
    }
}

/// Contact details for one customer, as needed by message composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Lookup seam for the customer and company data messages are composed from.
///
/// Customers and company profiles live outside this engine; the service layer
/// only needs names and reachable addresses. Lookups that miss return `None`
/// and the caller decides whether that fails the operation.
pub trait CustomerDirectory: Send + Sync {
    fn customer(&self, tenant_id: TenantId, customer_id: CustomerId) -> Option<CustomerContact>;

    /// Display name of the tenant's company, used in message signatures.
    fn company_name(&self, tenant_id: TenantId) -> Option<String>;
}

impl<D> CustomerDirectory for Arc<D>
where
    D: CustomerDirectory + ?Sized,
{
    fn customer(&self, tenant_id: TenantId, customer_id: CustomerId) -> Option<CustomerContact> {
        (**self).customer(tenant_id, customer_id)
    }

    fn company_name(&self, tenant_id: TenantId) -> Option<String> {
        (**self).company_name(tenant_id)
    }
}

/// In-memory directory for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    customers: RwLock<HashMap<(TenantId, CustomerId), CustomerContact>>,
    companies: RwLock<HashMap<TenantId, String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_customer(
        &self,
        tenant_id: TenantId,
        customer_id: CustomerId,
        contact: CustomerContact,
    ) {
        if let Ok(mut customers) = self.customers.write() {
            customers.insert((tenant_id, customer_id), contact);
        }
    }

    pub fn put_company(&self, tenant_id: TenantId, name: impl Into<String>) {
        if let Ok(mut companies) = self.companies.write() {
            companies.insert(tenant_id, name.into());
        }
    }
}

impl CustomerDirectory for InMemoryDirectory {
    fn customer(&self, tenant_id: TenantId, customer_id: CustomerId) -> Option<CustomerContact> {
        self.customers
            .read()
            .ok()
            .and_then(|customers| customers.get(&(tenant_id, customer_id)).cloned())
    }

    fn company_name(&self, tenant_id: TenantId) -> Option<String> {
        self.companies
            .read()
            .ok()
            .and_then(|companies| companies.get(&tenant_id).cloned())
    }
}

/// Email captured by [`RecordingEmailSender`].
#[derive(Debug, Clone)]
pub struct RecordedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub tags: Vec<(String, String)>,
}

/// Email sender that records every accepted message in memory.
///
/// Intended for tests and local development. Delivery failure can be injected
/// per recipient with [`reject_recipient`](Self::reject_recipient).
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    sent: RwLock<Vec<RecordedEmail>>,
    rejected_recipients: RwLock<Vec<String>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future send to `to` come back rejected.
    pub fn reject_recipient(&self, to: impl Into<String>) {
        if let Ok(mut rejected) = self.rejected_recipients.write() {
            rejected.push(to.into());
        }
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<RecordedEmail> {
        self.sent
            .read()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl EmailSender for RecordingEmailSender {
    fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        tags: &[(String, String)],
    ) -> DeliveryReceipt {
        let rejected = self
            .rejected_recipients
            .read()
            .map(|rejected| rejected.iter().any(|r| r == to))
            .unwrap_or(true);
        if rejected {
            return DeliveryReceipt::rejected(format!("delivery to {to} rejected"));
        }

        match self.sent.write() {
            Ok(mut sent) => {
                sent.push(RecordedEmail {
                    to: to.to_string(),
                    subject: subject.to_string(),
                    body: body.to_string(),
                    tags: tags.to_vec(),
                });
                DeliveryReceipt::accepted(format!("email-{}", sent.len()))
            }
            Err(_) => DeliveryReceipt::rejected("sender lock poisoned"),
        }
    }
}

/// SMS captured by [`RecordingSmsSender`].
#[derive(Debug, Clone)]
pub struct RecordedSms {
    pub tenant_id: TenantId,
    pub to: String,
    pub body: String,
}

/// SMS sender counterpart of [`RecordingEmailSender`].
#[derive(Debug, Default)]
pub struct RecordingSmsSender {
    sent: RwLock<Vec<RecordedSms>>,
    rejected_recipients: RwLock<Vec<String>>,
}

impl RecordingSmsSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_recipient(&self, to: impl Into<String>) {
        if let Ok(mut rejected) = self.rejected_recipients.write() {
            rejected.push(to.into());
        }
    }

    pub fn sent(&self) -> Vec<RecordedSms> {
        self.sent
            .read()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl SmsSender for RecordingSmsSender {
    fn send_sms(&self, tenant_id: TenantId, to: &str, body: &str) -> DeliveryReceipt {
        let rejected = self
            .rejected_recipients
            .read()
            .map(|rejected| rejected.iter().any(|r| r == to))
            .unwrap_or(true);
        if rejected {
            return DeliveryReceipt::rejected(format!("delivery to {to} rejected"));
        }

        match self.sent.write() {
            Ok(mut sent) => {
                sent.push(RecordedSms {
                    tenant_id,
                    to: to.to_string(),
                    body: body.to_string(),
                });
                DeliveryReceipt::accepted(format!("sms-{}", sent.len()))
            }
            Err(_) => DeliveryReceipt::rejected("sender lock poisoned"),
        }
    }
}
