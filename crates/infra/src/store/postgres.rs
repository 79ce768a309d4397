//! Postgres-backed invoice store.
//!
//! Persists each invoice as a current-state jsonb document plus a handful of
//! indexed columns (`status`, `due_date`, `balance_amount`, archival stamps)
//! so the candidate queries can filter in SQL. Payments are append-only rows;
//! document numbers come from a per-tenant upsert-increment on
//! `document_sequences`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `VersionConflict` | Duplicate payment or concurrent writer |
//! | Database (other) | Any other | `Backend` | Constraint or query failure |
//! | PoolClosed / RowNotFound / Other | N/A | `Backend` | Pool shutdown, network failures |
//!
//! ## Concurrency
//!
//! `save_invoice` runs in a transaction: it locks the row (`FOR UPDATE`),
//! compares the stored version against `ExpectedVersion`, then upserts. Two
//! writers racing on the same invoice serialize on the row lock; the loser
//! fails the version check and surfaces `VersionConflict` for the caller to
//! retry.
//!
//! ## Thread Safety
//!
//! `PostgresInvoiceStore` is `Send + Sync`; all operations go through the
//! SQLx connection pool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::{instrument, Span};

use fieldbill_core::{ExpectedVersion, InvoiceId, TenantId};
use fieldbill_invoicing::{Invoice, Payment};
use fieldbill_reminders::DueDateWindow;

use super::r#trait::{InvoiceStore, StoreError};

/// Expected schema:
///
/// - `invoices (tenant_id uuid, invoice_id uuid, invoice_number text,
///   customer_id uuid, status text, due_date timestamptz, balance_amount
///   bigint, deleted_at timestamptz, permanent_delete_scheduled_at
///   timestamptz, state jsonb, version bigint, updated_at timestamptz,
///   PRIMARY KEY (tenant_id, invoice_id))`
/// - `payments (payment_id uuid PRIMARY KEY, tenant_id uuid, invoice_id uuid,
///   customer_id uuid, payment_number text, amount bigint, method text,
///   reference text, notes text, status text, processed_at timestamptz,
///   UNIQUE (tenant_id, payment_number))`
/// - `document_sequences (tenant_id uuid, kind text, last_value bigint,
///   PRIMARY KEY (tenant_id, kind))`
#[derive(Debug, Clone)]
pub struct PostgresInvoiceStore {
    pool: Arc<PgPool>,
}

impl PostgresInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(
        skip(self),
        fields(
            tenant_id = %tenant_id.as_uuid(),
            invoice_id = %invoice_id.as_uuid(),
            version = tracing::field::Empty
        ),
        err
    )]
    pub async fn load_invoice(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Invoice, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT state, version
            FROM invoices
            WHERE tenant_id = $1 AND invoice_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(invoice_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_invoice", e))?;

        let Some(row) = row else {
            return Err(StoreError::NotFound);
        };
        let row = InvoiceRow::from_row(&row)
            .map_err(|e| StoreError::Serialization(format!("failed to read invoice row: {e}")))?;

        Span::current().record("version", row.version);
        decode_state(row.state)
    }

    /// Upsert the invoice under the optimistic version check.
    ///
    /// The row lock makes check-then-write atomic; a concurrent writer that
    /// committed first leaves a version the check rejects.
    #[instrument(
        skip(self, invoice),
        fields(
            tenant_id = %invoice.tenant_id().as_uuid(),
            invoice_id = %invoice.id().as_uuid(),
            expected_version = ?expected_version,
            version = invoice.version()
        ),
        err
    )]
    pub async fn save_invoice(
        &self,
        invoice: &Invoice,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let state = serde_json::to_value(invoice).map_err(|e| {
            StoreError::Serialization(format!("failed to serialize invoice state: {e}"))
        })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            SELECT version
            FROM invoices
            WHERE tenant_id = $1 AND invoice_id = $2
            FOR UPDATE
            "#,
        )
        .bind(invoice.tenant_id().as_uuid())
        .bind(invoice.id().as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("check_invoice_version", e))?;

        let current_version = match row {
            Some(row) => {
                let version: i64 = row.try_get("version").map_err(|e| {
                    StoreError::Serialization(format!("failed to read version: {e}"))
                })?;
                version as u64
            }
            None => 0,
        };

        if !expected_version.matches(current_version) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::VersionConflict(format!(
                "expected {expected_version:?}, found {current_version}"
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO invoices (
                tenant_id,
                invoice_id,
                invoice_number,
                customer_id,
                status,
                due_date,
                balance_amount,
                deleted_at,
                permanent_delete_scheduled_at,
                state,
                version,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (tenant_id, invoice_id)
            DO UPDATE SET
                invoice_number = EXCLUDED.invoice_number,
                customer_id = EXCLUDED.customer_id,
                status = EXCLUDED.status,
                due_date = EXCLUDED.due_date,
                balance_amount = EXCLUDED.balance_amount,
                deleted_at = EXCLUDED.deleted_at,
                permanent_delete_scheduled_at = EXCLUDED.permanent_delete_scheduled_at,
                state = EXCLUDED.state,
                version = EXCLUDED.version,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(invoice.tenant_id().as_uuid())
        .bind(invoice.id().as_uuid())
        .bind(invoice.invoice_number())
        .bind(invoice.customer_id().as_uuid())
        .bind(invoice.status().as_str())
        .bind(invoice.due_date())
        .bind(invoice.balance_amount().minor_units())
        .bind(invoice.deleted_at())
        .bind(invoice.permanent_delete_scheduled_at())
        .bind(&state)
        .bind(invoice.version() as i64)
        .bind(invoice.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("save_invoice", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(
        skip(self, payment),
        fields(
            tenant_id = %payment.tenant_id.as_uuid(),
            invoice_id = %payment.invoice_id.as_uuid(),
            payment_number = %payment.payment_number
        ),
        err
    )]
    pub async fn insert_payment_record(&self, payment: &Payment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id,
                tenant_id,
                invoice_id,
                customer_id,
                payment_number,
                amount,
                method,
                reference,
                notes,
                status,
                processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.tenant_id.as_uuid())
        .bind(payment.invoice_id.as_uuid())
        .bind(payment.customer_id.as_uuid())
        .bind(&payment.payment_number)
        .bind(payment.amount.minor_units())
        .bind(payment.method.as_str())
        .bind(payment.reference.as_deref())
        .bind(payment.notes.as_deref())
        .bind(payment.status.as_str())
        .bind(payment.processed_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_payment", e))?;

        Ok(())
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id.as_uuid(), candidate_count = tracing::field::Empty),
        err
    )]
    pub async fn reminder_candidates(
        &self,
        tenant_id: TenantId,
        window: DueDateWindow,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT state, version
            FROM invoices
            WHERE tenant_id = $1
                AND status = 'sent'
                AND deleted_at IS NULL
                AND balance_amount > 0
                AND due_date IS NOT NULL
                AND ($2::timestamptz IS NULL OR due_date >= $2)
                AND ($3::timestamptz IS NULL OR due_date < $3)
            ORDER BY due_date ASC
            LIMIT $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(window.after)
        .bind(window.before)
        .bind(limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reminder_candidates", e))?;

        let invoices = decode_rows(rows)?;
        Span::current().record("candidate_count", invoices.len());
        Ok(invoices)
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id.as_uuid(), candidate_count = tracing::field::Empty),
        err
    )]
    pub async fn overdue_candidates(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT state, version
            FROM invoices
            WHERE tenant_id = $1
                AND status IN ('sent', 'viewed', 'partial')
                AND deleted_at IS NULL
                AND balance_amount > 0
                AND due_date IS NOT NULL
                AND due_date < $2
            ORDER BY due_date ASC
            LIMIT $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("overdue_candidates", e))?;

        let invoices = decode_rows(rows)?;
        Span::current().record("candidate_count", invoices.len());
        Ok(invoices)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid()), err)]
    pub async fn purge_candidates(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT state, version
            FROM invoices
            WHERE tenant_id = $1
                AND deleted_at IS NOT NULL
                AND permanent_delete_scheduled_at <= $2
            ORDER BY permanent_delete_scheduled_at ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(now)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("purge_candidates", e))?;

        decode_rows(rows)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid(), kind), err)]
    async fn next_sequence(
        &self,
        tenant_id: TenantId,
        kind: &'static str,
    ) -> Result<u64, StoreError> {
        // The upsert takes the row lock, so concurrent callers serialize and
        // each observes a distinct value.
        let row = sqlx::query(
            r#"
            INSERT INTO document_sequences (tenant_id, kind, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, kind)
            DO UPDATE SET last_value = document_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(kind)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("next_sequence", e))?;

        let value: i64 = row
            .try_get("last_value")
            .map_err(|e| StoreError::Serialization(format!("failed to read last_value: {e}")))?;
        Ok(value as u64)
    }
}

fn decode_state(state: serde_json::Value) -> Result<Invoice, StoreError> {
    serde_json::from_value(state)
        .map_err(|e| StoreError::Serialization(format!("failed to deserialize invoice state: {e}")))
}

fn decode_rows(rows: Vec<sqlx::postgres::PgRow>) -> Result<Vec<Invoice>, StoreError> {
    let mut invoices = Vec::with_capacity(rows.len());
    for row in rows {
        let row = InvoiceRow::from_row(&row)
            .map_err(|e| StoreError::Serialization(format!("failed to read invoice row: {e}")))?;
        invoices.push(decode_state(row.state)?);
    }
    Ok(invoices)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: a concurrent writer got there first.
                Some("23505") => StoreError::VersionConflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

#[derive(Debug)]
struct InvoiceRow {
    state: serde_json::Value,
    version: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for InvoiceRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(InvoiceRow {
            state: row.try_get("state")?,
            version: row.try_get("version")?,
        })
    }
}

// The InvoiceStore trait is synchronous, but Postgres operations require
// async. We use tokio::runtime::Handle to run async code in a sync context;
// this works when called from within a tokio runtime.

fn runtime_handle() -> Result<tokio::runtime::Handle, StoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Backend(
            "PostgresInvoiceStore requires an async runtime (tokio); ensure you're calling \
             from within a tokio runtime context"
                .to_string(),
        )
    })
}

impl InvoiceStore for PostgresInvoiceStore {
    fn load(&self, tenant_id: TenantId, invoice_id: InvoiceId) -> Result<Invoice, StoreError> {
        runtime_handle()?.block_on(self.load_invoice(tenant_id, invoice_id))
    }

    fn save(
        &self,
        invoice: &Invoice,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        runtime_handle()?.block_on(self.save_invoice(invoice, expected_version))
    }

    fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        runtime_handle()?.block_on(self.insert_payment_record(payment))
    }

    fn find_reminder_candidates(
        &self,
        tenant_id: TenantId,
        window: DueDateWindow,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError> {
        runtime_handle()?.block_on(self.reminder_candidates(tenant_id, window, limit))
    }

    fn find_overdue_candidates(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Invoice>, StoreError> {
        runtime_handle()?.block_on(self.overdue_candidates(tenant_id, now, limit))
    }

    fn find_purge_due(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, StoreError> {
        runtime_handle()?.block_on(self.purge_candidates(tenant_id, now))
    }

    fn next_invoice_number(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        runtime_handle()?.block_on(self.next_sequence(tenant_id, "invoice"))
    }

    fn next_payment_number(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        runtime_handle()?.block_on(self.next_sequence(tenant_id, "payment"))
    }
}
