//! The send ledger: the durable record of every accepted send. Dedup checks
//! go against this table, never against a process-local cache, because a
//! scheduled send may be dispatched by a different process instance than the
//! one that accepted it.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::send_status::SendStatus;

/// Has this exact content already been dispatched to this recipient? The
/// dedup key is `(recipient, fingerprint)`: the same address with different
/// content is allowed through.
#[tracing::instrument(name = "Check the send ledger for a duplicate", skip(db_pool, fingerprint))]
pub async fn has_sent(
    db_pool: &PgPool,
    account_id: Uuid,
    recipient_email: &str,
    fingerprint: &str,
) -> Result<bool, sqlx::Error> {
    let existing = sqlx::query(
        r#"
        SELECT id FROM send_records
        WHERE account_id = $1
          AND recipient_email = $2
          AND content_fingerprint = $3
          AND status = 'dispatched'
        "#,
    )
    .bind(account_id)
    .bind(recipient_email)
    .bind(fingerprint)
    .fetch_optional(db_pool)
    .await
    .map_err(|err| {
        tracing::error!("Failed to execute query: {:?}", err);
        err
    })?;

    Ok(existing.is_some())
}

/// Appends one SendRecord. Takes any executor so dispatch can write the
/// `dispatched` record inside the same transaction as its counter increment.
#[tracing::instrument(
    name = "Append a send record",
    skip(executor, fingerprint),
    fields(status = %status.as_ref())
)]
pub async fn record<'c, E>(
    executor: E,
    account_id: Uuid,
    recipient_email: &str,
    fingerprint: &str,
    status: SendStatus,
    dispatched_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'c>,
{
    sqlx::query(
        r#"
        INSERT INTO send_records
            (id, account_id, recipient_email, content_fingerprint, status, created_at, dispatched_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account_id)
    .bind(recipient_email)
    .bind(fingerprint)
    .bind(status.as_ref())
    .bind(Utc::now())
    .bind(dispatched_at)
    .execute(executor)
    .await
    .map_err(|err| {
        tracing::error!("Failed to execute query: {:?}", err);
        err
    })?;

    Ok(())
}
