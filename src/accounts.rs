//! Account lookup, creation and counter reconciliation. Every counter
//! mutation is a single atomic UPDATE so concurrent dispatch tasks and
//! webhook reconciliation cannot lose updates when they race on one account.

use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::domain::account::Account;
use crate::domain::recipient::Recipient;
use crate::domain::recipient_email::RecipientEmail;
use crate::domain::recipient_name::RecipientName;
use crate::domain::tier::Tier;

const ACCOUNT_COLUMNS: &str = "id, email, name, tier, send_limit, sent_count, delivered_count, \
     opened_count, clicked_count, last_sent_at, last_opened_at, last_clicked_at, subscribed";

fn map_account(row: PgRow) -> Account {
    Account {
        id: row.get("id"),
        email: RecipientEmail::parse(row.get("email")).unwrap(),
        name: RecipientName::parse(row.get("name")).unwrap(),
        tier: Tier::parse(row.get("tier")).unwrap(),
        send_limit: row.get("send_limit"),
        sent_count: row.get("sent_count"),
        delivered_count: row.get("delivered_count"),
        opened_count: row.get("opened_count"),
        clicked_count: row.get("clicked_count"),
        last_sent_at: row.get("last_sent_at"),
        last_opened_at: row.get("last_opened_at"),
        last_clicked_at: row.get("last_clicked_at"),
        subscribed: row.get("subscribed"),
    }
}

#[tracing::instrument(name = "Fetch an account by email", skip(db_pool))]
pub async fn get_account_by_email(
    db_pool: &PgPool,
    email: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {} FROM accounts WHERE email = $1",
        ACCOUNT_COLUMNS
    ))
    .bind(email)
    .map(map_account)
    .fetch_optional(db_pool)
    .await
    .map_err(|err| {
        tracing::error!("Failed to execute query: {:?}", err);
        err
    })
}

#[tracing::instrument(
    name = "Insert a new account",
    skip(db_pool, name, email),
    fields(account_email = %email.as_ref())
)]
pub async fn insert_account(
    db_pool: &PgPool,
    name: &RecipientName,
    email: &RecipientEmail,
    tier: Tier,
    send_limit: i32,
) -> Result<Account, sqlx::Error> {
    sqlx::query(&format!(
        r#"
        INSERT INTO accounts (id, email, name, tier, send_limit, subscribed, created_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(email.as_ref())
    .bind(name.as_ref())
    .bind(tier.as_ref())
    .bind(send_limit)
    .bind(Utc::now())
    .map(map_account)
    .fetch_one(db_pool)
    .await
}

/// Recipients become accounts on their first appearance in a batch. Existing
/// accounts are left untouched.
#[tracing::instrument(
    name = "Ensure a recipient account exists",
    skip(db_pool, recipient),
    fields(recipient_email = %recipient.email.as_ref())
)]
pub async fn ensure_recipient_account(
    db_pool: &PgPool,
    recipient: &Recipient,
    free_limit: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO accounts (id, email, name, tier, send_limit, subscribed, created_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(recipient.email.as_ref())
    .bind(recipient.name.as_ref())
    .bind(Tier::Free.as_ref())
    .bind(free_limit)
    .bind(Utc::now())
    .execute(db_pool)
    .await
    .map_err(|err| {
        tracing::error!("Failed to execute query: {:?}", err);
        err
    })?;

    Ok(())
}

#[tracing::instrument(name = "Record an email open", skip(db_pool))]
pub async fn record_open(db_pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE accounts SET opened_count = opened_count + 1, last_opened_at = $2 WHERE email = $1",
    )
    .bind(email)
    .bind(Utc::now())
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(name = "Record an email click", skip(db_pool))]
pub async fn record_click(db_pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE accounts SET clicked_count = clicked_count + 1, last_clicked_at = $2 WHERE email = $1",
    )
    .bind(email)
    .bind(Utc::now())
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(name = "Record a provider delivery", skip(db_pool))]
pub async fn record_delivery(db_pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE accounts SET delivered_count = delivered_count + 1 WHERE email = $1")
        .bind(email)
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(name = "Unsubscribe an account", skip(db_pool))]
pub async fn unsubscribe(db_pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE accounts SET subscribed = FALSE WHERE email = $1")
        .bind(email)
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Applies a billing-driven plan change. `sent_count` is clamped to the new
/// limit in the same statement: a downgrade must not leave the account
/// permanently over quota, at the cost of erasing part of the send history
/// evidence (a known trade-off of this policy).
#[tracing::instrument(name = "Apply a plan change", skip(db_pool))]
pub async fn apply_plan_change(
    db_pool: &PgPool,
    email: &str,
    tier: Tier,
    new_limit: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET tier = $2, send_limit = $3, sent_count = LEAST(sent_count, $3)
        WHERE email = $1
        "#,
    )
    .bind(email)
    .bind(tier.as_ref())
    .bind(new_limit)
    .execute(db_pool)
    .await
    .map_err(|err| {
        tracing::error!("Failed to execute query: {:?}", err);
        err
    })?;

    Ok(result.rows_affected() > 0)
}
