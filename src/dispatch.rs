//! Per-recipient dispatch: placeholder substitution, tracking markers, and
//! the claim-then-send transaction that keeps `sent_count` and the send
//! ledger consistent.

use chrono::Utc;
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;

use crate::accounts;
use crate::domain::recipient::Recipient;
use crate::domain::send_status::SendStatus;
use crate::email_client::EmailClient;
use crate::fingerprint::content_fingerprint;
use crate::ledger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dispatched,
    SkippedDuplicate,
    SkippedQuota,
    Failed,
}

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("Failed to read or update dispatch state.")]
    Persistence(#[from] sqlx::Error),
    #[error("Failed to build a tracking URL.")]
    TrackingUrl(#[from] url::ParseError),
}

/// Everything a dispatch task needs besides the recipient. Owned so that
/// scheduled tasks can move a clone into their `'static` future.
#[derive(Clone)]
pub struct CampaignContext {
    pub sender_account_id: Uuid,
    pub subject: String,
    pub content: String,
    pub link_url: String,
    /// Send limit given to recipient accounts created on first appearance.
    pub recipient_free_limit: i32,
}

/// Substitutes the first `{{name}}` occurrence, verbatim and unescaped. When
/// the placeholder is absent the body goes out untouched, placeholder-free
/// content being the common case.
pub fn personalize(content: &str, name: &str) -> String {
    content.replacen("{{name}}", name, 1)
}

/// Appends the two per-recipient tracking markers: a hidden 1x1 image hitting
/// the open pixel and a link routed through the click redirect, both carrying
/// the recipient address as a query parameter.
pub fn build_tracked_body(
    base_url: &str,
    personalized: &str,
    recipient_email: &str,
    link_url: &str,
) -> Result<String, url::ParseError> {
    let open_url = Url::parse_with_params(
        &format!("{}/track-open", base_url),
        &[("email", recipient_email)],
    )?;
    let click_url = Url::parse_with_params(
        &format!("{}/track-click", base_url),
        &[("email", recipient_email), ("url", link_url)],
    )?;

    Ok(format!(
        r#"{}
<img src="{}" alt="" width="1" height="1" style="display: none;" />
<p><a href="{}" target="_blank">Click here</a> to visit our website.</p>"#,
        personalized, open_url, click_url
    ))
}

/// Dispatches one recipient. The returned outcome never aborts sibling sends:
/// duplicates, exhausted quota and transmission failures are all recorded in
/// the ledger and reported back as part of the batch summary.
#[tracing::instrument(
    name = "Dispatch a campaign email to one recipient",
    skip(db_pool, email_client, base_url, context, recipient),
    fields(recipient_email = %recipient.email.as_ref())
)]
pub async fn dispatch_to_recipient(
    db_pool: &PgPool,
    email_client: &EmailClient,
    base_url: &str,
    context: &CampaignContext,
    recipient: &Recipient,
) -> Result<DispatchOutcome, DispatchError> {
    let fingerprint = content_fingerprint(&context.content, recipient.email.as_ref());

    accounts::ensure_recipient_account(db_pool, recipient, context.recipient_free_limit).await?;

    if ledger::has_sent(
        db_pool,
        context.sender_account_id,
        recipient.email.as_ref(),
        &fingerprint,
    )
    .await?
    {
        ledger::record(
            db_pool,
            context.sender_account_id,
            recipient.email.as_ref(),
            &fingerprint,
            SendStatus::SkippedDuplicate,
            None,
        )
        .await?;
        tracing::info!(
            "This content was already sent to {}, skipping",
            recipient.email.as_ref()
        );
        return Ok(DispatchOutcome::SkippedDuplicate);
    }

    let personalized = personalize(&context.content, recipient.name.as_ref());
    let html_body = build_tracked_body(
        base_url,
        &personalized,
        recipient.email.as_ref(),
        &context.link_url,
    )?;

    // Claim one quota unit before contacting the provider. The guard keeps
    // sent_count <= send_limit even when concurrent batches race on the same
    // account; rolling back on transmit failure releases the claim, and the
    // ledger record commits atomically with the counter increment.
    let mut transaction = db_pool.begin().await?;
    let claimed = sqlx::query(
        r#"
        UPDATE accounts
        SET sent_count = sent_count + 1, last_sent_at = $2
        WHERE id = $1 AND sent_count < send_limit
        RETURNING sent_count
        "#,
    )
    .bind(context.sender_account_id)
    .bind(Utc::now())
    .fetch_optional(&mut transaction)
    .await?;

    if claimed.is_none() {
        transaction.rollback().await?;
        ledger::record(
            db_pool,
            context.sender_account_id,
            recipient.email.as_ref(),
            &fingerprint,
            SendStatus::SkippedQuota,
            None,
        )
        .await?;
        tracing::warn!(
            "Send limit exhausted before dispatching to {}",
            recipient.email.as_ref()
        );
        return Ok(DispatchOutcome::SkippedQuota);
    }

    if let Err(err) = email_client
        .send_email(&recipient.email, &context.subject, &html_body)
        .await
    {
        tracing::error!(
            "Failed to send an email to {}: {:?}",
            recipient.email.as_ref(),
            err
        );
        transaction.rollback().await?;
        ledger::record(
            db_pool,
            context.sender_account_id,
            recipient.email.as_ref(),
            &fingerprint,
            SendStatus::Failed,
            None,
        )
        .await?;
        return Ok(DispatchOutcome::Failed);
    }

    ledger::record(
        &mut transaction,
        context.sender_account_id,
        recipient.email.as_ref(),
        &fingerprint,
        SendStatus::Dispatched,
        Some(Utc::now()),
    )
    .await?;
    transaction.commit().await?;

    Ok(DispatchOutcome::Dispatched)
}
