use actix_web::{web, HttpResponse, ResponseError};
use chrono::Utc;
use reqwest::StatusCode;
use sqlx::PgPool;

use crate::{
    accounts,
    dispatch::{self, CampaignContext, DispatchOutcome},
    domain::campaign::{CampaignRequest, NewCampaignBody},
    domain::send_status::SendStatus,
    email_client::EmailClient,
    fingerprint::content_fingerprint,
    ledger,
    quota::{self, QuotaExceeded, QuotaSettings},
    scheduler::{parse_schedule, Scheduler, SchedulingError},
    startup::ApplicationBaseUrl,
};

#[derive(serde::Serialize, Default)]
pub struct BatchSummary {
    pub dispatched: usize,
    pub skipped_duplicate: usize,
    pub skipped_quota: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn count(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Dispatched => self.dispatched += 1,
            DispatchOutcome::SkippedDuplicate => self.skipped_duplicate += 1,
            DispatchOutcome::SkippedQuota => self.skipped_quota += 1,
            DispatchOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(thiserror::Error)]
pub enum CampaignError {
    #[error("{0}")]
    Validation(String),
    #[error("Sender account {0} does not exist.")]
    UnknownSender(String),
    #[error("Send limit reached. Please upgrade your plan to keep sending.")]
    QuotaExceeded(QuotaExceeded),
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
    #[error("Failed to read or update campaign state.")]
    Persistence(#[from] sqlx::Error),
}

impl std::fmt::Debug for CampaignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}

impl ResponseError for CampaignError {
    fn status_code(&self) -> StatusCode {
        match self {
            CampaignError::Validation(_) => StatusCode::BAD_REQUEST,
            CampaignError::UnknownSender(_) => StatusCode::NOT_FOUND,
            CampaignError::QuotaExceeded(_) => StatusCode::PAYMENT_REQUIRED,
            CampaignError::Scheduling(_) => StatusCode::BAD_REQUEST,
            CampaignError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            CampaignError::QuotaExceeded(quota_exceeded) => HttpResponse::build(self.status_code())
                .json(serde_json::json!({
                    "message": self.to_string(),
                    "checkout_url": quota_exceeded.checkout_url,
                    "sent_count": quota_exceeded.sent_count,
                    "send_limit": quota_exceeded.send_limit,
                })),
            _ => HttpResponse::build(self.status_code())
                .json(serde_json::json!({ "message": self.to_string() })),
        }
    }
}

/// Accepts a campaign, enforces the batch quota, then dispatches immediately
/// or defers one task per recipient. Per-recipient failures never abort the
/// batch; quota failures reject it before any dispatch.
#[tracing::instrument(
    name = "Publishing a campaign",
    skip(body, db_pool, email_client, base_url, quota_settings, scheduler),
    fields(
        sender_email = %body.sender_email,
        subject = %body.subject
    )
)]
pub async fn publish_campaign(
    body: web::Json<NewCampaignBody>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    quota_settings: web::Data<QuotaSettings>,
    scheduler: web::Data<Scheduler>,
) -> Result<HttpResponse, CampaignError> {
    let campaign: CampaignRequest = body.try_into().map_err(CampaignError::Validation)?;

    if campaign.recipients.valid.is_empty() {
        return Err(CampaignError::Validation(String::from(
            "No valid recipients provided.",
        )));
    }

    let sender = accounts::get_account_by_email(&db_pool, campaign.sender_email.as_ref())
        .await?
        .ok_or_else(|| CampaignError::UnknownSender(campaign.sender_email.as_ref().to_string()))?;

    quota::check_batch(&sender, campaign.recipients.valid.len(), &quota_settings)
        .map_err(CampaignError::QuotaExceeded)?;

    let context = CampaignContext {
        sender_account_id: sender.id,
        subject: campaign.subject.clone(),
        content: campaign.content.clone(),
        link_url: campaign.link_url.clone(),
        recipient_free_limit: quota_settings.free_limit,
    };

    if let Some(expression) = &campaign.schedule_at {
        let delay = parse_schedule(expression, Utc::now())?;

        for recipient in &campaign.recipients.valid {
            ledger::record(
                db_pool.get_ref(),
                sender.id,
                recipient.email.as_ref(),
                &content_fingerprint(&campaign.content, recipient.email.as_ref()),
                SendStatus::Scheduled,
                None,
            )
            .await?;
        }

        for recipient in campaign.recipients.valid.iter().cloned() {
            let db_pool = db_pool.get_ref().clone();
            let email_client = email_client.clone();
            let base_url = base_url.0.clone();
            let context = context.clone();

            scheduler.defer(delay, async move {
                let outcome = dispatch::dispatch_to_recipient(
                    &db_pool,
                    &email_client,
                    &base_url,
                    &context,
                    &recipient,
                )
                .await;

                if let Err(err) = outcome {
                    tracing::error!(
                        "Scheduled dispatch to {} failed: {:?}",
                        recipient.email.as_ref(),
                        err
                    );
                }
            });
        }

        return Ok(HttpResponse::Accepted().json(serde_json::json!({
            "message": "Campaign scheduled.",
            "scheduled": campaign.recipients.valid.len(),
            "invalid": campaign.recipients.invalid,
        })));
    }

    let mut summary = BatchSummary::default();

    for recipient in &campaign.recipients.valid {
        match dispatch::dispatch_to_recipient(
            &db_pool,
            &email_client,
            &base_url.0,
            &context,
            recipient,
        )
        .await
        {
            Ok(outcome) => summary.count(outcome),
            // Persistence failures stay isolated to their recipient too; the
            // outcome is logged and reported, siblings keep going.
            Err(err) => {
                tracing::error!(
                    "Dispatch to {} failed: {:?}",
                    recipient.email.as_ref(),
                    err
                );
                summary.count(DispatchOutcome::Failed);
            }
        }
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Campaign processed.",
        "summary": summary,
        "invalid": campaign.recipients.invalid,
    })))
}
