use actix_web::{
    web::{self, Query},
    HttpResponse, Responder,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::accounts;
use crate::domain::recipient_email::RecipientEmail;
use crate::domain::recipient_name::RecipientName;
use crate::domain::tier::Tier;
use crate::quota::QuotaSettings;

#[derive(Deserialize, Debug)]
pub struct NewAccountBody {
    pub name: String,
    pub email: String,
}

/// Signup, minus credentials (credential issuance lives with an external
/// collaborator). New accounts start on the free tier with the configured
/// free limit.
#[tracing::instrument(
    name = "Creating a new account",
    skip(body, db_pool, quota_settings),
    fields(
        account_email = %body.email,
        account_name = %body.name
    )
)]
pub async fn handle_create_account(
    body: web::Json<NewAccountBody>,
    db_pool: web::Data<PgPool>,
    quota_settings: web::Data<QuotaSettings>,
) -> impl Responder {
    let name = match RecipientName::parse(body.name.clone()) {
        Ok(name) => name,
        Err(err) => {
            tracing::error!("Validation error: {:?}", err);
            return HttpResponse::BadRequest().json(serde_json::json!({ "message": err }));
        }
    };
    let email = match RecipientEmail::parse(body.email.clone()) {
        Ok(email) => email,
        Err(err) => {
            tracing::error!("Validation error: {:?}", err);
            return HttpResponse::BadRequest().json(serde_json::json!({ "message": err }));
        }
    };

    match accounts::insert_account(&db_pool, &name, &email, Tier::Free, quota_settings.free_limit)
        .await
    {
        Ok(account) => HttpResponse::Created().json(serde_json::json!({
            "email": account.email,
            "name": account.name,
            "tier": account.tier,
            "send_limit": account.send_limit,
        })),
        Err(err) if is_unique_violation(&err) => {
            HttpResponse::Conflict().json(serde_json::json!({ "message": "Account already exists." }))
        }
        Err(err) => {
            tracing::error!("Failed to insert new account: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[derive(serde::Serialize)]
pub struct AccountStats {
    pub email: String,
    pub tier: Tier,
    pub send_limit: i32,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub last_sent_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_opened_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_clicked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub subscribed: bool,
}

#[tracing::instrument(name = "Fetching account usage stats", skip(db_pool))]
pub async fn handle_account_stats(
    path: web::Path<String>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    let email = path.into_inner();

    match accounts::get_account_by_email(&db_pool, &email).await {
        Ok(Some(account)) => HttpResponse::Ok().json(AccountStats {
            email: account.email.as_ref().to_string(),
            tier: account.tier,
            send_limit: account.send_limit,
            sent_count: account.sent_count,
            delivered_count: account.delivered_count,
            opened_count: account.opened_count,
            clicked_count: account.clicked_count,
            last_sent_at: account.last_sent_at,
            last_opened_at: account.last_opened_at,
            last_clicked_at: account.last_clicked_at,
            subscribed: account.subscribed,
        }),
        Ok(None) => {
            HttpResponse::NotFound().json(serde_json::json!({ "message": "Account not found." }))
        }
        Err(err) => {
            tracing::error!("Failed to fetch account: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct UnsubscribeParameters {
    pub email: String,
}

#[tracing::instrument(
    name = "Unsubscribing an account",
    skip(db_pool),
    fields(email = %parameters.email)
)]
pub async fn handle_unsubscribe(
    parameters: Query<UnsubscribeParameters>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    if RecipientEmail::parse(parameters.email.clone()).is_err() {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({ "message": "Invalid email address." }));
    }

    match accounts::unsubscribe(&db_pool, &parameters.email).await {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({
            "message": "You have successfully unsubscribed from our emails."
        })),
        Ok(false) => {
            HttpResponse::NotFound().json(serde_json::json!({ "message": "Account not found." }))
        }
        Err(err) => {
            tracing::error!("Failed to unsubscribe account: {:?}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}
