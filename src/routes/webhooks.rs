//! Inbound webhook reconciliation: delivery-provider events update the
//! sender's counters, billing-provider events change the plan and quota.
//! Payloads are modeled as typed structs with required fields; a body that
//! does not match is a 400, never a defensively-ignored read.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::PgPool;

use crate::accounts;
use crate::domain::tier::Tier;
use crate::quota::QuotaSettings;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryEventType {
    Delivered,
    Click,
    UniqueOpened,
}

#[derive(Deserialize, Debug)]
pub struct DeliveryEvent {
    pub event: DeliveryEventType,
    pub email: String,
    #[serde(rename = "message-id")]
    pub message_id: String,
    pub sender_email: String,
}

/// The provider does not guarantee idempotent webhook delivery and exposes no
/// reliable event id to dedup on, so a re-delivered event counts again. The
/// counters are recounts, not exact-once tallies.
#[tracing::instrument(
    name = "Reconcile a delivery-provider event",
    skip(event, db_pool),
    fields(
        delivery_event = ?event.event,
        recipient_email = %event.email,
        sender_email = %event.sender_email,
        message_id = %event.message_id
    )
)]
pub async fn handle_delivery_webhook(
    event: web::Json<DeliveryEvent>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let updated = match event.event {
        DeliveryEventType::Delivered => {
            accounts::record_delivery(&db_pool, &event.sender_email).await
        }
        DeliveryEventType::Click => accounts::record_click(&db_pool, &event.sender_email).await,
        DeliveryEventType::UniqueOpened => {
            accounts::record_open(&db_pool, &event.sender_email).await
        }
    }
    .map_err(|err| {
        tracing::error!("Failed to reconcile delivery event: {:?}", err);
        actix_web::error::ErrorInternalServerError("Failed to reconcile delivery event")
    })?;

    if !updated {
        return Ok(HttpResponse::NotFound()
            .json(serde_json::json!({ "message": "Sender account not found." })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Event reconciled." })))
}

#[derive(Deserialize, Debug)]
pub struct BillingEvent {
    pub meta: BillingMeta,
    pub data: BillingData,
}

#[derive(Deserialize, Debug)]
pub struct BillingMeta {
    pub event_name: String,
}

#[derive(Deserialize, Debug)]
pub struct BillingData {
    pub attributes: BillingAttributes,
}

#[derive(Deserialize, Debug)]
pub struct BillingAttributes {
    pub user_email: String,
    pub first_order_item: OrderItem,
}

#[derive(Deserialize, Debug)]
pub struct OrderItem {
    pub product_name: String,
}

/// Maps a purchased product to a tier and applies the new quota atomically.
/// Accounts are never created here: upgrading an unknown account is an error.
#[tracing::instrument(
    name = "Reconcile a billing-provider event",
    skip(event, db_pool, quota_settings),
    fields(
        event_name = %event.meta.event_name,
        user_email = %event.data.attributes.user_email,
        product_name = %event.data.attributes.first_order_item.product_name
    )
)]
pub async fn handle_billing_webhook(
    event: web::Json<BillingEvent>,
    db_pool: web::Data<PgPool>,
    quota_settings: web::Data<QuotaSettings>,
) -> impl Responder {
    if event.meta.event_name != "order_created" {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!("Unsupported billing event '{}'.", event.meta.event_name)
        }));
    }

    let product_name = event
        .data
        .attributes
        .first_order_item
        .product_name
        .to_lowercase();
    let (tier, new_limit) = if product_name.contains("premium") {
        (Tier::Premium, quota_settings.premium_limit)
    } else {
        (Tier::Basic, quota_settings.basic_limit)
    };

    match accounts::apply_plan_change(
        &db_pool,
        &event.data.attributes.user_email,
        tier,
        new_limit,
    )
    .await
    {
        Ok(true) => {
            tracing::info!(
                "Account {} moved to the {} plan with limit {}",
                event.data.attributes.user_email,
                tier.as_ref(),
                new_limit
            );
            HttpResponse::Ok().json(serde_json::json!({
                "message": format!("Account upgraded to {}.", tier.as_ref()),
                "tier": tier,
                "send_limit": new_limit,
            }))
        }
        Ok(false) => HttpResponse::NotFound()
            .json(serde_json::json!({ "message": "Account not found." })),
        Err(err) => {
            tracing::error!("Failed to apply plan change: {:?}", err);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "message": "Failed to apply plan change." }))
        }
    }
}
