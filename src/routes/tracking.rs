use actix_web::{
    web::{self, Query},
    HttpResponse, Responder,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::accounts;

/// Fixed 1x1 transparent PNG served by the open pixel.
const TRACKING_PIXEL: [u8; 68] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0xb5,
    0x1c, 0x0c, 0x02, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0xfc,
    0xff, 0x07, 0x00, 0x02, 0x00, 0x01, 0xfd, 0xea, 0x74, 0x66, 0x82, 0x00, 0x00, 0x00, 0x00,
    0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

#[derive(Deserialize, Debug)]
pub struct OpenParameters {
    pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct ClickParameters {
    pub email: String,
    pub url: String,
}

/// Open-pixel hit. The pixel is returned unconditionally: tracking must never
/// error visibly to the remote mail client, so lookup failures and unknown
/// addresses are logged and swallowed.
#[tracing::instrument(
    name = "Track an email open",
    skip(db_pool),
    fields(email = %parameters.email)
)]
pub async fn handle_track_open(
    parameters: Query<OpenParameters>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    match accounts::record_open(&db_pool, &parameters.email).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Open pixel hit for unknown address {}", parameters.email);
        }
        Err(err) => {
            tracing::error!("Failed to record email open: {:?}", err);
        }
    }

    HttpResponse::Ok()
        .content_type("image/png")
        .body(TRACKING_PIXEL.to_vec())
}

/// Click-redirect hit. The redirect to the destination still happens when the
/// account is unknown; losing the recipient's navigation over a tracking miss
/// is the worse failure.
#[tracing::instrument(
    name = "Track an email click",
    skip(db_pool),
    fields(email = %parameters.email, url = %parameters.url)
)]
pub async fn handle_track_click(
    parameters: Query<ClickParameters>,
    db_pool: web::Data<PgPool>,
) -> impl Responder {
    match accounts::record_click(&db_pool, &parameters.email).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Click hit for unknown address {}", parameters.email);
        }
        Err(err) => {
            tracing::error!("Failed to record email click: {:?}", err);
        }
    }

    HttpResponse::Found()
        .insert_header(("Location", parameters.url.clone()))
        .finish()
}
