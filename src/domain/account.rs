use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::recipient_email::RecipientEmail;
use crate::domain::recipient_name::RecipientName;
use crate::domain::tier::Tier;

/// One sender/recipient account. Counters are mutated by the dispatcher and
/// by event reconciliation; every mutation is a single atomic UPDATE.
#[derive(Debug, serde::Serialize)]
pub struct Account {
    pub id: Uuid,
    pub email: RecipientEmail,
    pub name: RecipientName,
    pub tier: Tier,
    pub send_limit: i32,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub last_opened_at: Option<DateTime<Utc>>,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub subscribed: bool,
}
