//! Batch-level quota enforcement. Acceptance is all-or-nothing: a batch that
//! would push `sent_count` past `send_limit` is rejected before any dispatch,
//! carrying the tier-specific checkout URL. Quota is actually *spent* one
//! unit at a time by the dispatcher's guarded increment, so this check is a
//! fast-fail and the database guard stays authoritative under concurrency.

use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::account::Account;
use crate::domain::tier::Tier;

#[derive(serde::Deserialize, Clone)]
pub struct QuotaSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub free_limit: i32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub basic_limit: i32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub premium_limit: i32,
    pub free_checkout_url: String,
    pub basic_checkout_url: String,
    pub premium_checkout_url: String,
}

impl QuotaSettings {
    pub fn limit_for(&self, tier: &Tier) -> i32 {
        match tier {
            Tier::Free => self.free_limit,
            Tier::Basic => self.basic_limit,
            Tier::Premium | Tier::Paid => self.premium_limit,
        }
    }

    /// Where to send the account owner when their current tier is exhausted.
    pub fn checkout_url_for(&self, tier: &Tier) -> &str {
        match tier {
            Tier::Free => &self.free_checkout_url,
            Tier::Basic => &self.basic_checkout_url,
            Tier::Premium | Tier::Paid => &self.premium_checkout_url,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QuotaExceeded {
    pub checkout_url: String,
    pub sent_count: i32,
    pub send_limit: i32,
    pub batch_size: usize,
}

/// Rejects the whole batch when the projected count would exceed the limit.
/// A batch that lands exactly on the limit is accepted.
pub fn check_batch(
    account: &Account,
    batch_size: usize,
    settings: &QuotaSettings,
) -> Result<(), QuotaExceeded> {
    let projected = account.sent_count as i64 + batch_size as i64;

    if projected > account.send_limit as i64 {
        return Err(QuotaExceeded {
            checkout_url: settings.checkout_url_for(&account.tier).to_string(),
            sent_count: account.sent_count,
            send_limit: account.send_limit,
            batch_size,
        });
    }

    Ok(())
}
