pub mod accounts;
pub mod campaigns;
pub mod health_check;
pub mod tracking;
pub mod webhooks;

pub use accounts::{handle_account_stats, handle_create_account, handle_unsubscribe};
pub use campaigns::publish_campaign;
pub use health_check::health_check;
pub use tracking::{handle_track_click, handle_track_open};
pub use webhooks::{handle_billing_webhook, handle_delivery_webhook};
