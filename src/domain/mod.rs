pub mod account;
pub mod campaign;
pub mod recipient;
pub mod recipient_email;
pub mod recipient_name;
pub mod send_status;
pub mod tier;
