pub mod accounts;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod email_client;
pub mod fingerprint;
pub mod ingest;
pub mod ledger;
pub mod quota;
pub mod routes;
pub mod scheduler;
pub mod startup;
pub mod telemetry;
