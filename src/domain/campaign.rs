use actix_web::web;
use serde::Deserialize;

use crate::domain::recipient_email::RecipientEmail;
use crate::ingest::{self, IngestOutcome};

fn default_link_url() -> String {
    String::from("https://www.example.com")
}

#[derive(Deserialize, Debug)]
pub struct NewCampaignBody {
    pub sender_email: String,
    pub subject: String,
    pub content: String,
    /// Manual recipient list: comma-separated `Name <addr>` or bare `addr` entries.
    pub recipients: Option<String>,
    /// Raw CSV upload content, two positional columns `name,email`, no header row.
    pub csv: Option<String>,
    pub schedule_at: Option<String>,
    #[serde(default = "default_link_url")]
    pub link_url: String,
}

/// One campaign submission. Built per request, consumed by the dispatch
/// pipeline and any scheduled tasks it spawns; never stored.
pub struct CampaignRequest {
    pub sender_email: RecipientEmail,
    pub subject: String,
    pub content: String,
    pub recipients: IngestOutcome,
    pub schedule_at: Option<String>,
    pub link_url: String,
}

impl TryFrom<web::Json<NewCampaignBody>> for CampaignRequest {
    type Error = String;

    fn try_from(body: web::Json<NewCampaignBody>) -> Result<Self, Self::Error> {
        let body = body.into_inner();
        let sender_email = RecipientEmail::parse(body.sender_email.clone())?;

        if body.subject.trim().is_empty() {
            return Err(String::from("Campaign subject cannot be empty"));
        }
        if body.content.trim().is_empty() {
            return Err(String::from("Campaign content cannot be empty"));
        }

        let recipients = match (&body.recipients, &body.csv) {
            (Some(manual), _) => ingest::parse_manual_list(manual),
            (None, Some(csv)) => ingest::parse_csv(csv.as_bytes()),
            (None, None) => {
                return Err(String::from(
                    "A campaign needs either a manual recipient list or a CSV upload",
                ))
            }
        };

        Ok(CampaignRequest {
            sender_email,
            subject: body.subject,
            content: body.content,
            recipients,
            schedule_at: body.schedule_at,
            link_url: body.link_url,
        })
    }
}
