use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::recipient_email::RecipientEmail;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// Transactional email transport, shaped around Brevo's `/v3/smtp/email` API.
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: RecipientEmail,
    sender_name: String,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
pub struct SendEmailBody {
    sender: BrevoContact,
    to: Vec<BrevoContact>,
    subject: String,
    #[serde(rename = "htmlContent")]
    html_content: String,
}

#[derive(serde::Serialize)]
struct BrevoContact {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: RecipientEmail,
        sender_name: String,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> EmailClient {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()
            .unwrap();

        EmailClient {
            http_client,
            base_url,
            sender,
            sender_name,
            api_key,
        }
    }

    pub async fn send_email(
        &self,
        recipient: &RecipientEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/v3/smtp/email", self.base_url);
        let body = SendEmailBody {
            sender: BrevoContact {
                email: String::from(self.sender.as_ref()),
                name: Some(self.sender_name.clone()),
            },
            to: vec![BrevoContact {
                email: String::from(recipient.as_ref()),
                name: None,
            }],
            subject: String::from(subject),
            html_content: String::from(html_content),
        };

        self.http_client
            .post(&url)
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}
