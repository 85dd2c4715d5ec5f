use crate::domain::recipient_email::RecipientEmail;
use crate::domain::recipient_name::RecipientName;

/// A validated `(name, email)` pair produced by recipient ingestion.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Recipient {
    pub name: RecipientName,
    pub email: RecipientEmail,
}

impl Recipient {
    pub fn parse(name: String, email: String) -> Result<Recipient, String> {
        let name = RecipientName::parse(name.trim().to_string())?;
        let email = RecipientEmail::parse(email.trim().to_string())?;

        Ok(Recipient { name, email })
    }
}
