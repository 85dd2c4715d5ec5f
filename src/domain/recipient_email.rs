use validator::validate_email;

#[derive(Debug, Clone, serde::Serialize)]
pub struct RecipientEmail(String);

impl RecipientEmail {
    pub fn parse(email: String) -> Result<RecipientEmail, String> {
        let is_valid_email = validate_email(&email);
        // validate_email accepts dotless domains ("user@localhost"); deliverable
        // addresses need at least one dot in the domain part.
        let domain_has_dot = email
            .rsplit_once('@')
            .map(|(_, domain)| domain.contains('.'))
            .unwrap_or(false);
        let has_whitespace = email.chars().any(char::is_whitespace);

        if !is_valid_email || !domain_has_dot || has_whitespace {
            return Err(format!("{} email is not valid", email));
        }

        // The address is the accounts unique key and part of the ledger dedup
        // key, so case is normalized once here and everything downstream
        // compares the normalized form.
        Ok(Self(email.to_lowercase()))
    }
}

impl AsRef<str> for RecipientEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
