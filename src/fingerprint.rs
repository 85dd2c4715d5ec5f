use sha2::{Digest, Sha256};

/// Derives the dedup key for one send: SHA-256 over the raw message body and
/// the recipient address, hex-encoded. The same body re-sent to the same
/// address collides; different content to the same address does not.
pub fn content_fingerprint(content: &str, recipient_email: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(content.as_bytes());
    hasher.update(recipient_email.as_bytes());

    hex::encode(hasher.finalize())
}
