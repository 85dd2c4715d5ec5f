//! Recipient ingestion: turns a manual free-text list or a CSV upload into a
//! validated, batch-deduplicated set of `(name, email)` pairs. Pure functions,
//! no persistent state.

use std::collections::HashSet;

use crate::domain::recipient::Recipient;

#[derive(Debug, serde::Serialize)]
pub struct RejectedRecipient {
    pub name: String,
    pub email: String,
    pub reason: String,
}

#[derive(Debug, serde::Serialize)]
pub struct IngestOutcome {
    pub valid: Vec<Recipient>,
    pub invalid: Vec<RejectedRecipient>,
}

impl IngestOutcome {
    fn new() -> Self {
        IngestOutcome {
            valid: Vec::new(),
            invalid: Vec::new(),
        }
    }

    /// Duplicate addresses within the batch are dropped, first occurrence wins.
    fn push(&mut self, name: String, email: String, seen: &mut HashSet<String>) {
        let address = email.trim().to_lowercase();

        if !address.is_empty() && !seen.insert(address) {
            return;
        }

        match Recipient::parse(name.clone(), email.clone()) {
            Ok(recipient) => self.valid.push(recipient),
            Err(reason) => self.invalid.push(RejectedRecipient {
                name,
                email,
                reason,
            }),
        }
    }
}

/// Parses a comma-separated manual list where every entry is either
/// `Name <address>` or a bare `address`. Bare entries reuse the address as
/// display name so personalization still has something to substitute.
pub fn parse_manual_list(input: &str) -> IngestOutcome {
    let mut outcome = IngestOutcome::new();
    let mut seen = HashSet::new();

    for entry in input.split(',') {
        let entry = entry.trim();

        if entry.is_empty() {
            continue;
        }

        match entry.strip_suffix('>').and_then(|e| e.split_once('<')) {
            Some((name, address)) => outcome.push(
                name.trim().to_string(),
                address.trim().to_string(),
                &mut seen,
            ),
            None => outcome.push(entry.to_string(), entry.to_string(), &mut seen),
        }
    }

    outcome
}

/// Parses CSV rows with two positional columns `name,email`. No header row is
/// expected; `"` is the quote character.
pub fn parse_csv(input: &[u8]) -> IngestOutcome {
    let mut outcome = IngestOutcome::new();
    let mut seen = HashSet::new();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                outcome.invalid.push(RejectedRecipient {
                    name: String::new(),
                    email: String::new(),
                    reason: format!("Malformed CSV row: {}", err),
                });
                continue;
            }
        };

        let name = record.get(0).unwrap_or("").to_string();
        let email = record.get(1).unwrap_or("").to_string();

        outcome.push(name, email, &mut seen);
    }

    outcome
}
