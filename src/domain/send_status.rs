#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SendStatus {
    Pending,
    Scheduled,
    Dispatched,
    Failed,
    SkippedDuplicate,
    SkippedQuota,
}

impl SendStatus {
    pub fn parse(status: String) -> Result<SendStatus, String> {
        match status.as_str() {
            "pending" => Ok(SendStatus::Pending),
            "scheduled" => Ok(SendStatus::Scheduled),
            "dispatched" => Ok(SendStatus::Dispatched),
            "failed" => Ok(SendStatus::Failed),
            "skipped_duplicate" => Ok(SendStatus::SkippedDuplicate),
            "skipped_quota" => Ok(SendStatus::SkippedQuota),
            _ => Err(format!("{} is not a valid send status", status)),
        }
    }
}

impl AsRef<str> for SendStatus {
    fn as_ref(&self) -> &str {
        match self {
            SendStatus::Pending => "pending",
            SendStatus::Scheduled => "scheduled",
            SendStatus::Dispatched => "dispatched",
            SendStatus::Failed => "failed",
            SendStatus::SkippedDuplicate => "skipped_duplicate",
            SendStatus::SkippedQuota => "skipped_quota",
        }
    }
}
