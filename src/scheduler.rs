//! Deferred dispatch. A schedule expression is resolved to a delay up front;
//! bad or already-passed expressions fail the request synchronously instead of
//! silently dropping the batch. Accepted tasks run as single-shot tokio tasks.
//!
//! Scheduled tasks live in process memory only: a restart loses them. This is
//! a known limitation; guaranteed scheduled dispatch would need a durable
//! job queue.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

#[derive(thiserror::Error, Debug)]
pub enum SchedulingError {
    #[error("'{0}' is not a valid schedule expression")]
    Unparseable(String),
    #[error("Scheduled time '{0}' is already in the past")]
    InPast(String),
}

/// Resolves a schedule expression to a delay from `now`. Accepts a relative
/// expression matching `^(\d+)([smh])$` or an RFC 3339 absolute timestamp.
pub fn parse_schedule(expression: &str, now: DateTime<Utc>) -> Result<Duration, SchedulingError> {
    let expression = expression.trim();

    if let Some(delay) = parse_relative(expression) {
        return Ok(delay);
    }

    let timestamp = DateTime::parse_from_rfc3339(expression)
        .map_err(|_| SchedulingError::Unparseable(expression.to_string()))?;

    (timestamp.with_timezone(&Utc) - now)
        .to_std()
        .map_err(|_| SchedulingError::InPast(expression.to_string()))
}

fn parse_relative(expression: &str) -> Option<Duration> {
    let (value, unit) = expression.split_at(expression.len().checked_sub(1)?);

    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    let value: u64 = value.parse().ok()?;

    match unit {
        "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

/// Holds the in-flight deferred dispatch tasks. One task per scheduled
/// recipient; there is no cancellation API once a task is accepted.
pub struct Scheduler {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler {
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Queues `task` to run once after `delay` and returns immediately.
    pub fn defer<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        let mut handles = self.handles.lock().unwrap();

        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    pub fn pending_count(&self) -> usize {
        let mut handles = self.handles.lock().unwrap();

        handles.retain(|handle| !handle.is_finished());
        handles.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::new()
    }
}
