//! Append-only log of failures raised outside a job's own counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A failure reported to the process-wide error channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Sequence number, starting at 1.
    pub id: u64,
    /// Component that raised the error.
    pub source: String,
    /// Error text.
    pub body: String,
    /// When the error was recorded.
    pub occurred_at: DateTime<Utc>,
}
