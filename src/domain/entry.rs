use super::payload::RawJson;
use super::severity::Severity;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A single log entry handed to the backend.
///
/// Only `payload` and `severity` are set by the sink writer. The backend client
/// fills in `timestamp` and `insert_id` when they are missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    pub payload: RawJson,
    pub severity: Severity,
    pub timestamp: Option<DateTime<Utc>>,
    pub insert_id: Option<String>,
    /// Per-entry labels, merged over the logger's common labels.
    pub labels: HashMap<String, String>,
}

impl Entry {
    pub fn new(payload: RawJson, severity: Severity) -> Self {
        Self {
            payload,
            severity,
            ..Default::default()
        }
    }

    /// Rough size of the entry once buffered, used against the logger's byte limit.
    pub fn approximate_size(&self) -> usize {
        let labels: usize = self.labels.iter().map(|(k, v)| k.len() + v.len()).sum();
        self.payload.len() + labels + self.insert_id.as_ref().map_or(0, String::len)
    }
}
