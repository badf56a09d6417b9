use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_ENTRY_COUNT_THRESHOLD: usize = 1000;
pub const DEFAULT_DELAY_THRESHOLD: Duration = Duration::from_secs(1);
pub const DEFAULT_BUFFERED_BYTE_LIMIT: usize = 1 << 30;

/// The monitored resource entries are attributed to, e.g. `global` or `gce_instance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl MonitoredResource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            labels: HashMap::new(),
        }
    }

    pub fn global() -> Self {
        Self::new("global")
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Per-logger options. Applied in order, so a later option of the same kind wins.
#[derive(Debug, Clone, PartialEq)]
pub enum LoggerOption {
    /// Labels attached to every entry. Replaces, rather than merges with, earlier common labels.
    CommonLabels(HashMap<String, String>),
    CommonResource(MonitoredResource),
    /// Deliver as soon as this many entries are pending.
    EntryCountThreshold(usize),
    /// Deliver pending entries at least this often.
    DelayThreshold(Duration),
    /// Drop new entries while this many bytes are waiting for delivery.
    BufferedByteLimit(usize),
}

impl LoggerOption {
    pub fn common_labels<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        LoggerOption::CommonLabels(
            labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Effective logger configuration after all options have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerSettings {
    pub common_labels: HashMap<String, String>,
    pub resource: MonitoredResource,
    pub entry_count_threshold: usize,
    pub delay_threshold: Duration,
    pub buffered_byte_limit: usize,
}

impl LoggerSettings {
    pub fn from_options(resource: MonitoredResource, options: &[LoggerOption]) -> Self {
        let mut settings = Self {
            common_labels: HashMap::new(),
            resource,
            entry_count_threshold: DEFAULT_ENTRY_COUNT_THRESHOLD,
            delay_threshold: DEFAULT_DELAY_THRESHOLD,
            buffered_byte_limit: DEFAULT_BUFFERED_BYTE_LIMIT,
        };

        for option in options {
            match option {
                LoggerOption::CommonLabels(labels) => settings.common_labels = labels.clone(),
                LoggerOption::CommonResource(resource) => settings.resource = resource.clone(),
                LoggerOption::EntryCountThreshold(n) => settings.entry_count_threshold = (*n).max(1),
                LoggerOption::DelayThreshold(d) => {
                    settings.delay_threshold = (*d).max(Duration::from_millis(1));
                }
                LoggerOption::BufferedByteLimit(n) => settings.buffered_byte_limit = *n,
            }
        }

        settings
    }
}
