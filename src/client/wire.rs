//! JSON body of the `v2/entries:write` REST call.

use super::options::{LoggerSettings, MonitoredResource};
use crate::domain::{Entry, RawJson, Severity};
use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use std::collections::HashMap;

/// Everything but RFC 3986 unreserved characters is escaped in a log id.
const LOG_ID: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteEntriesRequest<'a> {
    pub log_name: &'a str,
    pub resource: &'a MonitoredResource,
    #[serde(skip_serializing_if = "is_empty_map")]
    pub labels: &'a HashMap<String, String>,
    pub entries: Vec<WireEntry<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEntry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_payload: Option<&'a RawJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_payload: Option<String>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_map")]
    pub labels: &'a HashMap<String, String>,
}

impl<'a> WriteEntriesRequest<'a> {
    pub fn new(log_name: &'a str, settings: &'a LoggerSettings, entries: &'a [Entry]) -> Self {
        Self {
            log_name,
            resource: &settings.resource,
            labels: &settings.common_labels,
            entries: entries.iter().map(WireEntry::from_entry).collect(),
        }
    }

    /// The single entry written by `Client::ping`.
    pub fn ping(log_name: &'a str, resource: &'a MonitoredResource) -> Self {
        static NO_LABELS: std::sync::LazyLock<HashMap<String, String>> =
            std::sync::LazyLock::new(HashMap::new);

        Self {
            log_name,
            resource,
            labels: &NO_LABELS,
            entries: vec![WireEntry {
                json_payload: None,
                text_payload: Some("ping".to_string()),
                severity: Severity::Default,
                timestamp: Some(format_timestamp(DateTime::<Utc>::UNIX_EPOCH)),
                insert_id: Some("ping"),
                labels: &NO_LABELS,
            }],
        }
    }
}

impl<'a> WireEntry<'a> {
    /// JSON objects go out as `jsonPayload` untouched; anything else becomes `textPayload`.
    pub fn from_entry(entry: &'a Entry) -> Self {
        let (json_payload, text_payload) = if entry.payload.is_empty() {
            (None, None)
        } else if entry.payload.is_json_object() {
            (Some(&entry.payload), None)
        } else {
            let text = entry.payload.to_string_lossy();
            (None, Some(text.trim_end_matches(['\r', '\n']).to_string()))
        };

        Self {
            json_payload,
            text_payload,
            severity: entry.severity,
            timestamp: entry.timestamp.map(format_timestamp),
            insert_id: entry.insert_id.as_deref(),
            labels: &entry.labels,
        }
    }
}

/// `<parent>/logs/<escaped log id>`. The log id is path-escaped so `a/b` stays one segment.
pub fn log_name(parent: &str, log_id: &str) -> String {
    format!("{parent}/logs/{}", utf8_percent_encode(log_id, LOG_ID))
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn is_empty_map(map: &&HashMap<String, String>) -> bool {
    map.is_empty()
}
