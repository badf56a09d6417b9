use super::level::Level;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cloud Logging severity attached to each backend entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Default,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Maps an application level onto the backend severity.
    ///
    /// Runs on every leveled write, so it is a plain `match` rather than a
    /// round trip through the level's name. Fatal and panic both land on
    /// `Critical`; anything without a counterpart is `Default`.
    pub const fn from_level(level: Level) -> Self {
        match level {
            Level::Debug => Severity::Debug,
            Level::Info => Severity::Info,
            Level::Warn => Severity::Warning,
            Level::Error => Severity::Error,
            Level::Fatal | Level::Panic => Severity::Critical,
            Level::Trace | Level::NoLevel => Severity::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Default => "DEFAULT",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        Severity::from_level(level)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
