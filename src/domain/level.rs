use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Application-side log level, as handed to the sink by the structured-logging front end.
///
/// This is distinct from `Severity`, which is the backend's enumeration. `Trace` and
/// `NoLevel` exist so that records the backend has no counterpart for are still
/// representable; both map to `Severity::Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
    #[serde(rename = "")]
    NoLevel,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid log level '{input}'. Valid levels: trace, debug, info, warn, error, fatal, panic")]
pub struct LevelParseError {
    pub input: String,
}

impl Level {
    /// Numeric code in the conventional structured-logger numbering.
    pub const fn code(self) -> i8 {
        match self {
            Level::Trace => -1,
            Level::Debug => 0,
            Level::Info => 1,
            Level::Warn => 2,
            Level::Error => 3,
            Level::Fatal => 4,
            Level::Panic => 5,
            Level::NoLevel => 6,
        }
    }

    /// Inverse of [`Level::code`]. Unknown codes become `NoLevel`.
    pub const fn from_code(code: i8) -> Self {
        match code {
            -1 => Level::Trace,
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Warn,
            3 => Level::Error,
            4 => Level::Fatal,
            5 => Level::Panic,
            _ => Level::NoLevel,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
            Level::NoLevel => "",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            "" => Ok(Level::NoLevel),
            _ => Err(LevelParseError {
                input: s.to_string(),
            }),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        Level::from(*level)
    }
}
