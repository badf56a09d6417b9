//! Domain layer for rask-log-sink.
//!
//! Contains the types shared between the sink writer and the backend client:
//! - `Level`: Application-side log level (what the front end hands us)
//! - `Severity`: Cloud Logging severity (what the backend stores)
//! - `RawJson`: Pre-encoded payload carried through verbatim
//! - `Entry`: A single backend log entry

pub mod entry;
pub mod level;
pub mod payload;
pub mod severity;

pub use entry::Entry;
pub use level::{Level, LevelParseError};
pub use payload::RawJson;
pub use severity::Severity;
