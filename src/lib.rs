// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::missing_errors_doc,      // Errors are enumerated on each error type
    clippy::module_name_repetitions, // e.g. ClientError in client module
    clippy::must_use_candidate,      // Annotated selectively on critical APIs
    clippy::doc_markdown             // Product names in docs
)]

//! Routes `tracing` JSON records into Google Cloud Logging.
//!
//! Each record written by the JSON formatter becomes one Cloud Logging entry
//! whose payload is the record itself and whose severity is mapped from the
//! event's level. A copy can be teed to the terminal.
//!
//! ```no_run
//! use rask_log_sink::{ClientConfig, SinkWriter, console_writer_if_terminal};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let client = rask_log_sink::Client::new("my-project-id", ClientConfig::from_env())?;
//! let logger = client.logger("my-log-id", &[])?;
//! let writer = SinkWriter::with_tee(logger, console_writer_if_terminal(std::io::stderr(), true));
//! tracing::subscriber::set_global_default(rask_log_sink::json_subscriber(writer))?;
//!
//! tracing::info!(user = "ada", "signed in");
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod client;
pub mod domain;
pub mod sink;
pub mod terminal;

#[doc(hidden)]
pub mod test_support;

// Re-export main types for easy access
pub use bootstrap::{
    BootstrapError, connect, connect_with, install, install_with, json_subscriber, must_install,
};
pub use client::{Client, ClientConfig, ClientError, Logger, LoggerOption, MonitoredResource};
pub use domain::{Entry, Level, RawJson, Severity};
pub use sink::{EntrySink, LevelWriter, RecordWriter, SinkWriter, Tee};
pub use terminal::{ConsoleWriter, Discard, TerminalStream, console_writer_if_terminal};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
