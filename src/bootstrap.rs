//! Wiring a Cloud Logging sink into an application.
//!
//! `connect` returns an explicit `SinkWriter` handle for callers that pass
//! their logger through their own dependency graph. `install` additionally
//! makes it the process-wide `tracing` subscriber and belongs at the outermost
//! layer of an application, at startup.

use crate::client::{Client, ClientConfig, ClientError, LoggerOption};
use crate::sink::SinkWriter;
use std::collections::HashMap;
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{Subscriber, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("create client: {source}")]
    CreateClient {
        #[source]
        source: ClientError,
    },

    #[error("ping: {source}")]
    Ping {
        #[source]
        source: ClientError,
    },

    #[error("create logger: {source}")]
    CreateLogger {
        #[source]
        source: ClientError,
    },

    #[error("install default subscriber: {0}")]
    Install(#[from] SetGlobalDefaultError),
}

/// [`connect_with`] using [`ClientConfig::from_env`].
pub async fn connect(
    project: &str,
    log_id: &str,
    labels: HashMap<String, String>,
    options: &[LoggerOption],
) -> Result<(Client, SinkWriter), BootstrapError> {
    connect_with(ClientConfig::from_env(), project, log_id, labels, options).await
}

/// Creates a client for `project`, checks it can reach the backend, and
/// returns it together with a sink writer (no tee) for `log_id`.
///
/// `labels` become the logger's common labels unless `options` carries its
/// own `LoggerOption::CommonLabels`, which then wins.
pub async fn connect_with(
    config: ClientConfig,
    project: &str,
    log_id: &str,
    labels: HashMap<String, String>,
    options: &[LoggerOption],
) -> Result<(Client, SinkWriter), BootstrapError> {
    let client =
        Client::new(project, config).map_err(|source| BootstrapError::CreateClient { source })?;
    client
        .ping()
        .await
        .map_err(|source| BootstrapError::Ping { source })?;

    // labels go first so that a CommonLabels option in `options` overrides them.
    let mut effective = Vec::with_capacity(options.len() + 1);
    effective.push(LoggerOption::CommonLabels(labels));
    effective.extend_from_slice(options);

    let logger = client
        .logger(log_id, &effective)
        .map_err(|source| BootstrapError::CreateLogger { source })?;

    info!(log_name = logger.log_name(), "connected to cloud logging");
    Ok((client, SinkWriter::new(logger)))
}

/// JSON subscriber writing every event into `writer`.
///
/// Filtered by `RUST_LOG`, read when the subscriber is built; `info` when it is
/// unset or invalid.
pub fn json_subscriber(writer: SinkWriter) -> impl Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_writer(writer),
        )
}

/// [`install_with`] using [`ClientConfig::from_env`].
pub async fn install(
    project: &str,
    log_id: &str,
    labels: HashMap<String, String>,
    options: &[LoggerOption],
) -> Result<Client, BootstrapError> {
    install_with(ClientConfig::from_env(), project, log_id, labels, options).await
}

/// Connects and installs the sink as the process-wide default subscriber.
///
/// Nothing is installed if the client cannot be created or reached. The
/// returned client must be closed before the process exits.
pub async fn install_with(
    config: ClientConfig,
    project: &str,
    log_id: &str,
    labels: HashMap<String, String>,
    options: &[LoggerOption],
) -> Result<Client, BootstrapError> {
    let (client, writer) = connect_with(config, project, log_id, labels, options).await?;

    if let Err(e) = tracing::subscriber::set_global_default(json_subscriber(writer)) {
        let _ = client.close().await;
        return Err(e.into());
    }

    Ok(client)
}

/// [`install`], terminating the process with exit status 1 on failure.
///
/// Only for process startup; never call it on a request path.
pub async fn must_install(
    project: &str,
    log_id: &str,
    labels: HashMap<String, String>,
    options: &[LoggerOption],
) -> Client {
    match install(project, log_id, labels, options).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to set up cloud logging: {e}");
            std::process::exit(1);
        }
    }
}
