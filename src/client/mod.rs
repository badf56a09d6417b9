//! Minimal Google Cloud Logging client.
//!
//! `Client` owns the HTTP connection pool and knows the parent resource
//! (`projects/<id>` and friends). `Logger`s created from it buffer entries and
//! deliver them from a background task; see [`logger`].

pub mod logger;
pub mod options;
pub mod wire;

pub use logger::Logger;
pub use options::{LoggerOption, LoggerSettings, MonitoredResource};

use parking_lot::{Mutex, RwLock};
use reqwest::{Client as HttpClient, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use logger::Command;
use wire::WriteEntriesRequest;

pub const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com";

/// Resource name prefixes accepted as a client parent.
const PARENT_PREFIXES: [&str; 4] = ["projects/", "folders/", "organizations/", "billingAccounts/"];

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Request timeout: {0}")]
    RequestTimeout(String),
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Buffered byte limit of {limit} bytes exceeded, entry dropped")]
    Overflow { limit: usize },
    #[error("Logger {0} is closed")]
    Closed(String),
}

/// Called with every delivery failure the background tasks run into.
pub type ErrorHandler = Arc<dyn Fn(&ClientError) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    /// OAuth2 bearer token. Requests are sent unauthenticated when unset (emulators, tests).
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub enable_compression: bool,
    /// Resource attached to loggers that don't override it with `LoggerOption::CommonResource`.
    pub resource: MonitoredResource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("rask-log-sink/{}", env!("CARGO_PKG_VERSION")),
            enable_compression: true,
            resource: MonitoredResource::global(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `CLOUD_LOGGING_ENDPOINT` and `CLOUD_LOGGING_ACCESS_TOKEN`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("CLOUD_LOGGING_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                config.endpoint = endpoint.trim().to_string();
            }
        }
        if let Ok(token) = std::env::var("CLOUD_LOGGING_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                config.access_token = Some(token.trim().to_string());
            }
        }
        config
    }
}

/// Handle to the Cloud Logging API. Cheap to clone; all clones share loggers.
///
/// The owner must call [`Client::close`] before the process exits, otherwise
/// entries still buffered in loggers are lost. A logger's background task
/// otherwise runs until every clone of that `Logger` has been dropped, then
/// delivers what it still holds and exits.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    http: HttpClient,
    parent: String,
    write_url: Url,
    config: ClientConfig,
    on_error: RwLock<ErrorHandler>,
    /// Weak so that a logger's task ends once every `Logger` handle is dropped.
    loggers: Mutex<Vec<mpsc::WeakUnboundedSender<Command>>>,
    shutdown: CancellationToken,
}

impl Client {
    /// Creates a client scoped to `parent`.
    ///
    /// `parent` is either a bare project id or a full resource name such as
    /// `projects/my-project` or `organizations/1234`.
    pub fn new(parent: &str, config: ClientConfig) -> Result<Self, ClientError> {
        let parent = resolve_parent(parent)?;

        let mut endpoint_url: Url = config.endpoint.parse().map_err(|e| {
            ClientError::InvalidConfiguration(format!("Invalid endpoint URL '{}': {}", config.endpoint, e))
        })?;
        if !endpoint_url.path().ends_with('/') {
            let path = format!("{}/", endpoint_url.path());
            endpoint_url.set_path(&path);
        }
        let write_url = endpoint_url.join("v2/entries:write").map_err(|e| {
            ClientError::InvalidConfiguration(format!("Invalid endpoint URL '{}': {}", config.endpoint, e))
        })?;

        let http = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.enable_compression)
            .build()
            .map_err(|e| ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}")))?;

        debug!(parent = %parent, endpoint = %write_url, "created cloud logging client");

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                parent,
                write_url,
                config,
                on_error: RwLock::new(Arc::new(default_error_handler)),
                loggers: Mutex::new(Vec::new()),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Resolved parent resource name, e.g. `projects/my-project`.
    pub fn parent(&self) -> &str {
        &self.inner.parent
    }

    /// Replaces the handler that receives background delivery failures.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&ClientError) + Send + Sync + 'static,
    {
        *self.inner.on_error.write() = Arc::new(handler);
    }

    /// Checks reachability and permissions by writing a single entry to the `ping` log.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let log_name = wire::log_name(&self.inner.parent, "ping");
        let request = WriteEntriesRequest::ping(&log_name, &self.inner.config.resource);
        self.inner.write_entries(&request).await
    }

    /// Creates a logger writing to `log_id`, spawning its delivery task on the current runtime.
    pub fn logger(&self, log_id: &str, options: &[LoggerOption]) -> Result<Logger, ClientError> {
        if log_id.is_empty() {
            return Err(ClientError::InvalidConfiguration("log id must not be empty".to_string()));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ClientError::InvalidConfiguration("loggers must be created inside a tokio runtime".to_string())
        })?;

        let settings = LoggerSettings::from_options(self.inner.config.resource.clone(), options);
        let log_name = wire::log_name(&self.inner.parent, log_id);
        let logger = Logger::spawn(&runtime, Arc::clone(&self.inner), log_name, settings);
        self.inner.loggers.lock().push(logger.weak_sender());
        Ok(logger)
    }

    /// Waits until every logger has delivered its buffered entries.
    ///
    /// Returns the first delivery error seen since the previous flush.
    pub async fn flush(&self) -> Result<(), ClientError> {
        let senders: Vec<_> = {
            let mut loggers = self.inner.loggers.lock();
            loggers.retain(|logger| logger.upgrade().is_some());
            loggers.iter().filter_map(mpsc::WeakUnboundedSender::upgrade).collect()
        };
        let mut first_error = None;
        for sender in senders {
            let (reply, done) = oneshot::channel();
            if sender.send(Command::Flush(reply)).is_err() {
                continue;
            }
            if let Ok(Err(e)) = done.await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flushes every logger and stops their background tasks.
    pub async fn close(&self) -> Result<(), ClientError> {
        let result = self.flush().await;
        self.inner.shutdown.cancel();
        self.inner.loggers.lock().clear();
        result
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl ClientInner {
    pub(crate) async fn write_entries(&self, request: &WriteEntriesRequest<'_>) -> Result<(), ClientError> {
        let mut builder = self.http.post(self.write_url.clone()).json(request);
        if let Some(token) = &self.config.access_token {
            builder = builder.bearer_auth(token);
        }

        let response = timeout(self.config.timeout, builder.send())
            .await
            .map_err(|_| ClientError::RequestTimeout(format!("entries:write to {}", request.log_name)))?
            .map_err(ClientError::Network)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Http {
            status: status.as_u16(),
            message: if body.is_empty() { status.to_string() } else { body },
        })
    }

    pub(crate) fn report(&self, error: &ClientError) {
        let handler = self.on_error.read().clone();
        handler(error);
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

fn default_error_handler(error: &ClientError) {
    // Delivery failures must not go through tracing: the sink may be the subscriber's writer.
    eprintln!("rask-log-sink: {error}");
}

fn resolve_parent(parent: &str) -> Result<String, ClientError> {
    let parent = parent.trim();
    if parent.is_empty() {
        return Err(ClientError::InvalidConfiguration("project id must not be empty".to_string()));
    }
    if !parent.contains('/') {
        return Ok(format!("projects/{parent}"));
    }

    let valid = PARENT_PREFIXES.iter().any(|prefix| {
        parent
            .strip_prefix(*prefix)
            .is_some_and(|id| !id.is_empty() && !id.contains('/'))
    });
    if valid {
        Ok(parent.to_string())
    } else {
        Err(ClientError::InvalidConfiguration(format!(
            "Invalid parent '{parent}'. Expected a project id or one of {PARENT_PREFIXES:?} followed by an id"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_resolve_parent() {
        assert_eq!(resolve_parent("my-project").unwrap(), "projects/my-project");
        assert_eq!(resolve_parent("projects/my-project").unwrap(), "projects/my-project");
        assert_eq!(resolve_parent("organizations/1234").unwrap(), "organizations/1234");
        assert_eq!(resolve_parent(" billingAccounts/ab-12 ").unwrap(), "billingAccounts/ab-12");
    }

    #[test]
    fn test_resolve_parent_rejects_malformed_names() {
        for parent in ["", "   ", "projects/", "projects/a/b", "teams/x"] {
            assert!(
                matches!(resolve_parent(parent), Err(ClientError::InvalidConfiguration(_))),
                "parent: {parent:?}"
            );
        }
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let config = ClientConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        let err = Client::new("my-project", config).err().unwrap();
        assert!(err.to_string().contains("Invalid endpoint URL"));
    }

    #[test]
    fn test_write_url_keeps_endpoint_path() {
        let config = ClientConfig {
            endpoint: "http://localhost:8085/proxy".to_string(),
            ..Default::default()
        };
        let client = Client::new("my-project", config).unwrap();
        assert_eq!(client.inner.write_url.as_str(), "http://localhost:8085/proxy/v2/entries:write");
        assert_eq!(client.parent(), "projects/my-project");
    }

    #[test]
    fn test_logger_requires_runtime() {
        let client = Client::new("my-project", ClientConfig::default()).unwrap();
        let err = client.logger("app", &[]).err().unwrap();
        assert!(err.to_string().contains("tokio runtime"));
    }

    #[tokio::test]
    async fn test_logger_rejects_empty_log_id() {
        let client = Client::new("my-project", ClientConfig::default()).unwrap();
        assert!(matches!(
            client.logger("", &[]),
            Err(ClientError::InvalidConfiguration(_))
        ));
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides_defaults() {
        // SAFETY: serialized with the other env tests; no other thread reads these vars
        unsafe {
            std::env::set_var("CLOUD_LOGGING_ENDPOINT", " http://localhost:8085 ");
            std::env::set_var("CLOUD_LOGGING_ACCESS_TOKEN", "token-123");
        }
        let config = ClientConfig::from_env();
        unsafe {
            std::env::remove_var("CLOUD_LOGGING_ENDPOINT");
            std::env::remove_var("CLOUD_LOGGING_ACCESS_TOKEN");
        }

        assert_eq!(config.endpoint, "http://localhost:8085");
        assert_eq!(config.access_token.as_deref(), Some("token-123"));
    }

    #[test]
    #[serial]
    fn test_config_from_env_ignores_blank_values() {
        // SAFETY: see above
        unsafe {
            std::env::set_var("CLOUD_LOGGING_ENDPOINT", "");
            std::env::remove_var("CLOUD_LOGGING_ACCESS_TOKEN");
        }
        let config = ClientConfig::from_env();
        unsafe {
            std::env::remove_var("CLOUD_LOGGING_ENDPOINT");
        }

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.access_token.is_none());
    }
}
