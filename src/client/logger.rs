//! Buffered logger with a background delivery task.
//!
//! `Logger::log` never blocks: entries go through an unbounded `mpsc` channel
//! to a task that batches them and calls `entries:write` whenever
//! `EntryCountThreshold` entries are pending or `DelayThreshold` elapses.
//! Memory is bounded by `BufferedByteLimit` instead of channel capacity.

use super::options::LoggerSettings;
use super::wire::WriteEntriesRequest;
use super::{ClientError, ClientInner};
use crate::domain::Entry;
use crate::sink::EntrySink;
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub(crate) enum Command {
    Log(Entry),
    Flush(oneshot::Sender<Result<(), ClientError>>),
}

/// Writes entries to one log. Cheap to clone; clones share the buffer.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<LoggerShared>,
}

struct LoggerShared {
    log_name: String,
    settings: LoggerSettings,
    commands: mpsc::UnboundedSender<Command>,
    buffered_bytes: Arc<AtomicUsize>,
    client: Arc<ClientInner>,
}

impl Logger {
    pub(crate) fn spawn(
        runtime: &Handle,
        client: Arc<ClientInner>,
        log_name: String,
        settings: LoggerSettings,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let buffered_bytes = Arc::new(AtomicUsize::new(0));

        runtime.spawn(flush_loop(
            Arc::clone(&client),
            log_name.clone(),
            settings.clone(),
            receiver,
            Arc::clone(&buffered_bytes),
            client.shutdown_token(),
        ));

        Self {
            shared: Arc::new(LoggerShared {
                log_name,
                settings,
                commands,
                buffered_bytes,
                client,
            }),
        }
    }

    /// Full log name, e.g. `projects/my-project/logs/app`.
    pub fn log_name(&self) -> &str {
        &self.shared.log_name
    }

    pub fn settings(&self) -> &LoggerSettings {
        &self.shared.settings
    }

    /// Bytes accepted but not yet delivered.
    pub fn buffered_bytes(&self) -> usize {
        self.shared.buffered_bytes.load(Ordering::Relaxed)
    }

    /// Queues an entry for delivery. Failures are reported to the client's error handler.
    pub fn log(&self, mut entry: Entry) {
        if entry.timestamp.is_none() {
            entry.timestamp = Some(Utc::now());
        }
        if entry.insert_id.is_none() {
            entry.insert_id = Some(uuid::Uuid::new_v4().to_string());
        }

        let size = entry.approximate_size();
        let limit = self.shared.settings.buffered_byte_limit;
        let reserved = self
            .shared
            .buffered_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |buffered| {
                buffered.checked_add(size).filter(|total| *total <= limit)
            });
        if reserved.is_err() {
            self.shared.client.report(&ClientError::Overflow { limit });
            return;
        }

        if self.shared.commands.send(Command::Log(entry)).is_err() {
            self.shared.buffered_bytes.fetch_sub(size, Ordering::AcqRel);
            self.shared
                .client
                .report(&ClientError::Closed(self.shared.log_name.clone()));
        }
    }

    /// Delivers everything logged so far and returns the first failure since the last flush.
    pub async fn flush(&self) -> Result<(), ClientError> {
        let (reply, done) = oneshot::channel();
        self.shared
            .commands
            .send(Command::Flush(reply))
            .map_err(|_| ClientError::Closed(self.shared.log_name.clone()))?;
        done.await
            .map_err(|_| ClientError::Closed(self.shared.log_name.clone()))?
    }

    pub(crate) fn weak_sender(&self) -> mpsc::WeakUnboundedSender<Command> {
        self.shared.commands.downgrade()
    }
}

impl EntrySink for Logger {
    fn log(&self, entry: Entry) {
        Logger::log(self, entry);
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        Box::pin(Logger::flush(self))
    }
}

// =========================================================================
// Background flush loop
// =========================================================================

async fn flush_loop(
    client: Arc<ClientInner>,
    log_name: String,
    settings: LoggerSettings,
    mut receiver: mpsc::UnboundedReceiver<Command>,
    buffered_bytes: Arc<AtomicUsize>,
    shutdown_token: CancellationToken,
) {
    let mut pending: Vec<Entry> = Vec::new();
    let mut first_error: Option<ClientError> = None;
    let mut delay = tokio::time::interval(settings.delay_threshold);
    delay.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let batch = Batch {
        client: &client,
        log_name: &log_name,
        settings: &settings,
        buffered_bytes: &buffered_bytes,
    };

    loop {
        tokio::select! {
            _ = delay.tick() => {
                batch.deliver(&mut pending, &mut first_error).await;
            }

            command = receiver.recv() => match command {
                Some(Command::Log(entry)) => {
                    pending.push(entry);
                    if pending.len() >= settings.entry_count_threshold {
                        batch.deliver(&mut pending, &mut first_error).await;
                    }
                }
                Some(Command::Flush(reply)) => {
                    batch.deliver(&mut pending, &mut first_error).await;
                    let _ = reply.send(first_error.take().map_or(Ok(()), Err));
                }
                None => {
                    batch.deliver(&mut pending, &mut first_error).await;
                    break;
                }
            },

            () = shutdown_token.cancelled() => {
                // Later sends fail and are reported as Closed by `Logger::log`.
                receiver.close();
                while let Ok(command) = receiver.try_recv() {
                    match command {
                        Command::Log(entry) => pending.push(entry),
                        Command::Flush(reply) => {
                            let _ = reply.send(Err(ClientError::Closed(log_name.clone())));
                        }
                    }
                }
                batch.deliver(&mut pending, &mut first_error).await;
                break;
            }
        }
    }

    batch.buffered_bytes.store(0, Ordering::Release);
}

struct Batch<'a> {
    client: &'a ClientInner,
    log_name: &'a str,
    settings: &'a LoggerSettings,
    buffered_bytes: &'a AtomicUsize,
}

impl Batch<'_> {
    /// Sends `pending` in chunks of at most `entry_count_threshold` entries.
    async fn deliver(&self, pending: &mut Vec<Entry>, first_error: &mut Option<ClientError>) {
        if pending.is_empty() {
            return;
        }

        let entries = std::mem::take(pending);
        for chunk in entries.chunks(self.settings.entry_count_threshold) {
            let request = WriteEntriesRequest::new(self.log_name, self.settings, chunk);
            let result = self.client.write_entries(&request).await;

            let size: usize = chunk.iter().map(Entry::approximate_size).sum();
            self.buffered_bytes.fetch_sub(size, Ordering::AcqRel);

            if let Err(e) = result {
                self.client.report(&e);
                if first_error.is_none() {
                    *first_error = Some(e);
                }
            }
        }
    }
}
