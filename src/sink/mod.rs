//! The writer the structured-logging front end writes into.
//!
//! `SinkWriter` turns each serialized record into a backend `Entry` and
//! optionally copies it to a tee. It holds no locks of its own: it is exactly
//! as thread-safe as the `EntrySink` and the tee it holds, which the
//! `Send + Sync` bounds on both traits make explicit.

mod make_writer;

pub use make_writer::SinkHandle;

use crate::client::ClientError;
use crate::domain::{Entry, Level, RawJson, Severity};
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

/// Port to the backend logger.
pub trait EntrySink: Send + Sync {
    /// Hands an entry to the backend. Must not block on delivery.
    fn log(&self, entry: Entry);

    /// Waits for buffered entries to be delivered.
    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;
}

/// Accepts a serialized record.
pub trait RecordWriter: Send + Sync {
    fn write_record(&self, buf: &[u8]) -> io::Result<usize>;
}

/// A writer that can also make use of the record's level.
pub trait LevelWriter: RecordWriter {
    fn write_level(&self, level: Level, buf: &[u8]) -> io::Result<usize>;
}

/// Secondary destination receiving a copy of every record.
///
/// Which write path is used is fixed when the tee is built, not checked per write.
#[derive(Clone, Default)]
pub enum Tee {
    #[default]
    None,
    Plain(Arc<dyn RecordWriter>),
    Leveled(Arc<dyn LevelWriter>),
}

impl Tee {
    pub fn plain(writer: impl RecordWriter + 'static) -> Self {
        Tee::Plain(Arc::new(writer))
    }

    pub fn leveled(writer: impl LevelWriter + 'static) -> Self {
        Tee::Leveled(Arc::new(writer))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Tee::None)
    }
}

impl fmt::Debug for Tee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tee::None => f.write_str("Tee::None"),
            Tee::Plain(_) => f.write_str("Tee::Plain(..)"),
            Tee::Leveled(_) => f.write_str("Tee::Leveled(..)"),
        }
    }
}

/// Bridges serialized records to the backend and the optional tee.
///
/// Writes never fail from the caller's point of view: delivery problems are
/// the backend's to retry or report, and tee errors are ignored. Only
/// [`SinkWriter::flush`] surfaces an error.
#[derive(Clone)]
pub struct SinkWriter {
    sink: Arc<dyn EntrySink>,
    tee: Tee,
}

impl SinkWriter {
    pub fn new(sink: impl EntrySink + 'static) -> Self {
        Self::from_shared(Arc::new(sink), Tee::None)
    }

    pub fn with_tee(sink: impl EntrySink + 'static, tee: Tee) -> Self {
        Self::from_shared(Arc::new(sink), tee)
    }

    /// Builds a writer over a sink that is also used elsewhere.
    pub fn from_shared(sink: Arc<dyn EntrySink>, tee: Tee) -> Self {
        Self { sink, tee }
    }

    pub fn tee(&self) -> &Tee {
        &self.tee
    }

    /// Logs `buf` with `Severity::Default`. Always returns `Ok(buf.len())`.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.sink
            .log(Entry::new(RawJson::copy_from_slice(buf), Severity::Default));

        match &self.tee {
            Tee::None => {}
            Tee::Plain(tee) => {
                let _ = tee.write_record(buf);
            }
            Tee::Leveled(tee) => {
                let _ = tee.write_record(buf);
            }
        }

        Ok(buf.len())
    }

    /// Logs `buf` with the severity mapped from `level`. Always returns `Ok(buf.len())`.
    pub fn write_level(&self, level: Level, buf: &[u8]) -> io::Result<usize> {
        self.sink.log(Entry::new(
            RawJson::copy_from_slice(buf),
            Severity::from_level(level),
        ));

        match &self.tee {
            Tee::None => {}
            Tee::Plain(tee) => {
                let _ = tee.write_record(buf);
            }
            Tee::Leveled(tee) => {
                let _ = tee.write_level(level, buf);
            }
        }

        Ok(buf.len())
    }

    /// Forwards to the backend's flush and returns its error unchanged.
    pub async fn flush(&self) -> Result<(), ClientError> {
        self.sink.flush().await
    }
}

impl fmt::Debug for SinkWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkWriter").field("tee", &self.tee).finish_non_exhaustive()
    }
}

impl RecordWriter for SinkWriter {
    fn write_record(&self, buf: &[u8]) -> io::Result<usize> {
        SinkWriter::write(self, buf)
    }
}

impl LevelWriter for SinkWriter {
    fn write_level(&self, level: Level, buf: &[u8]) -> io::Result<usize> {
        SinkWriter::write_level(self, level, buf)
    }
}
