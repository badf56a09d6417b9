use super::SinkWriter;
use crate::domain::Level;
use std::io;
use tracing::Metadata;
use tracing_subscriber::fmt::MakeWriter;

/// Per-event writer handed to `tracing-subscriber`'s formatter.
///
/// Created through `make_writer_for`, it carries the event's level so the
/// formatted record takes the leveled path.
#[derive(Debug)]
pub struct SinkHandle<'a> {
    writer: &'a SinkWriter,
    level: Option<Level>,
}

impl io::Write for SinkHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.level {
            Some(level) => self.writer.write_level(level, buf),
            None => self.writer.write(buf),
        }
    }

    // Delivery is the backend's business; `SinkWriter::flush` is the real flush.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SinkWriter {
    type Writer = SinkHandle<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkHandle {
            writer: self,
            level: None,
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        SinkHandle {
            writer: self,
            level: Some(Level::from(*meta.level())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;
    use crate::test_support::RecordingSink;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_tracing_events_arrive_with_mapped_severity() {
        let sink = RecordingSink::new();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(SinkWriter::new(sink.clone())),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(order_id = 42, "payment retried");
            tracing::error!("payment failed");
            tracing::trace!("very chatty");
        });

        let entries = sink.entries();
        // The default fmt layer has no level filter of its own, so TRACE gets through too.
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert_eq!(entries[1].severity, Severity::Error);
        assert_eq!(entries[2].severity, Severity::Default);

        let record: serde_json::Value = serde_json::from_slice(entries[0].payload.encode()).unwrap();
        assert_eq!(record["message"], "payment retried");
        assert_eq!(record["order_id"], 42);
        assert_eq!(record["level"], "WARN");
    }

    #[test]
    fn test_plain_make_writer_uses_default_severity() {
        use std::io::Write;

        let sink = RecordingSink::new();
        let writer = SinkWriter::new(sink.clone());
        let mut handle = writer.make_writer();

        assert_eq!(handle.write(b"{\"a\":1}").unwrap(), 7);
        handle.flush().unwrap();
        assert_eq!(sink.entries()[0].severity, Severity::Default);
    }
}
