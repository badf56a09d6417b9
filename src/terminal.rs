//! Human-readable tee for interactive terminals.
//!
//! `console_writer_if_terminal` picks a `ConsoleWriter` when the stream is a
//! terminal and a `Discard` writer otherwise: redirected output is expected to
//! reach the backend through the sink, not as a formatted duplicate.

use crate::domain::Level;
use crate::sink::{LevelWriter, RecordWriter, Tee};
use chrono::DateTime;
use console::Style;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, IsTerminal, Write};

/// An output stream that can tell whether it is attached to a terminal.
pub trait TerminalStream: Write + Send + 'static {
    fn is_terminal(&self) -> bool;
}

impl TerminalStream for io::Stdout {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }
}

impl TerminalStream for io::Stderr {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }
}

impl TerminalStream for File {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }
}

/// Returns a console tee writing to `stream` if it is a terminal, otherwise a tee that drops everything.
pub fn console_writer_if_terminal<S: TerminalStream>(stream: S, colorful: bool) -> Tee {
    if stream.is_terminal() {
        Tee::leveled(ConsoleWriter::new(stream, colorful))
    } else {
        Tee::leveled(Discard)
    }
}

/// Renders JSON records as `HH:MM:SS LVL target: message key=value ...`.
pub struct ConsoleWriter<W> {
    out: Mutex<W>,
    colorful: bool,
}

impl<W: Write + Send> ConsoleWriter<W> {
    pub fn new(out: W, colorful: bool) -> Self {
        Self {
            out: Mutex::new(out),
            colorful,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, level: Option<Level>, buf: &[u8]) -> io::Result<usize> {
        let line = self.render(level, buf);
        let mut out = self.out.lock();
        out.write_all(line.as_bytes())?;
        out.flush()?;
        Ok(buf.len())
    }

    fn render(&self, level: Option<Level>, buf: &[u8]) -> String {
        let Ok(mut record) = serde_json::from_slice::<Map<String, Value>>(buf) else {
            let text = String::from_utf8_lossy(buf);
            return format!("{}\n", text.trim_end());
        };

        let mut parts: Vec<String> = Vec::new();

        if let Some(time) = take_string(&mut record, &["timestamp", "time"]) {
            let time = DateTime::parse_from_rfc3339(&time)
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or(time);
            parts.push(self.paint(Style::new().dim(), &time));
        }

        let record_level = take_string(&mut record, &["level"]).and_then(|l| l.parse::<Level>().ok());
        let level = level.or(record_level).unwrap_or(Level::NoLevel);
        parts.push(self.paint(level_style(level), level_abbreviation(level)));

        if let Some(target) = take_string(&mut record, &["target"]) {
            parts.push(self.paint(Style::new().dim(), &format!("{target}:")));
        }

        if let Some(message) = take_string(&mut record, &["message", "msg"]) {
            parts.push(message);
        }

        let mut fields: Vec<_> = record.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in fields {
            let style = if key == "error" || key == "err" {
                Style::new().red()
            } else {
                Style::new().cyan()
            };
            parts.push(format!("{}{}", self.paint(style, &format!("{key}=")), render_value(&value)));
        }

        let mut line = parts.join(" ");
        line.push('\n');
        line
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.colorful {
            // The stream was already checked by `console_writer_if_terminal`.
            style.force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl<W: Write + Send> RecordWriter for ConsoleWriter<W> {
    fn write_record(&self, buf: &[u8]) -> io::Result<usize> {
        self.emit(None, buf)
    }
}

impl<W: Write + Send> LevelWriter for ConsoleWriter<W> {
    fn write_level(&self, level: Level, buf: &[u8]) -> io::Result<usize> {
        self.emit(Some(level), buf)
    }
}

/// Accepts every write and drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl RecordWriter for Discard {
    fn write_record(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
}

impl LevelWriter for Discard {
    fn write_level(&self, _level: Level, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
}

fn take_string(record: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.remove(*key)? {
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) if !s.is_empty() && !s.contains(char::is_whitespace) => s.clone(),
        other => other.to_string(),
    }
}

fn level_abbreviation(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
        Level::Fatal => "FTL",
        Level::Panic => "PNC",
        Level::NoLevel => "???",
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Trace => Style::new().magenta(),
        Level::Debug => Style::new().yellow(),
        Level::Info => Style::new().green(),
        Level::Warn => Style::new().red(),
        Level::Error | Level::Fatal | Level::Panic => Style::new().red().bold(),
        Level::NoLevel => Style::new(),
    }
}
