//! Line forwarding from the renderer's output streams to the shell console.

use std::io::Write;
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

/// Consecutive read errors after which a stream is given up.
const MAX_READ_ERRORS: usize = 8;

/// Renderer output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// Destination of forwarded renderer lines.
pub trait OutputSink: Send + Sync + 'static {
    fn line(&self, stream: StreamKind, line: &str);
}

pub fn format_native_line(tag: &str, line: &str) -> String {
    format!("{tag} {line}")
}

/// Prints tagged lines on the shell's stdout.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    tag: String,
}

impl ConsoleSink {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl OutputSink for ConsoleSink {
    fn line(&self, stream: StreamKind, line: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", format_native_line(&self.tag, line)) {
            debug!(event = "shell.console.write_failed", stream = %stream, error = %e);
        }
        debug!(
            event = "shell.renderer.output_line",
            stream = %stream,
            bytes = line.len()
        );
    }
}

/// Keeps tagged lines in memory.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    tag: String,
    lines: Arc<Mutex<Vec<(StreamKind, String)>>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            lines: Arc::default(),
        }
    }

    pub fn lines(&self) -> Vec<(StreamKind, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl OutputSink for MemorySink {
    fn line(&self, stream: StreamKind, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((stream, format_native_line(&self.tag, line)));
        }
    }
}

/// Strip the line terminator and decode lossily.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Read `reader` line by line into `sink` until end of stream.
///
/// Lines are split on `\n` and decoded lossily, so bytes that are not UTF-8
/// never stop forwarding. The stream is drained until EOF; only repeated read
/// errors give it up. Returns the number of forwarded lines.
pub async fn forward_lines<R, S>(reader: R, stream: StreamKind, sink: Arc<S>) -> usize
where
    R: AsyncRead + Unpin,
    S: OutputSink + ?Sized,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    let mut errors = 0;

    loop {
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                if !buf.is_empty() {
                    sink.line(stream, &decode_line(&buf));
                    count += 1;
                }
                break;
            }
            Ok(_) => {
                errors = 0;
                if buf.ends_with(b"\n") {
                    sink.line(stream, &decode_line(&buf));
                    count += 1;
                    buf.clear();
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                errors += 1;
                warn!(
                    event = "shell.renderer.output_read_failed",
                    stream = %stream,
                    attempt = errors,
                    error = %e
                );
                if errors >= MAX_READ_ERRORS {
                    break;
                }
            }
        }
    }

    debug!(
        event = "shell.renderer.output_closed",
        stream = %stream,
        lines = count
    );
    count
}
