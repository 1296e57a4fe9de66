// src/streaming.rs

//! Concurrent draining of Terraform's stdout/stderr.
//!
//! The execution client writes into the writer halves of two in-memory
//! pipes ([`OutputPipes`]); a [`LogStreamer`] reads the other halves line by
//! line on two background tasks:
//!
//! - stdout lines are logged at info level,
//! - stderr lines are logged and appended to an [`ErrorBuffer`], which is
//!   prepended to the error if the operation fails.
//!
//! Both readers stop when the streamer is cancelled or dropped, even if the
//! writer side never closes.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, DuplexStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Append-only accumulator for stderr lines of one operation.
#[derive(Debug, Clone, Default)]
pub struct ErrorBuffer {
    inner: Arc<Mutex<String>>,
}

impl ErrorBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a whole line.
    pub fn append_line(&self, line: &str) {
        let mut buf = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buf.push_str(line);
        buf.push('\n');
    }

    /// Everything captured so far, without the trailing newline.
    pub fn contents(&self) -> String {
        let buf = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buf.trim_end_matches('\n').to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

/// Writer halves handed to the execution client.
#[derive(Debug)]
pub struct OutputPipes {
    pub stdout: DuplexStream,
    pub stderr: DuplexStream,
}

/// Reader halves consumed by a [`LogStreamer`].
#[derive(Debug)]
pub struct OutputReaders {
    pub stdout: DuplexStream,
    pub stderr: DuplexStream,
}

/// Create the stdout/stderr pipe pairs for one operation.
pub fn output_pipes() -> (OutputPipes, OutputReaders) {
    let (stdout_w, stdout_r) = tokio::io::duplex(PIPE_CAPACITY);
    let (stderr_w, stderr_r) = tokio::io::duplex(PIPE_CAPACITY);
    (
        OutputPipes {
            stdout: stdout_w,
            stderr: stderr_w,
        },
        OutputReaders {
            stdout: stdout_r,
            stderr: stderr_r,
        },
    )
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Handle to the two background readers of one operation.
///
/// Dropping the handle cancels both readers.
#[derive(Debug)]
pub struct LogStreamer {
    cancel: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl LogStreamer {
    /// Start draining the reader halves of [`output_pipes`].
    pub fn start(readers: OutputReaders, buffer: ErrorBuffer) -> Self {
        Self::from_streams(readers.stdout, readers.stderr, buffer)
    }

    /// Start draining two arbitrary streams.
    pub fn from_streams<O, E>(stdout: O, stderr: E, buffer: ErrorBuffer) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let (cancel, cancel_rx) = watch::channel(false);

        let stdout_handle = tokio::spawn(drain_lines(
            stdout,
            Stream::Stdout,
            None,
            cancel_rx.clone(),
        ));
        let stderr_handle = tokio::spawn(drain_lines(
            stderr,
            Stream::Stderr,
            Some(buffer),
            cancel_rx,
        ));

        Self {
            cancel,
            handles: vec![stdout_handle, stderr_handle],
        }
    }

    /// Ask both readers to stop after their current line.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait up to `grace` for both readers to reach end of stream.
    ///
    /// Returns `false` if the grace period ran out first; the readers are
    /// then left to the cancellation issued on drop.
    pub async fn settle(&mut self, grace: Duration) -> bool {
        let handles = std::mem::take(&mut self.handles);
        let joined = tokio::time::timeout(grace, async move {
            for handle in handles {
                let _ = handle.await;
            }
        })
        .await;

        if joined.is_err() {
            debug!(grace_ms = grace.as_millis() as u64, "output readers did not settle in time");
        }
        joined.is_ok()
    }
}

impl Drop for LogStreamer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn drain_lines<R>(
    reader: R,
    stream: Stream,
    buffer: Option<ErrorBuffer>,
    mut cancel: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        if *cancel.borrow() {
            break;
        }

        buf.clear();
        tokio::select! {
            biased;

            _ = cancel.changed() => break,

            read = reader.read_until(b'\n', &mut buf) => match read {
                Ok(0) => break,
                Ok(_) => {
                    if *cancel.borrow() {
                        break;
                    }
                    let line = decode_line(&buf);
                    info!(target: "terraform", stream = %stream, "{}", line);
                    if let Some(buffer) = &buffer {
                        buffer.append_line(&line);
                    }
                }
                Err(e) => {
                    debug!(stream = %stream, error = %e, "output reader failed");
                    break;
                }
            },
        }
    }

    debug!(stream = %stream, "output reader ended");
}

/// Text of one raw line without its `\n` or `\r\n` terminator.
/// Invalid UTF-8 is replaced rather than rejected.
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}
