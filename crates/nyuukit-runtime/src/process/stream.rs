//! Async stream line readers (non-UTF8-safe).
//!
//! Helper tools and the poster can emit non-UTF8 bytes on stdout/stderr.
//! Using `BufReader::lines()` would terminate the reader task on invalid
//! UTF-8, so lines are read as bytes and decoded lossily.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Forward every line of `stream` into `tx` until EOF.
///
/// Trailing `\n` and `\r\n` are stripped. Progress bars that redraw with a
/// bare `\r` are split on `\r` as well so each redraw becomes a line.
pub fn spawn_line_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    stream_type: &'static str,
    tx: mpsc::UnboundedSender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }

                    for segment in buf.split(|b| *b == b'\r') {
                        let line = String::from_utf8_lossy(segment).to_string();
                        debug!(%stream_type, "{}", line);
                        // Keep draining after the consumer is gone so the child never blocks.
                        let _ = tx.send(line);
                    }
                }
                Err(e) => {
                    debug!(%stream_type, error = %e, "stream reader exiting due to read error");
                    break;
                }
            }
        }
    })
}
