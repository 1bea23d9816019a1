//! Line sources for a run: child pipes and detached log files.
//!
//! The server (a Unity binary) can emit non-UTF8 bytes. `BufReader::lines()`
//! would end the reader on invalid UTF-8, so lines are read as bytes and
//! decoded lossily.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Strip the trailing `\n` / `\r\n` and decode lossily.
fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && buf[end - 1] == b'\r' {
            end -= 1;
        }
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Forward every line of `stream` to `tx` until EOF.
pub(crate) fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    stream_type: &'static str,
    tx: mpsc::Sender<String>,
) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if tx.send(decode_line(&buf)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(%stream_type, error = %e, "log stream reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(%stream_type, "log stream reader task exiting");
    });
}

/// Follow `path` from byte `offset`, forwarding complete lines.
///
/// Polls every `interval` at EOF. On `cancel` the file is read to EOF one
/// last time (including a trailing partial line) before the task exits and
/// drops `tx`.
pub(crate) fn spawn_file_tail(
    path: PathBuf,
    offset: u64,
    interval: Duration,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot open server log for tailing");
                return;
            }
        };
        if let Err(e) = file.seek(SeekFrom::Start(offset)).await {
            warn!(path = %path.display(), error = %e, "Cannot seek server log");
            return;
        }

        let mut reader = BufReader::new(file);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        let mut finishing = false;

        loop {
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    if finishing {
                        if !buf.is_empty() {
                            let _ = tx.send(decode_line(&buf)).await;
                        }
                        break;
                    }
                    tokio::select! {
                        () = tokio::time::sleep(interval) => {}
                        () = cancel.cancelled() => finishing = true,
                    }
                }
                Ok(_) => {
                    // A partial line at EOF stays in `buf` until completed
                    if buf.ends_with(b"\n") {
                        if tx.send(decode_line(&buf)).await.is_err() {
                            break;
                        }
                        buf.clear();
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Server log tail exiting due to read error");
                    break;
                }
            }
        }

        debug!(path = %path.display(), "log tail task exiting");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn decode_strips_line_endings() {
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"bad \xff byte\n"), "bad \u{fffd} byte");
    }

    #[tokio::test]
    async fn stream_reader_forwards_lines_in_order() {
        let (tx, mut rx) = mpsc::channel(16);
        spawn_stream_reader(&b"one\ntwo\r\nthree"[..], "stdout", tx);

        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        assert_eq!(rx.recv().await.as_deref(), Some("two"));
        assert_eq!(rx.recv().await.as_deref(), Some("three"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn tail_follows_appended_lines_from_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valheim-2026-01-01.log");
        std::fs::write(&path, "old line\n").unwrap();
        let offset = std::fs::metadata(&path).unwrap().len();

        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        spawn_file_tail(
            path.clone(),
            offset,
            Duration::from_millis(10),
            tx,
            cancel.clone(),
        );

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap();
        file.write_all(b"new line\npart").await.unwrap();
        file.flush().await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("new line"));

        file.write_all(b"ial\ntrailing").await.unwrap();
        file.flush().await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("partial"));

        cancel.cancel();
        assert_eq!(rx.recv().await.as_deref(), Some("trailing"));
        assert_eq!(rx.recv().await, None);
    }
}
