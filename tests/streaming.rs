// tests/streaming.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::time::Duration;

use tfapply::streaming::{ErrorBuffer, LogStreamer, output_pipes};
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn stderr_lines_are_buffered_stdout_lines_are_not() {
    init_tracing();
    let (mut pipes, readers) = output_pipes();
    let buffer = ErrorBuffer::new();
    let mut streamer = LogStreamer::start(readers, buffer.clone());

    pipes.stdout.write_all(b"Initializing...\n").await.unwrap();
    pipes.stderr.write_all(b"Error: one\nError: two\n").await.unwrap();
    pipes.stdout.write_all(b"done\n").await.unwrap();
    drop(pipes);

    assert!(with_timeout(streamer.settle(Duration::from_secs(2))).await);
    assert_eq!(buffer.contents(), "Error: one\nError: two");
}

#[tokio::test]
async fn last_line_without_newline_is_kept() {
    let (stdout_w, stdout_r) = tokio::io::duplex(1024);
    let (mut stderr_w, stderr_r) = tokio::io::duplex(1024);
    let buffer = ErrorBuffer::new();
    let mut streamer = LogStreamer::from_streams(stdout_r, stderr_r, buffer.clone());

    stderr_w.write_all(b"partial").await.unwrap();
    drop(stderr_w);
    drop(stdout_w);

    assert!(with_timeout(streamer.settle(Duration::from_secs(2))).await);
    assert_eq!(buffer.contents(), "partial");
}

#[tokio::test]
async fn invalid_utf8_line_does_not_stop_the_reader() {
    init_tracing();
    let (stdout_w, stdout_r) = tokio::io::duplex(1024);
    let (mut stderr_w, stderr_r) = tokio::io::duplex(1024);
    let buffer = ErrorBuffer::new();
    let mut streamer = LogStreamer::from_streams(stdout_r, stderr_r, buffer.clone());

    stderr_w
        .write_all(b"first\r\n\xff\xfe bad bytes\nError: module not found\n")
        .await
        .unwrap();
    drop(stderr_w);
    drop(stdout_w);

    assert!(with_timeout(streamer.settle(Duration::from_secs(2))).await);

    let lines: Vec<String> = buffer.contents().lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "first");
    assert!(lines[1].ends_with(" bad bytes"));
    assert!(lines[1].contains('\u{FFFD}'));
    assert_eq!(lines[2], "Error: module not found");
}

#[tokio::test]
async fn cancel_stops_readers_of_open_streams() {
    let (_stdout_w, stdout_r) = tokio::io::duplex(1024);
    let (_stderr_w, stderr_r) = tokio::io::duplex(1024);
    let mut streamer = LogStreamer::from_streams(stdout_r, stderr_r, ErrorBuffer::new());

    streamer.cancel();

    assert!(with_timeout(streamer.settle(Duration::from_secs(2))).await);
}

#[tokio::test]
async fn settle_gives_up_after_grace() {
    let (_stdout_w, stdout_r) = tokio::io::duplex(1024);
    let (_stderr_w, stderr_r) = tokio::io::duplex(1024);
    let mut streamer = LogStreamer::from_streams(stdout_r, stderr_r, ErrorBuffer::new());

    let settled = with_timeout(streamer.settle(Duration::from_millis(50))).await;
    assert!(!settled);
}

#[test]
fn error_buffer_appends_lines() {
    let buffer = ErrorBuffer::new();
    assert!(buffer.is_empty());

    buffer.append_line("first");
    buffer.clone().append_line("second");

    assert!(!buffer.is_empty());
    assert_eq!(buffer.contents(), "first\nsecond");
}
