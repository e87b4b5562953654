// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn job() -> JobId {
    JobId::new("42")
}

fn at(stdout: u64, stderr: u64) -> OutputPosition {
    OutputPosition { stdout, stderr }
}

#[tokio::test]
async fn reads_from_offset() {
    let remote = FakeRemoteAdapter::new();
    remote.append_stdout("42", "line one\nline two\n");

    let chunks = remote
        .get_new_output(&job(), "h", at(9, 0), OutputChannel::Stdout)
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].stream, OutputStream::Stdout);
    assert_eq!(chunks[0].data, b"line two\n");
    assert_eq!(chunks[0].new_offset, 18);
    assert_eq!(chunks[0].start_offset(), 9);
    assert!(!chunks[0].truncated);
}

#[tokio::test]
async fn reports_truncation_and_rereads_from_start() {
    let remote = FakeRemoteAdapter::new();
    remote.append_stdout("42", "0123456789\n");
    remote.replace_stdout("42", "new\n");

    let chunks = remote
        .get_new_output(&job(), "h", at(11, 0), OutputChannel::Stdout)
        .await
        .unwrap();
    assert!(chunks[0].truncated);
    assert_eq!(chunks[0].data, b"new\n");
    assert_eq!(chunks[0].new_offset, 4);
    assert_eq!(chunks[0].start_offset(), 0);
}

#[tokio::test]
async fn both_channel_reads_each_stream_from_its_own_offset() {
    let remote = FakeRemoteAdapter::new();
    remote.append_stdout("42", "out\n");
    remote.append_stderr("42", "err\n");
    remote.append_stdout("42", "more out\n");

    let chunks = remote
        .get_new_output(&job(), "h", at(4, 4), OutputChannel::Both)
        .await
        .unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].stream, OutputStream::Stdout);
    assert_eq!(chunks[0].data, b"more out\n");
    assert_eq!(chunks[1].stream, OutputStream::Stderr);
    assert!(chunks[1].data.is_empty());
    assert_eq!(chunks[1].new_offset, 4);

    let chunks = remote
        .get_new_output(&job(), "h", at(0, 0), OutputChannel::Stderr)
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].data, b"err\n");
}

#[tokio::test]
async fn injected_failures_are_consumed() {
    let remote = FakeRemoteAdapter::new();
    remote.fail_next_reads(2);

    for _ in 0..2 {
        assert!(remote
            .get_new_output(&job(), "h", at(0, 0), OutputChannel::Stdout)
            .await
            .is_err());
    }
    assert!(remote
        .get_new_output(&job(), "h", at(0, 0), OutputChannel::Stdout)
        .await
        .is_ok());
    assert_eq!(remote.read_count(), 3);
}

#[tokio::test]
async fn run_command_records_and_returns_result() {
    let remote = FakeRemoteAdapter::new();
    remote.set_command_result(3, "out", "err");

    let output = remote
        .run_command(&job(), "h", "echo hi", Duration::from_secs(120))
        .await
        .unwrap();
    assert_eq!(output.exit_code, 3);
    assert!(!output.success());
    assert_eq!(remote.commands(), vec!["echo hi".to_string()]);
}
