// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SCONTROL: &str = "JobId=4242 JobName=train\n   UserId=alice(1000) GroupId=alice(1000)\n   \
    WorkDir=/home/alice/run\n   StdErr=/home/alice/run/train-4242.err\n   StdIn=/dev/null\n   \
    StdOut=/home/alice/run/train-4242.out\n   Power=\n";

#[test]
fn parses_separate_output_paths() {
    let paths = parse_output_paths(SCONTROL).unwrap();
    assert_eq!(paths.stdout, "/home/alice/run/train-4242.out");
    assert_eq!(paths.stderr, "/home/alice/run/train-4242.err");
}

#[test]
fn missing_stderr_means_merged_streams() {
    let paths = parse_output_paths("JobId=1 StdOut=/tmp/slurm-1.out").unwrap();
    assert_eq!(paths.stderr, "/tmp/slurm-1.out");
    assert_eq!(
        paths.for_channel(OutputChannel::Both),
        vec![(OutputStream::Stdout, "/tmp/slurm-1.out")]
    );
    assert_eq!(
        paths.for_channel(OutputChannel::Stderr),
        vec![(OutputStream::Stderr, "/tmp/slurm-1.out")]
    );
}

#[test]
fn missing_stdout_is_none() {
    assert_eq!(parse_output_paths("JobId=1 StdOut=(null)"), None);
    assert_eq!(parse_output_paths(""), None);
}

#[test]
fn both_channel_reads_two_files_when_split() {
    let paths = parse_output_paths(SCONTROL).unwrap();
    assert_eq!(
        paths.for_channel(OutputChannel::Both),
        vec![
            (OutputStream::Stdout, "/home/alice/run/train-4242.out"),
            (OutputStream::Stderr, "/home/alice/run/train-4242.err"),
        ]
    );
}

#[test]
fn read_script_quotes_paths_and_embeds_offset() {
    let script = read_script("/tmp/my out.log", 128);
    assert!(script.contains("'/tmp/my out.log'"));
    assert!(script.contains("start=128;"));
    assert!(script.starts_with("total=$(stat"));
}

#[test]
fn parses_read_output_from_offset() {
    let chunk = parse_read_output(b"20\nsecond line\n", OutputStream::Stderr, 8).unwrap();
    assert_eq!(chunk.stream, OutputStream::Stderr);
    assert_eq!(chunk.data, b"second line\n");
    assert_eq!(chunk.new_offset, 20);
    assert!(!chunk.truncated);
}

#[test]
fn parses_truncated_read_output() {
    let chunk = parse_read_output(b"4\nnew\n", OutputStream::Stdout, 100).unwrap();
    assert!(chunk.truncated);
    assert_eq!(chunk.new_offset, 4);
    assert_eq!(chunk.start_offset(), 0);
}

#[test]
fn rejects_read_output_without_header() {
    assert!(parse_read_output(b"", OutputStream::Stdout, 0).is_err());
    assert!(parse_read_output(b"abc\ndata", OutputStream::Stdout, 0).is_err());
}

#[yare::parameterized(
    plain   = { "4242\n", Some("4242") },
    cluster = { "4242;gpu\n", Some("4242") },
    array   = { "4242_3", Some("4242_3") },
    empty   = { "", None },
    junk    = { "Submitted batch job $(rm)", None },
)]
fn parses_submitted_job_id(stdout: &str, expected: Option<&str>) {
    assert_eq!(
        parse_submitted_job_id(stdout).map(|j| j.to_string()),
        expected.map(str::to_string)
    );
}

#[yare::parameterized(
    numeric = { "1234", true },
    array   = { "1234_7", true },
    step    = { "1234.batch", true },
    empty   = { "", false },
    inject  = { "1; rm -rf ~", false },
    subst   = { "$(id)", false },
)]
fn job_id_validation(raw: &str, ok: bool) {
    assert_eq!(check_job_id(&JobId::new(raw)).is_ok(), ok);
}
