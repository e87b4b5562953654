// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL write-ahead log of store mutations.
//!
//! Every mutation is appended before it is applied to the in-memory state,
//! so recovery is snapshot + replay of later entries. Appends are grouped:
//! the store fsyncs right away only for ops that must survive a crash on
//! their own, and otherwise when [`Wal::needs_flush`] says so.
//!
//! Each entry is a single line of JSON: `{"seq":N,"op":{...}}\n`

use crate::state::StoreOp;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// Flush interval for group commit
const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Maximum entries to buffer before forcing flush
const FLUSH_THRESHOLD: usize = 100;

/// Errors that can occur in Wal operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialization helper for writing WAL entries without cloning the op.
#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    op: &'a StoreOp,
}

#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    op: StoreOp,
}

/// A single WAL entry with sequence number
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub op: StoreOp,
}

/// Append-only JSONL log.
///
/// Entries are buffered by [`Wal::append`] and made durable by
/// [`Wal::flush`], which writes them with a single fsync.
pub struct Wal {
    file: File,
    path: PathBuf,
    /// Highest sequence number assigned
    write_seq: u64,
    /// Serialized lines waiting to be flushed (without trailing newline)
    write_buffer: Vec<Vec<u8>>,
    last_flush: Instant,
}

impl Wal {
    /// Open or create a WAL at the given path.
    ///
    /// A corrupt tail (partial write from a crash, garbage line) is cut off:
    /// the original file is rotated to `.bak` and a clean log holding the
    /// valid prefix takes its place.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = Self::open_append(path)?;
        let (valid_lines, corrupt) = Self::read_valid_lines(&file)?;

        if corrupt {
            drop(file);

            let bak_path = crate::snapshot::rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = valid_lines.len(),
                "Corrupt WAL detected, rotating to .bak and preserving valid entries",
            );
            std::fs::rename(path, &bak_path)?;

            {
                let mut new_file = File::create(path)?;
                for line in &valid_lines {
                    new_file.write_all(line.as_bytes())?;
                    new_file.write_all(b"\n")?;
                }
                new_file.sync_all()?;
            }

            file = Self::open_append(path)?;
        }

        let write_seq = valid_lines
            .iter()
            .filter_map(|l| serde_json::from_str::<WalRecord>(l).ok())
            .map(|r| r.seq)
            .max()
            .unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_owned(),
            write_seq,
            write_buffer: Vec::new(),
            last_flush: Instant::now(),
        })
    }

    fn open_append(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
    }

    /// Read all parseable lines, stopping at the first corrupt entry.
    ///
    /// Returns the lines and whether anything past them was unreadable.
    fn read_valid_lines(file: &File) -> Result<(Vec<String>, bool), WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut valid_lines = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok((valid_lines, true)),
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if serde_json::from_str::<WalRecord>(trimmed).is_err() {
                return Ok((valid_lines, true));
            }
            valid_lines.push(trimmed.to_string());
        }

        Ok((valid_lines, false))
    }

    /// Append an op to the write buffer.
    ///
    /// Returns the assigned sequence number. The op is NOT durable until
    /// `flush()` is called.
    pub fn append(&mut self, op: &StoreOp) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let json_bytes = serde_json::to_vec(&WalRecordRef { seq, op })?;
        self.write_seq = seq;
        self.write_buffer.push(json_bytes);
        Ok(seq)
    }

    /// Buffered entries are due: the flush interval elapsed or the buffer
    /// is full
    pub fn needs_flush(&self) -> bool {
        !self.write_buffer.is_empty()
            && (self.last_flush.elapsed() >= FLUSH_INTERVAL
                || self.write_buffer.len() >= FLUSH_THRESHOLD)
    }

    /// Entries appended but not yet flushed
    pub fn pending(&self) -> usize {
        self.write_buffer.len()
    }

    /// Flush all buffered entries to disk with a single fsync.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }

        for mut json_bytes in self.write_buffer.drain(..) {
            json_bytes.push(b'\n');
            self.file.write_all(&json_bytes)?;
        }

        self.file.sync_all()?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Highest sequence number assigned so far
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Drop entries with a sequence number below `seq`.
    ///
    /// Called after a snapshot covering them has been saved. The kept lines
    /// are written to a temp file which then replaces the log.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;

        let tmp_path = self.path.with_extension("tmp");
        let (lines, _) = Self::read_valid_lines(&self.file)?;

        {
            let mut tmp_file = File::create(&tmp_path)?;
            for line in &lines {
                let keep = serde_json::from_str::<WalRecord>(line)
                    .map(|r| r.seq >= seq)
                    .unwrap_or(false);
                if keep {
                    tmp_file.write_all(line.as_bytes())?;
                    tmp_file.write_all(b"\n")?;
                }
            }
            tmp_file.sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        self.file = Self::open_append(&self.path)?;
        Ok(())
    }

    /// All entries with a sequence number above `seq`, in log order.
    ///
    /// Used for recovery (replaying on top of a snapshot).
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        let (lines, _) = Self::read_valid_lines(&self.file)?;
        let mut entries = Vec::new();
        for line in lines {
            let record: WalRecord = serde_json::from_str(&line)?;
            if record.seq > seq {
                entries.push(WalEntry {
                    seq: record.seq,
                    op: record.op,
                });
            }
        }
        Ok(entries)
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush WAL on close");
        }
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
