//! Append-only log of cache mutations.
//!
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [record 1: codec-framed LogEntry]
//! [record 2: codec-framed LogEntry]
//! ...
//! ```
//!
//! Replaying the log from the start rebuilds the cache. Compaction replaces
//! the whole file with one `Upsert` per live row, written to a temporary
//! file first and renamed over the log.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Result as IoResult, Seek, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CachedEntity;

use super::codec;

/// One logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the log, starting at 1; restarts after compaction.
    pub sequence: u64,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// The mutation.
    pub op: LogOp,
}

/// The mutation a [`LogEntry`] records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogOp {
    /// Row written (insert or replace).
    Upsert(CachedEntity),
    /// Every row removed.
    Purge,
}

/// Append-only cache log. Not internally synchronized.
#[derive(Debug)]
pub struct CacheLog {
    path: PathBuf,
    writer: BufWriter<File>,
    sequence: u64,
    sync_on_write: bool,
}

impl CacheLog {
    /// Opens the log at `path`, creating it with a header if it is new.
    ///
    /// Returns the log and the entries already in it. A record cut short at
    /// the end of the file (a crash mid-append) is dropped and the file is
    /// truncated to the last complete record.
    ///
    /// # Errors
    ///
    /// I/O failures, a bad header, or a corrupt record before the tail.
    pub fn open(path: &Path, sync_on_write: bool) -> IoResult<(Self, Vec<LogEntry>)> {
        let is_new = fs::metadata(path).map_or(true, |m| m.len() == 0);
        if is_new {
            let mut file = File::create(path)?;
            codec::write_header(&mut file)?;
            file.sync_all()?;
        }

        let (entries, valid_len) = Self::read_entries(path)?;
        let file = OpenOptions::new().write(true).open(path)?;
        if file.metadata()?.len() > valid_len {
            tracing::warn!(path = %path.display(), valid_len, "dropping incomplete record at end of cache log");
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        drop(file);

        let sequence = entries.last().map_or(0, |e| e.sequence);
        let writer = BufWriter::new(OpenOptions::new().append(true).open(path)?);
        Ok((
            Self {
                path: path.to_path_buf(),
                writer,
                sequence,
                sync_on_write,
            },
            entries,
        ))
    }

    fn read_entries(path: &Path) -> IoResult<(Vec<LogEntry>, u64)> {
        let mut reader = BufReader::new(File::open(path)?);
        codec::read_header(&mut reader)?;
        let mut entries = Vec::new();
        let mut valid_len = reader.stream_position()?;
        loop {
            match codec::decode::<LogEntry>(&mut reader) {
                Ok(entry) => {
                    entries.push(entry);
                    valid_len = reader.stream_position()?;
                }
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
        }
        Ok((entries, valid_len))
    }

    /// Appends `op`, returning its sequence number.
    pub fn append(&mut self, op: LogOp) -> IoResult<u64> {
        let entry = LogEntry {
            sequence: self.sequence + 1,
            timestamp: Utc::now(),
            op,
        };
        let encoded = codec::encode(&entry)?;
        self.writer.write_all(&encoded)?;
        self.writer.flush()?;
        if self.sync_on_write {
            self.writer.get_ref().sync_data()?;
        }
        self.sequence = entry.sequence;
        Ok(entry.sequence)
    }

    /// Replaces the log with one `Upsert` per row in `rows`.
    pub fn rewrite<'a>(&mut self, rows: impl IntoIterator<Item = &'a CachedEntity>) -> IoResult<()> {
        let tmp_path = self.path.with_extension("log.tmp");
        let mut sequence = 0;
        let mut tmp = BufWriter::new(File::create(&tmp_path)?);
        codec::write_header(&mut tmp)?;
        for row in rows {
            sequence += 1;
            let entry = LogEntry {
                sequence,
                timestamp: Utc::now(),
                op: LogOp::Upsert(row.clone()),
            };
            tmp.write_all(&codec::encode(&entry)?)?;
        }
        // This handle outlives the rename and becomes the writer.
        let tmp = tmp.into_inner().map_err(std::io::IntoInnerError::into_error)?;
        tmp.sync_all()?;
        self.writer.flush()?;
        fs::rename(&tmp_path, &self.path)?;
        self.writer = BufWriter::new(tmp);
        self.sequence = sequence;
        Ok(())
    }

    /// Sequence number of the last entry.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Current file size in bytes.
    pub fn size_bytes(&self) -> IoResult<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }
}
