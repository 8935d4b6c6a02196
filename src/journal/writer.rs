//! Journal writer
//!
//! - Append-only, single file, opened for append
//! - Optional fsync after every append (on by default)
//! - The sequence number only advances after a successful write

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::errors::{JournalError, JournalResult};
use super::frame::JournalFrame;
use super::reader::JournalReader;

pub struct JournalWriter {
    path: PathBuf,
    file: File,
    next_sequence: u64,
    sync: bool,
}

impl JournalWriter {
    /// Opens or creates the journal file at `path`.
    ///
    /// Parent directories are created when missing. An existing journal is
    /// scanned to find the next sequence number; a corrupt journal refuses
    /// to open.
    pub fn open(path: &Path, sync: bool) -> JournalResult<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    JournalError::append_failed(
                        format!("Failed to create journal directory: {}", dir.display()),
                        e,
                    )
                })?;
            }
        }

        let next_sequence = Self::determine_next_sequence(path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                JournalError::append_failed(format!("Failed to open journal: {}", path.display()), e)
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_sequence,
            sync,
        })
    }

    fn determine_next_sequence(path: &Path) -> JournalResult<u64> {
        match fs::metadata(path) {
            Ok(m) if m.len() == 0 => return Ok(1),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(1),
            Err(e) => {
                return Err(JournalError::append_failed("Failed to read journal metadata", e));
            }
        }

        let mut reader = JournalReader::open(path)?;
        while reader.read_next()?.is_some() {}
        Ok(reader.last_sequence_number() + 1)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_sequence_number(&self) -> u64 {
        self.next_sequence
    }

    /// Appends a raw payload, returning its sequence number.
    pub fn append(&mut self, payload: Vec<u8>) -> JournalResult<u64> {
        let sequence = self.next_sequence;
        let bytes = JournalFrame::new(sequence, payload).serialize();

        self.file.write_all(&bytes).map_err(|e| {
            JournalError::append_failed(format!("Failed to write journal frame {}", sequence), e)
        })?;

        if self.sync {
            self.file.sync_all().map_err(|e| {
                JournalError::fsync_failed(format!("fsync failed after journal frame {}", sequence), e)
            })?;
        }

        self.next_sequence += 1;
        Ok(sequence)
    }

    /// Encodes `entry` as JSON and appends it.
    pub fn append_entry<T: Serialize>(&mut self, entry: &T) -> JournalResult<u64> {
        let payload = serde_json::to_vec(entry).map_err(|e| {
            JournalError::append_failed(
                "Failed to encode journal entry",
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })?;
        self.append(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sequence_starts_at_one_and_increments() {
        let dir = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(&dir.path().join("j.log"), true).unwrap();
        assert_eq!(writer.append(b"a".to_vec()).unwrap(), 1);
        assert_eq!(writer.append(b"b".to_vec()).unwrap(), 2);
        assert_eq!(writer.next_sequence_number(), 3);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("j.log");
        {
            let mut writer = JournalWriter::open(&path, false).unwrap();
            writer.append(b"a".to_vec()).unwrap();
            writer.append(b"b".to_vec()).unwrap();
        }
        let mut writer = JournalWriter::open(&path, false).unwrap();
        assert_eq!(writer.append(b"c".to_vec()).unwrap(), 3);
    }
}
