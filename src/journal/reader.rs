//! Journal reader with strict corruption detection
//!
//! - Frames are read strictly in order from the first byte
//! - A bad checksum, a truncated frame, or a sequence gap halts the read
//! - Nothing is skipped and nothing is repaired

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::errors::{JournalError, JournalResult};
use super::frame::{JournalFrame, MIN_FRAME_SIZE};

/// Sequential reader over one journal file.
pub struct JournalReader {
    path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
    last_sequence: u64,
}

impl JournalReader {
    pub fn open(path: &Path) -> JournalResult<Self> {
        let file = File::open(path).map_err(|e| {
            JournalError::corruption(format!("Failed to open journal {}: {}", path.display(), e))
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| JournalError::corruption(format!("Failed to read journal metadata: {}", e)))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
            last_sequence: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Sequence number of the last frame read successfully, 0 before any.
    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence
    }

    /// Reads the next frame.
    ///
    /// `Ok(None)` means a clean end of file.
    pub fn read_next(&mut self) -> JournalResult<Option<JournalFrame>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_FRAME_SIZE as u64 {
            return Err(JournalError::corruption_at_offset(
                self.current_offset,
                format!("Truncated journal: {} trailing bytes", remaining),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            JournalError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read frame length: {}", e),
            )
        })?;
        let frame_length = u32::from_le_bytes(len_buf) as u64;

        if frame_length < MIN_FRAME_SIZE as u64 || frame_length > remaining {
            return Err(JournalError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Invalid frame length {} with {} bytes remaining",
                    frame_length, remaining
                ),
            ));
        }

        let mut buf = vec![0u8; frame_length as usize];
        buf[..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut buf[4..]).map_err(|e| {
            JournalError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read frame body: {}", e),
            )
        })?;

        let (frame, consumed) = JournalFrame::deserialize(&buf)
            .map_err(|e| JournalError::corruption_at_offset(self.current_offset, e.to_string()))?;

        let expected = self.last_sequence + 1;
        if frame.sequence != expected {
            return Err(JournalError::corruption_at_sequence(
                frame.sequence,
                format!("Non-sequential sequence number: expected {}, got {}", expected, frame.sequence),
            ));
        }

        self.current_offset += consumed as u64;
        self.last_sequence = frame.sequence;
        Ok(Some(frame))
    }

    /// Reads every remaining frame.
    pub fn read_all(&mut self) -> JournalResult<Vec<JournalFrame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.read_next()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

/// Reads and decodes every entry of the journal at `path`.
///
/// A missing file is an empty journal. A payload that does not decode is
/// corruption.
pub fn replay_entries<T: DeserializeOwned>(path: &Path) -> JournalResult<Vec<(u64, T)>> {
    match std::fs::metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(JournalError::corruption(format!(
                "Failed to stat journal {}: {}",
                path.display(),
                e
            )))
        }
    }

    let mut reader = JournalReader::open(path)?;
    let mut entries = Vec::new();
    while let Some(frame) = reader.read_next()? {
        let entry = serde_json::from_slice(&frame.payload).map_err(|e| {
            JournalError::corruption_at_sequence(frame.sequence, format!("Undecodable entry: {}", e))
        })?;
        entries.push((frame.sequence, entry));
    }
    Ok(entries)
}
