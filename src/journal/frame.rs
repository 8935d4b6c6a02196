//! Journal frame encoding

use std::io;

use super::checksum::compute_checksum;

/// Length prefix + sequence number
pub(crate) const HEADER_SIZE: usize = 4 + 8;
/// Trailing checksum
pub(crate) const TRAILER_SIZE: usize = 4;
/// Smallest well-formed frame (empty payload)
pub(crate) const MIN_FRAME_SIZE: usize = HEADER_SIZE + TRAILER_SIZE;

/// One journal frame: a sequence number and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalFrame {
    /// Position in the journal, starting at 1
    pub sequence: u64,
    /// Encoded entry
    pub payload: Vec<u8>,
}

impl JournalFrame {
    pub fn new(sequence: u64, payload: Vec<u8>) -> Self {
        Self { sequence, payload }
    }

    /// Encodes the frame, checksum last.
    pub fn serialize(&self) -> Vec<u8> {
        let total = MIN_FRAME_SIZE + self.payload.len();
        let mut buf = Vec::with_capacity(total);
        buf.extend_from_slice(&(total as u32).to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        let checksum = compute_checksum(&buf[4..]);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// Decodes one frame from the start of `data`, verifying its checksum.
    ///
    /// Returns the frame and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "frame shorter than header"));
        }

        let total = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if total < MIN_FRAME_SIZE || total > data.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid frame length {}", total),
            ));
        }

        let body = &data[4..total - TRAILER_SIZE];
        let stored = u32::from_le_bytes([
            data[total - 4],
            data[total - 3],
            data[total - 2],
            data[total - 1],
        ]);
        let computed = compute_checksum(body);
        if stored != computed {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("checksum mismatch: stored {:08x}, computed {:08x}", stored, computed),
            ));
        }

        let mut seq = [0u8; 8];
        seq.copy_from_slice(&body[..8]);
        let frame = Self {
            sequence: u64::from_le_bytes(seq),
            payload: body[8..].to_vec(),
        };
        Ok((frame, total))
    }
}
