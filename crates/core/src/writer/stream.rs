//! Chunk stream layout shared by the built-in writers.
//!
//! Each chunk is stored as a fixed header followed by its payload:
//!
//! | field        | size | encoding      |
//! |--------------|------|---------------|
//! | track number | 4    | big endian    |
//! | timestamp µs | 8    | big endian    |
//! | key flag     | 1    | 0 or 1        |
//! | payload len  | 4    | big endian    |

use bytes::{BufMut, BytesMut};

use super::error::WriterError;
use super::traits::{OutputTrack, WriterProgress};
use crate::media::CodedSample;

/// Size of the header written before every payload.
pub const CHUNK_HEADER_LEN: usize = 17;

/// Output tracks and running totals of one writer.
#[derive(Debug, Default)]
pub(crate) struct ChunkStream {
    tracks: Vec<OutputTrack>,
    bytes_written: u64,
    milliseconds_written: u64,
}

impl ChunkStream {
    /// Registers a track. Track numbers start at 1.
    pub fn add_track(&mut self, track: OutputTrack) -> u32 {
        self.tracks.push(track);
        self.tracks.len() as u32
    }

    pub fn tracks(&self) -> &[OutputTrack] {
        &self.tracks
    }

    /// Encodes a chunk into `buf` after checking its track number.
    pub fn encode(&self, chunk: &CodedSample, buf: &mut BytesMut) -> Result<(), WriterError> {
        if chunk.track_id == 0 || chunk.track_id as usize > self.tracks.len() {
            return Err(WriterError::UnknownTrack {
                track_id: chunk.track_id,
            });
        }
        let len = u32::try_from(chunk.data.len())
            .map_err(|_| WriterError::write_failed(chunk.track_id, "chunk too large"))?;

        buf.reserve(CHUNK_HEADER_LEN + chunk.data.len());
        buf.put_u32(chunk.track_id);
        buf.put_u64(chunk.timestamp_us);
        buf.put_u8(u8::from(chunk.key));
        buf.put_u32(len);
        buf.put_slice(&chunk.data);
        Ok(())
    }

    /// Advances the totals after `written` bytes of `chunk` were stored.
    pub fn record(&mut self, chunk: &CodedSample, written: usize) -> WriterProgress {
        self.bytes_written += written as u64;
        self.milliseconds_written = self.milliseconds_written.max(chunk.end_ms());
        self.progress()
    }

    pub fn progress(&self) -> WriterProgress {
        WriterProgress {
            bytes_written: self.bytes_written,
            milliseconds_written: self.milliseconds_written,
        }
    }
}
