use crate::protocol::RtmpHeader;
use crate::{ByteWriter, DEFAULT_CHUNK_SIZE};

/// Encoder for server-emitted messages.
///
/// Every message goes out as a Type-0 chunk; payloads larger than the
/// outgoing chunk size continue in Type-3 chunks. Only the one-byte basic
/// header form is produced, which covers the protocol (2) and command (3)
/// chunk streams the responder uses.
pub struct ChunkWriter {
    chunk_size: usize,
}

impl ChunkWriter {
    pub fn new() -> Self {
        ChunkWriter {
            chunk_size: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Apply a newly announced outgoing chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size;
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn write_message(&self, out: &mut ByteWriter, header: &RtmpHeader, payload: &[u8]) {
        debug_assert!(header.chunk_stream_id < 64);
        debug_assert_eq!(header.message_length as usize, payload.len());

        out.write_u8(header.chunk_stream_id as u8); // fmt 0
        out.write_u24(header.wire_timestamp());
        out.write_u24(payload.len() as u32);
        out.write_u8(header.message_type);
        out.write_u32_le(header.message_stream_id);
        if header.has_extended_timestamp() {
            out.write_u32(header.timestamp);
        }

        let first = payload.len().min(self.chunk_size);
        out.write_data(&payload[..first]);

        let mut offset = first;
        while offset < payload.len() {
            out.write_u8(0xC0 | header.chunk_stream_id as u8); // fmt 3
            let end = (offset + self.chunk_size).min(payload.len());
            out.write_data(&payload[offset..end]);
            offset = end;
        }
    }
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}
