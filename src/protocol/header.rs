use crate::protocol::constants::EXTENDED_TIMESTAMP;

/// Logical RTMP message header, one per message regardless of how many
/// chunks carried it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpHeader {
    pub chunk_stream_id: u32,
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type: u8,
    pub message_stream_id: u32,
}

impl RtmpHeader {
    pub fn new(
        chunk_stream_id: u32,
        timestamp: u32,
        message_length: u32,
        message_type: u8,
        message_stream_id: u32,
    ) -> Self {
        RtmpHeader {
            chunk_stream_id,
            timestamp,
            message_length,
            message_type,
            message_stream_id,
        }
    }

    /// Check if the timestamp needs the extended 32-bit field on the wire
    pub fn has_extended_timestamp(&self) -> bool {
        self.timestamp >= EXTENDED_TIMESTAMP
    }

    /// The 24-bit timestamp field value for the wire format
    pub fn wire_timestamp(&self) -> u32 {
        if self.has_extended_timestamp() {
            EXTENDED_TIMESTAMP
        } else {
            self.timestamp
        }
    }
}
