// Message types
pub const MSG_TYPE_SET_CHUNK_SIZE: u8 = 1;
pub const MSG_TYPE_ABORT: u8 = 2;
pub const MSG_TYPE_ACK: u8 = 3;
pub const MSG_TYPE_USER_CONTROL: u8 = 4;
pub const MSG_TYPE_WINDOW_ACK: u8 = 5;
pub const MSG_TYPE_SET_PEER_BW: u8 = 6;
pub const MSG_TYPE_AUDIO: u8 = 8;
pub const MSG_TYPE_VIDEO: u8 = 9;
pub const MSG_TYPE_DATA_AMF3: u8 = 15;
pub const MSG_TYPE_SHARED_OBJECT_AMF3: u8 = 16;
pub const MSG_TYPE_COMMAND_AMF3: u8 = 17;
pub const MSG_TYPE_DATA_AMF0: u8 = 18;
pub const MSG_TYPE_SHARED_OBJECT_AMF0: u8 = 19;
pub const MSG_TYPE_COMMAND_AMF0: u8 = 20;
pub const MSG_TYPE_AGGREGATE: u8 = 22;

// Chunk stream IDs used for server emissions
pub const CHUNK_STREAM_PROTOCOL: u32 = 2;
pub const CHUNK_STREAM_COMMAND: u32 = 3;

// User control event types
pub const EVENT_STREAM_BEGIN: u16 = 0;

// SetPeerBandwidth limit types
pub const LIMIT_HARD: u8 = 0;
pub const LIMIT_SOFT: u8 = 1;
pub const LIMIT_DYNAMIC: u8 = 2;

// Default values
pub const DEFAULT_CHUNK_SIZE: u32 = 128;
pub const DEFAULT_WINDOW_ACK_SIZE: u32 = 2_500_000;

// A 24-bit timestamp of all ones means a 32-bit extended timestamp follows
pub const EXTENDED_TIMESTAMP: u32 = 0xFF_FFFF;

/// Human-readable message type name for diagnostics
pub fn message_type_name(type_id: u8) -> &'static str {
    match type_id {
        MSG_TYPE_SET_CHUNK_SIZE => "SetChunkSize",
        MSG_TYPE_ABORT => "Abort",
        MSG_TYPE_ACK => "Ack",
        MSG_TYPE_USER_CONTROL => "UserControl",
        MSG_TYPE_WINDOW_ACK => "WindowAckSize",
        MSG_TYPE_SET_PEER_BW => "SetPeerBandwidth",
        MSG_TYPE_AUDIO => "Audio",
        MSG_TYPE_VIDEO => "Video",
        MSG_TYPE_DATA_AMF3 => "DataAmf3",
        MSG_TYPE_SHARED_OBJECT_AMF3 => "SharedObjectAmf3",
        MSG_TYPE_COMMAND_AMF3 => "CommandAmf3",
        MSG_TYPE_DATA_AMF0 => "DataAmf0",
        MSG_TYPE_SHARED_OBJECT_AMF0 => "SharedObjectAmf0",
        MSG_TYPE_COMMAND_AMF0 => "CommandAmf0",
        MSG_TYPE_AGGREGATE => "Aggregate",
        _ => "Unknown",
    }
}
