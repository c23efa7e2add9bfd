mod utils;
mod protocol;
mod amf;
mod handshake;
mod chunk;
mod control;
mod media;
mod receiver;

// Re-export commonly used types at crate root
pub use utils::*;
pub use protocol::*;
pub use amf::*;
pub use handshake::*;
pub use chunk::*;
pub use control::*;
pub use media::*;

// Receiver exports
pub use receiver::{
    ReceiverConfig, ReceiverConfigBuilder, RtmpReceiver, StreamSink, VideoFrame,
};
