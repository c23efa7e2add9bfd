mod avcc;

pub use avcc::*;

/// Video codec id from the low nibble of the FLV video tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// Sorenson H.263
    H263,
    /// Screen video
    ScreenVideo,
    /// On2 VP6
    Vp6,
    /// On2 VP6 with alpha
    Vp6Alpha,
    /// Screen video v2
    ScreenVideo2,
    /// H.264 AVC
    H264,
    /// H.265 HEVC
    H265,
    /// AV1
    Av1,
    /// Unknown
    Unknown(u8),
}

impl VideoCodec {
    pub fn from_codec_id(id: u8) -> Self {
        match id {
            2 => VideoCodec::H263,
            3 => VideoCodec::ScreenVideo,
            4 => VideoCodec::Vp6,
            5 => VideoCodec::Vp6Alpha,
            6 => VideoCodec::ScreenVideo2,
            7 => VideoCodec::H264,
            12 => VideoCodec::H265,
            13 => VideoCodec::Av1,
            _ => VideoCodec::Unknown(id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::H263 => "H.263",
            VideoCodec::ScreenVideo => "Screen",
            VideoCodec::Vp6 => "VP6",
            VideoCodec::Vp6Alpha => "VP6-Alpha",
            VideoCodec::ScreenVideo2 => "Screen-v2",
            VideoCodec::H264 => "H.264",
            VideoCodec::H265 => "H.265",
            VideoCodec::Av1 => "AV1",
            VideoCodec::Unknown(_) => "Unknown",
        }
    }
}

/// Frame type from the high nibble of the FLV video tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFrameType {
    /// Keyframe (I-frame)
    Keyframe,
    /// Inter-frame (P-frame)
    InterFrame,
    /// Disposable inter-frame
    DisposableInterFrame,
    /// Generated keyframe
    GeneratedKeyframe,
    /// Video info/command frame
    VideoInfo,
    /// Unknown
    Unknown(u8),
}

impl VideoFrameType {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => VideoFrameType::Keyframe,
            2 => VideoFrameType::InterFrame,
            3 => VideoFrameType::DisposableInterFrame,
            4 => VideoFrameType::GeneratedKeyframe,
            5 => VideoFrameType::VideoInfo,
            other => VideoFrameType::Unknown(other),
        }
    }
}

/// Split the FLV video tag byte into frame type and codec
pub fn parse_video_tag(tag: u8) -> (VideoFrameType, VideoCodec) {
    (
        VideoFrameType::from_bits((tag >> 4) & 0x0F),
        VideoCodec::from_codec_id(tag & 0x0F),
    )
}
