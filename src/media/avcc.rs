use log::debug;

use crate::ByteCursor;

const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
const EMULATION_PREVENTION: [u8; 3] = [0x00, 0x00, 0x03];

/// Append one NAL unit in Annex-B framing: a four-byte start code, then the
/// body with every `00 00 00` window replaced by `00 00 03`.
pub fn append_annex_b(out: &mut Vec<u8>, nalu: &[u8]) {
    out.extend_from_slice(&START_CODE);

    let mut rest = nalu;
    while let Some((&byte, _)) = rest.split_first() {
        if rest.len() >= 3 && rest[0] == 0 && rest[1] == 0 && rest[2] == 0 {
            out.extend_from_slice(&EMULATION_PREVENTION);
            rest = &rest[3..];
        } else {
            out.push(byte);
            rest = &rest[1..];
        }
    }
}

/// Decoder configuration parsed from the AVC sequence header
#[derive(Debug, Clone)]
pub struct AvcConfig {
    pub version: u8,

    /// AVC profile (66=Baseline, 77=Main, 100=High, ...)
    pub profile: u8,

    /// Profile compatibility flags
    pub compatibility: u8,

    /// AVC level (e.g. 31 = 3.1)
    pub level: u8,

    /// NALU length-prefix width in bytes, 1..=4
    pub nalu_length_size: u8,

    /// Sequence parameter sets
    pub sps: Vec<Vec<u8>>,

    /// Picture parameter sets
    pub pps: Vec<Vec<u8>>,
}

impl AvcConfig {
    pub fn profile_name(&self) -> &'static str {
        match self.profile {
            66 => "Baseline",
            77 => "Main",
            88 => "Extended",
            100 => "High",
            110 => "High 10",
            122 => "High 4:2:2",
            244 => "High 4:4:4",
            _ => "Unknown",
        }
    }
}

/// Outcome of feeding one video payload to the parser
#[derive(Debug)]
pub enum AvccPacket {
    /// Sequence header; parameter sets are parked for the next NALU message
    SequenceHeader(AvcConfig),

    /// NALU message; the converted Annex-B bytes are in [`AvccParser::video`]
    Frames,

    /// AVC packet type other than sequence header / NALU
    Unsupported(u8),

    /// A read ran past the end of the payload; the message is dropped
    Truncated,
}

/// Converts AVCC-framed H.264 payloads to the Annex-B byte stream.
///
/// A sequence header yields no output by itself: its SPS/PPS are converted
/// and held until the next NALU message, which gets them prepended so a
/// decoder always sees parameter sets before the first coded slice. The
/// output buffer is reused across calls.
pub struct AvccParser {
    nalu_length_size: usize,
    extradata: Vec<u8>,
    video: Vec<u8>,
}

impl AvccParser {
    pub fn new() -> Self {
        AvccParser {
            nalu_length_size: 0,
            extradata: Vec::new(),
            video: Vec::new(),
        }
    }

    /// Annex-B output of the most recent [`parse`](AvccParser::parse) call
    pub fn video(&self) -> &[u8] {
        &self.video
    }

    /// Feed one FLV VIDEODATA payload, already stripped of the tag byte
    pub fn parse(&mut self, data: &[u8]) -> AvccPacket {
        self.video.clear();

        let mut cursor = ByteCursor::new(data);
        let packet_type = cursor.read_u8();
        cursor.read_u24(); // composition time, irrelevant for byte-stream output
        if cursor.is_truncated() {
            return AvccPacket::Truncated;
        }

        match packet_type {
            0 => self.parse_sequence_header(&mut cursor),
            1 => self.parse_nalus(&mut cursor),
            other => AvccPacket::Unsupported(other),
        }
    }

    fn parse_sequence_header(&mut self, cursor: &mut ByteCursor) -> AvccPacket {
        self.extradata.clear();

        let version = cursor.read_u8();
        let profile = cursor.read_u8();
        let compatibility = cursor.read_u8();
        let level = cursor.read_u8();
        let nalu_length_size = ((cursor.read_u8() & 0x03) + 1) as usize;
        let sps_count = (cursor.read_u8() & 0x1F) as usize;

        let mut config = AvcConfig {
            version,
            profile,
            compatibility,
            level,
            nalu_length_size: nalu_length_size as u8,
            sps: Vec::with_capacity(sps_count),
            pps: Vec::new(),
        };

        for _ in 0..sps_count {
            let size = cursor.read_u16() as usize;
            let body = cursor.read_data(size);
            if cursor.is_truncated() {
                self.extradata.clear();
                return AvccPacket::Truncated;
            }
            append_annex_b(&mut self.extradata, body);
            config.sps.push(body.to_vec());
        }

        let pps_count = cursor.read_u8() as usize;
        for _ in 0..pps_count {
            let size = cursor.read_u16() as usize;
            let body = cursor.read_data(size);
            if cursor.is_truncated() {
                self.extradata.clear();
                return AvccPacket::Truncated;
            }
            append_annex_b(&mut self.extradata, body);
            config.pps.push(body.to_vec());
        }

        if cursor.is_truncated() {
            self.extradata.clear();
            return AvccPacket::Truncated;
        }

        self.nalu_length_size = nalu_length_size;
        AvccPacket::SequenceHeader(config)
    }

    fn parse_nalus(&mut self, cursor: &mut ByteCursor) -> AvccPacket {
        if self.nalu_length_size == 0 {
            debug!("NALU message before any sequence header, dropped");
            return AvccPacket::Frames;
        }

        // Parameter sets from the last sequence header lead the stream
        self.video.append(&mut self.extradata);

        while !cursor.is_empty() {
            let size = match self.nalu_length_size {
                1 => cursor.read_u8() as usize,
                2 => cursor.read_u16() as usize,
                3 => cursor.read_u24() as usize,
                _ => cursor.read_u32() as usize,
            };
            let body = cursor.read_data(size);
            if cursor.is_truncated() {
                debug!("truncated NALU, remainder of message dropped");
                break;
            }
            append_annex_b(&mut self.video, body);
        }

        AvccPacket::Frames
    }
}

impl Default for AvccParser {
    fn default() -> Self {
        Self::new()
    }
}
