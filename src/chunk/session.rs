use std::collections::HashMap;

use log::debug;

use crate::amf::scan_command;
use crate::protocol::*;
use crate::{ByteCursor, Error, Result, RollingBuffer};

/// Callbacks the session raises while draining a connection's byte stream.
/// The receiver implements this; responses it queues are flushed after the
/// parse call returns.
pub trait SessionHandler {
    /// The acknowledgement window was crossed; an ACK carrying the total
    /// received byte count must go out.
    fn on_need_ack(&mut self, total_received: u32) -> Result<()>;

    /// A complete AMF0 command arrived.
    fn on_command(&mut self, name: &str, transaction_id: Option<f64>) -> Result<()>;

    /// A complete video message arrived; the payload still carries the
    /// leading FLV video tag byte.
    fn on_video(&mut self, stream_id: u32, timestamp: u32, payload: &[u8]) -> Result<()>;
}

/// Per-chunk-stream state: the last fully decoded header for Type-1/2/3
/// field inheritance, and the accumulator for a message spanning chunks.
struct ChunkStreamState {
    header: RtmpHeader,
    assembly: Vec<u8>,
}

/// Resumable demultiplexer for the RTMP chunk stream.
///
/// `parse` may be called with arbitrarily split input; a chunk cut off by a
/// recv boundary is parked in the rolling buffer and decoding resumes where
/// it left off on the next call. Complete messages are dispatched to the
/// [`SessionHandler`] in arrival order.
pub struct ChunkSession {
    rolling: RollingBuffer,
    chunk_size: u32,
    window_ack_size: u32,
    total_received: u32,
    received_since_ack: u32,
    chunk_streams: HashMap<u32, ChunkStreamState>,
}

impl ChunkSession {
    pub fn new(rolling: RollingBuffer) -> Self {
        ChunkSession {
            rolling,
            chunk_size: DEFAULT_CHUNK_SIZE,
            window_ack_size: DEFAULT_WINDOW_ACK_SIZE,
            total_received: 0,
            received_since_ack: 0,
            chunk_streams: HashMap::new(),
        }
    }

    /// Incoming chunk size currently in effect
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn window_ack_size(&self) -> u32 {
        self.window_ack_size
    }

    /// Drain `data` (prefixed by any parked suffix), dispatching every
    /// complete message. Returns `Err` only for connection-fatal protocol
    /// violations; running out of bytes mid-chunk is not an error.
    pub fn parse(&mut self, data: &[u8], handler: &mut dyn SessionHandler) -> Result<()> {
        let input = self.rolling.continue_with(data);
        let mut cursor = ByteCursor::new(&input);

        while !cursor.is_empty() {
            let chunk_start = cursor.position();

            let basic = cursor.read_u8();
            let fmt = (basic >> 6) & 0x03;
            let mut cs_id = (basic & 0x3F) as u32;
            if cs_id == 0 {
                cs_id = cursor.read_u8() as u32 + 64;
            } else if cs_id == 1 {
                cs_id = cursor.read_u16() as u32 + 64;
            }
            if cursor.is_truncated() {
                self.rolling.store_remaining(&input[chunk_start..]);
                return Ok(());
            }

            let prev_header = self.chunk_streams.get(&cs_id).map(|s| s.header);
            let assembled = self
                .chunk_streams
                .get(&cs_id)
                .map(|s| s.assembly.len())
                .unwrap_or(0);

            let header = if fmt == 0 {
                let ts = cursor.read_u24();
                let message_length = cursor.read_u24();
                let message_type = cursor.read_u8();
                let message_stream_id = cursor.read_u32_le();
                let timestamp = if ts == EXTENDED_TIMESTAMP {
                    cursor.read_u32()
                } else {
                    ts
                };
                RtmpHeader::new(cs_id, timestamp, message_length, message_type, message_stream_id)
            } else {
                let Some(prev) = prev_header else {
                    return Err(Error::protocol(format!(
                        "format {} chunk without prior state on chunk stream {}",
                        fmt, cs_id
                    )));
                };
                match fmt {
                    1 => {
                        let delta = cursor.read_u24();
                        let message_length = cursor.read_u24();
                        let message_type = cursor.read_u8();
                        let delta = if delta == EXTENDED_TIMESTAMP {
                            cursor.read_u32()
                        } else {
                            delta
                        };
                        RtmpHeader::new(
                            cs_id,
                            prev.timestamp.wrapping_add(delta),
                            message_length,
                            message_type,
                            prev.message_stream_id,
                        )
                    }
                    2 => {
                        let delta = cursor.read_u24();
                        let delta = if delta == EXTENDED_TIMESTAMP {
                            cursor.read_u32()
                        } else {
                            delta
                        };
                        RtmpHeader::new(
                            cs_id,
                            prev.timestamp.wrapping_add(delta),
                            prev.message_length,
                            prev.message_type,
                            prev.message_stream_id,
                        )
                    }
                    // Format 3: everything inherits, timestamp delta is zero
                    _ => RtmpHeader { chunk_stream_id: cs_id, ..prev },
                }
            };
            if cursor.is_truncated() {
                self.rolling.store_remaining(&input[chunk_start..]);
                return Ok(());
            }

            // How much of the message this chunk may carry
            let message_length = header.message_length as usize;
            let expected = message_length
                .saturating_sub(assembled)
                .min(self.chunk_size as usize);
            let payload = cursor.read_data(expected);
            if cursor.is_truncated() {
                self.rolling.store_remaining(&input[chunk_start..]);
                return Ok(());
            }

            let consumed = (cursor.position() - chunk_start) as u32;
            self.total_received = self.total_received.wrapping_add(consumed);
            self.received_since_ack = self.received_since_ack.wrapping_add(consumed);
            if self.received_since_ack > self.window_ack_size {
                handler.on_need_ack(self.total_received)?;
                self.received_since_ack = 0;
            }

            let mut reassembled = None;
            {
                let state = self
                    .chunk_streams
                    .entry(cs_id)
                    .or_insert_with(|| ChunkStreamState {
                        header,
                        assembly: Vec::new(),
                    });
                state.header = header;

                if message_length > self.chunk_size as usize {
                    state.assembly.extend_from_slice(payload);
                    if state.assembly.len() >= message_length {
                        reassembled = Some(std::mem::take(&mut state.assembly));
                    }
                }
            }

            if message_length <= self.chunk_size as usize {
                self.handle_message(&header, payload, handler)?;
            } else if let Some(message) = reassembled {
                self.handle_message(&header, &message, handler)?;
            }
        }

        self.rolling.clear();
        Ok(())
    }

    fn handle_message(
        &mut self,
        header: &RtmpHeader,
        payload: &[u8],
        handler: &mut dyn SessionHandler,
    ) -> Result<()> {
        match header.message_type {
            MSG_TYPE_SET_CHUNK_SIZE => {
                let size = read_u32_payload(payload, "SetChunkSize")?;
                if size == 0 {
                    return Err(Error::protocol("peer announced a zero chunk size"));
                }
                debug!("peer chunk size is now {}", size);
                self.chunk_size = size;
            }
            MSG_TYPE_ABORT => {
                let cs_id = read_u32_payload(payload, "Abort")?;
                if self.chunk_streams.remove(&cs_id).is_none() {
                    debug!("abort for unknown chunk stream {}", cs_id);
                }
            }
            MSG_TYPE_WINDOW_ACK => {
                let size = read_u32_payload(payload, "WindowAckSize")?;
                debug!("peer window acknowledgement size is now {}", size);
                self.window_ack_size = size;
            }
            MSG_TYPE_ACK | MSG_TYPE_SET_PEER_BW | MSG_TYPE_USER_CONTROL => {
                debug!("{} from peer ignored", message_type_name(header.message_type));
            }
            MSG_TYPE_COMMAND_AMF0 => {
                let scan = scan_command(payload)?;
                match scan.name.as_deref() {
                    Some(name) => handler.on_command(name, scan.transaction_id)?,
                    None => debug!("command message without a name, dropped"),
                }
            }
            MSG_TYPE_DATA_AMF0 => match scan_command(payload) {
                Ok(scan) => debug!("data message {:?}", scan.name),
                Err(e) => debug!("unreadable AMF0 data message: {}", e),
            },
            MSG_TYPE_VIDEO => {
                handler.on_video(header.message_stream_id, header.timestamp, payload)?;
            }
            MSG_TYPE_AUDIO => {
                debug!("audio message dropped ({} bytes)", payload.len());
            }
            other => {
                debug!(
                    "unhandled message type {} ({}) dropped",
                    other,
                    message_type_name(other)
                );
            }
        }
        Ok(())
    }
}

fn read_u32_payload(payload: &[u8], what: &str) -> Result<u32> {
    let mut cursor = ByteCursor::new(payload);
    let value = cursor.read_u32();
    if cursor.is_truncated() {
        return Err(Error::protocol(format!("short {} message", what)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::markers;
    use crate::ByteWriter;

    #[derive(Default)]
    struct Recorder {
        acks: Vec<u32>,
        commands: Vec<(String, Option<f64>)>,
        videos: Vec<(u32, u32, Vec<u8>)>,
    }

    impl SessionHandler for Recorder {
        fn on_need_ack(&mut self, total_received: u32) -> Result<()> {
            self.acks.push(total_received);
            Ok(())
        }

        fn on_command(&mut self, name: &str, transaction_id: Option<f64>) -> Result<()> {
            self.commands.push((name.to_string(), transaction_id));
            Ok(())
        }

        fn on_video(&mut self, stream_id: u32, timestamp: u32, payload: &[u8]) -> Result<()> {
            self.videos.push((stream_id, timestamp, payload.to_vec()));
            Ok(())
        }
    }

    fn session() -> ChunkSession {
        ChunkSession::new(RollingBuffer::new())
    }

    /// Encode one message as a Type-0 chunk plus Type-3 continuations
    fn encode_message(
        cs_id: u32,
        type_id: u8,
        stream_id: u32,
        timestamp: u32,
        payload: &[u8],
        chunk_size: usize,
    ) -> Vec<u8> {
        let mut out = ByteWriter::new();
        out.write_u8(cs_id as u8); // fmt 0
        if timestamp >= EXTENDED_TIMESTAMP {
            out.write_u24(EXTENDED_TIMESTAMP);
        } else {
            out.write_u24(timestamp);
        }
        out.write_u24(payload.len() as u32);
        out.write_u8(type_id);
        out.write_u32_le(stream_id);
        if timestamp >= EXTENDED_TIMESTAMP {
            out.write_u32(timestamp);
        }
        let first = payload.len().min(chunk_size);
        out.write_data(&payload[..first]);
        let mut offset = first;
        while offset < payload.len() {
            out.write_u8(0xC0 | cs_id as u8); // fmt 3
            let end = (offset + chunk_size).min(payload.len());
            out.write_data(&payload[offset..end]);
            offset = end;
        }
        out.into_vec()
    }

    #[test]
    fn test_set_chunk_size_message() {
        // Basic header cs_id=2 fmt=0, length 4, type 1, payload 65536
        let bytes = [
            0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00,
        ];
        let mut session = session();
        let mut recorder = Recorder::default();

        session.parse(&bytes, &mut recorder).unwrap();

        assert_eq!(session.chunk_size(), 65536);
        assert!(recorder.commands.is_empty());
        assert!(recorder.videos.is_empty());
    }

    #[test]
    fn test_multi_chunk_reassembly() {
        let mut session = session();
        let mut recorder = Recorder::default();

        // Shrink the incoming chunk size to 4 first
        let set = encode_message(2, MSG_TYPE_SET_CHUNK_SIZE, 0, 0, &4u32.to_be_bytes(), 128);
        session.parse(&set, &mut recorder).unwrap();

        let payload: Vec<u8> = (0u8..10).collect();
        let chunks = encode_message(4, MSG_TYPE_VIDEO, 1, 0, &payload, 4);
        session.parse(&chunks, &mut recorder).unwrap();

        assert_eq!(recorder.videos.len(), 1);
        assert_eq!(recorder.videos[0].2, payload);

        // The chunk stream keeps its header for later Type-3 chunks
        let more = [0xC4, 0, 1, 2, 3, 0xC4, 4, 5, 6, 7, 0xC4, 8, 9];
        session.parse(&more, &mut recorder).unwrap();
        assert_eq!(recorder.videos.len(), 2);
        assert_eq!(recorder.videos[1].2, payload);
    }

    #[test]
    fn test_extended_timestamp() {
        let mut session = session();
        let mut recorder = Recorder::default();

        // Timestamp 0x01000000 exceeds 24 bits and travels in the extension
        let chunks = encode_message(4, MSG_TYPE_VIDEO, 1, 0x0100_0000, &[0xAB], 128);
        session.parse(&chunks, &mut recorder).unwrap();

        assert_eq!(recorder.videos.len(), 1);
        assert_eq!(recorder.videos[0].1, 0x0100_0000);
    }

    #[test]
    fn test_extended_timestamp_marker_value() {
        // 24-bit field of FF FF FF followed by u32 0x00010000
        let bytes = [
            0x04, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x01, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0xAB,
        ];
        let mut session = session();
        let mut recorder = Recorder::default();
        session.parse(&bytes, &mut recorder).unwrap();

        assert_eq!(recorder.videos.len(), 1);
        assert_eq!(recorder.videos[0].1, 65536);
    }

    #[test]
    fn test_header_inheritance_chain() {
        let mut session = session();
        let mut recorder = Recorder::default();

        // Type 0 establishes everything
        let first = encode_message(5, MSG_TYPE_VIDEO, 7, 100, &[1, 2, 3], 128);
        session.parse(&first, &mut recorder).unwrap();

        // Type 1: new delta + length + type, stream id inherited
        let mut t1 = ByteWriter::new();
        t1.write_u8(0x40 | 5);
        t1.write_u24(10); // delta
        t1.write_u24(2);
        t1.write_u8(MSG_TYPE_VIDEO);
        t1.write_data(&[4, 5]);
        session.parse(t1.as_slice(), &mut recorder).unwrap();

        // Type 2: delta only
        let mut t2 = ByteWriter::new();
        t2.write_u8(0x80 | 5);
        t2.write_u24(7);
        t2.write_data(&[6, 7]);
        session.parse(t2.as_slice(), &mut recorder).unwrap();

        // Type 3: full inheritance, zero delta
        let mut t3 = ByteWriter::new();
        t3.write_u8(0xC0 | 5);
        t3.write_data(&[8, 9]);
        session.parse(t3.as_slice(), &mut recorder).unwrap();

        let stamps: Vec<u32> = recorder.videos.iter().map(|v| v.1).collect();
        assert_eq!(stamps, vec![100, 110, 117, 117]);
        assert!(recorder.videos.iter().all(|v| v.0 == 7));
    }

    #[test]
    fn test_split_points_do_not_change_messages() {
        let payload_a: Vec<u8> = (0u8..200).collect();
        let payload_b = b"abcdefgh".to_vec();

        let mut stream = Vec::new();
        stream.extend(encode_message(4, MSG_TYPE_VIDEO, 1, 10, &payload_a, 128));
        stream.extend(encode_message(6, MSG_TYPE_VIDEO, 1, 20, &payload_b, 128));
        stream.extend(encode_message(4, MSG_TYPE_VIDEO, 1, 30, &payload_a, 128));

        for step in [1usize, 3, 7, stream.len()] {
            let mut session = session();
            let mut recorder = Recorder::default();
            for piece in stream.chunks(step) {
                session.parse(piece, &mut recorder).unwrap();
            }
            let payloads: Vec<&Vec<u8>> = recorder.videos.iter().map(|v| &v.2).collect();
            assert_eq!(
                payloads,
                vec![&payload_a, &payload_b, &payload_a],
                "split step {}",
                step
            );
            assert_eq!(recorder.videos[0].1, 10);
            assert_eq!(recorder.videos[1].1, 20);
            assert_eq!(recorder.videos[2].1, 30);
        }
    }

    #[test]
    fn test_interleaved_chunk_streams() {
        let mut session = session();
        let mut recorder = Recorder::default();

        let set = encode_message(2, MSG_TYPE_SET_CHUNK_SIZE, 0, 0, &4u32.to_be_bytes(), 128);
        session.parse(&set, &mut recorder).unwrap();

        // Chunks of two messages interleave across their chunk streams
        let mut stream = Vec::new();
        stream.extend_from_slice(&[0x04, 0, 0, 0, 0, 0, 6, MSG_TYPE_VIDEO, 1, 0, 0, 0]);
        stream.extend_from_slice(&[1, 1, 1, 1]); // first chunk of cs 4
        stream.extend_from_slice(&[0x05, 0, 0, 0, 0, 0, 5, MSG_TYPE_VIDEO, 2, 0, 0, 0]);
        stream.extend_from_slice(&[2, 2, 2, 2]); // first chunk of cs 5
        stream.extend_from_slice(&[0xC4, 1, 1]); // cs 4 completes
        stream.extend_from_slice(&[0xC5, 2]); // cs 5 completes
        session.parse(&stream, &mut recorder).unwrap();

        assert_eq!(recorder.videos.len(), 2);
        assert_eq!(recorder.videos[0].0, 1);
        assert_eq!(recorder.videos[0].2, vec![1; 6]);
        assert_eq!(recorder.videos[1].0, 2);
        assert_eq!(recorder.videos[1].2, vec![2; 5]);
    }

    #[test]
    fn test_format3_without_state_is_fatal() {
        let mut session = session();
        let mut recorder = Recorder::default();
        assert!(session.parse(&[0xC4, 0x00], &mut recorder).is_err());
    }

    #[test]
    fn test_abort_discards_chunk_stream() {
        let mut session = session();
        let mut recorder = Recorder::default();

        let first = encode_message(9, MSG_TYPE_VIDEO, 1, 0, &[1], 128);
        session.parse(&first, &mut recorder).unwrap();

        let abort = encode_message(2, MSG_TYPE_ABORT, 0, 0, &9u32.to_be_bytes(), 128);
        session.parse(&abort, &mut recorder).unwrap();

        // Type 3 on the aborted stream no longer has state to inherit
        assert!(session.parse(&[0xC0 | 9], &mut recorder).is_err());
    }

    #[test]
    fn test_command_dispatch() {
        let mut amf = ByteWriter::new();
        amf.write_u8(markers::STRING);
        amf.write_amf0_string("connect");
        amf.write_u8(markers::NUMBER);
        amf.write_double(1.0);

        let chunks = encode_message(3, MSG_TYPE_COMMAND_AMF0, 0, 0, amf.as_slice(), 128);
        let mut session = session();
        let mut recorder = Recorder::default();
        session.parse(&chunks, &mut recorder).unwrap();

        assert_eq!(recorder.commands, vec![("connect".to_string(), Some(1.0))]);
    }

    #[test]
    fn test_ack_window() {
        let mut session = session();
        let mut recorder = Recorder::default();

        // Shrink the window so a few messages cross it
        let window = encode_message(2, MSG_TYPE_WINDOW_ACK, 0, 0, &100u32.to_be_bytes(), 128);
        session.parse(&window, &mut recorder).unwrap();
        assert_eq!(session.window_ack_size(), 100);

        let payload = [0u8; 60];
        for _ in 0..4 {
            let chunks = encode_message(4, MSG_TYPE_VIDEO, 1, 0, &payload, 128);
            session.parse(&chunks, &mut recorder).unwrap();
        }

        // 72 bytes per message on the wire; the window trips every other one
        assert_eq!(recorder.acks.len(), 2);
        assert!(recorder.acks[0] > 100);
        assert!(recorder.acks[1] > recorder.acks[0]);
    }

    #[test]
    fn test_extended_cs_id_forms() {
        let mut session = session();
        let mut recorder = Recorder::default();

        // Two-byte form: cs_id = 10 + 64 = 74
        let mut two = ByteWriter::new();
        two.write_u8(0x00);
        two.write_u8(10);
        two.write_u24(0);
        two.write_u24(1);
        two.write_u8(MSG_TYPE_VIDEO);
        two.write_u32_le(1);
        two.write_data(&[0xAA]);
        session.parse(two.as_slice(), &mut recorder).unwrap();

        // Three-byte form: cs_id = 0x0102 + 64
        let mut three = ByteWriter::new();
        three.write_u8(0x01);
        three.write_u16(0x0102);
        three.write_u24(0);
        three.write_u24(1);
        three.write_u8(MSG_TYPE_VIDEO);
        three.write_u32_le(1);
        three.write_data(&[0xBB]);
        session.parse(three.as_slice(), &mut recorder).unwrap();

        assert_eq!(recorder.videos.len(), 2);

        // Continuations resolve to the same chunk streams
        session.parse(&[0xC0, 10, 0xCC], &mut recorder).unwrap();
        assert_eq!(recorder.videos.len(), 3);
        assert_eq!(recorder.videos[2].2, vec![0xCC]);
    }
}
