use crate::amf::markers;
use crate::chunk::ChunkWriter;
use crate::protocol::*;
use crate::ByteWriter;

/// Builds the control messages and command responses the server emits.
///
/// Everything goes out as Type-0 chunks with stream id 0: protocol control
/// on chunk stream 2, command responses on chunk stream 3. Callers pass the
/// connection's outbox; bytes are appended in emission order.
pub struct Responder {
    writer: ChunkWriter,
    window_ack_size: u32,
    peer_bandwidth: u32,
    chunk_size: u32,
}

impl Responder {
    pub fn new(window_ack_size: u32, peer_bandwidth: u32, chunk_size: u32) -> Self {
        Responder {
            writer: ChunkWriter::new(),
            window_ack_size,
            peer_bandwidth,
            chunk_size,
        }
    }

    fn emit(&self, out: &mut ByteWriter, chunk_stream_id: u32, type_id: u8, payload: &[u8]) {
        let header = RtmpHeader::new(chunk_stream_id, 0, payload.len() as u32, type_id, 0);
        self.writer.write_message(out, &header, payload);
    }

    /// ACK carrying the total number of bytes received so far
    pub fn ack(&self, out: &mut ByteWriter, total_received: u32) {
        let mut payload = ByteWriter::with_capacity(4);
        payload.write_u32(total_received);
        self.emit(out, CHUNK_STREAM_PROTOCOL, MSG_TYPE_ACK, payload.as_slice());
    }

    /// Everything a `connect` command gets back: window size, peer
    /// bandwidth, chunk size, the `_result` status object, and StreamBegin.
    /// The announced chunk size applies to the writer immediately after the
    /// announcement itself is encoded.
    pub fn connect_response(&mut self, out: &mut ByteWriter, transaction_id: f64) {
        let mut window = ByteWriter::with_capacity(4);
        window.write_u32(self.window_ack_size);
        self.emit(out, CHUNK_STREAM_PROTOCOL, MSG_TYPE_WINDOW_ACK, window.as_slice());

        let mut bandwidth = ByteWriter::with_capacity(5);
        bandwidth.write_u32(self.peer_bandwidth);
        bandwidth.write_u8(LIMIT_DYNAMIC);
        self.emit(out, CHUNK_STREAM_PROTOCOL, MSG_TYPE_SET_PEER_BW, bandwidth.as_slice());

        let mut chunk_size = ByteWriter::with_capacity(4);
        chunk_size.write_u32(self.chunk_size);
        self.emit(out, CHUNK_STREAM_PROTOCOL, MSG_TYPE_SET_CHUNK_SIZE, chunk_size.as_slice());
        self.writer.set_chunk_size(self.chunk_size as usize);

        let mut amf = ByteWriter::new();
        amf.write_u8(markers::STRING);
        amf.write_amf0_string("_result");
        amf.write_u8(markers::NUMBER);
        amf.write_double(transaction_id);
        amf.write_u8(markers::NULL);
        amf.write_u8(markers::OBJECT);
        amf.write_amf0_string("level");
        amf.write_u8(markers::STRING);
        amf.write_amf0_string("status");
        amf.write_amf0_string("code");
        amf.write_u8(markers::STRING);
        amf.write_amf0_string("NetConnection.Connect.Success");
        amf.write_amf0_string("description");
        amf.write_u8(markers::STRING);
        amf.write_amf0_string("Connection succeeded.");
        amf.write_u16(0);
        amf.write_u8(markers::OBJECT_END);
        self.emit(out, CHUNK_STREAM_COMMAND, MSG_TYPE_COMMAND_AMF0, amf.as_slice());

        let mut begin = ByteWriter::with_capacity(6);
        begin.write_u16(EVENT_STREAM_BEGIN);
        begin.write_u32(0);
        self.emit(out, CHUNK_STREAM_PROTOCOL, MSG_TYPE_USER_CONTROL, begin.as_slice());
    }

    /// Generic `_result` acknowledgement echoing the transaction number
    pub fn result(&self, out: &mut ByteWriter, transaction_id: f64) {
        let mut amf = ByteWriter::new();
        amf.write_u8(markers::STRING);
        amf.write_amf0_string("_result");
        amf.write_u8(markers::NUMBER);
        amf.write_double(transaction_id);
        amf.write_u8(markers::NULL);
        amf.write_u8(markers::UNDEFINED);
        self.emit(out, CHUNK_STREAM_COMMAND, MSG_TYPE_COMMAND_AMF0, amf.as_slice());
    }
}
