// Shared helpers for the integration tests: a minimal RTMP publishing
// client and a sink that records everything the receiver delivers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::RngCore;
use rtmp_ingest::{
    markers, AvcConfig, ByteWriter, StreamSink, VideoFrame, HANDSHAKE_SIZE,
    MSG_TYPE_COMMAND_AMF0, RTMP_VERSION,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestPublisher {
    pub stream: TcpStream,
}

impl TestPublisher {
    /// Connect to a receiver on localhost, waiting for it to start listening
    pub async fn connect(port: u16) -> TestPublisher {
        for _ in 0..100 {
            if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
                return TestPublisher { stream };
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("receiver never started listening on port {}", port);
    }

    /// Client side of the handshake. Returns the 3073 S0+S1+S2 bytes.
    pub async fn handshake(&mut self) -> Vec<u8> {
        let mut c0c1 = vec![RTMP_VERSION];
        c0c1.extend_from_slice(&0x1000u32.to_be_bytes()); // client time
        c0c1.extend_from_slice(&0u32.to_be_bytes());
        let mut random = vec![0u8; HANDSHAKE_SIZE - 8];
        rand::rng().fill_bytes(&mut random);
        c0c1.extend_from_slice(&random);
        self.stream.write_all(&c0c1).await.unwrap();

        let response = self.recv_exact(1 + HANDSHAKE_SIZE * 2).await;
        assert_eq!(response[0], RTMP_VERSION);

        let mut c2 = Vec::with_capacity(HANDSHAKE_SIZE);
        c2.extend_from_slice(&response[1..5]); // echo of S1 time
        c2.extend_from_slice(&0u32.to_be_bytes());
        c2.extend_from_slice(&response[9..1537]); // echo of S1 random
        self.stream.write_all(&c2).await.unwrap();

        response
    }

    pub async fn send_message(
        &mut self,
        cs_id: u32,
        type_id: u8,
        stream_id: u32,
        timestamp: u32,
        payload: &[u8],
    ) {
        let bytes = encode_message(cs_id, type_id, stream_id, timestamp, payload, 128);
        self.stream.write_all(&bytes).await.unwrap();
    }

    pub async fn send_connect(&mut self) {
        let mut amf = ByteWriter::new();
        amf.write_u8(markers::STRING);
        amf.write_amf0_string("connect");
        amf.write_u8(markers::NUMBER);
        amf.write_double(1.0);
        amf.write_u8(markers::OBJECT);
        amf.write_amf0_string("app");
        amf.write_u8(markers::STRING);
        amf.write_amf0_string("live");
        amf.write_u16(0);
        amf.write_u8(markers::OBJECT_END);
        self.send_message(3, MSG_TYPE_COMMAND_AMF0, 0, 0, amf.as_slice())
            .await;
    }

    pub async fn recv_exact(&mut self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        timeout(IO_TIMEOUT, self.stream.read_exact(&mut bytes))
            .await
            .expect("timed out waiting for receiver output")
            .expect("receiver closed the connection");
        bytes
    }

    /// Wait for the receiver to close the connection
    pub async fn expect_close(&mut self) {
        let mut sink = [0u8; 64];
        loop {
            let read = timeout(IO_TIMEOUT, self.stream.read(&mut sink))
                .await
                .expect("timed out waiting for the receiver to disconnect")
                .unwrap_or(0);
            if read == 0 {
                return;
            }
        }
    }
}

/// Encode one message as a Type-0 chunk plus Type-3 continuations
pub fn encode_message(
    cs_id: u32,
    type_id: u8,
    stream_id: u32,
    timestamp: u32,
    payload: &[u8],
    chunk_size: usize,
) -> Vec<u8> {
    let mut out = ByteWriter::new();
    out.write_u8(cs_id as u8); // fmt 0
    out.write_u24(timestamp);
    out.write_u24(payload.len() as u32);
    out.write_u8(type_id);
    out.write_u32_le(stream_id);
    let first = payload.len().min(chunk_size);
    out.write_data(&payload[..first]);
    let mut offset = first;
    while offset < payload.len() {
        out.write_u8(0xC0 | cs_id as u8);
        let end = (offset + chunk_size).min(payload.len());
        out.write_data(&payload[offset..end]);
        offset = end;
    }
    out.into_vec()
}

pub const TEST_SPS: [u8; 4] = [0x67, 0x42, 0x00, 0x1E];
pub const TEST_PPS: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];

/// FLV video payload: keyframe tag + AVC sequence header with one SPS/PPS
pub fn sequence_header_payload() -> Vec<u8> {
    let mut data = vec![
        0x17, // keyframe, H.264
        0x00, // sequence header
        0x00, 0x00, 0x00, // composition time
        0x01, // configuration version
        0x42, // profile
        0x00, // compatibility
        0x1E, // level
        0xFF, // 4-byte NALU lengths
        0xE1, // 1 SPS
    ];
    data.extend_from_slice(&(TEST_SPS.len() as u16).to_be_bytes());
    data.extend_from_slice(&TEST_SPS);
    data.push(0x01); // 1 PPS
    data.extend_from_slice(&(TEST_PPS.len() as u16).to_be_bytes());
    data.extend_from_slice(&TEST_PPS);
    data
}

/// FLV video payload: one length-prefixed NALU
pub fn nalu_payload(tag: u8, nalu: &[u8]) -> Vec<u8> {
    let mut data = vec![tag, 0x01, 0x00, 0x00, 0x00];
    data.extend_from_slice(&(nalu.len() as u32).to_be_bytes());
    data.extend_from_slice(nalu);
    data
}

#[derive(Debug, Clone)]
pub enum SinkRecord {
    Setup {
        stream_id: u32,
        sps: Vec<Vec<u8>>,
        pps: Vec<Vec<u8>>,
    },
    Frame(VideoFrame),
}

/// Sink that records deliveries for later assertions
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub records: Arc<Mutex<Vec<SinkRecord>>>,
}

impl RecordingSink {
    pub fn new() -> (RecordingSink, Arc<Mutex<Vec<SinkRecord>>>) {
        let sink = RecordingSink::default();
        let records = sink.records.clone();
        (sink, records)
    }

    /// Poll until `count` records arrived or the timeout elapses
    pub async fn wait_for(records: &Arc<Mutex<Vec<SinkRecord>>>, count: usize) {
        for _ in 0..250 {
            if records.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {} sink records, got {}",
            count,
            records.lock().unwrap().len()
        );
    }
}

#[async_trait::async_trait]
impl StreamSink for RecordingSink {
    async fn on_stream_setup(&mut self, stream_id: u32, config: &AvcConfig) {
        self.records.lock().unwrap().push(SinkRecord::Setup {
            stream_id,
            sps: config.sps.clone(),
            pps: config.pps.clone(),
        });
    }

    async fn on_video_frame(&mut self, frame: VideoFrame) {
        self.records.lock().unwrap().push(SinkRecord::Frame(frame));
    }
}
