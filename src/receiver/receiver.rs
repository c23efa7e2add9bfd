use std::collections::HashMap;

use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chunk::{ChunkSession, SessionHandler};
use crate::control::Responder;
use crate::handshake::HandshakeEngine;
use crate::media::{parse_video_tag, AvcConfig, AvccPacket, AvccParser, VideoCodec, VideoFrameType};
use crate::receiver::config::ReceiverConfig;
use crate::{ByteWriter, Error, Result, RollingBuffer};

const RECV_BUFFER_SIZE: usize = 16 * 1024;

/// One Annex-B framed video delivery
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// First delivery for this RTMP stream id on this connection
    pub is_new_stream: bool,

    /// FLV frame type was keyframe
    pub is_keyframe: bool,

    /// RTMP message stream id
    pub stream_id: u32,

    /// Message timestamp in milliseconds
    pub timestamp: u32,

    /// Annex-B byte stream; parameter sets lead the first delivery
    pub data: Vec<u8>,
}

/// Where the receiver delivers a publish.
///
/// Callbacks run on the receiver's worker task, in arrival order, and must
/// not call back into the receiver.
#[async_trait::async_trait]
pub trait StreamSink: Send {
    /// A publisher delivered the H.264 decoder configuration for a stream.
    /// The same parameter sets are also prepended to the next video frame,
    /// so sinks that only consume the byte stream may ignore this.
    async fn on_stream_setup(&mut self, _stream_id: u32, _config: &AvcConfig) {}

    /// A video frame is ready in Annex-B framing.
    async fn on_video_frame(&mut self, frame: VideoFrame);
}

/// RTMP ingest receiver: accepts one publisher at a time and forwards its
/// H.264 video as an Annex-B byte stream.
pub struct RtmpReceiver {
    shutdown_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl RtmpReceiver {
    /// Bind the listening socket and spawn the worker task.
    ///
    /// Binding is the only failure reported to the caller; everything that
    /// happens to individual connections afterwards is handled (and, when
    /// enabled, logged) by the worker.
    pub async fn start<S: StreamSink + 'static>(
        config: ReceiverConfig,
        sink: S,
    ) -> Result<RtmpReceiver> {
        config.validate()?;

        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::connection(format!("failed to bind {}: {}", addr, e)))?;
        if config.enable_logging {
            info!("RTMP receiver listening on {}", addr);
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let worker = tokio::spawn(worker_loop(listener, shutdown_rx, config, sink));

        Ok(RtmpReceiver {
            shutdown_tx: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    /// Signal the worker and wait for it to exit. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Drop for RtmpReceiver {
    fn drop(&mut self) {
        // stop() was not awaited; don't leave the worker accepting forever
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

async fn worker_loop<S: StreamSink>(
    listener: TcpListener,
    mut shutdown_rx: mpsc::Receiver<()>,
    config: ReceiverConfig,
    mut sink: S,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                if config.enable_logging {
                    info!("RTMP receiver shutting down");
                }
                return;
            }
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("accept failed: {}", e);
                        continue;
                    }
                };
                if config.enable_logging {
                    info!("client connected from {}", peer);
                }
                match serve_client(socket, &mut shutdown_rx, &config, &mut sink).await {
                    Ok(true) => {
                        if config.enable_logging {
                            info!("RTMP receiver shutting down");
                        }
                        return;
                    }
                    Ok(false) => {
                        if config.enable_logging {
                            info!("client disconnected");
                        }
                    }
                    Err(e) => warn!("client session ended: {}", e),
                }
            }
        }
    }
}

/// Drive one client from handshake to disconnect.
///
/// Returns `Ok(true)` when a shutdown signal interrupted the connection,
/// `Ok(false)` on client disconnect, and `Err` on protocol or IO failure.
/// Per-connection state lives on this stack frame and is released on every
/// exit path.
async fn serve_client<S: StreamSink>(
    mut socket: TcpStream,
    shutdown_rx: &mut mpsc::Receiver<()>,
    config: &ReceiverConfig,
    sink: &mut S,
) -> Result<bool> {
    let mut rolling = RollingBuffer::new();
    let mut handshake = HandshakeEngine::new();
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let mut sent_s0s1 = false;
    let mut sent_s2 = false;

    while !handshake.is_complete() {
        let received = tokio::select! {
            _ = shutdown_rx.recv() => return Ok(true),
            read = socket.read(&mut buf) => read?,
        };
        if received == 0 {
            return Ok(false);
        }
        handshake.consume(&buf[..received], &mut rolling)?;

        if !sent_s0s1 && handshake.round() >= 1 {
            socket.write_all(&handshake.s0s1()).await?;
            sent_s0s1 = true;
        }
        if !sent_s2 && handshake.round() >= 2 {
            socket.write_all(&handshake.s2()).await?;
            sent_s2 = true;
        }
    }
    handshake.validate_echo()?;
    if config.enable_logging {
        info!("handshake complete");
    }

    let mut session = ChunkSession::new(rolling);
    let mut driver = ConnectionDriver::new(config);

    // The client may have sent session bytes on the heels of C2
    session.parse(&[], &mut driver)?;
    driver.flush(&mut socket, sink).await?;

    loop {
        let received = tokio::select! {
            _ = shutdown_rx.recv() => return Ok(true),
            read = socket.read(&mut buf) => read?,
        };
        if received == 0 {
            return Ok(false);
        }
        session.parse(&buf[..received], &mut driver)?;
        driver.flush(&mut socket, sink).await?;
    }
}

/// Per-stream video state
struct VideoStream {
    avcc: AvccParser,
    is_new_stream: bool,
}

impl Default for VideoStream {
    fn default() -> Self {
        VideoStream {
            avcc: AvccParser::new(),
            is_new_stream: true,
        }
    }
}

enum SinkEvent {
    Setup(u32, AvcConfig),
    Frame(VideoFrame),
}

/// Session handler for one connection: queues wire responses and sink
/// deliveries while the parser runs, flushed once per parse call.
struct ConnectionDriver {
    responder: Responder,
    outbox: ByteWriter,
    events: Vec<SinkEvent>,
    video_streams: HashMap<u32, VideoStream>,
}

impl ConnectionDriver {
    fn new(config: &ReceiverConfig) -> Self {
        ConnectionDriver {
            responder: Responder::new(
                config.window_ack_size,
                config.peer_bandwidth,
                config.chunk_size,
            ),
            outbox: ByteWriter::new(),
            events: Vec::new(),
            video_streams: HashMap::new(),
        }
    }

    async fn flush<S: StreamSink>(&mut self, socket: &mut TcpStream, sink: &mut S) -> Result<()> {
        if !self.outbox.is_empty() {
            socket.write_all(self.outbox.as_slice()).await?;
            self.outbox.clear();
        }
        for event in self.events.drain(..) {
            match event {
                SinkEvent::Setup(stream_id, config) => {
                    sink.on_stream_setup(stream_id, &config).await;
                }
                SinkEvent::Frame(frame) => {
                    sink.on_video_frame(frame).await;
                }
            }
        }
        Ok(())
    }
}

impl SessionHandler for ConnectionDriver {
    fn on_need_ack(&mut self, total_received: u32) -> Result<()> {
        self.responder.ack(&mut self.outbox, total_received);
        Ok(())
    }

    fn on_command(&mut self, name: &str, transaction_id: Option<f64>) -> Result<()> {
        debug!("command {:?} (transaction {:?})", name, transaction_id);
        if name == "connect" {
            self.responder
                .connect_response(&mut self.outbox, transaction_id.unwrap_or(1.0));
        } else if let Some(transaction_id) = transaction_id {
            self.responder.result(&mut self.outbox, transaction_id);
        }
        Ok(())
    }

    fn on_video(&mut self, stream_id: u32, timestamp: u32, payload: &[u8]) -> Result<()> {
        let Some((&tag, body)) = payload.split_first() else {
            debug!("empty video message dropped");
            return Ok(());
        };

        let (frame_type, codec) = parse_video_tag(tag);
        if codec != VideoCodec::H264 {
            debug!("{} video dropped, only H.264 is accepted", codec.name());
            return Ok(());
        }
        let is_keyframe = match frame_type {
            VideoFrameType::Keyframe => true,
            VideoFrameType::InterFrame => false,
            other => {
                debug!("video frame type {:?} dropped", other);
                return Ok(());
            }
        };

        let stream = self.video_streams.entry(stream_id).or_default();
        match stream.avcc.parse(body) {
            AvccPacket::SequenceHeader(config) => {
                debug!(
                    "stream {} sequence header: {} profile, level {}",
                    stream_id,
                    config.profile_name(),
                    config.level
                );
                self.events.push(SinkEvent::Setup(stream_id, config));
            }
            AvccPacket::Frames => {
                let video = stream.avcc.video();
                if !video.is_empty() {
                    self.events.push(SinkEvent::Frame(VideoFrame {
                        is_new_stream: stream.is_new_stream,
                        is_keyframe,
                        stream_id,
                        timestamp,
                        data: video.to_vec(),
                    }));
                    stream.is_new_stream = false;
                }
            }
            AvccPacket::Unsupported(kind) => {
                debug!("AVC packet type {} dropped", kind);
            }
            AvccPacket::Truncated => {
                debug!("truncated AVC payload on stream {} dropped", stream_id);
            }
        }
        Ok(())
    }
}
