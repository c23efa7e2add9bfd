// Simple RTMP ingest example
//
// Accepts a single publisher (e.g. ffmpeg or OBS pointed at
// rtmp://localhost/live) and prints what arrives on the video callback.
//
// Usage:
//   cargo run --example simple_receiver

use log::info;
use rtmp_ingest::{AvcConfig, ReceiverConfig, Result, RtmpReceiver, StreamSink, VideoFrame};

struct PrintSink;

#[async_trait::async_trait]
impl StreamSink for PrintSink {
    async fn on_stream_setup(&mut self, stream_id: u32, config: &AvcConfig) {
        info!(
            "stream {} configured: {} profile, level {}, {} SPS / {} PPS",
            stream_id,
            config.profile_name(),
            config.level,
            config.sps.len(),
            config.pps.len()
        );
    }

    async fn on_video_frame(&mut self, frame: VideoFrame) {
        info!(
            "stream {} ts={}ms {} {} bytes{}",
            frame.stream_id,
            frame.timestamp,
            if frame.is_keyframe { "keyframe" } else { "frame" },
            frame.data.len(),
            if frame.is_new_stream { " (new stream)" } else { "" },
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = ReceiverConfig::builder()
        .host("0.0.0.0")
        .port(1935)
        .enable_logging(true)
        .build()?;

    info!("Starting RTMP ingest on port {}", config.port);
    let mut receiver = RtmpReceiver::start(config, PrintSink).await?;

    info!("Press Ctrl+C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Error waiting for shutdown signal: {}", e);
    }

    receiver.stop().await;
    info!("Receiver stopped");
    Ok(())
}
