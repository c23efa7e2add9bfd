use crate::{Error, Result};

/// Receiver configuration
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Host to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Log connection lifecycle events at info level
    pub enable_logging: bool,

    /// Outgoing chunk size announced on connect
    pub chunk_size: u32,

    /// Window acknowledgement size announced on connect
    pub window_ack_size: u32,

    /// Peer bandwidth announced on connect
    pub peer_bandwidth: u32,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            host: "0.0.0.0".to_string(),
            port: 1935,
            enable_logging: false,
            chunk_size: 60_000,
            window_ack_size: 2_500_000,
            peer_bandwidth: 2_500_000,
        }
    }
}

impl ReceiverConfig {
    /// Create config builder
    pub fn builder() -> ReceiverConfigBuilder {
        ReceiverConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("Invalid port: 0"));
        }

        if self.chunk_size < 128 {
            return Err(Error::config("Chunk size must be at least 128"));
        }

        if self.chunk_size > 65536 {
            return Err(Error::config("Chunk size must not exceed 65536"));
        }

        if self.window_ack_size == 0 {
            return Err(Error::config("Window acknowledgement size must be non-zero"));
        }

        Ok(())
    }
}

/// Builder for ReceiverConfig
pub struct ReceiverConfigBuilder {
    config: ReceiverConfig,
}

impl ReceiverConfigBuilder {
    pub fn new() -> Self {
        ReceiverConfigBuilder {
            config: ReceiverConfig::default(),
        }
    }

    /// Set host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable lifecycle logging
    pub fn enable_logging(mut self, enable: bool) -> Self {
        self.config.enable_logging = enable;
        self
    }

    /// Set the announced outgoing chunk size
    pub fn chunk_size(mut self, size: u32) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the announced window acknowledgement size
    pub fn window_ack_size(mut self, size: u32) -> Self {
        self.config.window_ack_size = size;
        self
    }

    /// Build configuration
    pub fn build(self) -> Result<ReceiverConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ReceiverConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
