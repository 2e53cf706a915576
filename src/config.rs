//! Configuration for stalkline
//!
//! Centralized connection settings with sensible defaults.

use std::time::Duration;

/// Default beanstalkd host
pub const DEFAULT_HOST: &str = "localhost";

/// Default beanstalkd port
pub const DEFAULT_PORT: u16 = 11300;

/// Largest job body the framer will accept from the server (1 GiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 1 << 30;

/// Connection configuration
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Server
    // -------------------------------------------------------------------------
    /// Target server address
    pub host: String,

    /// Target server port
    pub port: u16,

    // -------------------------------------------------------------------------
    // Decoding
    // -------------------------------------------------------------------------
    /// Parse stats/list bodies into documents instead of returning raw text
    pub decode_documents: bool,

    /// Upper bound on a declared response body length
    pub max_body_size: usize,

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------
    /// Bound on the initial TCP connect (`None` uses the OS default)
    pub connect_timeout: Option<Duration>,

    /// Socket read timeout. Leave unset to let a plain `reserve` block.
    pub read_timeout: Option<Duration>,

    /// Socket write timeout
    pub write_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            decode_documents: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` form of the target address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable or disable structured decoding of stats/list bodies
    pub fn decode_documents(mut self, enabled: bool) -> Self {
        self.config.decode_documents = enabled;
        self
    }

    /// Set the maximum accepted response body size (in bytes)
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the socket read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = Some(timeout);
        self
    }

    /// Set the socket write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
