//! Command-line and environment configuration for the gateway binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::TypedValueParser;
use clap::Parser;

use crate::gateway::{GatewayConfig, GatewayConfigBuilder, GatewayConfigBuilderError};
use crate::server::state::DEFAULT_MAX_TEXT_CHARS;

/// Serve text-to-speech over HTTP, one inference at a time.
#[derive(Debug, Clone, Parser)]
#[command(name = "tts-gateway", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "TTS_GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "TTS_GATEWAY_PORT", default_value_t = 8004)]
    pub port: u16,

    /// Synthesis engine to load at startup
    #[arg(long, env = "TTS_GATEWAY_ENGINE", default_value = "formant")]
    pub engine: String,

    /// Voice reference used when a request omits `voice_path`
    #[arg(long, env = "TTS_GATEWAY_DEFAULT_VOICE", default_value = "voices/Jordan.wav")]
    pub default_voice: PathBuf,

    /// Give up waiting for a result after this many seconds
    #[arg(long, env = "TTS_GATEWAY_REQUEST_TIMEOUT")]
    pub request_timeout_secs: Option<u64>,

    /// Worker threads available for blocking inference
    #[arg(long, env = "TTS_GATEWAY_BLOCKING_THREADS", default_value_t = 2,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub blocking_threads: u16,

    /// Reject requests whose text is longer than this many characters
    #[arg(long, env = "TTS_GATEWAY_MAX_TEXT_CHARS", default_value_t = DEFAULT_MAX_TEXT_CHARS,
          value_parser = clap::value_parser!(u32).range(1..).map(|n| n as usize))]
    pub max_text_chars: usize,

    /// Default log filter (overridden by RUST_LOG)
    #[arg(long, env = "TTS_GATEWAY_LOG", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn gateway_config(&self) -> Result<GatewayConfig, GatewayConfigBuilderError> {
        let mut builder = GatewayConfigBuilder::default();
        if let Some(secs) = self.request_timeout_secs {
            builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }
}
