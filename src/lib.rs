//! # tts-gateway
//!
//! Serve a speech synthesis model over HTTP from a single, non-reentrant
//! accelerator.
//!
//! ## Features
//!
//! - **Single-flight inference**: at most one synthesis runs at a time,
//!   while request intake keeps accepting and queueing callers
//! - **Convention-tolerant capability adapter**: works with generation
//!   primitives whose exact call shape is not known up front
//! - **WAV and MP3 output**: fully buffered, with the right media type
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! tts-gateway = "2026.2"
//! ```
//!
//! ```rust,no_run
//! use tts_gateway::{engines, AudioFormat, GatewayConfig, SingleFlightGateway, SynthesisRequest};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let capability = engines::load("formant")?;
//! let gateway = SingleFlightGateway::new(capability, GatewayConfig::default());
//!
//! let request = SynthesisRequest::new("Hello, world!", "voices/Jordan.wav")
//!     .with_seed(Some(42))
//!     .with_format(AudioFormat::Wav);
//! let audio = gateway.submit(request).await?;
//! std::fs::write("output.wav", audio.as_bytes())?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod capability;
pub mod config;
pub mod engines;
pub mod error;
pub mod gateway;
pub mod server;
pub mod task;

pub use audio::{AudioFormat, EncodedAudio, DEFAULT_SAMPLE_RATE};
pub use capability::{CapabilityAdapter, SynthesisCapability};
pub use error::{CapabilityError, EncodingError, ErrorKind, InferenceError, Stage, SynthesisError};
pub use gateway::{GatewayConfig, GatewayConfigBuilder, GatewayStats, SingleFlightGateway};
pub use task::{InferenceTask, SynthesisRequest};

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    /// Raw mono audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (24000 for every built-in engine)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Encode the audio into a complete in-memory container.
    pub fn encode(&self, format: AudioFormat) -> Result<EncodedAudio, EncodingError> {
        audio::encode(&self.samples, self.sample_rate, format)
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
