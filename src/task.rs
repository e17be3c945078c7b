//! The unit of work run under the admission slot.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::audio::{AudioFormat, EncodedAudio};
use crate::capability::{CapabilityAdapter, SynthesisCapability};
use crate::error::SynthesisError;
use crate::SynthesisResult;

/// One synthesis call, as accepted from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_reference: PathBuf,
    pub seed: Option<u64>,
    pub output_format: AudioFormat,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice_reference: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            voice_reference: voice_reference.into(),
            seed: None,
            output_format: AudioFormat::default(),
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.output_format = format;
        self
    }
}

/// Voice lookup, synthesis and encoding, run blocking to completion.
#[derive(Clone)]
pub struct InferenceTask {
    adapter: CapabilityAdapter,
}

impl InferenceTask {
    pub fn new(capability: Arc<dyn SynthesisCapability>) -> Self {
        Self {
            adapter: CapabilityAdapter::new(capability),
        }
    }

    pub fn capability_name(&self) -> &str {
        self.adapter.capability().name()
    }

    pub fn run(&self, request: &SynthesisRequest) -> Result<EncodedAudio, SynthesisError> {
        let result = self.execute(request);
        if let Err(err) = &result {
            log::error!("Inference failed during {}: {}", err.stage(), err);
        }
        result
    }

    fn execute(&self, request: &SynthesisRequest) -> Result<EncodedAudio, SynthesisError> {
        ensure_voice_exists(&request.voice_reference)?;

        let started = Instant::now();
        let samples = self.adapter.synthesize(
            &request.text,
            &request.voice_reference,
            request.seed,
        )?;
        let result = SynthesisResult {
            samples,
            sample_rate: self.adapter.capability().sample_rate(),
        };
        let elapsed = started.elapsed();
        log::info!(
            "Synthesized {:.2}s of audio in {:.2?} ({:.1}x real-time)",
            result.duration_secs(),
            elapsed,
            result.duration_secs() / elapsed.as_secs_f64().max(f64::EPSILON)
        );

        Ok(result.encode(request.output_format)?)
    }
}

fn ensure_voice_exists(path: &Path) -> Result<(), SynthesisError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(SynthesisError::VoiceNotFound(path.to_path_buf())),
    }
}
