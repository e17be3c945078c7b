use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::AudioFormat;

/// Failure reported by a [`SynthesisCapability`](crate::capability::SynthesisCapability).
///
/// The split matters: the adapter falls through to the next call convention
/// only on [`CapabilityError::SignatureMismatch`]. Every other failure is a
/// genuine computation error and propagates immediately.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("signature mismatch: {0}")]
    SignatureMismatch(String),
    #[error("{0}")]
    Runtime(String),
}

impl CapabilityError {
    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::SignatureMismatch(msg.into())
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}

/// The step of an inference task that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    VoiceLookup,
    Seeding,
    Conditioning,
    Generation,
    Normalization,
    Encoding,
    Dispatch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::VoiceLookup => "voice lookup",
            Stage::Seeding => "seeding",
            Stage::Conditioning => "conditioning",
            Stage::Generation => "generation",
            Stage::Normalization => "normalization",
            Stage::Encoding => "encoding",
            Stage::Dispatch => "dispatch",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InferenceError {
    #[error("{stage} failed: {source}")]
    Capability {
        stage: Stage,
        #[source]
        source: CapabilityError,
    },
    #[error("no generate() call convention matched after {attempts} attempts: {last}")]
    ConventionsExhausted {
        attempts: usize,
        #[source]
        last: CapabilityError,
    },
    #[error("malformed waveform: {0}")]
    MalformedOutput(String),
    #[error("inference worker failed: {0}")]
    Worker(String),
    #[error("timed out after {0:?} waiting for the inference result")]
    TimedOut(Duration),
}

impl InferenceError {
    pub fn stage(&self) -> Stage {
        match self {
            InferenceError::Capability { stage, .. } => *stage,
            InferenceError::ConventionsExhausted { .. } => Stage::Generation,
            InferenceError::MalformedOutput(_) => Stage::Normalization,
            InferenceError::Worker(_) | InferenceError::TimedOut(_) => Stage::Dispatch,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EncodingError {
    #[error("cannot encode an empty sample buffer")]
    EmptyBuffer,
    #[error("no encoder available for {0} output")]
    EncoderUnavailable(AudioFormat),
    #[error("WAV writer error: {0}")]
    Wav(#[from] hound::Error),
    #[error("MP3 encoder error: {0}")]
    Mp3(String),
}

/// Transport-independent classification of a [`SynthesisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Internal,
}

/// Every failure the gateway can hand back to a caller.
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("Voice file not found on server: {}", .0.display())]
    VoiceNotFound(PathBuf),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl SynthesisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SynthesisError::VoiceNotFound(_) => ErrorKind::NotFound,
            SynthesisError::Inference(_) | SynthesisError::Encoding(_) => ErrorKind::Internal,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            SynthesisError::VoiceNotFound(_) => Stage::VoiceLookup,
            SynthesisError::Inference(e) => e.stage(),
            SynthesisError::Encoding(_) => Stage::Encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_voice_maps_to_not_found() {
        let missing = SynthesisError::VoiceNotFound(PathBuf::from("voices/missing.wav"));
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert!(missing.to_string().contains("voices/missing.wav"));

        let exhausted = SynthesisError::from(InferenceError::ConventionsExhausted {
            attempts: 3,
            last: CapabilityError::mismatch("unexpected keyword 'conditionals'"),
        });
        assert_eq!(exhausted.kind(), ErrorKind::Internal);
        assert_eq!(exhausted.stage(), Stage::Generation);

        let empty = SynthesisError::from(EncodingError::EmptyBuffer);
        assert_eq!(empty.kind(), ErrorKind::Internal);
        assert_eq!(empty.stage(), Stage::Encoding);
    }

    #[test]
    fn capability_failure_keeps_its_stage() {
        let err = InferenceError::Capability {
            stage: Stage::Conditioning,
            source: CapabilityError::runtime("CUDA out of memory"),
        };
        assert_eq!(err.stage(), Stage::Conditioning);
        assert_eq!(err.to_string(), "conditioning failed: CUDA out of memory");
    }
}
