use std::path::Path;
use std::sync::Arc;

use crate::error::{CapabilityError, InferenceError, Stage};

use super::{Conditioning, Invocation, SynthesisCapability, Waveform};

/// Call conventions for the generation primitive, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Positional,
    Batched,
    Keyword,
}

impl Convention {
    pub const PRIORITY: [Convention; 3] =
        [Convention::Positional, Convention::Batched, Convention::Keyword];

    fn invocation<'a>(
        self,
        text: &'a str,
        batch: &'a [&'a str],
        conditioning: &'a Conditioning,
    ) -> Invocation<'a> {
        match self {
            Convention::Positional => Invocation::Positional { text, conditioning },
            Convention::Batched => Invocation::Batched {
                texts: batch,
                conditioning,
            },
            Convention::Keyword => Invocation::Keyword {
                text,
                conditionals: conditioning,
            },
        }
    }
}

/// Uniform `(text, voice, seed) -> samples` front for a [`SynthesisCapability`].
///
/// No retries happen here. A signature mismatch moves on to the next
/// convention; anything else is returned to the caller as is.
#[derive(Clone)]
pub struct CapabilityAdapter {
    capability: Arc<dyn SynthesisCapability>,
}

impl CapabilityAdapter {
    pub fn new(capability: Arc<dyn SynthesisCapability>) -> Self {
        Self { capability }
    }

    pub fn capability(&self) -> &dyn SynthesisCapability {
        self.capability.as_ref()
    }

    /// Produce a flat mono sample buffer for `text` in the voice of `voice_path`.
    pub fn synthesize(
        &self,
        text: &str,
        voice_path: &Path,
        seed: Option<u64>,
    ) -> Result<Vec<f32>, InferenceError> {
        if let Some(seed) = seed {
            self.capability
                .manual_seed(seed)
                .map_err(|source| InferenceError::Capability {
                    stage: Stage::Seeding,
                    source,
                })?;
        }

        // Recomputed for every request, even for a repeated voice.
        let conditioning = self
            .capability
            .prepare_conditionals(voice_path)
            .map_err(|source| InferenceError::Capability {
                stage: Stage::Conditioning,
                source,
            })?;

        let waveform = self.generate(text, &conditioning)?;
        normalize(waveform)
    }

    fn generate(&self, text: &str, conditioning: &Conditioning) -> Result<Waveform, InferenceError> {
        let batch = [text];
        let mut last = CapabilityError::mismatch("no call convention attempted");

        for convention in Convention::PRIORITY {
            let invocation = convention.invocation(text, &batch, conditioning);
            match self.capability.generate(invocation) {
                Ok(waveform) => {
                    log::debug!(
                        "{} accepted the {:?} generate() convention",
                        self.capability.name(),
                        convention
                    );
                    return Ok(waveform);
                }
                Err(CapabilityError::SignatureMismatch(reason)) => {
                    log::debug!(
                        "{} rejected the {:?} generate() convention: {}",
                        self.capability.name(),
                        convention,
                        reason
                    );
                    last = CapabilityError::SignatureMismatch(reason);
                }
                Err(source) => {
                    return Err(InferenceError::Capability {
                        stage: Stage::Generation,
                        source,
                    })
                }
            }
        }

        Err(InferenceError::ConventionsExhausted {
            attempts: Convention::PRIORITY.len(),
            last,
        })
    }
}

/// Reduce a raw generation result to a flat host-resident sample buffer.
///
/// A tuple yields its first element; a non-empty list then yields its first
/// element; whatever remains is moved to host memory and flattened in order.
pub fn normalize(waveform: Waveform) -> Result<Vec<f32>, InferenceError> {
    let waveform = match waveform {
        Waveform::Tuple(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::MalformedOutput("empty tuple".to_string()))?,
        other => other,
    };

    let waveform = match waveform {
        Waveform::List(items) if !items.is_empty() => items
            .into_iter()
            .next()
            .unwrap_or(Waveform::Samples(Vec::new())),
        other => other,
    };

    let mut samples = Vec::new();
    flatten_into(waveform, &mut samples)?;

    if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
        return Err(InferenceError::MalformedOutput(format!(
            "non-finite sample {} at index {pos}",
            samples[pos]
        )));
    }

    Ok(samples)
}

fn flatten_into(waveform: Waveform, out: &mut Vec<f32>) -> Result<(), InferenceError> {
    match waveform {
        Waveform::Samples(samples) => out.extend(samples),
        Waveform::Tensor(tensor) => {
            let tensor = tensor.to_host();
            if tensor.data.len() != tensor.numel() {
                return Err(InferenceError::MalformedOutput(format!(
                    "tensor of shape {:?} holds {} values",
                    tensor.shape,
                    tensor.data.len()
                )));
            }
            out.extend(tensor.data);
        }
        Waveform::Tuple(items) | Waveform::List(items) => {
            for item in items {
                flatten_into(item, out)?;
            }
        }
    }
    Ok(())
}
