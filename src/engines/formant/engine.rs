use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::capability::{Conditioning, Invocation, SynthesisCapability, Tensor, Waveform};
use crate::error::CapabilityError;

use super::render::{render, RngStreams};
use super::voice::VoiceProfile;

/// Formant speech engine.
///
/// Accepts every generation convention. Positional calls return a `[1, n]`
/// host tensor, batched calls return one tensor per input, and keyword
/// calls return plain samples.
///
/// ```rust,no_run
/// use std::path::Path;
/// use tts_gateway::capability::{Invocation, SynthesisCapability};
/// use tts_gateway::engines::formant::FormantEngine;
///
/// let engine = FormantEngine::new();
/// engine.manual_seed(42)?;
/// let voice = engine.prepare_conditionals(Path::new("voices/Jordan.wav"))?;
/// let waveform = engine.generate(Invocation::Keyword {
///     text: "Hello, world!",
///     conditionals: &voice,
/// })?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct FormantEngine {
    rng: Mutex<RngStreams>,
}

impl Default for FormantEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FormantEngine {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(RngStreams::from_entropy()),
        }
    }

    fn render(&self, text: &str, conditioning: &Conditioning) -> Result<Vec<f32>, CapabilityError> {
        let voice = conditioning.downcast_ref::<VoiceProfile>().ok_or_else(|| {
            CapabilityError::runtime("conditioning was not produced by the formant engine")
        })?;
        // A panicked render leaves the streams in a valid (if unseeded) state.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        render(text, voice, &mut rng)
    }
}

impl SynthesisCapability for FormantEngine {
    fn name(&self) -> &str {
        "formant"
    }

    fn manual_seed(&self, seed: u64) -> Result<(), CapabilityError> {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reseed(seed);
        Ok(())
    }

    fn prepare_conditionals(&self, wav_fpath: &Path) -> Result<Conditioning, CapabilityError> {
        VoiceProfile::from_wav(wav_fpath).map(Conditioning::new)
    }

    fn generate(&self, invocation: Invocation<'_>) -> Result<Waveform, CapabilityError> {
        match invocation {
            Invocation::Positional { text, conditioning } => {
                let samples = self.render(text, conditioning)?;
                let len = samples.len();
                Ok(Waveform::Tensor(Tensor::host(samples, vec![1, len])))
            }
            Invocation::Batched {
                texts,
                conditioning,
            } => texts
                .iter()
                .map(|text| {
                    let samples = self.render(text, conditioning)?;
                    let len = samples.len();
                    Ok::<_, CapabilityError>(Waveform::Tensor(Tensor::host(samples, vec![len])))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Waveform::List),
            Invocation::Keyword { text, conditionals } => {
                self.render(text, conditionals).map(Waveform::Samples)
            }
        }
    }
}
