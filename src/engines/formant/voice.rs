use std::path::Path;

use crate::error::CapabilityError;

/// Pitch used when a reference recording is too quiet to measure.
const FALLBACK_PITCH_HZ: f32 = 140.0;
const MIN_PITCH_HZ: f32 = 60.0;
const MAX_PITCH_HZ: f32 = 400.0;
const MIN_ENERGY: f32 = 0.05;
const MAX_ENERGY: f32 = 0.5;
/// RMS below which a reference is treated as silence.
const SILENCE_RMS: f32 = 1e-4;

/// Voice characteristics measured from a reference recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceProfile {
    /// Estimated fundamental frequency.
    pub pitch_hz: f32,
    /// RMS level, clamped to a usable range.
    pub energy: f32,
}

impl VoiceProfile {
    /// Analyse a WAV file.
    ///
    /// Integer and float encodings at any sample rate are accepted;
    /// multichannel input is mixed down to mono first.
    pub fn from_wav(path: &Path) -> Result<Self, CapabilityError> {
        let reader = hound::WavReader::open(path).map_err(|e| {
            CapabilityError::runtime(format!(
                "cannot read reference voice {}: {e}",
                path.display()
            ))
        })?;
        let spec = reader.spec();
        let samples = read_mono(reader)?;

        if samples.is_empty() {
            return Err(CapabilityError::runtime(format!(
                "reference voice {} contains no audio",
                path.display()
            )));
        }

        let profile = Self::measure(&samples, spec.sample_rate);
        log::debug!(
            "Voice profile for {}: {:.1}Hz, energy {:.3}",
            path.display(),
            profile.pitch_hz,
            profile.energy
        );
        Ok(profile)
    }

    /// Zero-crossing pitch estimate and RMS energy of a mono signal.
    pub fn measure(samples: &[f32], sample_rate: u32) -> Self {
        let rms = (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt();
        if rms < SILENCE_RMS {
            return Self {
                pitch_hz: FALLBACK_PITCH_HZ,
                energy: MIN_ENERGY,
            };
        }

        let crossings = samples
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count();
        let duration = samples.len() as f32 / sample_rate as f32;
        let pitch_hz = (crossings as f32 / (2.0 * duration)).clamp(MIN_PITCH_HZ, MAX_PITCH_HZ);

        Self {
            pitch_hz,
            energy: rms.clamp(MIN_ENERGY, MAX_ENERGY),
        }
    }
}

fn read_mono<R: std::io::Read>(reader: hound::WavReader<R>) -> Result<Vec<f32>, CapabilityError> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(decode_error)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(decode_error)?
        }
    };

    Ok(interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect())
}

fn decode_error(err: hound::Error) -> CapabilityError {
    CapabilityError::runtime(format!("failed to decode reference voice: {err}"))
}
