use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::voice::VoiceProfile;
use crate::audio::DEFAULT_SAMPLE_RATE;
use crate::error::CapabilityError;

/// Longest render accepted, in samples (10 minutes).
pub const MAX_RENDER_SAMPLES: usize = 600 * DEFAULT_SAMPLE_RATE as usize;

const LETTER_SAMPLES: usize = 1_920; // 80ms
const SPACE_SAMPLES: usize = 1_200; // 50ms
const SHORT_PAUSE_SAMPLES: usize = 2_880; // 120ms
const LONG_PAUSE_SAMPLES: usize = 6_000; // 250ms
const ENVELOPE_SAMPLES: usize = 240; // 10ms
const CROSSFADE_SAMPLES: usize = 240; // 10ms @ 24kHz
const HARMONICS: usize = 8;
const MAX_JITTER: f32 = 0.03;
const PEAK: f32 = 0.9;

/// The two random streams the renderer draws from.
///
/// Both must be reseeded together for a render to be reproducible.
pub struct RngStreams {
    noise: StdRng,
    jitter: StdRng,
}

impl RngStreams {
    pub fn from_entropy() -> Self {
        Self {
            noise: StdRng::from_entropy(),
            jitter: StdRng::from_entropy(),
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.noise = StdRng::seed_from_u64(seed);
        self.jitter = StdRng::seed_from_u64(seed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Vowel { f1: f32, f2: f32 },
    Voiced,
    Unvoiced,
    Silence(usize),
}

fn classify(ch: char) -> Option<Segment> {
    let lower = ch.to_ascii_lowercase();
    let segment = match lower {
        'a' => Segment::Vowel { f1: 730.0, f2: 1090.0 },
        'e' => Segment::Vowel { f1: 530.0, f2: 1840.0 },
        'i' | 'y' => Segment::Vowel { f1: 270.0, f2: 2290.0 },
        'o' => Segment::Vowel { f1: 570.0, f2: 840.0 },
        'u' | 'w' => Segment::Vowel { f1: 300.0, f2: 870.0 },
        'b' | 'd' | 'g' | 'j' | 'l' | 'm' | 'n' | 'r' | 'v' | 'z' => Segment::Voiced,
        c if c.is_ascii_alphanumeric() => Segment::Unvoiced,
        c if c.is_whitespace() => Segment::Silence(SPACE_SAMPLES),
        ',' | ';' | ':' | '-' => Segment::Silence(SHORT_PAUSE_SAMPLES),
        '.' | '!' | '?' => Segment::Silence(LONG_PAUSE_SAMPLES),
        // Treat other scripts as open vowels so every letter is audible.
        c if c.is_alphabetic() => Segment::Vowel { f1: 600.0, f2: 1200.0 },
        _ => return None,
    };
    Some(segment)
}

impl Segment {
    fn len(self) -> usize {
        match self {
            Segment::Silence(len) => len,
            _ => LETTER_SAMPLES,
        }
    }
}

/// Render `text` in the given voice.
///
/// Fails before allocating when the output would exceed
/// [`MAX_RENDER_SAMPLES`].
pub fn render(
    text: &str,
    voice: &VoiceProfile,
    rng: &mut RngStreams,
) -> Result<Vec<f32>, CapabilityError> {
    let planned = text
        .chars()
        .filter_map(classify)
        .fold(0usize, |total, segment| total.saturating_add(segment.len()));
    if planned > MAX_RENDER_SAMPLES {
        return Err(CapabilityError::runtime(format!(
            "text would render {planned} samples, above the limit of {MAX_RENDER_SAMPLES}"
        )));
    }

    let mut out: Vec<f32> = Vec::with_capacity(planned);
    let mut clock = 0usize;

    for segment in text.chars().filter_map(classify) {
        let audio = match segment {
            Segment::Silence(len) => vec![0.0; len],
            Segment::Vowel { f1, f2 } => {
                let pitch = jittered(voice.pitch_hz, rng);
                harmonic(pitch, Some((f1, f2)), clock, LETTER_SAMPLES)
            }
            Segment::Voiced => {
                let pitch = jittered(voice.pitch_hz, rng);
                let tone = harmonic(pitch, None, clock, LETTER_SAMPLES);
                let noise = noise(rng, LETTER_SAMPLES);
                tone.iter().zip(&noise).map(|(t, n)| 0.6 * t + 0.2 * n).collect()
            }
            Segment::Unvoiced => noise(rng, LETTER_SAMPLES)
                .into_iter()
                .map(|n| 0.3 * n)
                .collect(),
        };
        clock += audio.len();

        let audio = apply_envelope(audio);
        if out.is_empty() {
            out.extend_from_slice(&audio);
        } else {
            append_with_crossfade(&mut out, &audio, CROSSFADE_SAMPLES);
        }
    }

    scale_to(&mut out, voice.energy);
    Ok(out)
}

fn jittered(pitch_hz: f32, rng: &mut RngStreams) -> f32 {
    pitch_hz * (1.0 + rng.jitter.gen_range(-MAX_JITTER..=MAX_JITTER))
}

/// Sum of harmonics of `pitch_hz`, shaped by two formant peaks when given.
///
/// `clock` keeps phase continuous across segments.
fn harmonic(pitch_hz: f32, formants: Option<(f32, f32)>, clock: usize, len: usize) -> Vec<f32> {
    let weights: Vec<f32> = (1..=HARMONICS)
        .map(|k| {
            let freq = k as f32 * pitch_hz;
            match formants {
                Some((f1, f2)) => {
                    (-((freq - f1) / 300.0).powi(2)).exp()
                        + 0.5 * (-((freq - f2) / 500.0).powi(2)).exp()
                        + 0.05
                }
                None => 1.0 / k as f32,
            }
        })
        .collect();
    let norm: f32 = weights.iter().sum();

    (0..len)
        .map(|i| {
            let t = (clock + i) as f32 / DEFAULT_SAMPLE_RATE as f32;
            weights
                .iter()
                .enumerate()
                .map(|(k, w)| w * (TAU * (k + 1) as f32 * pitch_hz * t).sin())
                .sum::<f32>()
                / norm
        })
        .collect()
}

fn noise(rng: &mut RngStreams, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.noise.gen_range(-1.0..=1.0)).collect()
}

fn apply_envelope(mut audio: Vec<f32>) -> Vec<f32> {
    let ramp = ENVELOPE_SAMPLES.min(audio.len() / 2);
    let len = audio.len();
    for i in 0..ramp {
        let gain = i as f32 / ramp as f32;
        audio[i] *= gain;
        audio[len - 1 - i] *= gain;
    }
    audio
}

fn scale_to(samples: &mut [f32], energy: f32) {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak == 0.0 {
        return;
    }
    // Louder references give louder output, never above PEAK.
    let gain = (PEAK * (energy / 0.5).sqrt()) / peak;
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

fn append_with_crossfade(dst: &mut Vec<f32>, src: &[f32], crossfade_samples: usize) {
    let overlap = crossfade_samples.min(dst.len()).min(src.len());
    if overlap == 0 {
        dst.extend_from_slice(src);
        return;
    }

    let dst_start = dst.len() - overlap;
    for (i, &incoming) in src[..overlap].iter().enumerate() {
        let t = (i + 1) as f32 / (overlap as f32 + 1.0);
        dst[dst_start + i] = dst[dst_start + i] * (1.0 - t) + incoming * t;
    }

    dst.extend_from_slice(&src[overlap..]);
}
