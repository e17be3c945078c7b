//! Formant synthesis engine.
//!
//! A small, fully deterministic speech-like synthesizer that needs no model
//! weights. Voice identity is taken from a reference WAV (pitch and level);
//! each character of the input is rendered as a voiced or unvoiced segment.
//!
//! It is the default capability of the gateway binary and the one used by
//! the integration tests. Heavier models plug in through the same
//! [`SynthesisCapability`](crate::capability::SynthesisCapability) trait.
//!
//! # Randomness
//!
//! Rendering draws from two independent streams: one for consonant noise
//! and one for pitch jitter. [`manual_seed`](crate::capability::SynthesisCapability::manual_seed)
//! reseeds both, so identical `(text, voice, seed)` inputs produce
//! identical samples.

pub mod engine;
pub mod render;
pub mod voice;

pub use engine::FormantEngine;
pub use render::MAX_RENDER_SAMPLES;
pub use voice::VoiceProfile;
