//! In-memory audio encoding.
//!
//! Encoders need the complete sample buffer, so output is always fully
//! materialised before it is handed to the transport layer.

use std::fmt;
use std::io::Cursor;

use crate::error::EncodingError;

/// Sample rate of capabilities that do not report their own.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Container format of an encoded response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    Wav,
    #[default]
    Mp3,
}

impl AudioFormat {
    /// Resolve a client-supplied format name.
    ///
    /// Matching is case-insensitive. Only `"wav"` selects the uncompressed
    /// container; any other value falls back to MP3.
    pub fn from_requested(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("wav") {
            AudioFormat::Wav
        } else {
            AudioFormat::Mp3
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudioFormat::Wav => "WAV",
            AudioFormat::Mp3 => "MP3",
        })
    }
}

/// A complete encoded audio payload plus its container format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    bytes: Vec<u8>,
    format: AudioFormat,
}

impl EncodedAudio {
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode mono `f32` samples into the requested container.
pub fn encode(
    samples: &[f32],
    sample_rate: u32,
    format: AudioFormat,
) -> Result<EncodedAudio, EncodingError> {
    if samples.is_empty() {
        return Err(EncodingError::EmptyBuffer);
    }

    let bytes = match format {
        AudioFormat::Wav => encode_wav(samples, sample_rate)?,
        AudioFormat::Mp3 => encode_mp3(samples, sample_rate)?,
    };

    log::debug!(
        "Encoded {} samples @ {}Hz into {} bytes of {}",
        samples.len(),
        sample_rate,
        bytes.len(),
        format
    );

    Ok(EncodedAudio { bytes, format })
}

/// 32-bit float WAV, so a decode returns the exact input samples.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, EncodingError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 4));
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}

#[cfg(feature = "mp3")]
fn encode_mp3(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, EncodingError> {
    use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, MonoPcm, Quality};

    // Worst-case size of the final LAME flush.
    const FLUSH_RESERVE: usize = 7200;

    let mut builder = Builder::new()
        .ok_or_else(|| EncodingError::Mp3("failed to allocate LAME encoder".to_string()))?;
    builder.set_num_channels(1).map_err(mp3_error)?;
    builder.set_sample_rate(sample_rate).map_err(mp3_error)?;
    builder.set_brate(Bitrate::Kbps128).map_err(mp3_error)?;
    builder.set_quality(Quality::Best).map_err(mp3_error)?;
    let mut encoder = builder.build().map_err(mp3_error)?;

    let pcm: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();

    let mut out = Vec::new();
    out.reserve(mp3lame_encoder::max_required_buffer_size(pcm.len()));
    encoder
        .encode_to_vec(MonoPcm(&pcm), &mut out)
        .map_err(mp3_error)?;

    out.reserve(FLUSH_RESERVE);
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(mp3_error)?;

    Ok(out)
}

#[cfg(not(feature = "mp3"))]
fn encode_mp3(_samples: &[f32], _sample_rate: u32) -> Result<Vec<u8>, EncodingError> {
    Err(EncodingError::EncoderUnavailable(AudioFormat::Mp3))
}

#[cfg(feature = "mp3")]
fn mp3_error(err: impl fmt::Debug) -> EncodingError {
    EncodingError::Mp3(format!("{err:?}"))
}
