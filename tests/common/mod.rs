//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tts_gateway::capability::{Conditioning, Invocation, SynthesisCapability, Waveform};
use tts_gateway::CapabilityError;

/// Write a short 16-bit mono voice reference and return its path.
pub fn write_voice(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..8_000 {
        let s = (i as f32 * 110.0 * std::f32::consts::TAU / 16_000.0).sin() * 0.25;
        writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

/// Sleeps inside `generate` and records how many calls overlap.
///
/// Text `"boom"` fails with a runtime error and text `"panic"` panics.
pub struct SlowCapability {
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowCapability {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl SynthesisCapability for SlowCapability {
    fn name(&self) -> &str {
        "slow"
    }

    fn manual_seed(&self, _seed: u64) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn prepare_conditionals(&self, wav_fpath: &Path) -> Result<Conditioning, CapabilityError> {
        Ok(Conditioning::new(wav_fpath.to_path_buf()))
    }

    fn generate(&self, invocation: Invocation<'_>) -> Result<Waveform, CapabilityError> {
        let text = match invocation {
            Invocation::Positional { text, .. } => text,
            _ => return Err(CapabilityError::mismatch("only positional calls are supported")),
        };

        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);

        match text {
            "boom" => Err(CapabilityError::runtime("numerical instability in sampler")),
            "panic" => panic!("capability crashed"),
            _ => Ok(Waveform::Samples(vec![0.25; 2_400])),
        }
    }
}
