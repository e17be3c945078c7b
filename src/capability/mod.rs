//! The opaque synthesis capability and the adapter that tames it.
//!
//! A capability exposes two primitives, conditioning preparation and
//! generation. Its generation primitive is not held to a single call
//! convention: some implementations take a plain string, some a batch,
//! some only named arguments. Results are just as loose, ranging from a
//! flat buffer to a device-resident tensor wrapped in a tuple. The
//! [`CapabilityAdapter`] hides all of that behind one function.

pub mod adapter;

use std::any::Any;
use std::fmt;
use std::path::Path;

use crate::audio::DEFAULT_SAMPLE_RATE;
use crate::error::CapabilityError;

pub use adapter::{CapabilityAdapter, Convention};

/// Which of the two required primitives a capability actually provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoints {
    pub prepare_conditionals: bool,
    pub generate: bool,
}

impl EntryPoints {
    pub const ALL: EntryPoints = EntryPoints {
        prepare_conditionals: true,
        generate: true,
    };

    /// Names of the required primitives that are absent.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.prepare_conditionals {
            missing.push("prepare_conditionals");
        }
        if !self.generate {
            missing.push("generate");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.prepare_conditionals && self.generate
    }
}

/// Capability-produced voice conditioning.
///
/// Type-erased so that each capability can carry whatever it needs. It is
/// produced and consumed inside a single inference task and never shared.
pub struct Conditioning(Box<dyn Any + Send>);

impl Conditioning {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self(Box::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for Conditioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Conditioning(..)")
    }
}

/// One way of calling the generation primitive.
#[derive(Debug, Clone, Copy)]
pub enum Invocation<'a> {
    /// `generate(text, conditioning)`
    Positional {
        text: &'a str,
        conditioning: &'a Conditioning,
    },
    /// `generate([text], conditioning)`
    Batched {
        texts: &'a [&'a str],
        conditioning: &'a Conditioning,
    },
    /// `generate(text=text, conditionals=conditioning)`
    Keyword {
        text: &'a str,
        conditionals: &'a Conditioning,
    },
}

impl Invocation<'_> {
    pub fn conditioning(&self) -> &Conditioning {
        match self {
            Invocation::Positional { conditioning, .. }
            | Invocation::Batched { conditioning, .. } => conditioning,
            Invocation::Keyword { conditionals, .. } => conditionals,
        }
    }
}

/// Where a tensor's data currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Host,
    Accelerator(usize),
}

/// A dense row-major tensor of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    pub device: Device,
}

impl Tensor {
    pub fn host(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self {
            data,
            shape,
            device: Device::Host,
        }
    }

    /// Copy the tensor into host memory. A no-op for host tensors.
    pub fn to_host(self) -> Self {
        if self.device != Device::Host {
            log::debug!("Moving {:?} tensor {:?} to host", self.device, self.shape);
        }
        Self {
            device: Device::Host,
            ..self
        }
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Raw result of the generation primitive, in any of the shapes observed
/// across capability versions.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    Samples(Vec<f32>),
    Tensor(Tensor),
    Tuple(Vec<Waveform>),
    List(Vec<Waveform>),
}

/// An externally supplied speech synthesis component.
///
/// Implementations run on the shared accelerator and are never called
/// concurrently by the gateway, but must still be `Send + Sync` to cross
/// into the worker pool.
pub trait SynthesisCapability: Send + Sync {
    /// Short identifier used in logs and the health endpoint.
    fn name(&self) -> &str;

    fn entry_points(&self) -> EntryPoints {
        EntryPoints::ALL
    }

    /// Rate of the samples `generate` returns. Written into every WAV/MP3 header.
    fn sample_rate(&self) -> u32 {
        DEFAULT_SAMPLE_RATE
    }

    /// Seed every random stream the capability samples from.
    ///
    /// This mutates process-wide state of the capability; it is only
    /// reproducible because the gateway admits one task at a time.
    fn manual_seed(&self, seed: u64) -> Result<(), CapabilityError>;

    /// Derive conditioning from a reference recording.
    fn prepare_conditionals(&self, wav_fpath: &Path) -> Result<Conditioning, CapabilityError>;

    /// Generate a waveform.
    ///
    /// Must return [`CapabilityError::SignatureMismatch`] for invocation
    /// shapes it does not accept, and only for those.
    fn generate(&self, invocation: Invocation<'_>) -> Result<Waveform, CapabilityError>;
}
