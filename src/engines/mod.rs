//! Speech synthesis engines.
//!
//! Engines are loaded by name at bootstrap. Loading also checks that the
//! engine exposes both required primitives; a process without a complete
//! capability must not start serving.
//!
//! # Available Engines
//!
//! - `formant` - built-in formant synthesizer (no model files needed)

pub mod formant;

use std::sync::Arc;

use crate::capability::SynthesisCapability;

/// Names accepted by [`load`].
pub const AVAILABLE: &[&str] = &["formant"];

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Unknown engine '{name}'. Available engines: {}", AVAILABLE.join(", "))]
    UnknownEngine { name: String },
    #[error("Engine '{name}' does not support the prepare_conditionals/generate flow (missing: {})", .missing.join(", "))]
    MissingEntryPoints {
        name: String,
        missing: Vec<&'static str>,
    },
}

/// Load an engine by name and verify its entry points.
pub fn load(name: &str) -> Result<Arc<dyn SynthesisCapability>, LoadError> {
    let capability: Arc<dyn SynthesisCapability> = match name.trim().to_ascii_lowercase().as_str() {
        "formant" => Arc::new(formant::FormantEngine::new()),
        _ => {
            return Err(LoadError::UnknownEngine {
                name: name.to_string(),
            })
        }
    };

    verify(capability.as_ref())?;
    log::info!("Loaded '{}' synthesis engine", capability.name());
    Ok(capability)
}

/// Check that a capability provides both required primitives.
pub fn verify(capability: &dyn SynthesisCapability) -> Result<(), LoadError> {
    let entry_points = capability.entry_points();
    if entry_points.is_complete() {
        return Ok(());
    }
    Err(LoadError::MissingEntryPoints {
        name: capability.name().to_string(),
        missing: entry_points.missing(),
    })
}
