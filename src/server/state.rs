use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::gateway::SingleFlightGateway;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub gateway: SingleFlightGateway,
    default_voice: Arc<PathBuf>,
    max_text_chars: usize,
}

/// Longest accepted `text`, in characters, unless configured otherwise.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 5_000;

impl AppState {
    pub fn new(gateway: SingleFlightGateway, default_voice: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            default_voice: Arc::new(default_voice.into()),
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }

    pub fn with_max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.max_text_chars = max_text_chars;
        self
    }

    pub fn max_text_chars(&self) -> usize {
        self.max_text_chars
    }

    pub fn default_voice(&self) -> &Path {
        &self.default_voice
    }
}
