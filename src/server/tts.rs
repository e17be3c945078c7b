//! `POST /tts`

use std::path::PathBuf;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::audio::AudioFormat;
use crate::task::SynthesisRequest;

use super::{ApiError, AppState};

/// TTS request body
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    /// Text to synthesize
    pub text: String,

    /// Reference voice recording; the server default when absent or null
    #[serde(default)]
    pub voice_path: Option<PathBuf>,

    /// Seed for reproducible output; must be non-negative
    #[serde(default)]
    pub seed: Option<i64>,

    /// `wav`, or anything else for MP3
    #[serde(default = "default_format")]
    pub output_format: String,
}

fn default_format() -> String {
    "mp3".to_string()
}

impl TtsRequest {
    fn into_synthesis_request(self, state: &AppState) -> Result<SynthesisRequest, ApiError> {
        if self.text.trim().is_empty() {
            return Err(ApiError::bad_request("text must not be empty"));
        }
        let max = state.max_text_chars();
        if self.text.chars().nth(max).is_some() {
            return Err(ApiError::bad_request(format!(
                "text exceeds the limit of {max} characters"
            )));
        }
        let seed = self
            .seed
            .map(|seed| {
                u64::try_from(seed).map_err(|_| {
                    ApiError::bad_request(format!("seed must be a non-negative integer, got {seed}"))
                })
            })
            .transpose()?;

        let voice = self
            .voice_path
            .unwrap_or_else(|| state.default_voice().to_path_buf());
        let format = AudioFormat::from_requested(&self.output_format);

        Ok(SynthesisRequest::new(self.text, voice)
            .with_seed(seed)
            .with_format(format))
    }
}

/// Synthesize speech and return the encoded audio as the response body.
pub async fn synthesize(
    State(state): State<AppState>,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let request = req.into_synthesis_request(&state)?;
    log::info!(
        "TTS request: {} chars, voice {}, {}",
        request.text.chars().count(),
        request.voice_reference.display(),
        request.output_format
    );

    let audio = state.gateway.submit(request).await?;
    let content_type = audio.content_type();

    Ok(([(header::CONTENT_TYPE, content_type)], audio.into_bytes()).into_response())
}
