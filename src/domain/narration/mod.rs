pub mod assembler;
pub mod error;
pub mod language;
pub mod model;
pub mod segmenter;
pub mod service;
pub mod text;

pub use assembler::{download_filename, AssembledAudio, AssemblyError};
pub use error::NarrationServiceError;
pub use language::{contains_cjk, detect_language, LanguageCode};
pub use model::{CacheKey, CacheWriteScope, Chunk, OwnerScope, SynthesisParams, TtsEngine};
pub use segmenter::{segment, DEFAULT_MAX_CHUNK_LENGTH};
pub use service::{
    DownloadedNarration, NarrationPlan, NarrationRequest, NarrationService, NarrationServiceApi,
    NarrationStream,
};
pub use text::clean_text;

use crate::domain::voice::VoiceProfileSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request for POST /stream_audio
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamAudioRequest {
    pub story: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

/// Query for GET /download_audio
#[derive(Debug, Deserialize)]
pub struct DownloadAudioQuery {
    pub story_id: Option<String>,
    pub tts_service: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TtsServiceOption {
    pub id: String,
    pub name: String,
    pub clones_voice: bool,
}

/// Response for GET /tts-options
#[derive(Debug, Clone, Serialize)]
pub struct TtsOptionsResponse {
    pub services: Vec<TtsServiceOption>,
    pub default_service: TtsEngine,
    pub voice_profiles: BTreeMap<LanguageCode, Vec<VoiceProfileSummary>>,
}
