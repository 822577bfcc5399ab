use super::synthesis_repository::{
    read_audio_response, SynthesisError, SynthesisRepository, SynthesisRequest,
};
use crate::domain::narration::TtsEngine;
use async_trait::async_trait;
use bytes::Bytes;

/// Google Translate TTS rejects longer inputs
const MAX_CHUNK_LENGTH: usize = 200;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; narration-backend)";

/// Plain (non-cloning) synthesis through the Google Translate TTS endpoint.
/// Returns MP3 audio in the backend's built-in voice.
pub struct GoogleSynthesisRepository {
    http_client: reqwest::Client,
    url: String,
}

impl GoogleSynthesisRepository {
    pub fn new(http_client: reqwest::Client, url: String) -> Self {
        Self { http_client, url }
    }
}

#[async_trait]
impl SynthesisRepository for GoogleSynthesisRepository {
    fn engine(&self) -> TtsEngine {
        TtsEngine::Google
    }

    fn max_chunk_length(&self) -> usize {
        MAX_CHUNK_LENGTH
    }

    async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<Bytes, SynthesisError> {
        let response = self
            .http_client
            .get(&self.url)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("ie", "UTF-8"),
                ("q", request.text),
                ("tl", request.language.google_tag()),
                ("client", "tw-ob"),
            ])
            .send()
            .await?;

        let audio = read_audio_response(response).await?;

        tracing::debug!(
            language = %request.language,
            text_length = request.text.chars().count(),
            audio_size = audio.len(),
            "Google synthesis completed"
        );

        Ok(audio)
    }
}
