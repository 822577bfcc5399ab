use super::synthesis_repository::{
    read_audio_response, SynthesisError, SynthesisRepository, SynthesisRequest,
};
use crate::domain::narration::TtsEngine;
use crate::domain::voice::ReferenceAudio;
use crate::infrastructure::config::ReferenceAudioTransport;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::Serialize;
use std::time::Instant;

/// How the backend should deliver the generated audio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Stream,
    File,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum RefAudioPayload {
    Path(String),
    Inline {
        data: String,
        #[serde(rename = "type")]
        kind: &'static str,
    },
}

impl RefAudioPayload {
    fn inline(audio: &[u8]) -> Self {
        RefAudioPayload::Inline {
            data: STANDARD.encode(audio),
            kind: "base64",
        }
    }
}

#[derive(Debug, Serialize)]
struct F5Request<'a> {
    text_to_generate: &'a str,
    ref_audio: RefAudioPayload,
    ref_text: &'a str,
    remove_silence: bool,
    cross_fade_duration: f32,
    nfe_step: u32,
    speed: f32,
    response_type: ResponseType,
}

/// Voice-cloning synthesis against an F5-TTS HTTP service
pub struct F5SynthesisRepository {
    http_client: reqwest::Client,
    url: String,
    transport: ReferenceAudioTransport,
    response_type: ResponseType,
    max_chunk_length: usize,
}

impl F5SynthesisRepository {
    pub fn new(
        http_client: reqwest::Client,
        url: String,
        transport: ReferenceAudioTransport,
        max_chunk_length: usize,
    ) -> Self {
        Self {
            http_client,
            url,
            transport,
            response_type: ResponseType::default(),
            max_chunk_length,
        }
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    async fn reference_payload(
        &self,
        reference: Option<&ReferenceAudio>,
    ) -> Result<RefAudioPayload, SynthesisError> {
        match (reference, self.transport) {
            (None, _) => Err(SynthesisError::ReferenceAudio(
                "voice profile has no reference audio".to_string(),
            )),
            (Some(ReferenceAudio::Inline(audio)), _) => Ok(RefAudioPayload::inline(audio)),
            (Some(ReferenceAudio::Path(path)), ReferenceAudioTransport::Path) => {
                Ok(RefAudioPayload::Path(path.to_string_lossy().into_owned()))
            }
            (Some(ReferenceAudio::Path(path)), ReferenceAudioTransport::Inline) => {
                let audio = tokio::fs::read(path).await.map_err(|e| {
                    SynthesisError::ReferenceAudio(format!("{}: {}", path.display(), e))
                })?;
                Ok(RefAudioPayload::inline(&audio))
            }
        }
    }
}

#[async_trait]
impl SynthesisRepository for F5SynthesisRepository {
    fn engine(&self) -> TtsEngine {
        TtsEngine::F5
    }

    fn max_chunk_length(&self) -> usize {
        self.max_chunk_length
    }

    async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<Bytes, SynthesisError> {
        let ref_audio = self
            .reference_payload(request.voice.reference_audio.as_ref())
            .await?;

        let body = F5Request {
            text_to_generate: request.text,
            ref_audio,
            ref_text: &request.voice.reference_text,
            remove_silence: request.params.remove_silence,
            cross_fade_duration: request.params.cross_fade_duration,
            nfe_step: request.params.nfe_step,
            speed: request.params.speed,
            response_type: self.response_type,
        };

        let started = Instant::now();
        let response = self.http_client.post(&self.url).json(&body).send().await?;
        let audio = read_audio_response(response).await?;

        tracing::debug!(
            voice = %request.voice.id,
            language = %request.language,
            text_length = request.text.chars().count(),
            audio_size = audio.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "F5 synthesis completed"
        );

        Ok(audio)
    }
}
