use crate::domain::narration::{LanguageCode, SynthesisParams, TtsEngine};
use crate::domain::voice::VoiceProfile;
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("synthesis request failed: {0}")]
    Transport(reqwest::Error),
    #[error("synthesis request timed out")]
    Timeout,
    #[error("synthesis backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("synthesis backend returned no audio")]
    EmptyAudio,
    #[error("reference audio unavailable: {0}")]
    ReferenceAudio(String),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SynthesisError::Timeout
        } else {
            SynthesisError::Transport(err)
        }
    }
}

/// One chunk to synthesize with a given voice
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub voice: &'a VoiceProfile,
    pub language: LanguageCode,
    pub params: SynthesisParams,
}

/// Abstracts a remote synthesis backend.
///
/// Implementations synthesize exactly one bounded chunk per call and return
/// the encoded audio as produced by the backend. Splitting text and merging
/// audio are the caller's concern.
#[async_trait]
pub trait SynthesisRepository: Send + Sync {
    fn engine(&self) -> TtsEngine;

    /// Longest chunk, in characters, this backend accepts
    fn max_chunk_length(&self) -> usize;

    async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<Bytes, SynthesisError>;
}

/// Shared response handling: anything but 200 with a non-empty body is a failure
pub(crate) async fn read_audio_response(
    response: reqwest::Response,
) -> Result<Bytes, SynthesisError> {
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(SynthesisError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let audio = response.bytes().await?;
    if audio.is_empty() {
        return Err(SynthesisError::EmptyAudio);
    }

    Ok(audio)
}
