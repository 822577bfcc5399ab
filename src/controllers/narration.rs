use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Extension, Json,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    domain::narration::{
        DownloadAudioQuery, LanguageCode, NarrationRequest, NarrationServiceApi,
        NarrationServiceError, OwnerScope, StreamAudioRequest, SynthesisParams,
        TtsEngine, TtsOptionsResponse,
    },
    error::{AppError, AppResult},
    infrastructure::auth::AuthUser,
};

const MAX_SPEED: f32 = 4.0;

pub struct NarrationController {
    narration_service: Arc<dyn NarrationServiceApi>,
}

impl NarrationController {
    pub fn new(narration_service: Arc<dyn NarrationServiceApi>) -> Self {
        Self { narration_service }
    }

    /// POST /stream_audio - Narrate text as a chunked audio stream
    ///
    /// A failure on the first chunk is answered with a JSON error; later
    /// failures cut the body short.
    pub async fn stream_audio(
        State(controller): State<Arc<NarrationController>>,
        auth_user: Option<Extension<AuthUser>>,
        Json(request): Json<StreamAudioRequest>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let engine = parse_engine(request.tts_service.as_deref())?;
        let language = parse_language(request.language.as_deref())?;
        let params = parse_params(request.speed)?;
        let owner = OwnerScope::from(auth_user.map(|Extension(user)| user.user_id));

        let plan = controller
            .narration_service
            .plan(NarrationRequest {
                text: request.story,
                language,
                engine,
                voice_id: request.voice_profile.filter(|id| !id.trim().is_empty()),
                owner,
                params,
            })
            .await?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
        headers.insert("X-Chunk-Count", HeaderValue::from(plan.chunks.len()));
        headers.insert(
            "X-Language",
            HeaderValue::from_static(plan.language.as_str()),
        );
        if let Ok(voice) = HeaderValue::from_str(&plan.voice.id) {
            headers.insert("X-Voice-Profile", voice);
        }

        let mut stream = controller.narration_service.stream(plan);
        let first = match stream.next().await {
            Some(Ok(audio)) => audio,
            Some(Err(e)) => return Err(e.into()),
            None => return Ok((StatusCode::OK, headers, Body::empty())),
        };

        let body = futures::stream::once(async move { Ok::<_, NarrationServiceError>(first) })
            .chain(stream);

        Ok((StatusCode::OK, headers, Body::from_stream(body)))
    }

    /// GET /download_audio - Narrate a stored story into one WAV attachment
    pub async fn download_audio(
        State(controller): State<Arc<NarrationController>>,
        Extension(auth_user): Extension<AuthUser>,
        Query(query): Query<DownloadAudioQuery>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let story_id = query
            .story_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing story_id".to_string()))?
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest("Invalid story_id".to_string()))?;
        let engine = parse_engine(query.tts_service.as_deref())?;

        let download = controller
            .narration_service
            .download_story(auth_user.user_id, story_id, engine)
            .await?;

        tracing::info!(
            user_id = %auth_user.user_id,
            story_id,
            chunk_count = download.chunk_count,
            audio_size = download.audio.data.len(),
            "Story download ready"
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
        headers.insert(
            header::CONTENT_DISPOSITION,
            content_disposition(&download.filename)?,
        );
        headers.insert(
            "X-Duration-Seconds",
            duration_header(download.audio.duration())?,
        );

        Ok((StatusCode::OK, headers, Body::from(download.audio.data)))
    }

    /// GET /tts-options - List synthesis services and voice profiles
    pub async fn tts_options(
        State(controller): State<Arc<NarrationController>>,
        auth_user: Option<Extension<AuthUser>>,
    ) -> AppResult<Json<TtsOptionsResponse>> {
        let owner = OwnerScope::from(auth_user.map(|Extension(user)| user.user_id));
        let options = controller.narration_service.options(owner).await?;

        Ok(Json(options))
    }
}

fn parse_engine(selector: Option<&str>) -> AppResult<TtsEngine> {
    match selector.map(str::trim).filter(|s| !s.is_empty()) {
        Some(selector) => selector.parse().map_err(AppError::BadRequest),
        None => Ok(TtsEngine::default()),
    }
}

/// `None` or "auto" means detect from the text
fn parse_language(language: Option<&str>) -> AppResult<Option<LanguageCode>> {
    match language.map(str::trim) {
        None | Some("") => Ok(None),
        Some(tag) if tag.eq_ignore_ascii_case("auto") => Ok(None),
        Some(tag) => tag.parse().map(Some).map_err(AppError::BadRequest),
    }
}

fn parse_params(speed: Option<f32>) -> AppResult<SynthesisParams> {
    let mut params = SynthesisParams::default();

    if let Some(speed) = speed {
        if !speed.is_finite() || speed <= 0.0 || speed > MAX_SPEED {
            return Err(AppError::BadRequest(format!(
                "speed must be greater than 0 and at most {}",
                MAX_SPEED
            )));
        }
        params.speed = speed;
    }

    Ok(params)
}

/// Attachment header with an ASCII fallback name and the UTF-8 original
fn content_disposition(filename: &str) -> AppResult<HeaderValue> {
    let ascii: String = filename.chars().filter(char::is_ascii).collect();
    let ascii = ascii.trim_start_matches('_');

    HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    ))
    .map_err(|e| AppError::Internal(format!("Invalid download filename: {}", e)))
}

/// Seconds with millisecond precision, e.g. `0.900`
fn duration_header(duration: Duration) -> AppResult<HeaderValue> {
    HeaderValue::from_str(&format!("{:.3}", duration.as_secs_f64()))
        .map_err(|e| AppError::Internal(format!("Invalid duration header: {}", e)))
}
