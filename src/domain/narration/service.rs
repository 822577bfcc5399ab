use super::assembler::{assemble_segments, download_filename, AssembledAudio};
use super::error::NarrationServiceError;
use super::language::{detect_language, LanguageCode};
use super::model::{CacheKey, CacheWriteScope, Chunk, OwnerScope, SynthesisParams, TtsEngine};
use super::segmenter::segment;
use super::text::clean_text;
use super::{TtsOptionsResponse, TtsServiceOption};
use crate::domain::voice::VoiceProfile;
use crate::infrastructure::repositories::{
    AudioCacheRepository, StoryRepository, SynthesisError, SynthesisRepository, SynthesisRequest,
    VoiceProfileRepository,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use moka::future::Cache;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How long a just-synthesized chunk stays available to coalesced callers
const IN_FLIGHT_TTL: Duration = Duration::from_secs(30);
const IN_FLIGHT_CAPACITY: u64 = 256;

/// Ordered audio blocks of one narration; ends early after an error
pub type NarrationStream = BoxStream<'static, Result<Bytes, NarrationServiceError>>;

/// What to narrate and how
#[derive(Debug, Clone)]
pub struct NarrationRequest {
    pub text: String,
    /// Detected from the text when absent
    pub language: Option<LanguageCode>,
    pub engine: TtsEngine,
    /// Default profile for the language when absent
    pub voice_id: Option<String>,
    pub owner: OwnerScope,
    pub params: SynthesisParams,
}

/// A validated narration: segmented text plus everything needed to voice it
pub struct NarrationPlan {
    pub chunks: Vec<Chunk>,
    pub voice: VoiceProfile,
    pub language: LanguageCode,
    pub owner: OwnerScope,
    pub engine: TtsEngine,
    pub params: SynthesisParams,
    synthesizer: Arc<dyn SynthesisRepository>,
}

#[derive(Debug, Clone)]
pub struct DownloadedNarration {
    pub filename: String,
    pub audio: AssembledAudio,
    pub chunk_count: usize,
}

/// Cache-or-synthesize for a single chunk
struct ChunkResolver {
    cache: Arc<dyn AudioCacheRepository>,
    write_scope: CacheWriteScope,
    in_flight: Cache<CacheKey, Bytes>,
}

impl ChunkResolver {
    async fn resolve(
        &self,
        chunk: &Chunk,
        plan: &NarrationPlan,
    ) -> Result<Bytes, NarrationServiceError> {
        let key = CacheKey::new(
            chunk.text.as_str(),
            plan.voice.id.as_str(),
            plan.language,
            plan.owner,
        );

        match self.cache.get(&key).await {
            Ok(Some(audio)) => {
                tracing::debug!(
                    chunk_index = chunk.index,
                    voice = %plan.voice.id,
                    language = %plan.language,
                    audio_size = audio.len(),
                    "Chunk served from cache"
                );
                return Ok(audio);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    chunk_index = chunk.index,
                    voice = %plan.voice.id,
                    language = %plan.language,
                    error = %e,
                    "Audio cache lookup failed, treating as miss"
                );
            }
        }

        let write_key = key.with_owner(self.write_scope.owner_for(plan.owner));
        let started = Instant::now();

        // Concurrent misses on the same key share one backend call
        let audio = self
            .in_flight
            .try_get_with(
                write_key.clone(),
                self.synthesize_and_store(chunk, plan, &write_key),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    chunk_index = chunk.index,
                    voice = %plan.voice.id,
                    language = %plan.language,
                    engine = %plan.engine,
                    error = %e,
                    "Chunk synthesis failed"
                );
                NarrationServiceError::Backend {
                    chunk_index: chunk.index,
                    message: e.to_string(),
                }
            })?;

        tracing::debug!(
            chunk_index = chunk.index,
            voice = %plan.voice.id,
            language = %plan.language,
            audio_size = audio.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Chunk synthesized"
        );

        Ok(audio)
    }

    async fn synthesize_and_store(
        &self,
        chunk: &Chunk,
        plan: &NarrationPlan,
        write_key: &CacheKey,
    ) -> Result<Bytes, SynthesisError> {
        let audio = plan
            .synthesizer
            .synthesize(SynthesisRequest {
                text: &chunk.text,
                voice: &plan.voice,
                language: plan.language,
                params: plan.params,
            })
            .await?;

        match self.cache.put(write_key, &audio).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(
                chunk_index = chunk.index,
                owner = %write_key.owner,
                "Chunk already cached, keeping existing entry"
            ),
            Err(e) => tracing::warn!(
                chunk_index = chunk.index,
                voice = %plan.voice.id,
                language = %plan.language,
                error = %e,
                "Failed to cache synthesized chunk"
            ),
        }

        Ok(audio)
    }
}

/// Cursor over a plan's chunks while it is being streamed
struct StreamProgress {
    plan: Arc<NarrationPlan>,
    resolver: Arc<ChunkResolver>,
    next: usize,
    delivered: usize,
    failed: bool,
    started: Instant,
}

impl Drop for StreamProgress {
    fn drop(&mut self) {
        let total = self.plan.chunks.len();
        if !self.failed && self.next < total {
            tracing::info!(
                next_chunk = self.next,
                "Listener disconnected, stopping narration"
            );
        }

        tracing::info!(
            voice = %self.plan.voice.id,
            language = %self.plan.language,
            delivered = self.delivered,
            total,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Narration stream finished"
        );
    }
}

pub struct NarrationService {
    voices: Arc<dyn VoiceProfileRepository>,
    stories: Arc<dyn StoryRepository>,
    engines: BTreeMap<TtsEngine, Arc<dyn SynthesisRepository>>,
    resolver: Arc<ChunkResolver>,
}

impl NarrationService {
    pub fn new(
        voices: Arc<dyn VoiceProfileRepository>,
        stories: Arc<dyn StoryRepository>,
        cache: Arc<dyn AudioCacheRepository>,
        synthesizers: Vec<Arc<dyn SynthesisRepository>>,
        write_scope: CacheWriteScope,
    ) -> Self {
        let engines = synthesizers
            .into_iter()
            .map(|synthesizer| (synthesizer.engine(), synthesizer))
            .collect();

        let in_flight = Cache::builder()
            .max_capacity(IN_FLIGHT_CAPACITY)
            .time_to_live(IN_FLIGHT_TTL)
            .build();

        Self {
            voices,
            stories,
            engines,
            resolver: Arc::new(ChunkResolver {
                cache,
                write_scope,
                in_flight,
            }),
        }
    }
}

#[async_trait]
pub trait NarrationServiceApi: Send + Sync {
    /// Validate a narration request and segment its text.
    ///
    /// Resolves the engine and voice profile before any cache or backend
    /// work happens, so a missing voice fails fast.
    async fn plan(&self, request: NarrationRequest) -> Result<NarrationPlan, NarrationServiceError>;

    /// Resolve chunks in order, yielding each chunk's audio as soon as it is
    /// available. The first failure is yielded and ends the stream.
    ///
    /// A chunk is only started when the consumer polls for it. Dropping the
    /// stream never starts another chunk; a chunk already being resolved
    /// finishes in the background and is cached.
    fn stream(&self, plan: NarrationPlan) -> NarrationStream;

    /// Resolve every chunk, then join them into a single WAV file
    async fn assemble(&self, plan: NarrationPlan) -> Result<AssembledAudio, NarrationServiceError>;

    /// Narrate a stored story owned by `user_id` as a downloadable file
    async fn download_story(
        &self,
        user_id: Uuid,
        story_id: i64,
        engine: TtsEngine,
    ) -> Result<DownloadedNarration, NarrationServiceError>;

    /// Synthesis services and the voice profiles `owner` may use
    async fn options(&self, owner: OwnerScope) -> Result<TtsOptionsResponse, NarrationServiceError>;
}

#[async_trait]
impl NarrationServiceApi for NarrationService {
    async fn plan(&self, request: NarrationRequest) -> Result<NarrationPlan, NarrationServiceError> {
        let text = clean_text(&request.text);
        if text.is_empty() {
            return Err(NarrationServiceError::Invalid(
                "Story text cannot be empty".to_string(),
            ));
        }

        let synthesizer = self.synthesizer(request.engine)?;
        let language = request.language.unwrap_or_else(|| detect_language(&text));
        let voice = self
            .resolve_voice(
                request.engine,
                language,
                request.voice_id.as_deref(),
                request.owner,
            )
            .await?;

        let chunks = segment(&text, synthesizer.max_chunk_length());
        if chunks.is_empty() {
            return Err(NarrationServiceError::Invalid(
                "Story contains nothing to narrate".to_string(),
            ));
        }

        tracing::info!(
            engine = %request.engine,
            voice = %voice.id,
            language = %language,
            owner = %request.owner,
            text_length = text.chars().count(),
            chunk_count = chunks.len(),
            "Narration planned"
        );

        Ok(NarrationPlan {
            chunks,
            voice,
            language,
            owner: request.owner,
            engine: request.engine,
            params: request.params,
            synthesizer,
        })
    }

    fn stream(&self, plan: NarrationPlan) -> NarrationStream {
        let progress = StreamProgress {
            plan: Arc::new(plan),
            resolver: self.resolver.clone(),
            next: 0,
            delivered: 0,
            failed: false,
            started: Instant::now(),
        };

        stream::unfold(progress, |mut progress| async move {
            if progress.failed {
                return None;
            }
            let chunk = progress.plan.chunks.get(progress.next)?.clone();
            progress.next += 1;

            // Detached so a dropped listener never cancels a half-done synthesis
            let resolver = progress.resolver.clone();
            let plan = progress.plan.clone();
            let chunk_index = chunk.index;
            let result = tokio::spawn(async move { resolver.resolve(&chunk, &plan).await })
                .await
                .unwrap_or_else(|e| {
                    Err(NarrationServiceError::Other(anyhow::anyhow!(
                        "chunk {} task failed: {}",
                        chunk_index,
                        e
                    )))
                });

            match result {
                Ok(_) => progress.delivered += 1,
                Err(_) => progress.failed = true,
            }
            Some((result, progress))
        })
        .boxed()
    }

    async fn assemble(&self, plan: NarrationPlan) -> Result<AssembledAudio, NarrationServiceError> {
        let started = Instant::now();
        let mut segments = Vec::with_capacity(plan.chunks.len());

        for chunk in &plan.chunks {
            segments.push(self.resolver.resolve(chunk, &plan).await?);
        }

        let assembled = tokio::task::spawn_blocking(move || assemble_segments(&segments))
            .await
            .map_err(|e| anyhow::anyhow!("audio assembly task failed: {}", e))??;

        tracing::info!(
            voice = %plan.voice.id,
            language = %plan.language,
            chunk_count = plan.chunks.len(),
            audio_size = assembled.data.len(),
            duration_secs = assembled.duration().as_secs_f64(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Narration assembled"
        );

        Ok(assembled)
    }

    async fn download_story(
        &self,
        user_id: Uuid,
        story_id: i64,
        engine: TtsEngine,
    ) -> Result<DownloadedNarration, NarrationServiceError> {
        let story = self
            .stories
            .find_for_owner(story_id, user_id)
            .await?
            .ok_or_else(|| NarrationServiceError::NotFound("Story not found".to_string()))?;

        let language = detect_language(&story.content);
        let plan = self
            .plan(NarrationRequest {
                text: story.content,
                language: Some(language),
                engine,
                voice_id: None,
                owner: OwnerScope::User(user_id),
                params: SynthesisParams::default(),
            })
            .await?;

        let chunk_count = plan.chunks.len();
        let audio = self.assemble(plan).await?;

        Ok(DownloadedNarration {
            filename: download_filename(&story.theme, story.id),
            audio,
            chunk_count,
        })
    }

    async fn options(&self, owner: OwnerScope) -> Result<TtsOptionsResponse, NarrationServiceError> {
        let services = self
            .engines
            .keys()
            .map(|engine| TtsServiceOption {
                id: engine.as_str().to_string(),
                name: engine.display_name().to_string(),
                clones_voice: engine.clones_voice(),
            })
            .collect();

        let mut voice_profiles: BTreeMap<_, Vec<_>> = LanguageCode::ALL
            .iter()
            .map(|language| (*language, Vec::new()))
            .collect();
        for profile in self.voices.list_visible(owner.user_id()).await? {
            voice_profiles
                .entry(profile.language)
                .or_default()
                .push(profile.summary());
        }

        Ok(TtsOptionsResponse {
            services,
            default_service: TtsEngine::default(),
            voice_profiles,
        })
    }
}

impl NarrationService {
    fn synthesizer(
        &self,
        engine: TtsEngine,
    ) -> Result<Arc<dyn SynthesisRepository>, NarrationServiceError> {
        self.engines.get(&engine).cloned().ok_or_else(|| {
            NarrationServiceError::Invalid(format!("TTS service '{}' is not available", engine))
        })
    }

    async fn resolve_voice(
        &self,
        engine: TtsEngine,
        language: LanguageCode,
        voice_id: Option<&str>,
        owner: OwnerScope,
    ) -> Result<VoiceProfile, NarrationServiceError> {
        if !engine.clones_voice() {
            return Ok(VoiceProfile::builtin(engine, language));
        }

        match voice_id {
            Some(id) => self
                .voices
                .find_by_id(id, owner.user_id())
                .await?
                .ok_or_else(|| NarrationServiceError::VoiceNotFound(id.to_string())),
            None => self
                .voices
                .list_for_language(language, owner.user_id())
                .await?
                .into_iter()
                .next()
                .ok_or(NarrationServiceError::NoVoiceProfile(language)),
        }
    }
}
