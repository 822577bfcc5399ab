use crate::domain::narration::{CacheWriteScope, DEFAULT_MAX_CHUNK_LENGTH};
use crate::infrastructure::repositories::ResponseType;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::ops::RangeInclusive;
use std::time::Duration;

const RETENTION_DAYS_RANGE: RangeInclusive<i64> = 1..=36_500;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Synthesis backends
    pub f5tts_url: String,
    pub google_tts_url: String,
    pub synthesis_timeout_secs: u64,
    pub reference_audio_transport: ReferenceAudioTransport,
    #[serde(skip)]
    pub f5_response_type: ResponseType,
    pub max_chunk_length: usize,
    // Audio cache
    pub audio_cache_backend: CacheBackend,
    pub audio_cache_write_scope: CacheWriteScope,
    pub audio_cache_retention_days: Option<i64>,
    pub memory_cache_max_entries: u64,
    // Voice profiles
    pub voice_profiles_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Postgres,
    Memory,
}

/// How reference audio reaches the voice-cloning backend: as a path the
/// backend can open itself, or inline as base64.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceAudioTransport {
    Path,
    Inline,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")?,
            environment: match env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .as_str()
            {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            f5tts_url: env::var("F5TTS_URL")
                .unwrap_or_else(|_| "http://localhost:8000/tts".to_string()),
            google_tts_url: env::var("GOOGLE_TTS_URL")
                .unwrap_or_else(|_| "https://translate.google.com/translate_tts".to_string()),
            synthesis_timeout_secs: env::var("SYNTHESIS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            reference_audio_transport: match env::var("REFERENCE_AUDIO_TRANSPORT")
                .unwrap_or_else(|_| "path".to_string())
                .to_lowercase()
                .as_str()
            {
                "inline" | "base64" => ReferenceAudioTransport::Inline,
                _ => ReferenceAudioTransport::Path,
            },
            f5_response_type: match env::var("F5TTS_RESPONSE_TYPE")
                .unwrap_or_else(|_| "stream".to_string())
                .to_lowercase()
                .as_str()
            {
                "file" => ResponseType::File,
                _ => ResponseType::Stream,
            },
            max_chunk_length: env::var("MAX_CHUNK_LENGTH")
                .unwrap_or_else(|_| DEFAULT_MAX_CHUNK_LENGTH.to_string())
                .parse()?,
            audio_cache_backend: match env::var("AUDIO_CACHE_BACKEND")
                .unwrap_or_else(|_| "postgres".to_string())
                .to_lowercase()
                .as_str()
            {
                "memory" => CacheBackend::Memory,
                _ => CacheBackend::Postgres,
            },
            audio_cache_write_scope: match env::var("AUDIO_CACHE_WRITE_SCOPE")
                .unwrap_or_else(|_| "user".to_string())
                .to_lowercase()
                .as_str()
            {
                "shared" => CacheWriteScope::Shared,
                _ => CacheWriteScope::User,
            },
            audio_cache_retention_days: env::var("AUDIO_CACHE_RETENTION_DAYS")
                .ok()
                .map(|days| days.parse())
                .transpose()?,
            memory_cache_max_entries: env::var("MEMORY_CACHE_MAX_ENTRIES")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()?,
            voice_profiles_dir: env::var("VOICE_PROFILES_DIR").ok().map(PathBuf::from),
        };

        if config.max_chunk_length == 0 {
            return Err("MAX_CHUNK_LENGTH must be greater than zero".into());
        }

        if let Some(days) = config.audio_cache_retention_days {
            if !RETENTION_DAYS_RANGE.contains(&days) {
                return Err(format!(
                    "AUDIO_CACHE_RETENTION_DAYS must be between {} and {}",
                    RETENTION_DAYS_RANGE.start(),
                    RETENTION_DAYS_RANGE.end()
                )
                .into());
            }
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }
}
