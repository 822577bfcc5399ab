use super::language::LanguageCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One bounded piece of narration text; the unit of synthesis and caching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub byte_len: usize,
}

impl Chunk {
    pub fn new(index: usize, text: String) -> Self {
        let byte_len = text.len();
        Self {
            index,
            text,
            byte_len,
        }
    }
}

/// Identity under which cached audio is stored and looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerScope {
    User(Uuid),
    Shared,
}

impl OwnerScope {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            OwnerScope::User(id) => Some(*id),
            OwnerScope::Shared => None,
        }
    }
}

impl From<Option<Uuid>> for OwnerScope {
    fn from(user_id: Option<Uuid>) -> Self {
        user_id.map(OwnerScope::User).unwrap_or(OwnerScope::Shared)
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerScope::User(id) => write!(f, "user:{}", id),
            OwnerScope::Shared => write!(f, "shared"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub text: String,
    pub voice_id: String,
    pub language: LanguageCode,
    pub owner: OwnerScope,
}

impl CacheKey {
    pub fn new(
        text: impl Into<String>,
        voice_id: impl Into<String>,
        language: LanguageCode,
        owner: OwnerScope,
    ) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            language,
            owner,
        }
    }

    /// Same text, voice and language under a different owner
    pub fn with_owner(&self, owner: OwnerScope) -> Self {
        Self {
            owner,
            ..self.clone()
        }
    }
}

/// Owner under which freshly synthesized audio is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheWriteScope {
    #[default]
    User,
    Shared,
}

impl CacheWriteScope {
    pub fn owner_for(&self, requester: OwnerScope) -> OwnerScope {
        match self {
            CacheWriteScope::User => requester,
            CacheWriteScope::Shared => OwnerScope::Shared,
        }
    }
}

/// Tuning knobs sent with every voice-cloning call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SynthesisParams {
    pub remove_silence: bool,
    pub cross_fade_duration: f32,
    pub nfe_step: u32,
    pub speed: f32,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            remove_silence: true,
            cross_fade_duration: 0.15,
            nfe_step: 32,
            speed: 1.0,
        }
    }
}

/// Synthesis services a caller can select
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum TtsEngine {
    #[default]
    #[serde(rename = "f5tts")]
    F5,
    #[serde(rename = "gtts")]
    Google,
}

impl TtsEngine {
    pub const ALL: [TtsEngine; 2] = [TtsEngine::F5, TtsEngine::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            TtsEngine::F5 => "f5tts",
            TtsEngine::Google => "gtts",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TtsEngine::F5 => "F5 Text-to-Speech",
            TtsEngine::Google => "Google Text-to-Speech",
        }
    }

    /// Whether the engine conditions its output on a reference voice
    pub fn clones_voice(&self) -> bool {
        matches!(self, TtsEngine::F5)
    }
}

impl fmt::Display for TtsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TtsEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "f5tts" | "f5" => Ok(TtsEngine::F5),
            "gtts" | "google" => Ok(TtsEngine::Google),
            _ => Err("Invalid TTS service".to_string()),
        }
    }
}
