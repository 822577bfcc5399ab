use crate::domain::narration::{LanguageCode, TtsEngine};
use bytes::Bytes;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Where the reference recording of a cloned voice lives
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceAudio {
    Path(PathBuf),
    Inline(Bytes),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceProfile {
    pub id: String,
    /// `None` for shared profiles
    pub owner: Option<Uuid>,
    pub language: LanguageCode,
    pub name: String,
    /// Absent for engines that speak with a built-in voice
    pub reference_audio: Option<ReferenceAudio>,
    pub reference_text: String,
}

impl VoiceProfile {
    /// The fixed voice of an engine that does not clone
    pub fn builtin(engine: TtsEngine, language: LanguageCode) -> Self {
        Self {
            id: format!("{}-{}", engine.as_str(), language.as_str()),
            owner: None,
            language,
            name: format!("{} ({})", engine.display_name(), language),
            reference_audio: None,
            reference_text: String::new(),
        }
    }

    pub fn summary(&self) -> VoiceProfileSummary {
        VoiceProfileSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            language: self.language,
            shared: self.owner.is_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceProfileSummary {
    pub id: String,
    pub name: String,
    pub language: LanguageCode,
    pub shared: bool,
}
