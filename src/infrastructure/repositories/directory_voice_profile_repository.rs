use super::voice_profile_repository::VoiceProfileRepository;
use crate::domain::narration::{contains_cjk, LanguageCode};
use crate::domain::voice::{ReferenceAudio, VoiceProfile};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::path::Path;
use uuid::Uuid;

const AUDIO_EXTENSIONS: [&str; 3] = ["wav", "mp3", "m4a"];

/// Shared voice profiles discovered from a directory of
/// `<name>.{wav,mp3,m4a}` recordings paired with `<name>.txt` transcripts.
pub struct DirectoryVoiceProfileRepository {
    profiles: Vec<VoiceProfile>,
}

impl DirectoryVoiceProfileRepository {
    /// Scan `dir` once. A missing directory yields no profiles.
    pub async fn load(dir: &Path) -> AppResult<Self> {
        let mut profiles = Vec::new();

        if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
            tracing::warn!(dir = %dir.display(), "Voice profile directory not found");
            return Ok(Self { profiles });
        }

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", dir.display(), e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", dir.display(), e)))?
        {
            let path = entry.path();
            let is_audio = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false);
            if !is_audio {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let transcript_path = path.with_extension("txt");
            let reference_text = match tokio::fs::read_to_string(&transcript_path).await {
                Ok(text) => text.trim().to_string(),
                Err(_) => {
                    tracing::debug!(audio = %path.display(), "Skipping voice without transcript");
                    continue;
                }
            };

            let language = if contains_cjk(&reference_text) {
                LanguageCode::Chinese
            } else {
                LanguageCode::English
            };

            profiles.push(VoiceProfile {
                id: stem.to_string(),
                owner: None,
                language,
                name: display_name(stem),
                reference_audio: Some(ReferenceAudio::Path(path.clone())),
                reference_text,
            });
        }

        profiles.sort_by(|a, b| a.language.cmp(&b.language).then(a.name.cmp(&b.name)));

        tracing::info!(
            dir = %dir.display(),
            count = profiles.len(),
            "Voice profiles loaded"
        );

        Ok(Self { profiles })
    }
}

/// `old_storyteller` -> `Old Storyteller`
fn display_name(stem: &str) -> String {
    stem.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[async_trait]
impl VoiceProfileRepository for DirectoryVoiceProfileRepository {
    async fn find_by_id(&self, id: &str, _owner: Option<Uuid>) -> AppResult<Option<VoiceProfile>> {
        Ok(self.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn list_for_language(
        &self,
        language: LanguageCode,
        _owner: Option<Uuid>,
    ) -> AppResult<Vec<VoiceProfile>> {
        Ok(self
            .profiles
            .iter()
            .filter(|p| p.language == language)
            .cloned()
            .collect())
    }

    async fn list_visible(&self, _owner: Option<Uuid>) -> AppResult<Vec<VoiceProfile>> {
        Ok(self.profiles.clone())
    }
}
