use crate::domain::narration::LanguageCode;
use crate::domain::voice::{ReferenceAudio, VoiceProfile};
use crate::error::{AppError, AppResult};
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Read access to the voice profiles a requester may narrate with
#[async_trait]
pub trait VoiceProfileRepository: Send + Sync {
    /// A profile visible to `owner`: their own or a shared one
    async fn find_by_id(&self, id: &str, owner: Option<Uuid>) -> AppResult<Option<VoiceProfile>>;

    /// Visible profiles for a language, the owner's before shared ones, then by name.
    /// The first entry is the default voice for that language.
    async fn list_for_language(
        &self,
        language: LanguageCode,
        owner: Option<Uuid>,
    ) -> AppResult<Vec<VoiceProfile>>;

    async fn list_visible(&self, owner: Option<Uuid>) -> AppResult<Vec<VoiceProfile>>;
}

#[derive(Debug, sqlx::FromRow)]
struct VoiceProfileRow {
    id: String,
    user_id: Option<Uuid>,
    language: String,
    name: String,
    ref_audio: Option<Vec<u8>>,
    ref_audio_path: Option<String>,
    ref_text: String,
}

impl TryFrom<VoiceProfileRow> for VoiceProfile {
    type Error = AppError;

    fn try_from(row: VoiceProfileRow) -> Result<Self, Self::Error> {
        let language = row
            .language
            .parse::<LanguageCode>()
            .map_err(|e| AppError::Internal(format!("voice profile {}: {}", row.id, e)))?;

        let reference_audio = match (row.ref_audio, row.ref_audio_path) {
            (Some(audio), _) => Some(ReferenceAudio::Inline(Bytes::from(audio))),
            (None, Some(path)) => Some(ReferenceAudio::Path(PathBuf::from(path))),
            (None, None) => None,
        };

        Ok(VoiceProfile {
            id: row.id,
            owner: row.user_id,
            language,
            name: row.name,
            reference_audio,
            reference_text: row.ref_text,
        })
    }
}

const VOICE_PROFILE_COLUMNS: &str =
    "id, user_id, language, name, ref_audio, ref_audio_path, ref_text";

/// Voice profiles stored in the `voice_profiles` table
pub struct PgVoiceProfileRepository {
    pool: Arc<DbPool>,
}

impl PgVoiceProfileRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoiceProfileRepository for PgVoiceProfileRepository {
    async fn find_by_id(&self, id: &str, owner: Option<Uuid>) -> AppResult<Option<VoiceProfile>> {
        let pool = self.pool.as_ref();
        let row = sqlx::query_as::<_, VoiceProfileRow>(&format!(
            "SELECT {} FROM voice_profiles WHERE id = $1 AND (user_id = $2 OR user_id IS NULL)",
            VOICE_PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await?;

        row.map(VoiceProfile::try_from).transpose()
    }

    async fn list_for_language(
        &self,
        language: LanguageCode,
        owner: Option<Uuid>,
    ) -> AppResult<Vec<VoiceProfile>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, VoiceProfileRow>(&format!(
            r#"
            SELECT {} FROM voice_profiles
            WHERE language = $1 AND (user_id = $2 OR user_id IS NULL)
            ORDER BY user_id NULLS LAST, name
            "#,
            VOICE_PROFILE_COLUMNS
        ))
        .bind(language.as_str())
        .bind(owner)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(VoiceProfile::try_from).collect()
    }

    async fn list_visible(&self, owner: Option<Uuid>) -> AppResult<Vec<VoiceProfile>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, VoiceProfileRow>(&format!(
            r#"
            SELECT {} FROM voice_profiles
            WHERE user_id = $1 OR user_id IS NULL
            ORDER BY language, user_id NULLS LAST, name
            "#,
            VOICE_PROFILE_COLUMNS
        ))
        .bind(owner)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(VoiceProfile::try_from).collect()
    }
}
