use super::audio_cache_repository::{AudioCacheRepository, CacheError};
use crate::domain::narration::CacheKey;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;

/// Audio cache backed by the `audio_cache` table
pub struct PgAudioCacheRepository {
    pool: Arc<DbPool>,
}

impl PgAudioCacheRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AudioCacheRepository for PgAudioCacheRepository {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let pool = self.pool.as_ref();

        // A NULL owner never equals $4, so shared requesters only see shared rows
        let audio: Option<Vec<u8>> = sqlx::query_scalar(
            r#"
            SELECT audio_data FROM audio_cache
            WHERE chunk_text = $1
              AND voice_id = $2
              AND language = $3
              AND (user_id = $4 OR user_id IS NULL)
            ORDER BY user_id NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(&key.text)
        .bind(&key.voice_id)
        .bind(key.language.as_str())
        .bind(key.owner.user_id())
        .fetch_optional(pool)
        .await?;

        Ok(audio.map(Bytes::from))
    }

    async fn put(&self, key: &CacheKey, audio: &[u8]) -> Result<bool, CacheError> {
        let pool = self.pool.as_ref();

        let result = sqlx::query(
            r#"
            INSERT INTO audio_cache (id, chunk_text, voice_id, language, user_id, audio_data, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&key.text)
        .bind(&key.voice_id)
        .bind(key.language.as_str())
        .bind(key.owner.user_id())
        .bind(audio)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn purge_older_than(&self, max_age: chrono::Duration) -> Result<u64, CacheError> {
        let pool = self.pool.as_ref();
        let cutoff = chrono::Utc::now() - max_age;

        let result = sqlx::query("DELETE FROM audio_cache WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
