use super::audio_cache_repository::{AudioCacheRepository, CacheError};
use crate::domain::narration::{CacheKey, OwnerScope};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use moka::future::Cache;

#[derive(Debug, Clone)]
struct StoredAudio {
    audio: Bytes,
    created_at: DateTime<Utc>,
}

/// In-process audio cache for single-node deployments and tests
pub struct MemoryAudioCacheRepository {
    entries: Cache<CacheKey, StoredAudio>,
}

impl MemoryAudioCacheRepository {
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_entries).build(),
        }
    }
}

#[async_trait]
impl AudioCacheRepository for MemoryAudioCacheRepository {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        if let Some(stored) = self.entries.get(key).await {
            return Ok(Some(stored.audio));
        }

        if key.owner == OwnerScope::Shared {
            return Ok(None);
        }

        Ok(self
            .entries
            .get(&key.with_owner(OwnerScope::Shared))
            .await
            .map(|stored| stored.audio))
    }

    async fn put(&self, key: &CacheKey, audio: &[u8]) -> Result<bool, CacheError> {
        let audio = Bytes::copy_from_slice(audio);
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(async move {
                StoredAudio {
                    audio,
                    created_at: Utc::now(),
                }
            })
            .await;

        Ok(entry.is_fresh())
    }

    async fn purge_older_than(&self, max_age: chrono::Duration) -> Result<u64, CacheError> {
        let cutoff = Utc::now() - max_age;
        let expired: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, stored)| stored.created_at < cutoff)
            .map(|(key, _)| key)
            .collect();

        for key in &expired {
            self.entries.invalidate(key.as_ref()).await;
        }

        Ok(expired.len() as u64)
    }
}
