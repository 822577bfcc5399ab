use crate::domain::narration::CacheKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Store of synthesized chunk audio.
///
/// Entries are keyed by (chunk text, voice, language, owner) and are never
/// overwritten once written. Lookups prefer the owner's entry and fall back
/// to a shared entry for the same text, voice and language.
#[async_trait]
pub trait AudioCacheRepository: Send + Sync {
    /// Owner entry first, then the shared entry, else `None`
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    /// Insert if absent. Returns `true` when a new entry was written.
    async fn put(&self, key: &CacheKey, audio: &[u8]) -> Result<bool, CacheError>;

    /// Delete entries created before `now - max_age`, returning how many went
    async fn purge_older_than(&self, max_age: chrono::Duration) -> Result<u64, CacheError>;
}

/// Periodically evict cache entries older than `retention_days`
pub fn spawn_retention_sweep(
    cache: Arc<dyn AudioCacheRepository>,
    retention_days: i64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let max_age = chrono::Duration::days(retention_days);
        let mut interval = tokio::time::interval(RETENTION_SWEEP_INTERVAL);

        loop {
            interval.tick().await;

            match cache.purge_older_than(max_age).await {
                Ok(removed) => {
                    tracing::info!(removed, retention_days, "Audio cache retention sweep finished")
                }
                Err(e) => tracing::warn!(error = %e, "Audio cache retention sweep failed"),
            }
        }
    })
}
