use crate::domain::story::Story;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// A story only if it belongs to `user_id`
    async fn find_for_owner(&self, story_id: i64, user_id: Uuid) -> AppResult<Option<Story>>;
}

pub struct PgStoryRepository {
    pool: Arc<DbPool>,
}

impl PgStoryRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    async fn find_for_owner(&self, story_id: i64, user_id: Uuid) -> AppResult<Option<Story>> {
        let pool = self.pool.as_ref();
        let story = sqlx::query_as::<_, Story>(
            "SELECT id, user_id, theme, content, created_at FROM stories WHERE id = $1 AND user_id = $2",
        )
        .bind(story_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(story)
    }
}
