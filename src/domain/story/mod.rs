use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A generated story owned by a user; only read by the narration pipeline
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Story {
    pub id: i64,
    pub user_id: Uuid,
    pub theme: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
