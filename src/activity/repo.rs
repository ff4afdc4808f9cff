use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Activity, NewActivity};
use crate::db::RepoError;

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Append an activity and bump the owner's `last_activity`.
    async fn record(&self, activity: NewActivity) -> Result<Activity, RepoError>;
}

#[derive(Clone)]
pub struct PgActivityRepository {
    db: PgPool,
}

impl PgActivityRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn record(&self, activity: NewActivity) -> Result<Activity, RepoError> {
        let row = sqlx::query_as::<_, Activity>(
            r#"
            WITH inserted AS (
                INSERT INTO activities (user_id, action, metadata)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, action, "timestamp", metadata
            ), touched AS (
                UPDATE users SET last_activity = now() WHERE id = $1
            )
            SELECT id, user_id, action, "timestamp", metadata FROM inserted
            "#,
        )
        .bind(activity.user_id)
        .bind(activity.action.as_str())
        .bind(&activity.metadata)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }
}
