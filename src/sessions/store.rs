use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;

use super::SessionError;

const SESSION_ID_LEN: usize = 32;

/// Server-side session row.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub data: Map<String, Value>,
    pub expires_at: OffsetDateTime,
}

impl SessionRecord {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `None` for unknown or expired sessions.
    async fn load(&self, sid: &str) -> Result<Option<SessionRecord>, SessionError>;
    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError>;
    async fn destroy(&self, sid: &str) -> Result<(), SessionError>;
    async fn prune_expired(&self) -> Result<u64, SessionError>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, sid: &str) -> Result<Option<SessionRecord>, SessionError> {
        let row = sqlx::query_as::<_, (String, Json<Map<String, Value>>, OffsetDateTime)>(
            r#"
            SELECT sid, sess, expire
              FROM user_sessions
             WHERE sid = $1 AND expire > now()
            "#,
        )
        .bind(sid)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|(id, Json(data), expires_at)| SessionRecord {
            id,
            data,
            expires_at,
        }))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (sid, sess, expire)
            VALUES ($1, $2, $3)
            ON CONFLICT (sid) DO UPDATE
               SET sess = EXCLUDED.sess, expire = EXCLUDED.expire
            "#,
        )
        .bind(&record.id)
        .bind(Json(&record.data))
        .bind(record.expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> Result<(), SessionError> {
        sqlx::query(r#"DELETE FROM user_sessions WHERE sid = $1"#)
            .bind(sid)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn prune_expired(&self) -> Result<u64, SessionError> {
        let res = sqlx::query(r#"DELETE FROM user_sessions WHERE expire <= now()"#)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
