use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::query::UserQuery;
use super::repo_types::{NewUser, User, UserListItem, UserStatus, UserSummary};
use crate::activity::ActivitySummary;
use crate::db::RepoError;

/// Activities nested under each listed user.
pub const RECENT_ACTIVITY_LIMIT: i64 = 5;

const USER_COLUMNS: &str =
    "id, email, name, password_hash, status, last_login, last_activity, created_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn find_summary(&self, id: Uuid) -> Result<Option<UserSummary>, RepoError>;
    /// Stamp `last_login` and `last_activity` after a successful login.
    async fn record_login(&self, id: Uuid) -> Result<(), RepoError>;
    /// One page of users matching `query`, plus the total match count.
    async fn find(&self, query: &UserQuery) -> Result<(Vec<UserListItem>, i64), RepoError>;
    async fn update_status(&self, ids: &[Uuid], status: UserStatus) -> Result<u64, RepoError>;
    async fn delete(&self, ids: &[Uuid]) -> Result<u64, RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn recent_activities(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<ActivitySummary>>, RepoError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, String, OffsetDateTime)>(
            r#"
            SELECT user_id, action, "timestamp"
              FROM (
                SELECT user_id, action, "timestamp",
                       row_number() OVER (PARTITION BY user_id ORDER BY "timestamp" DESC) AS rn
                  FROM activities
                 WHERE user_id = ANY($1)
              ) recent
             WHERE rn <= $2
             ORDER BY user_id, "timestamp" DESC
            "#,
        )
        .bind(ids)
        .bind(RECENT_ACTIVITY_LIMIT)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<ActivitySummary>> = HashMap::new();
        for (user_id, action, timestamp) in rows {
            grouped
                .entry(user_id)
                .or_default()
                .push(ActivitySummary { action, timestamp });
        }
        Ok(grouped)
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, query: &UserQuery) {
    qb.push(" WHERE TRUE");
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if !query.search.is_empty() {
        let pattern = format!("%{}%", escape_like(&query.search));
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub(crate) fn page_query(query: &UserQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT id, name, email, status, last_login, last_activity, created_at FROM users",
    );
    push_filter(&mut qb, query);
    // column names come from the SortField allow-list, never from input
    qb.push(format!(
        " ORDER BY {} {}, id ASC",
        query.sort.column(),
        query.order.as_sql()
    ));
    qb.push(" LIMIT ")
        .push_bind(query.page_size)
        .push(" OFFSET ")
        .push_bind(query.offset());
    qb
}

pub(crate) fn count_query(query: &UserQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM users");
    push_filter(&mut qb, query);
    qb
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let sql = format!(
            "INSERT INTO users (email, name, password_hash, status) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(UserStatus::Active)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_summary(&self, id: Uuid) -> Result<Option<UserSummary>, RepoError> {
        let row = sqlx::query_as::<_, UserSummary>(
            r#"SELECT id, email, name, status, last_login FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn record_login(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query(r#"UPDATE users SET last_login = now(), last_activity = now() WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn find(&self, query: &UserQuery) -> Result<(Vec<UserListItem>, i64), RepoError> {
        let mut page = page_query(query);
        let mut count = count_query(query);
        let (mut items, total) = tokio::try_join!(
            page.build_query_as::<UserListItem>().fetch_all(&self.db),
            count.build_query_scalar::<i64>().fetch_one(&self.db),
        )?;

        let ids: Vec<Uuid> = items.iter().map(|u| u.id).collect();
        let mut recent = self.recent_activities(&ids).await?;
        for item in &mut items {
            item.activities = recent.remove(&item.id).unwrap_or_default();
        }
        Ok((items, total))
    }

    async fn update_status(&self, ids: &[Uuid], status: UserStatus) -> Result<u64, RepoError> {
        let res = sqlx::query(r#"UPDATE users SET status = $1 WHERE id = ANY($2)"#)
            .bind(status)
            .bind(ids)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<u64, RepoError> {
        let res = sqlx::query(r#"DELETE FROM users WHERE id = ANY($1)"#)
            .bind(ids)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
