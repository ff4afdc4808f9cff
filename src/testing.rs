//! In-memory stand-ins for the Postgres repositories, used by unit tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::activity::repo_types::{Activity, ActivitySummary, NewActivity};
use crate::activity::ActivityRepository;
use crate::auth::password::hash_password;
use crate::db::RepoError;
use crate::sessions::{SessionError, SessionRecord, SessionStore};
use crate::users::query::{SortField, SortOrder, UserQuery};
use crate::users::repo::{UserRepository, RECENT_ACTIVITY_LIMIT};
use crate::users::repo_types::{NewUser, User, UserListItem, UserStatus, UserSummary};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    activities: Mutex<Vec<Activity>>,
    sessions: Mutex<HashMap<String, SessionRecord>>,
    fail_users: AtomicBool,
    fail_activities: AtomicBool,
    fail_sessions: AtomicBool,
    user_calls: AtomicUsize,
}

fn unavailable() -> anyhow::Error {
    anyhow::anyhow!("memory store unavailable")
}

impl MemoryStore {
    pub fn fail_users(&self, on: bool) {
        self.fail_users.store(on, AtomicOrdering::SeqCst);
    }

    pub fn fail_activities(&self, on: bool) {
        self.fail_activities.store(on, AtomicOrdering::SeqCst);
    }

    pub fn fail_sessions(&self, on: bool) {
        self.fail_sessions.store(on, AtomicOrdering::SeqCst);
    }

    /// Number of user repository calls made so far.
    pub fn user_calls(&self) -> usize {
        self.user_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn insert_user(&self, name: &str, email: &str, password: &str) -> User {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: hash_password(password).unwrap(),
            status: UserStatus::Active,
            last_login: now,
            last_activity: now,
            created_at: now,
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn set_status(&self, id: Uuid, status: UserStatus) {
        for u in self.users.lock().unwrap().iter_mut().filter(|u| u.id == id) {
            u.status = status;
        }
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.email == email).cloned()
    }

    pub fn activities_for(&self, user_id: Uuid) -> Vec<Activity> {
        self.activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    fn enter_users(&self) -> Result<(), RepoError> {
        self.user_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_users.load(AtomicOrdering::SeqCst) {
            return Err(RepoError::Store(unavailable()));
        }
        Ok(())
    }

    fn enter_sessions(&self) -> Result<(), SessionError> {
        if self.fail_sessions.load(AtomicOrdering::SeqCst) {
            return Err(SessionError::Store(unavailable()));
        }
        Ok(())
    }

    fn recent_activities(&self, user_id: Uuid) -> Vec<ActivitySummary> {
        let mut recent: Vec<ActivitySummary> = self
            .activities_for(user_id)
            .into_iter()
            .map(|a| ActivitySummary {
                action: a.action,
                timestamp: a.timestamp,
            })
            .collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(RECENT_ACTIVITY_LIMIT as usize);
        recent
    }
}

fn matches(query: &UserQuery, u: &User) -> bool {
    if query.status.is_some_and(|s| s != u.status) {
        return false;
    }
    let needle = query.search.to_lowercase();
    u.name.to_lowercase().contains(&needle) || u.email.to_lowercase().contains(&needle)
}

/// Case-insensitive first, like the database's linguistic collation.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare(field: SortField, a: &User, b: &User) -> Ordering {
    match field {
        SortField::Name => collate(&a.name, &b.name),
        SortField::Email => collate(&a.email, &b.email),
        SortField::LastLogin => a.last_login.cmp(&b.last_login),
        SortField::LastActivity => a.last_activity.cmp(&b.last_activity),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        self.enter_users()?;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::UniqueViolation("users_email_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            status: UserStatus::Active,
            last_login: now,
            last_activity: now,
            created_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.enter_users()?;
        Ok(self.user_by_email(email))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        self.enter_users()?;
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_summary(&self, id: Uuid) -> Result<Option<UserSummary>, RepoError> {
        self.enter_users()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .map(UserSummary::from))
    }

    async fn record_login(&self, id: Uuid) -> Result<(), RepoError> {
        self.enter_users()?;
        let now = OffsetDateTime::now_utc();
        for u in self.users.lock().unwrap().iter_mut().filter(|u| u.id == id) {
            u.last_login = now;
            u.last_activity = now;
        }
        Ok(())
    }

    async fn find(&self, query: &UserQuery) -> Result<(Vec<UserListItem>, i64), RepoError> {
        self.enter_users()?;
        let mut matched: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| matches(query, u))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            let ord = compare(query.sort, a, b);
            let ord = match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then_with(|| a.id.cmp(&b.id))
        });
        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .map(|u| UserListItem {
                activities: self.recent_activities(u.id),
                id: u.id,
                name: u.name,
                email: u.email,
                status: u.status,
                last_login: u.last_login,
                last_activity: u.last_activity,
                created_at: u.created_at,
            })
            .collect();
        Ok((items, total))
    }

    async fn update_status(&self, ids: &[Uuid], status: UserStatus) -> Result<u64, RepoError> {
        self.enter_users()?;
        let mut count = 0;
        for u in self.users.lock().unwrap().iter_mut().filter(|u| ids.contains(&u.id)) {
            u.status = status;
            count += 1;
        }
        Ok(count)
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<u64, RepoError> {
        self.enter_users()?;
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| !ids.contains(&u.id));
        let removed = (before - users.len()) as u64;
        drop(users);
        self.activities
            .lock()
            .unwrap()
            .retain(|a| !ids.contains(&a.user_id));
        Ok(removed)
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn record(&self, activity: NewActivity) -> Result<Activity, RepoError> {
        if self.fail_activities.load(AtomicOrdering::SeqCst) {
            return Err(RepoError::Store(unavailable()));
        }
        let row = Activity {
            id: Uuid::new_v4(),
            user_id: activity.user_id,
            action: activity.action.as_str().to_string(),
            timestamp: OffsetDateTime::now_utc(),
            metadata: activity.metadata,
        };
        self.activities.lock().unwrap().push(row.clone());
        for u in self
            .users
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|u| u.id == row.user_id)
        {
            u.last_activity = row.timestamp;
        }
        Ok(row)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, sid: &str) -> Result<Option<SessionRecord>, SessionError> {
        self.enter_sessions()?;
        let now = OffsetDateTime::now_utc();
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(sid)
            .filter(|r| !r.is_expired(now))
            .cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        self.enter_sessions()?;
        self.sessions
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> Result<(), SessionError> {
        self.enter_sessions()?;
        self.sessions.lock().unwrap().remove(sid);
        Ok(())
    }

    async fn prune_expired(&self) -> Result<u64, SessionError> {
        self.enter_sessions()?;
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, r| !r.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[tokio::test]
    async fn prune_drops_only_expired_sessions() {
        let store = MemoryStore::default();
        let now = OffsetDateTime::now_utc();
        for (id, offset) in [("old", -10), ("new", 3600)] {
            store
                .save(&SessionRecord {
                    id: id.into(),
                    data: Map::new(),
                    expires_at: now + time::Duration::seconds(offset),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.prune_expired().await.unwrap(), 1);
        assert!(store.load("new").await.unwrap().is_some());
        assert!(store.load("old").await.unwrap().is_none());
    }
}
