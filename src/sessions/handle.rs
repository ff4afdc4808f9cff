use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::store::{generate_session_id, SessionRecord, SessionStore};
use super::SessionError;
use crate::error::ApiError;

/// Key/value view of the caller's server-side session.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    /// Writes through to the store, creating the session if needed.
    async fn set(&self, key: &str, value: Value) -> Result<(), SessionError>;
    async fn destroy(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unchanged,
    Saved,
    Destroyed,
}

struct Inner {
    id: Option<String>,
    data: Map<String, Value>,
    state: SessionState,
}

/// Store-backed session bound to one request by the session layer.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
    store: Arc<dyn SessionStore>,
    max_age: Duration,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>, record: Option<SessionRecord>, max_age: Duration) -> Self {
        let (id, data) = match record {
            Some(r) => (Some(r.id), r.data),
            None => (None, Map::new()),
        };
        Self {
            inner: Arc::new(Mutex::new(Inner {
                id,
                data,
                state: SessionState::Unchanged,
            })),
            store,
            max_age,
        }
    }

    pub async fn id(&self) -> Option<String> {
        self.inner.lock().await.id.clone()
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }
}

#[async_trait]
impl SessionHandle for Session {
    async fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().await.data.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        inner.data.insert(key.to_owned(), value);
        let id = inner.id.get_or_insert_with(generate_session_id).clone();
        let record = SessionRecord {
            id,
            data: inner.data.clone(),
            expires_at: OffsetDateTime::now_utc() + self.max_age,
        };
        self.store.save(&record).await?;
        inner.state = SessionState::Saved;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if let Some(id) = inner.id.as_deref() {
            self.store.destroy(id).await?;
        }
        inner.id = None;
        inner.data.clear();
        inner.state = SessionState::Destroyed;
        Ok(())
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            tracing::error!("session layer not installed");
            ApiError::Internal {
                message: "Internal server error".into(),
                details: None,
            }
        })
    }
}
