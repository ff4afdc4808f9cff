use thiserror::Error;

pub mod handle;
pub mod layer;
pub mod store;

pub use handle::{Session, SessionHandle, SessionState};
pub use store::{PgSessionStore, SessionRecord, SessionStore};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<sqlx::Error> for SessionError {
    fn from(e: sqlx::Error) -> Self {
        SessionError::Store(anyhow::Error::new(e))
    }
}
