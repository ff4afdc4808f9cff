use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Audit actions written by the user administration endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    ViewedUsersTable,
    UsersEndpointError,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::ViewedUsersTable => "VIEWED_USERS_TABLE",
            ActivityAction::UsersEndpointError => "USERS_ENDPOINT_ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub metadata: serde_json::Value,
}

/// Append-only audit record.
#[derive(Debug, Clone, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub timestamp: OffsetDateTime,
    pub metadata: serde_json::Value,
}

/// Lightweight view nested under each listed user.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct ActivitySummary {
    pub action: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
