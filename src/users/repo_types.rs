use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::activity::ActivitySummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Blocked => "BLOCKED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ACTIVE" => Some(UserStatus::Active),
            "BLOCKED" => Some(UserStatus::Blocked),
            _ => None,
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never leaves the server
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_activity: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Projection loaded by the session guard.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login: OffsetDateTime,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            status: u.status,
            last_login: u.last_login,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Row of the admin listing, with the user's most recent activities.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserListItem {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_activity: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[sqlx(skip)]
    pub activities: Vec<ActivitySummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            name: "Alice".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            status: UserStatus::Active,
            last_login: datetime!(2024-01-02 03:04:05 UTC),
            last_activity: datetime!(2024-01-02 03:04:05 UTC),
            created_at: datetime!(2024-01-01 00:00:00 UTC),
        }
    }

    #[test]
    fn user_json_hides_hash_and_uses_iso_timestamps() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["lastLogin"], "2024-01-02T03:04:05Z");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn status_parse_is_exact() {
        assert_eq!(UserStatus::parse("BLOCKED"), Some(UserStatus::Blocked));
        assert_eq!(UserStatus::parse("ACTIVE"), Some(UserStatus::Active));
        assert_eq!(UserStatus::parse("blocked"), None);
        assert_eq!(UserStatus::Blocked.as_str(), "BLOCKED");
    }

    #[test]
    fn summary_projection_copies_identity_fields() {
        let u = user();
        let s = UserSummary::from(&u);
        assert_eq!(s.id, u.id);
        assert_eq!(s.email, u.email);
        assert_eq!(s.status, UserStatus::Active);
    }
}
