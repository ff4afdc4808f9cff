use serde_json::json;
use thiserror::Error;

use super::dto::ListUsersParams;
use super::repo_types::UserStatus;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid sort field. Valid fields: {}", SortField::valid_names())]
    InvalidSortField,
    #[error("Invalid order. Use 'asc' or 'desc'")]
    InvalidOrder,
    #[error("Invalid status. Use 'ACTIVE' or 'BLOCKED'")]
    InvalidStatus,
    #[error("Invalid {0}: expected a positive integer")]
    InvalidPagination(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Email,
    LastLogin,
    LastActivity,
    CreatedAt,
    Status,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::Name,
        SortField::Email,
        SortField::LastLogin,
        SortField::LastActivity,
        SortField::CreatedAt,
        SortField::Status,
    ];

    /// Name as exposed in the query string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Email => "email",
            SortField::LastLogin => "lastLogin",
            SortField::LastActivity => "lastActivity",
            SortField::CreatedAt => "createdAt",
            SortField::Status => "status",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Email => "email",
            SortField::LastLogin => "last_login",
            SortField::LastActivity => "last_activity",
            SortField::CreatedAt => "created_at",
            SortField::Status => "status",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == raw)
            .ok_or(QueryError::InvalidSortField)
    }

    fn valid_names() -> String {
        Self::ALL.map(|f| f.as_str()).join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        match raw {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(QueryError::InvalidOrder),
        }
    }
}

/// Validated listing query handed to the user repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub sort: SortField,
    pub order: SortOrder,
    pub status: Option<UserStatus>,
    pub search: String,
    pub page: i64,
    pub page_size: i64,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            sort: SortField::LastLogin,
            order: SortOrder::Desc,
            status: None,
            search: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl UserQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        total / self.page_size + i64::from(total % self.page_size != 0)
    }

    /// Effective parameters, as recorded in the audit trail.
    pub fn metadata(&self) -> serde_json::Value {
        json!({
            "sort": self.sort.as_str(),
            "order": self.order.as_str(),
            "status": self.status.map(|s| s.as_str()),
            "search": self.search,
            "page": self.page,
            "pageSize": self.page_size,
        })
    }
}

impl TryFrom<ListUsersParams> for UserQuery {
    type Error = QueryError;

    fn try_from(p: ListUsersParams) -> Result<Self, Self::Error> {
        let defaults = UserQuery::default();
        let sort = match p.sort.as_deref() {
            Some(raw) => SortField::parse(raw)?,
            None => defaults.sort,
        };
        let order = match p.order.as_deref() {
            Some(raw) => SortOrder::parse(raw)?,
            None => defaults.order,
        };
        let status = match p.status.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(UserStatus::parse(raw).ok_or(QueryError::InvalidStatus)?),
        };
        Ok(Self {
            sort,
            order,
            status,
            search: p.search.unwrap_or_default(),
            page: positive(p.page.as_deref(), "page")?.unwrap_or(defaults.page),
            page_size: positive(p.page_size.as_deref(), "pageSize")?.unwrap_or(defaults.page_size),
        })
    }
}

fn positive(raw: Option<&str>, name: &'static str) -> Result<Option<i64>, QueryError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => match v.parse::<i64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(QueryError::InvalidPagination(name)),
        },
    }
}
