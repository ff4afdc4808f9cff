use serde::{Deserialize, Serialize};

use super::repo_types::UserListItem;

/// Raw query string of `GET /api/users`; validated into `UserQuery`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersParams {
    pub sort: Option<String>,
    pub order: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct SortingInfo {
    pub sort: &'static str,
    pub order: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UsersPage {
    pub success: bool,
    pub data: Vec<UserListItem>,
    pub pagination: PaginationInfo,
    pub sorting: SortingInfo,
}

/// Body of the bulk endpoints. Kept loose so shape errors map to 400.
#[derive(Debug, Default, Deserialize)]
pub struct BulkUsersRequest {
    #[serde(default)]
    pub users: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct BulkUsersResponse {
    pub success: bool,
    pub message: String,
    pub count: u64,
}
