use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dto::{ListUsersParams, PaginationInfo, SortingInfo, UsersPage};
use super::query::UserQuery;
use super::repo_types::UserStatus;
use crate::{
    activity::{ActivityAction, NewActivity},
    db::RepoError,
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Block,
    Activate,
    Delete,
}

impl BulkAction {
    fn verb(&self) -> &'static str {
        match self {
            BulkAction::Block => "block",
            BulkAction::Activate => "activate",
            BulkAction::Delete => "delete",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            BulkAction::Block => "Users blocked successfully",
            BulkAction::Activate => "Users activated successfully",
            BulkAction::Delete => "Users deleted successfully",
        }
    }
}

/// Paginated, filtered listing. Every outcome past validation is audited
/// against `caller`.
pub async fn list_users(
    st: &AppState,
    caller: Uuid,
    params: ListUsersParams,
) -> Result<UsersPage, ApiError> {
    let query = UserQuery::try_from(params).map_err(|e| {
        warn!(error = %e, "invalid listing query");
        ApiError::from(e)
    })?;

    let outcome = async {
        let (items, total) = st.users.find(&query).await?;
        let view = st
            .activities
            .record(NewActivity {
                user_id: caller,
                action: ActivityAction::ViewedUsersTable,
                metadata: query.metadata(),
            })
            .await?;
        debug!(activity_id = %view.id, user_id = %caller, total, "users table viewed");
        Ok::<_, RepoError>((items, total))
    }
    .await;

    match outcome {
        Ok((data, total)) => Ok(UsersPage {
            success: true,
            data,
            pagination: PaginationInfo {
                total,
                page: query.page,
                page_size: query.page_size,
                total_pages: query.total_pages(total),
            },
            sorting: SortingInfo {
                sort: query.sort.as_str(),
                order: query.order.as_str(),
            },
        }),
        Err(e) => {
            error!(error = %e, user_id = %caller, "users endpoint failed");
            let audit = st
                .activities
                .record(NewActivity {
                    user_id: caller,
                    action: ActivityAction::UsersEndpointError,
                    metadata: json!({ "error": e.to_string() }),
                })
                .await;
            if let Err(audit_err) = audit {
                error!(error = %audit_err, user_id = %caller, "failed to record listing error");
            }
            Err(ApiError::internal(
                "Failed to fetch users",
                &e,
                st.config.is_development(),
            ))
        }
    }
}

/// Validate the `users` field of a bulk request: a non-empty array of ids.
pub fn parse_user_ids(raw: Option<Value>, action: BulkAction) -> Result<Vec<Uuid>, ApiError> {
    let invalid = || ApiError::Validation(format!("Users are required to {}", action.verb()));
    let Some(Value::Array(items)) = raw else {
        return Err(invalid());
    };
    if items.is_empty() {
        return Err(invalid());
    }
    items
        .iter()
        .map(|v| v.as_str().and_then(|s| Uuid::parse_str(s).ok()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ApiError::Validation("Users must be a list of user ids".into()))
}

async fn apply_bulk(st: &AppState, action: BulkAction, ids: &[Uuid]) -> Result<u64, ApiError> {
    if ids.is_empty() {
        return Err(ApiError::Validation(format!(
            "Users are required to {}",
            action.verb()
        )));
    }
    let res = match action {
        BulkAction::Block => st.users.update_status(ids, UserStatus::Blocked).await,
        BulkAction::Activate => st.users.update_status(ids, UserStatus::Active).await,
        BulkAction::Delete => st.users.delete(ids).await,
    };
    match res {
        Ok(count) => {
            info!(action = action.verb(), requested = ids.len(), affected = count, "bulk user update");
            Ok(count)
        }
        Err(e) => {
            error!(error = %e, action = action.verb(), "bulk user update failed");
            Err(ApiError::internal(
                format!("Failed to {} users", action.verb()),
                &e,
                st.config.is_development(),
            ))
        }
    }
}

pub async fn block_users(st: &AppState, ids: &[Uuid]) -> Result<u64, ApiError> {
    apply_bulk(st, BulkAction::Block, ids).await
}

pub async fn activate_users(st: &AppState, ids: &[Uuid]) -> Result<u64, ApiError> {
    apply_bulk(st, BulkAction::Activate, ids).await
}

pub async fn delete_users(st: &AppState, ids: &[Uuid]) -> Result<u64, ApiError> {
    apply_bulk(st, BulkAction::Delete, ids).await
}
