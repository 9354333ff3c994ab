use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::config::ListingConfig;
use crate::error::{ApiError, ApiResult, StoreError};
use crate::users::dto::{CreateUserRequest, UserListing};
use crate::users::repo::UserStore;
use crate::users::repo_types::{NewUser, User, UserQuery};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Effective page window for one listing call (page is 1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Missing, non-numeric, or non-positive values fall back to page 1 and
    /// the configured default limit; limit is capped at `max_limit`.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>, cfg: &ListingConfig) -> Self {
        Self::clamped(
            parse_positive(page).unwrap_or(1),
            parse_positive(limit).unwrap_or(cfg.default_limit),
            cfg,
        )
    }

    pub fn clamped(page: u32, limit: u32, cfg: &ListingConfig) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, cfg.max_limit.max(1)),
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = i64::from(self.limit);
        (total + limit - 1) / limit
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw?.trim().parse::<u32>().ok().filter(|v| *v >= 1)
}

#[instrument(skip(store))]
pub async fn list_users(
    store: &dyn UserStore,
    pagination: Pagination,
    search: &str,
) -> ApiResult<UserListing> {
    let query = UserQuery {
        search: (!search.is_empty()).then(|| search.to_string()),
        offset: pagination.offset(),
        limit: i64::from(pagination.limit),
    };
    let page = store
        .list(&query)
        .await
        .map_err(ApiError::store("fetch users"))?;

    Ok(UserListing {
        total_pages: pagination.total_pages(page.total),
        users: page.users,
        total: page.total,
        page: pagination.page,
        limit: pagination.limit,
    })
}

/// Trims the email and drops a blank name, then checks presence and shape.
pub fn validate_new_user(req: CreateUserRequest) -> ApiResult<NewUser> {
    let email = req.email.as_deref().map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    Ok(NewUser {
        email: email.to_string(),
        name,
    })
}

#[instrument(skip(store, req))]
pub async fn create_user(store: &dyn UserStore, req: CreateUserRequest) -> ApiResult<User> {
    let new_user = validate_new_user(req).map_err(|e| {
        warn!(error = %e, "create user rejected");
        e
    })?;

    let duplicate = || ApiError::Conflict("User with this email already exists".into());

    if store
        .find_by_email(&new_user.email)
        .await
        .map_err(ApiError::store("create user"))?
        .is_some()
    {
        warn!(email = %new_user.email, "email already registered");
        return Err(duplicate());
    }

    let user = match store.insert(new_user).await {
        Ok(u) => u,
        Err(StoreError::UniqueViolation) => {
            warn!("email registered concurrently");
            return Err(duplicate());
        }
        Err(e) => return Err(ApiError::store("create user")(e)),
    };

    info!(user_id = user.id, email = %user.email, "user created");
    Ok(user)
}

pub fn parse_user_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| ApiError::Validation("Invalid user id".into()))
}

/// Deleting an id that is already gone is reported as not found.
#[instrument(skip(store))]
pub async fn delete_user(store: &dyn UserStore, id: i64) -> ApiResult<User> {
    match store.delete(id).await.map_err(ApiError::store("delete user"))? {
        Some(user) => {
            info!(user_id = user.id, email = %user.email, "user deleted");
            Ok(user)
        }
        None => {
            warn!(user_id = id, "delete of unknown user");
            Err(ApiError::NotFound("User not found".into()))
        }
    }
}
