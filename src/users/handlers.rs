use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    users::{
        dto::{CreateUserRequest, ListQuery, UserListing},
        repo_types::User,
        services::{create_user, delete_user, list_users, parse_user_id, Pagination},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/:id", delete(remove))
}

/// GET /users?page=&limit=&search=
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<UserListing>> {
    let q = match params {
        Ok(Query(pairs)) => ListQuery::from_pairs(pairs),
        Err(e) => {
            warn!(error = %e, "unreadable list query, using defaults");
            ListQuery::default()
        }
    };
    let pagination = Pagination::from_raw(
        q.page.as_deref(),
        q.limit.as_deref(),
        &state.config.listing,
    );
    let search = q.search.unwrap_or_default();
    let listing = list_users(state.store.as_ref(), pagination, &search).await?;
    Ok(Json(listing))
}

/// POST /users { email, name? }
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(body) = payload.map_err(|e| {
        warn!(error = %e, "unreadable create body");
        ApiError::Validation("Invalid request body".into())
    })?;
    let user = create_user(state.store.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// DELETE /users/:id
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = parse_user_id(&id)?;
    let user = delete_user(state.store.as_ref(), id).await?;
    Ok(Json(user))
}
