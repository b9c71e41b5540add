use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::db::models::{NewUser, User};
use crate::db::users;
use crate::error::ApiResult;
use crate::router::AppState;
use crate::services::accounts;
use crate::services::scope::Caller;

use super::{require_admin, ApiJson, ApiPath};

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

/// `GET /api/users`
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<UsersResponse>> {
    require_admin(&caller)?;
    let users = users::list(&state.pool).await?;
    Ok(Json(UsersResponse { users }))
}

/// `POST /api/users`
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(new_user): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    require_admin(&caller)?;
    let user = accounts::create_user(&state.pool, &new_user, state.hash_iterations).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `DELETE /api/users/:id`
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    require_admin(&caller)?;
    accounts::delete_user(&state.pool, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
