use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::db::models::{Doctor, Patient, User};
use crate::db::{doctors, patients, users};
use crate::error::{ApiError, ApiResult};
use crate::middleware::SessionToken;
use crate::router::AppState;
use crate::services::accounts::{self, Registration};
use crate::services::scope::{Caller, RowFilter};
use crate::services::sessions;

use super::ApiJson;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    pub patient: Option<Patient>,
    pub doctor: Option<Doctor>,
}

fn session_response(state: &AppState, user: User, token: String) -> SessionResponse {
    SessionResponse {
        user,
        token,
        token_type: "Bearer",
        expires_in: state.session_ttl.num_seconds(),
    }
}

/// `POST /api/auth/register`: self-registration for customers.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(registration): ApiJson<Registration>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let user = accounts::register(&state.pool, &registration, state.hash_iterations).await?;
    let token = sessions::issue(&state.pool, &user, state.session_ttl).await?;
    Ok((StatusCode::CREATED, Json(session_response(&state, user, token))))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let (user, token) =
        sessions::login(&state.pool, &request.username, &request.password, state.session_ttl)
            .await?;
    Ok(Json(session_response(&state, user, token)))
}

/// `POST /api/auth/logout`: revokes the token used for this request.
pub async fn logout(
    State(state): State<AppState>,
    Extension(token): Extension<SessionToken>,
) -> ApiResult<StatusCode> {
    sessions::revoke(&state.pool, &token.0).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`: the caller's account and linked profile.
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<MeResponse>> {
    let user = users::find(&state.pool, caller.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let patient = match user.patient_id {
        Some(id) => patients::find(&state.pool, id, &RowFilter::All).await?,
        None => None,
    };
    let doctor = match user.doctor_id {
        Some(id) => {
            let mut conn = state.pool.acquire().await?;
            doctors::find(&mut conn, id).await?
        }
        None => None,
    };

    Ok(Json(MeResponse {
        user,
        patient,
        doctor,
    }))
}
