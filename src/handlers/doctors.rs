use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::db::doctors::{self, DoctorFilter};
use crate::db::models::{Doctor, DoctorChanges, NewDoctor, Role};
use crate::error::{ApiError, ApiResult};
use crate::router::AppState;
use crate::services::scope::Caller;
use crate::services::validation;

use super::{require_admin, ApiJson, ApiPath, ApiQuery};

#[derive(Serialize)]
pub struct DoctorsResponse {
    pub doctors: Vec<Doctor>,
}

/// `GET /api/doctors`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<DoctorFilter>,
) -> ApiResult<Json<DoctorsResponse>> {
    let doctors = doctors::list(&state.pool, &filter).await?;
    Ok(Json(DoctorsResponse { doctors }))
}

/// `GET /api/doctors/:id`
pub async fn detail(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Doctor>> {
    let mut conn = state.pool.acquire().await?;
    let doctor = doctors::find(&mut conn, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Doctor {id} not found")))?;
    Ok(Json(doctor))
}

/// `POST /api/doctors`
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(new_doctor): ApiJson<NewDoctor>,
) -> ApiResult<(StatusCode, Json<Doctor>)> {
    require_admin(&caller)?;
    let new_doctor = validation::new_doctor(&new_doctor)?;

    let mut tx = state.pool.begin().await?;
    let doctor = doctors::insert(&mut tx, &new_doctor).await?;
    tx.commit().await?;

    log::info!("Created doctor {}", doctor.doctor_id);
    Ok((StatusCode::CREATED, Json(doctor)))
}

/// `PUT /api/doctors/:id`: admins, or the doctor editing their own profile.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<DoctorChanges>,
) -> ApiResult<Json<Doctor>> {
    let owns = caller.role == Role::Doctor && caller.doctor_id == Some(id);
    if !caller.is_admin() && !owns {
        return Err(ApiError::Forbidden(
            "You can only update your own doctor profile".to_string(),
        ));
    }

    let current = {
        let mut conn = state.pool.acquire().await?;
        doctors::find(&mut conn, id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Doctor {id} not found")))?
    };
    let changes = validation::doctor_changes(&changes, &current)?;

    let doctor = doctors::update(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Doctor {id} not found")))?;
    Ok(Json(doctor))
}

/// `DELETE /api/doctors/:id`: cascades to appointments and records.
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    require_admin(&caller)?;
    if !doctors::delete(&state.pool, id).await? {
        return Err(ApiError::NotFound(format!("Doctor {id} not found")));
    }
    log::info!("User {} deleted doctor {}", caller.username, id);
    Ok(StatusCode::NO_CONTENT)
}
