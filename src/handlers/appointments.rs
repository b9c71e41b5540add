use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::db::appointments::{self, AppointmentFilter};
use crate::db::doctors;
use crate::db::models::{Appointment, AppointmentChanges, AppointmentStatus, NewAppointment, Role};
use crate::error::{ApiError, ApiResult};
use crate::router::AppState;
use crate::services::booking::{self, SlotStatus};
use crate::services::scope::Caller;
use crate::utils::slot_time;

use super::{require_admin, ApiJson, ApiPath, ApiQuery};

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub available: bool,
    pub within_hours: bool,
}

/// Customers book for their own patient record and doctors for themselves.
fn ensure_can_book(caller: &Caller, request: &NewAppointment) -> ApiResult<()> {
    let allowed = match caller.role {
        Role::Admin => true,
        Role::Customer => caller.patient_id == Some(request.patient_id),
        Role::Doctor => caller.doctor_id == Some(request.doctor_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You can only book appointments for your own record".to_string(),
        ))
    }
}

/// `GET /api/appointments/availability?doctor_id=..&date=..&time=..`
pub async fn availability(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let time = slot_time(query.time);
    let mut conn = state.pool.acquire().await?;

    let doctor = doctors::find(&mut conn, query.doctor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Doctor {} not found", query.doctor_id)))?;
    let slot = booking::check_slot(&mut conn, doctor.id, query.date, time, None).await?;
    let within_hours = booking::ensure_within_availability(&doctor, query.date, time).is_ok();

    Ok(Json(AvailabilityResponse {
        doctor_id: doctor.doctor_id,
        date: query.date,
        time,
        available: slot == SlotStatus::Available && within_hours,
        within_hours,
    }))
}

/// `GET /api/appointments`
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> ApiResult<Json<AppointmentsResponse>> {
    let appointments = appointments::list(&state.pool, &caller.scope(), &filter).await?;
    Ok(Json(AppointmentsResponse { appointments }))
}

/// `GET /api/appointments/:id`
pub async fn detail(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Appointment>> {
    let appointment = appointments::find(&state.pool, id, &caller.scope())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Appointment {id} not found")))?;
    Ok(Json(appointment))
}

/// `POST /api/appointments`
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(request): ApiJson<NewAppointment>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    ensure_can_book(&caller, &request)?;
    let appointment = booking::book(&state.pool, &request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// `PUT /api/appointments/:id`: reschedule, change status, or edit notes.
/// Customers may cancel or move their appointments but not complete them.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<AppointmentChanges>,
) -> ApiResult<Json<Appointment>> {
    let current = appointments::find(&state.pool, id, &caller.scope())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Appointment {id} not found")))?;

    if caller.role == Role::Customer && changes.status == Some(AppointmentStatus::Completed) {
        return Err(ApiError::Forbidden(
            "Only staff can mark an appointment completed".to_string(),
        ));
    }

    let updated = booking::reschedule(&state.pool, &current, &changes).await?;
    Ok(Json(updated))
}

/// `DELETE /api/appointments/:id`
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    require_admin(&caller)?;
    if !appointments::delete(&state.pool, id).await? {
        return Err(ApiError::NotFound(format!("Appointment {id} not found")));
    }
    log::info!("User {} deleted appointment {}", caller.username, id);
    Ok(StatusCode::NO_CONTENT)
}
