use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::db::appointments::{self, AppointmentFilter};
use crate::db::models::{Appointment, MedicalRecord, NewPatient, Patient, PatientChanges, Role};
use crate::db::patients::{self, PatientFilter};
use crate::db::records::{self, RecordFilter};
use crate::error::{ApiError, ApiResult};
use crate::router::AppState;
use crate::services::scope::Caller;
use crate::services::validation;

use super::{require_admin, ApiJson, ApiPath, ApiQuery};

#[derive(Serialize)]
pub struct PatientsResponse {
    pub patients: Vec<Patient>,
}

#[derive(Serialize)]
pub struct PatientAppointmentsResponse {
    pub patient_id: String,
    pub appointments: Vec<Appointment>,
}

#[derive(Serialize)]
pub struct PatientRecordsResponse {
    pub patient_id: String,
    pub records: Vec<MedicalRecord>,
}

async fn visible_patient(state: &AppState, caller: &Caller, id: i64) -> ApiResult<Patient> {
    patients::find(&state.pool, id, &caller.scope())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Patient {id} not found")))
}

/// `GET /api/patients`
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(filter): ApiQuery<PatientFilter>,
) -> ApiResult<Json<PatientsResponse>> {
    let patients = patients::list(&state.pool, &caller.scope(), &filter).await?;
    Ok(Json(PatientsResponse { patients }))
}

/// `GET /api/patients/:id`
pub async fn detail(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(visible_patient(&state, &caller, id).await?))
}

/// `POST /api/patients`
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(new_patient): ApiJson<NewPatient>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    require_admin(&caller)?;
    let new_patient = validation::new_patient(&new_patient)?;

    let mut tx = state.pool.begin().await?;
    let patient = patients::insert(&mut tx, &new_patient).await?;
    tx.commit().await?;

    log::info!("Created patient {}", patient.patient_id);
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `PUT /api/patients/:id`: admins, or the customer who owns the record.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<PatientChanges>,
) -> ApiResult<Json<Patient>> {
    let owns = caller.role == Role::Customer && caller.patient_id == Some(id);
    if !caller.is_admin() && !owns {
        return Err(ApiError::Forbidden(
            "You can only update your own patient record".to_string(),
        ));
    }

    let changes = validation::patient_changes(&changes)?;
    let patient = patients::update(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Patient {id} not found")))?;
    Ok(Json(patient))
}

/// `DELETE /api/patients/:id`: cascades to appointments and records.
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    require_admin(&caller)?;
    if !patients::delete(&state.pool, id).await? {
        return Err(ApiError::NotFound(format!("Patient {id} not found")));
    }
    log::info!("User {} deleted patient {}", caller.username, id);
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/patients/:id/appointments`
pub async fn appointments(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PatientAppointmentsResponse>> {
    let patient = visible_patient(&state, &caller, id).await?;
    let filter = AppointmentFilter {
        patient_id: Some(patient.id),
        ..Default::default()
    };
    let appointments = appointments::list(&state.pool, &caller.scope(), &filter).await?;
    Ok(Json(PatientAppointmentsResponse {
        patient_id: patient.patient_id,
        appointments,
    }))
}

/// `GET /api/patients/:id/records`
pub async fn records(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PatientRecordsResponse>> {
    let patient = visible_patient(&state, &caller, id).await?;
    let filter = RecordFilter {
        patient_id: Some(patient.id),
        ..Default::default()
    };
    let records = records::list(&state.pool, &caller.scope(), &filter).await?;
    Ok(Json(PatientRecordsResponse {
        patient_id: patient.patient_id,
        records,
    }))
}
