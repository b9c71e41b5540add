use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Serialize;

use crate::db::models::{MedicalRecord, MedicalRecordChanges, NewMedicalRecord, Role};
use crate::db::records::{self, RecordFilter};
use crate::db::{appointments, doctors, foreign_key_violation, patients};
use crate::error::{ApiError, ApiResult};
use crate::router::AppState;
use crate::services::scope::Caller;
use crate::services::validation;

use super::{require_admin, ApiJson, ApiPath, ApiQuery};

#[derive(Serialize)]
pub struct RecordsResponse {
    pub records: Vec<MedicalRecord>,
}

fn ensure_staff(caller: &Caller) -> ApiResult<()> {
    if caller.role == Role::Customer {
        return Err(ApiError::Forbidden(
            "Only doctors and administrators can write medical records".to_string(),
        ));
    }
    Ok(())
}

/// `GET /api/records`
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(filter): ApiQuery<RecordFilter>,
) -> ApiResult<Json<RecordsResponse>> {
    let records = records::list(&state.pool, &caller.scope(), &filter).await?;
    Ok(Json(RecordsResponse { records }))
}

/// `GET /api/records/:id`
pub async fn detail(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MedicalRecord>> {
    let record = records::find(&state.pool, id, &caller.scope())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Medical record {id} not found")))?;
    Ok(Json(record))
}

/// `POST /api/records`: doctors write under their own doctor id.
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(new_record): ApiJson<NewMedicalRecord>,
) -> ApiResult<(StatusCode, Json<MedicalRecord>)> {
    ensure_staff(&caller)?;
    if caller.role == Role::Doctor && caller.doctor_id != Some(new_record.doctor_id) {
        return Err(ApiError::Forbidden(
            "Doctors can only write records under their own name".to_string(),
        ));
    }
    let new_record = validation::new_record(&new_record)?;

    let mut tx = state.pool.begin().await?;

    if !patients::exists(&mut tx, new_record.patient_id).await? {
        return Err(ApiError::NotFound(format!(
            "Patient {} not found",
            new_record.patient_id
        )));
    }
    if doctors::find(&mut tx, new_record.doctor_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Doctor {} not found",
            new_record.doctor_id
        )));
    }
    if let Some(appointment_id) = new_record.appointment_id {
        let appointment = appointments::find_on(&mut tx, appointment_id)
            .await?
            .filter(|a| caller.scope().permits(a.patient_id, a.doctor_id))
            .ok_or_else(|| ApiError::NotFound(format!("Appointment {appointment_id} not found")))?;
        if appointment.patient_id != new_record.patient_id
            || appointment.doctor_id != new_record.doctor_id
        {
            return Err(ApiError::ValidationFailed(
                "Appointment belongs to a different patient or doctor".to_string(),
            ));
        }
    }

    let record_date = new_record
        .record_date
        .unwrap_or_else(|| Utc::now().date_naive());
    let record = match records::insert(&mut tx, &new_record, record_date).await {
        Ok(record) => record,
        Err(e) if foreign_key_violation(&e) => {
            return Err(ApiError::NotFound(
                "Referenced patient, doctor or appointment no longer exists".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;

    log::info!(
        "Created medical record {} for patient {}",
        record.record_id,
        record.patient_id
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// `PUT /api/records/:id`: admins, or the doctor who wrote the record.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<MedicalRecordChanges>,
) -> ApiResult<Json<MedicalRecord>> {
    ensure_staff(&caller)?;
    // Doctors only see their own records, so this also covers ownership.
    records::find(&state.pool, id, &caller.scope())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Medical record {id} not found")))?;

    let changes = validation::record_changes(&changes)?;
    let record = records::update(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Medical record {id} not found")))?;
    Ok(Json(record))
}

/// `DELETE /api/records/:id`
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    require_admin(&caller)?;
    if !records::delete(&state.pool, id).await? {
        return Err(ApiError::NotFound(format!("Medical record {id} not found")));
    }
    log::info!("User {} deleted medical record {}", caller.username, id);
    Ok(StatusCode::NO_CONTENT)
}
