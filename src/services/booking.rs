//! Appointment slot booking.
//!
//! A slot is a (doctor, date, time) triple that at most one non-cancelled
//! appointment may hold. Booking draws the appointment's external id first,
//! which makes the transaction a writer before anything is read; concurrent
//! bookings therefore queue on SQLite's write lock and the loser sees the
//! winner's row in its slot check. The partial unique index
//! `idx_appointments_active_slot` backs the check at the storage layer.

use chrono::{Datelike, NaiveDate, NaiveTime};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::models::{Appointment, AppointmentChanges, AppointmentStatus, Doctor, NewAppointment};
use crate::db::{appointments, doctors, patients, unique_violation};
use crate::error::{ApiError, ApiResult};
use crate::services::ids::{next_external_id, IdKind};
use crate::utils::{cleared_text, format_date, optional_text, parse_available_days, slot_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Available,
    Conflict,
}

pub async fn check_slot(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    exclude: Option<i64>,
) -> Result<SlotStatus, sqlx::Error> {
    let taken = appointments::slot_taken(conn, doctor_id, date, slot_time(time), exclude).await?;
    Ok(if taken {
        SlotStatus::Conflict
    } else {
        SlotStatus::Available
    })
}

/// Rejects slots outside the doctor's weekly availability window.
pub fn ensure_within_availability(
    doctor: &Doctor,
    date: NaiveDate,
    time: NaiveTime,
) -> ApiResult<()> {
    let days = parse_available_days(&doctor.available_days)?;
    if !days.contains(&date.weekday()) {
        return Err(ApiError::ValidationFailed(format!(
            "Doctor {} does not work on {}",
            doctor.doctor_id,
            date.weekday()
        )));
    }

    if time < doctor.available_start || time >= doctor.available_end {
        return Err(ApiError::ValidationFailed(format!(
            "Doctor {} is available between {} and {}",
            doctor.doctor_id,
            doctor.available_start.format("%H:%M"),
            doctor.available_end.format("%H:%M")
        )));
    }

    Ok(())
}

fn slot_conflict(doctor: &Doctor, date: NaiveDate, time: NaiveTime) -> ApiError {
    ApiError::Conflict(format!(
        "Doctor {} already has an appointment on {} at {}",
        doctor.doctor_id,
        date,
        time.format("%H:%M")
    ))
}

/// Books a new `scheduled` appointment as one atomic unit.
pub async fn book(pool: &SqlitePool, request: &NewAppointment) -> ApiResult<Appointment> {
    let new = NewAppointment {
        appointment_time: slot_time(request.appointment_time),
        reason: optional_text(request.reason.as_deref()),
        notes: optional_text(request.notes.as_deref()),
        ..request.clone()
    };

    let mut tx = pool.begin().await?;

    let appointment_id = next_external_id(&mut tx, IdKind::Appointment).await?;

    if !patients::exists(&mut tx, new.patient_id).await? {
        return Err(ApiError::NotFound(format!("Patient {} not found", new.patient_id)));
    }
    let doctor = doctors::find(&mut tx, new.doctor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Doctor {} not found", new.doctor_id)))?;

    ensure_within_availability(&doctor, new.appointment_date, new.appointment_time)?;

    let status = check_slot(
        &mut tx,
        doctor.id,
        new.appointment_date,
        new.appointment_time,
        None,
    )
    .await?;
    if status == SlotStatus::Conflict {
        log::warn!(
            "Slot conflict for doctor {} on {} at {}",
            doctor.doctor_id,
            format_date(new.appointment_date),
            new.appointment_time
        );
        return Err(slot_conflict(&doctor, new.appointment_date, new.appointment_time));
    }

    let appointment = match appointments::insert(&mut tx, &appointment_id, &new).await {
        Ok(appointment) => appointment,
        Err(e) if unique_violation(&e).is_some() => {
            return Err(slot_conflict(&doctor, new.appointment_date, new.appointment_time));
        }
        Err(e) => return Err(e.into()),
    };

    tx.commit().await?;

    log::info!(
        "Booked {} for patient {} with doctor {} on {} at {}",
        appointment.appointment_id,
        appointment.patient_id,
        doctor.doctor_id,
        format_date(appointment.appointment_date),
        appointment.appointment_time
    );

    Ok(appointment)
}

/// Applies changes to an existing appointment.
///
/// Moving the appointment, or reviving a cancelled one, needs the target slot
/// to be free and inside the doctor's availability. The update is a single
/// statement guarded by the active-slot index.
pub async fn reschedule(
    pool: &SqlitePool,
    current: &Appointment,
    request: &AppointmentChanges,
) -> ApiResult<Appointment> {
    let changes = AppointmentChanges {
        appointment_time: request.appointment_time.map(slot_time),
        reason: cleared_text(request.reason.as_deref()),
        notes: cleared_text(request.notes.as_deref()),
        ..request.clone()
    };

    let date = changes.appointment_date.unwrap_or(current.appointment_date);
    let time = changes.appointment_time.unwrap_or(current.appointment_time);
    let status = changes.status.unwrap_or(current.status);

    let moved = date != current.appointment_date || time != current.appointment_time;
    let revived = !current.status.holds_slot() && status.holds_slot();
    let claims_slot = status.holds_slot() && (moved || revived);

    let mut conn = pool.acquire().await?;

    let doctor = doctors::find(&mut conn, current.doctor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Doctor {} not found", current.doctor_id)))?;

    if claims_slot {
        ensure_within_availability(&doctor, date, time)?;
        let slot = check_slot(&mut conn, doctor.id, date, time, Some(current.id)).await?;
        if slot == SlotStatus::Conflict {
            return Err(slot_conflict(&doctor, date, time));
        }
    }

    let updated = match appointments::update(&mut conn, current.id, &changes).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            return Err(ApiError::NotFound(format!(
                "Appointment {} not found",
                current.appointment_id
            )))
        }
        Err(e) if unique_violation(&e).is_some() => {
            return Err(slot_conflict(&doctor, date, time));
        }
        Err(e) => return Err(e.into()),
    };

    if updated.status == AppointmentStatus::Cancelled && current.status != AppointmentStatus::Cancelled {
        log::info!("Cancelled {}", updated.appointment_id);
    } else if claims_slot {
        log::info!(
            "Moved {} to {} at {}",
            updated.appointment_id,
            format_date(updated.appointment_date),
            updated.appointment_time
        );
    }

    Ok(updated)
}
