use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::db::models::{Appointment, AppointmentChanges, AppointmentStatus, NewAppointment};
use crate::services::scope::{Resource, RowFilter};

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
}

/// Inserts a `scheduled` appointment under an external id the caller has
/// already drawn. The active-slot unique index rejects a second live booking
/// for the same doctor, date and time.
pub async fn insert(
    conn: &mut SqliteConnection,
    appointment_id: &str,
    new: &NewAppointment,
) -> Result<Appointment, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, Appointment>(
        "INSERT INTO appointments (appointment_id, patient_id, doctor_id, appointment_date,
                                   appointment_time, status, reason, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(appointment_id)
    .bind(new.patient_id)
    .bind(new.doctor_id)
    .bind(new.appointment_date)
    .bind(new.appointment_time)
    .bind(AppointmentStatus::Scheduled)
    .bind(&new.reason)
    .bind(&new.notes)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

/// True when a non-cancelled appointment other than `exclude` holds the slot.
pub async fn slot_taken(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    exclude: Option<i64>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM appointments
            WHERE doctor_id = ? AND appointment_date = ? AND appointment_time = ?
              AND status <> 'cancelled' AND (? IS NULL OR id <> ?)
         )",
    )
    .bind(doctor_id)
    .bind(date)
    .bind(time)
    .bind(exclude)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await
}

pub async fn list(
    pool: &SqlitePool,
    scope: &RowFilter,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM appointments WHERE 1 = 1");
    scope.push_sql(&mut qb, Resource::Appointments);

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(date) = filter.date {
        qb.push(" AND appointment_date = ").push_bind(date);
    }
    if let Some(doctor_id) = filter.doctor_id {
        qb.push(" AND doctor_id = ").push_bind(doctor_id);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient_id);
    }

    qb.push(" ORDER BY appointment_date, appointment_time, id");
    qb.build_query_as::<Appointment>().fetch_all(pool).await
}

pub async fn find(
    pool: &SqlitePool,
    id: i64,
    scope: &RowFilter,
) -> Result<Option<Appointment>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM appointments WHERE id = ");
    qb.push_bind(id);
    scope.push_sql(&mut qb, Resource::Appointments);
    qb.build_query_as::<Appointment>().fetch_optional(pool).await
}

/// Unscoped lookup on an open connection, for use inside transactions.
pub async fn find_on(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    changes: &AppointmentChanges,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET
            appointment_date = COALESCE(?, appointment_date),
            appointment_time = COALESCE(?, appointment_time),
            status = COALESCE(?, status),
            reason = NULLIF(COALESCE(?, reason), ''),
            notes = NULLIF(COALESCE(?, notes), ''),
            updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(changes.appointment_date)
    .bind(changes.appointment_time)
    .bind(changes.status)
    .bind(&changes.reason)
    .bind(&changes.notes)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
