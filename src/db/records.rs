use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::db::models::{MedicalRecord, MedicalRecordChanges, NewMedicalRecord};
use crate::services::ids::{next_external_id, IdKind};
use crate::services::scope::{Resource, RowFilter};

#[derive(Deserialize, Debug, Default, Clone)]
pub struct RecordFilter {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

pub async fn insert(
    conn: &mut SqliteConnection,
    new: &NewMedicalRecord,
    record_date: NaiveDate,
) -> Result<MedicalRecord, sqlx::Error> {
    let record_id = next_external_id(conn, IdKind::Record).await?;
    let now = Utc::now();

    sqlx::query_as::<_, MedicalRecord>(
        "INSERT INTO medical_records (record_id, patient_id, doctor_id, appointment_id, diagnosis,
                                      prescription, notes, record_date, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(&record_id)
    .bind(new.patient_id)
    .bind(new.doctor_id)
    .bind(new.appointment_id)
    .bind(&new.diagnosis)
    .bind(&new.prescription)
    .bind(&new.notes)
    .bind(record_date)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

pub async fn list(
    pool: &SqlitePool,
    scope: &RowFilter,
    filter: &RecordFilter,
) -> Result<Vec<MedicalRecord>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM medical_records WHERE 1 = 1");
    scope.push_sql(&mut qb, Resource::MedicalRecords);

    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient_id);
    }
    if let Some(doctor_id) = filter.doctor_id {
        qb.push(" AND doctor_id = ").push_bind(doctor_id);
    }

    qb.push(" ORDER BY record_date DESC, id DESC");
    qb.build_query_as::<MedicalRecord>().fetch_all(pool).await
}

pub async fn find(
    pool: &SqlitePool,
    id: i64,
    scope: &RowFilter,
) -> Result<Option<MedicalRecord>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM medical_records WHERE id = ");
    qb.push_bind(id);
    scope.push_sql(&mut qb, Resource::MedicalRecords);
    qb.build_query_as::<MedicalRecord>().fetch_optional(pool).await
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: &MedicalRecordChanges,
) -> Result<Option<MedicalRecord>, sqlx::Error> {
    sqlx::query_as::<_, MedicalRecord>(
        "UPDATE medical_records SET
            diagnosis = COALESCE(?, diagnosis),
            prescription = NULLIF(COALESCE(?, prescription), ''),
            notes = NULLIF(COALESCE(?, notes), ''),
            record_date = COALESCE(?, record_date),
            updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(&changes.diagnosis)
    .bind(&changes.prescription)
    .bind(&changes.notes)
    .bind(changes.record_date)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM medical_records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
