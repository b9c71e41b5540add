use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::db::models::{Doctor, DoctorChanges, NewDoctor};
use crate::services::ids::{next_external_id, IdKind};

#[derive(Deserialize, Debug, Default, Clone)]
pub struct DoctorFilter {
    pub specialization: Option<String>,
}

pub async fn insert(conn: &mut SqliteConnection, new: &NewDoctor) -> Result<Doctor, sqlx::Error> {
    let doctor_id = next_external_id(conn, IdKind::Doctor).await?;
    let now = Utc::now();

    sqlx::query_as::<_, Doctor>(
        "INSERT INTO doctors (doctor_id, first_name, last_name, specialization, phone, email,
                              available_days, available_start, available_end, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(&doctor_id)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.specialization)
    .bind(&new.phone)
    .bind(&new.email)
    .bind(&new.available_days)
    .bind(new.available_start)
    .bind(new.available_end)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

/// The doctor directory is visible to every authenticated caller.
pub async fn list(pool: &SqlitePool, filter: &DoctorFilter) -> Result<Vec<Doctor>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM doctors WHERE 1 = 1");

    if let Some(specialization) = filter
        .specialization
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        qb.push(" AND LOWER(specialization) = ")
            .push_bind(specialization.to_lowercase());
    }

    qb.push(" ORDER BY last_name, first_name, id");
    qb.build_query_as::<Doctor>().fetch_all(pool).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Doctor>, sqlx::Error> {
    sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: &DoctorChanges,
) -> Result<Option<Doctor>, sqlx::Error> {
    sqlx::query_as::<_, Doctor>(
        "UPDATE doctors SET
            first_name = COALESCE(?, first_name),
            last_name = COALESCE(?, last_name),
            specialization = COALESCE(?, specialization),
            phone = NULLIF(COALESCE(?, phone), ''),
            email = NULLIF(COALESCE(?, email), ''),
            available_days = COALESCE(?, available_days),
            available_start = COALESCE(?, available_start),
            available_end = COALESCE(?, available_end),
            updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(&changes.first_name)
    .bind(&changes.last_name)
    .bind(&changes.specialization)
    .bind(&changes.phone)
    .bind(&changes.email)
    .bind(&changes.available_days)
    .bind(changes.available_start)
    .bind(changes.available_end)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM doctors WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
