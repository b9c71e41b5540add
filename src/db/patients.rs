use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::db::models::{NewPatient, Patient, PatientChanges};
use crate::services::ids::{next_external_id, IdKind};
use crate::services::scope::{Resource, RowFilter};

#[derive(Deserialize, Debug, Default, Clone)]
pub struct PatientFilter {
    /// Case-insensitive match against first or last name.
    pub search: Option<String>,
}

pub async fn insert(conn: &mut SqliteConnection, new: &NewPatient) -> Result<Patient, sqlx::Error> {
    let patient_id = next_external_id(conn, IdKind::Patient).await?;
    let now = Utc::now();

    sqlx::query_as::<_, Patient>(
        "INSERT INTO patients (patient_id, first_name, last_name, date_of_birth, gender, phone, email,
                               address, blood_type, emergency_contact, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(&patient_id)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(new.date_of_birth)
    .bind(&new.gender)
    .bind(&new.phone)
    .bind(&new.email)
    .bind(&new.address)
    .bind(&new.blood_type)
    .bind(&new.emergency_contact)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

/// Makes `%`, `_` and the escape character itself match literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn list(
    pool: &SqlitePool,
    scope: &RowFilter,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM patients WHERE 1 = 1");
    scope.push_sql(&mut qb, Resource::Patients);

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        qb.push(" AND (LOWER(first_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(last_name) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    qb.push(" ORDER BY last_name, first_name, id");
    qb.build_query_as::<Patient>().fetch_all(pool).await
}

/// Fetches one patient if it is visible under `scope`.
pub async fn find(
    pool: &SqlitePool,
    id: i64,
    scope: &RowFilter,
) -> Result<Option<Patient>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM patients WHERE id = ");
    qb.push_bind(id);
    scope.push_sql(&mut qb, Resource::Patients);
    qb.build_query_as::<Patient>().fetch_optional(pool).await
}

pub async fn exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM patients WHERE id = ?)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await
}

/// Applies the provided fields; `None` leaves a column untouched.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: &PatientChanges,
) -> Result<Option<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>(
        "UPDATE patients SET
            first_name = COALESCE(?, first_name),
            last_name = COALESCE(?, last_name),
            date_of_birth = COALESCE(?, date_of_birth),
            gender = COALESCE(?, gender),
            phone = NULLIF(COALESCE(?, phone), ''),
            email = NULLIF(COALESCE(?, email), ''),
            address = NULLIF(COALESCE(?, address), ''),
            blood_type = NULLIF(COALESCE(?, blood_type), ''),
            emergency_contact = NULLIF(COALESCE(?, emergency_contact), ''),
            updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(&changes.first_name)
    .bind(&changes.last_name)
    .bind(changes.date_of_birth)
    .bind(&changes.gender)
    .bind(&changes.phone)
    .bind(&changes.email)
    .bind(&changes.address)
    .bind(&changes.blood_type)
    .bind(&changes.emergency_contact)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM patients WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
