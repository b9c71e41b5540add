use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::models::{NewUser, Role, User};

/// Inserts a user with an already hashed password.
pub async fn insert(
    conn: &mut SqliteConnection,
    new: &NewUser,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash, role, patient_id, doctor_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(&new.username)
    .bind(&new.email)
    .bind(password_hash)
    .bind(new.role)
    .bind(new.patient_id)
    .bind(new.doctor_id)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn count_by_role(pool: &SqlitePool, role: Role) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
        .bind(role)
        .fetch_one(pool)
        .await
}

/// True when another account already links to this patient or doctor row.
pub async fn link_taken(
    conn: &mut SqliteConnection,
    patient_id: Option<i64>,
    doctor_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM users
            WHERE (? IS NOT NULL AND patient_id = ?) OR (? IS NOT NULL AND doctor_id = ?)
         )",
    )
    .bind(patient_id)
    .bind(patient_id)
    .bind(doctor_id)
    .bind(doctor_id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
