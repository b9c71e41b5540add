use serde::Deserialize;
use sqlx::SqlitePool;

use crate::db::models::{NewPatient, NewUser, Role, User};
use crate::db::{doctors, patients, unique_violation, users};
use crate::error::{ApiError, ApiResult};
use crate::services::credentials::hash_password_blocking;
use crate::services::scope::Caller;
use crate::services::validation;

/// Customer self-registration: account credentials plus the patient record
/// the account will own.
#[derive(Deserialize, Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub patient: NewPatient,
}

fn duplicate_account(err: &sqlx::Error) -> Option<ApiError> {
    unique_violation(err).map(|message| {
        let field = if message.contains("users.email") {
            "email"
        } else {
            "username"
        };
        ApiError::Conflict(format!("An account with this {field} already exists"))
    })
}

/// Creates the patient row and its customer account in one transaction.
pub async fn register(
    pool: &SqlitePool,
    registration: &Registration,
    iterations: u32,
) -> ApiResult<User> {
    let (username, email) = validation::credentials(
        &registration.username,
        &registration.email,
        &registration.password,
    )?;
    let new_patient = validation::new_patient(&registration.patient)?;
    let password_hash = hash_password_blocking(registration.password.clone(), iterations).await?;

    let mut tx = pool.begin().await?;
    let patient = patients::insert(&mut tx, &new_patient).await?;

    let new_user = NewUser {
        username,
        email,
        password: registration.password.clone(),
        role: Role::Customer,
        patient_id: Some(patient.id),
        doctor_id: None,
    };
    let user = match users::insert(&mut tx, &new_user, &password_hash).await {
        Ok(user) => user,
        Err(e) => return Err(duplicate_account(&e).unwrap_or_else(|| e.into())),
    };

    tx.commit().await?;

    log::info!(
        "Registered customer {} for patient {}",
        user.username,
        patient.patient_id
    );
    Ok(user)
}

/// Admin-created account. The linked patient or doctor must exist and must
/// not already belong to another account.
pub async fn create_user(pool: &SqlitePool, input: &NewUser, iterations: u32) -> ApiResult<User> {
    let new_user = validation::new_user(input)?;
    let password_hash = hash_password_blocking(new_user.password.clone(), iterations).await?;

    let mut tx = pool.begin().await?;

    if let Some(patient_id) = new_user.patient_id {
        if !patients::exists(&mut tx, patient_id).await? {
            return Err(ApiError::NotFound(format!("Patient {patient_id} not found")));
        }
    }
    if let Some(doctor_id) = new_user.doctor_id {
        if doctors::find(&mut tx, doctor_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("Doctor {doctor_id} not found")));
        }
    }
    if users::link_taken(&mut tx, new_user.patient_id, new_user.doctor_id).await? {
        return Err(ApiError::Conflict(
            "That record is already linked to another account".to_string(),
        ));
    }

    let user = match users::insert(&mut tx, &new_user, &password_hash).await {
        Ok(user) => user,
        Err(e) => return Err(duplicate_account(&e).unwrap_or_else(|| e.into())),
    };

    tx.commit().await?;

    log::info!("Created {:?} account {}", user.role, user.username);
    Ok(user)
}

/// Deletes an account. Nobody may delete their own account.
pub async fn delete_user(pool: &SqlitePool, caller: &Caller, id: i64) -> ApiResult<()> {
    if caller.user_id == id {
        return Err(ApiError::Forbidden(
            "You cannot delete your own account".to_string(),
        ));
    }
    if !users::delete(pool, id).await? {
        return Err(ApiError::NotFound(format!("User {id} not found")));
    }

    log::info!("User {} deleted account {}", caller.username, id);
    Ok(())
}

/// Creates the first admin when the database has none.
pub async fn ensure_bootstrap_admin(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    iterations: u32,
) -> ApiResult<Option<User>> {
    if users::count_by_role(pool, Role::Admin).await? > 0 {
        return Ok(None);
    }

    let admin = NewUser {
        username: username.to_string(),
        email: format!("{}@localhost", username.trim()),
        password: password.to_string(),
        role: Role::Admin,
        patient_id: None,
        doctor_id: None,
    };
    let user = create_user(pool, &admin, iterations).await?;
    log::info!("Bootstrapped admin account {}", user.username);
    Ok(Some(user))
}
