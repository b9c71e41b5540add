use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use envconfig::Envconfig;
use sqlx::SqlitePool;

use hospital_admin::config::Config;
use hospital_admin::db::models::{NewAppointment, NewDoctor, NewMedicalRecord, NewPatient, NewUser, Role};
use hospital_admin::db::{doctors, init_db, patients, records, users};
use hospital_admin::error::{ApiError, ApiResult};
use hospital_admin::services::{accounts, booking};

const DEMO_PASSWORD: &str = "demo-password";

fn at(h: u32, m: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h, m, 0)
}

fn born(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn get_seed_data() -> Option<(Vec<NewDoctor>, Vec<NewPatient>)> {
    let doctor = |first: &str, last: &str, specialization: &str, days: &str| {
        Some(NewDoctor {
            first_name: first.to_string(),
            last_name: last.to_string(),
            specialization: specialization.to_string(),
            phone: None,
            email: Some(format!("{}@hospital.test", last.to_lowercase())),
            available_days: days.to_string(),
            available_start: at(9, 0)?,
            available_end: at(17, 0)?,
        })
    };

    let seed_doctors = vec![
        doctor("Gregory", "House", "Diagnostics", "Mon,Tue,Wed,Thu,Fri")?,
        doctor("James", "Wilson", "Oncology", "Mon,Wed,Fri")?,
        doctor("Lisa", "Cuddy", "Endocrinology", "Tue,Thu")?,
        doctor("Allison", "Cameron", "Immunology", "Mon,Tue,Wed,Thu,Fri")?,
    ];

    let patient = |first: &str, last: &str, dob: NaiveDate, gender: &str, blood: &str| NewPatient {
        first_name: first.to_string(),
        last_name: last.to_string(),
        date_of_birth: dob,
        gender: gender.to_string(),
        phone: None,
        email: None,
        address: None,
        blood_type: Some(blood.to_string()),
        emergency_contact: None,
    };

    let seed_patients = vec![
        patient("Ada", "Lovelace", born(1985, 12, 10)?, "female", "A+"),
        patient("Alan", "Turing", born(1978, 6, 23)?, "male", "O-"),
        patient("Grace", "Hopper", born(1966, 12, 9)?, "female", "B+"),
        patient("Edsger", "Dijkstra", born(1990, 5, 11)?, "male", "AB+"),
        patient("Barbara", "Liskov", born(1972, 11, 7)?, "female", "O+"),
        patient("Ken", "Thompson", born(1983, 2, 4)?, "male", "A-"),
    ];

    Some((seed_doctors, seed_patients))
}

/// The first date on or after `from` that falls on `weekday`.
fn next_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() - from.weekday().num_days_from_monday()) % 7;
    from + Duration::days(i64::from(ahead))
}

/// Creates the account unless the username is already taken, e.g. by the
/// server's bootstrap admin.
async fn ensure_account(pool: &SqlitePool, account: &NewUser, iterations: u32) -> ApiResult<()> {
    if users::find_by_username(pool, &account.username).await?.is_some() {
        log::info!("Account {} already exists; leaving it as is", account.username);
        return Ok(());
    }
    accounts::create_user(pool, account, iterations).await?;
    Ok(())
}

pub async fn seed_database(pool: &SqlitePool, iterations: u32) -> ApiResult<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        log::info!("Database already holds {} patients; skipping seed", existing);
        return Ok(());
    }

    let (seed_doctors, seed_patients) =
        get_seed_data().ok_or_else(|| ApiError::Internal("invalid seed data".to_string()))?;

    let mut tx = pool.begin().await?;

    // Seed doctors
    let mut doctor_rows = Vec::new();
    for doctor in &seed_doctors {
        doctor_rows.push(doctors::insert(&mut tx, doctor).await?);
    }

    // Seed patients
    let mut patient_rows = Vec::new();
    for patient in &seed_patients {
        patient_rows.push(patients::insert(&mut tx, patient).await?);
    }
    tx.commit().await?;

    // Seed accounts: an admin, one per doctor, and one for the first two patients
    let account = |username: &str, role: Role, patient_id: Option<i64>, doctor_id: Option<i64>| NewUser {
        username: username.to_string(),
        email: format!("{username}@hospital.test"),
        password: DEMO_PASSWORD.to_string(),
        role,
        patient_id,
        doctor_id,
    };
    ensure_account(pool, &account("admin", Role::Admin, None, None), iterations).await?;
    for doctor in &doctor_rows {
        let username = doctor.last_name.to_lowercase();
        ensure_account(pool, &account(&username, Role::Doctor, None, Some(doctor.id)), iterations)
            .await?;
    }
    for patient in patient_rows.iter().take(2) {
        let username = patient.first_name.to_lowercase();
        ensure_account(pool, &account(&username, Role::Customer, Some(patient.id), None), iterations)
            .await?;
    }

    // Seed appointments on the coming Monday for the full-week doctors
    let monday = next_weekday(Utc::now().date_naive() + Duration::days(1), Weekday::Mon);
    let house = &doctor_rows[0];
    let cameron = &doctor_rows[3];
    let mut booked = Vec::new();
    for (index, patient) in patient_rows.iter().enumerate() {
        let doctor = if index % 2 == 0 { house } else { cameron };
        let hour = 9 + u32::try_from(index / 2).unwrap_or(0);
        let request = NewAppointment {
            patient_id: patient.id,
            doctor_id: doctor.id,
            appointment_date: monday,
            appointment_time: at(hour, 0).ok_or_else(|| ApiError::Internal("bad hour".to_string()))?,
            reason: Some("Routine checkup".to_string()),
            notes: None,
        };
        booked.push(booking::book(pool, &request).await?);
    }

    // Seed medical records for the first few patients
    let mut conn = pool.acquire().await?;
    for appointment in booked.iter().take(3) {
        let record = NewMedicalRecord {
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            appointment_id: Some(appointment.id),
            diagnosis: "Seasonal allergies".to_string(),
            prescription: Some("Cetirizine 10mg daily".to_string()),
            notes: None,
            record_date: None,
        };
        records::insert(&mut conn, &record, Utc::now().date_naive()).await?;
    }

    log::info!(
        "Seeded {} doctors, {} patients, {} appointments",
        doctor_rows.len(),
        patient_rows.len(),
        booked.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    dotenvy::dotenv().ok();

    let config = Config::init_from_env().map_err(|e| format!("Invalid configuration: {e}"))?;
    let pool = init_db(&config.database_url, config.db_max_connections).await?;
    seed_database(&pool, config.password_hash_iterations).await?;
    pool.close().await;
    Ok(())
}
