//! HTTP surface. Every route lives under `/api`; all but health, register
//! and login sit behind [`require_auth`].

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use axum::Router;
use sqlx::SqlitePool;

use crate::handlers::{appointments, auth, doctors, health, patients, records, users};
use crate::middleware::{log_requests, require_auth};

/// Shared request state. The pool is opened once at startup and closed on
/// shutdown; handlers only borrow it.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub session_ttl: chrono::Duration,
    pub hash_iterations: u32,
}

pub fn build_router(state: AppState) -> Router {
    // Path params use `:param` syntax (axum 0.7).
    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", delete(users::remove))
        .route("/patients", get(patients::list).post(patients::create))
        .route(
            "/patients/:id",
            get(patients::detail)
                .put(patients::update)
                .delete(patients::remove),
        )
        .route("/patients/:id/appointments", get(patients::appointments))
        .route("/patients/:id/records", get(patients::records))
        .route("/doctors", get(doctors::list).post(doctors::create))
        .route(
            "/doctors/:id",
            get(doctors::detail)
                .put(doctors::update)
                .delete(doctors::remove),
        )
        .route("/appointments/availability", get(appointments::availability))
        .route(
            "/appointments",
            get(appointments::list).post(appointments::create),
        )
        .route(
            "/appointments/:id",
            get(appointments::detail)
                .put(appointments::update)
                .delete(appointments::remove),
        )
        .route("/records", get(records::list).post(records::create))
        .route(
            "/records/:id",
            get(records::detail)
                .put(records::update)
                .delete(records::remove),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/health", get(health::check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    Router::new()
        .nest("/api", protected.merge(public))
        .layer(from_fn(log_requests))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::db::models::{AppointmentChanges, AppointmentStatus, NewAppointment, NewMedicalRecord, Role, User};
    use crate::db::testing::{date, insert_doctor, insert_patient, insert_user, temp_pool, time};
    use crate::db::{appointments as appointment_rows, records as record_rows};
    use crate::services::{booking, sessions};

    struct TestApp {
        _dir: tempfile::TempDir,
        pool: SqlitePool,
        router: Router,
    }

    async fn test_app() -> TestApp {
        let (dir, pool) = temp_pool().await;
        let router = build_router(AppState {
            pool: pool.clone(),
            session_ttl: Duration::hours(1),
            hash_iterations: 1_000,
        });
        TestApp {
            _dir: dir,
            pool,
            router,
        }
    }

    impl TestApp {
        async fn token_for(&self, user: &User) -> String {
            sessions::issue(&self.pool, user, Duration::hours(1))
                .await
                .unwrap()
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("Authorization", format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }
    }

    // 2026-11-02 is a Monday.
    async fn book_at(pool: &SqlitePool, patient_id: i64, doctor_id: i64, hour: u32) -> i64 {
        let appointment = booking::book(
            pool,
            &NewAppointment {
                patient_id,
                doctor_id,
                appointment_date: date(2026, 11, 2),
                appointment_time: time(hour, 0),
                reason: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        appointment.id
    }

    async fn write_record(pool: &SqlitePool, patient_id: i64, doctor_id: i64) {
        let mut conn = pool.acquire().await.unwrap();
        let new = NewMedicalRecord {
            patient_id,
            doctor_id,
            appointment_id: None,
            diagnosis: "Hypertension".into(),
            prescription: None,
            notes: None,
            record_date: None,
        };
        record_rows::insert(&mut conn, &new, date(2026, 10, 1))
            .await
            .unwrap();
    }

    fn ids(json: &Value, key: &str, field: &str) -> Vec<i64> {
        json[key]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row[field].as_i64().unwrap())
            .collect()
    }

    fn booking_body(patient_id: i64, doctor_id: i64, at: &str) -> Value {
        json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": "2026-11-02",
            "appointment_time": at,
            "reason": "Checkup"
        })
    }

    #[tokio::test]
    async fn health_is_public_and_everything_else_needs_a_token() {
        let app = test_app().await;

        let (status, json) = app.send("GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["database"], "ok");

        let (status, json) = app.send("GET", "/api/patients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");

        let (status, _) = app
            .send("GET", "/api/patients", Some("not-a-real-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn customer_sees_only_their_own_rows() {
        let app = test_app().await;
        let own = insert_patient(&app.pool, "Own").await;
        let other = insert_patient(&app.pool, "Other").await;
        let doctor = insert_doctor(&app.pool, "House").await;
        let own_appt = book_at(&app.pool, own.id, doctor.id, 9).await;
        book_at(&app.pool, other.id, doctor.id, 10).await;
        write_record(&app.pool, own.id, doctor.id).await;
        write_record(&app.pool, other.id, doctor.id).await;

        let customer = insert_user(&app.pool, "own", Role::Customer, Some(own.id), None).await;
        let token = app.token_for(&customer).await;

        let (_, json) = app.send("GET", "/api/patients", Some(&token), None).await;
        assert_eq!(ids(&json, "patients", "id"), vec![own.id]);

        let (_, json) = app.send("GET", "/api/appointments", Some(&token), None).await;
        assert_eq!(ids(&json, "appointments", "id"), vec![own_appt]);

        let (_, json) = app.send("GET", "/api/records", Some(&token), None).await;
        assert_eq!(ids(&json, "records", "patient_id"), vec![own.id]);

        let uri = format!("/api/patients/{}", other.id);
        let (status, _) = app.send("GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/patients/{}/records", other.id);
        let (status, _) = app.send("GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn doctor_sees_only_their_patients_and_rows() {
        let app = test_app().await;
        let mine = insert_patient(&app.pool, "Mine").await;
        let theirs = insert_patient(&app.pool, "Theirs").await;
        let house = insert_doctor(&app.pool, "House").await;
        let wilson = insert_doctor(&app.pool, "Wilson").await;
        let my_appt = book_at(&app.pool, mine.id, house.id, 9).await;
        book_at(&app.pool, theirs.id, wilson.id, 9).await;
        write_record(&app.pool, theirs.id, wilson.id).await;

        let user = insert_user(&app.pool, "house", Role::Doctor, None, Some(house.id)).await;
        let token = app.token_for(&user).await;

        let (_, json) = app.send("GET", "/api/patients", Some(&token), None).await;
        assert_eq!(ids(&json, "patients", "id"), vec![mine.id]);

        let (_, json) = app.send("GET", "/api/appointments", Some(&token), None).await;
        assert_eq!(ids(&json, "appointments", "id"), vec![my_appt]);

        let (_, json) = app.send("GET", "/api/records", Some(&token), None).await;
        assert!(json["records"].as_array().unwrap().is_empty());

        // The doctor directory itself is not scoped.
        let (_, json) = app.send("GET", "/api/doctors", Some(&token), None).await;
        assert_eq!(json["doctors"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unlinked_accounts_see_empty_lists() {
        let app = test_app().await;
        let patient = insert_patient(&app.pool, "Someone").await;
        let doctor = insert_doctor(&app.pool, "House").await;
        book_at(&app.pool, patient.id, doctor.id, 9).await;

        let customer = insert_user(&app.pool, "orphan", Role::Customer, None, None).await;
        let token = app.token_for(&customer).await;

        for (uri, key) in [
            ("/api/patients", "patients"),
            ("/api/appointments", "appointments"),
            ("/api/records", "records"),
        ] {
            let (status, json) = app.send("GET", uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::OK);
            assert!(json[key].as_array().unwrap().is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn double_booking_conflicts_and_cancelled_slot_can_be_rebooked() {
        let app = test_app().await;
        let patient = insert_patient(&app.pool, "Ada").await;
        let doctor = insert_doctor(&app.pool, "House").await;
        let admin = insert_user(&app.pool, "root", Role::Admin, None, None).await;
        let token = app.token_for(&admin).await;
        let body = booking_body(patient.id, doctor.id, "10:00:00");

        let (status, first) = app
            .send("POST", "/api/appointments", Some(&token), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["status"], "scheduled");
        assert!(first["appointment_id"].as_str().unwrap().starts_with("APT"));

        let (status, json) = app
            .send("POST", "/api/appointments", Some(&token), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "CONFLICT");

        let uri = format!("/api/appointments/{}", first["id"]);
        let (status, json) = app
            .send("PUT", &uri, Some(&token), Some(json!({"status": "cancelled"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "cancelled");

        let (status, _) = app
            .send("POST", "/api/appointments", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn booking_outside_availability_is_rejected() {
        let app = test_app().await;
        let patient = insert_patient(&app.pool, "Ada").await;
        let doctor = insert_doctor(&app.pool, "House").await;
        let admin = insert_user(&app.pool, "root", Role::Admin, None, None).await;
        let token = app.token_for(&admin).await;

        let (status, json) = app
            .send(
                "POST",
                "/api/appointments",
                Some(&token),
                Some(booking_body(patient.id, doctor.id, "18:30:00")),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"], "VALIDATION_FAILED");

        let (status, _) = app
            .send(
                "POST",
                "/api/appointments",
                Some(&token),
                Some(booking_body(patient.id, 404, "10:00:00")),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn availability_reflects_booked_slots() {
        let app = test_app().await;
        let patient = insert_patient(&app.pool, "Ada").await;
        let doctor = insert_doctor(&app.pool, "House").await;
        book_at(&app.pool, patient.id, doctor.id, 11).await;
        let customer = insert_user(&app.pool, "ada", Role::Customer, Some(patient.id), None).await;
        let token = app.token_for(&customer).await;

        let uri = format!(
            "/api/appointments/availability?doctor_id={}&date=2026-11-02&time=11:00:00",
            doctor.id
        );
        let (status, json) = app.send("GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["available"], false);
        assert_eq!(json["within_hours"], true);

        let uri = format!(
            "/api/appointments/availability?doctor_id={}&date=2026-11-02&time=12:00:00",
            doctor.id
        );
        let (_, json) = app.send("GET", &uri, Some(&token), None).await;
        assert_eq!(json["available"], true);
    }

    #[tokio::test]
    async fn customers_book_and_update_only_within_their_rights() {
        let app = test_app().await;
        let own = insert_patient(&app.pool, "Own").await;
        let other = insert_patient(&app.pool, "Other").await;
        let doctor = insert_doctor(&app.pool, "House").await;
        let customer = insert_user(&app.pool, "own", Role::Customer, Some(own.id), None).await;
        let token = app.token_for(&customer).await;

        let (status, _) = app
            .send(
                "POST",
                "/api/appointments",
                Some(&token),
                Some(booking_body(other.id, doctor.id, "09:00:00")),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) = app
            .send(
                "POST",
                "/api/appointments",
                Some(&token),
                Some(booking_body(own.id, doctor.id, "09:00:00")),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/appointments/{}", created["id"]);
        let (status, _) = app
            .send("PUT", &uri, Some(&token), Some(json!({"status": "completed"})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app
            .send(
                "PUT",
                &uri,
                Some(&token),
                Some(json!({"appointment_time": "14:00:00"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["appointment_time"], "14:00:00");

        let (status, _) = app.send("DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn rescheduling_onto_a_taken_slot_conflicts() {
        let app = test_app().await;
        let patient = insert_patient(&app.pool, "Ada").await;
        let doctor = insert_doctor(&app.pool, "House").await;
        book_at(&app.pool, patient.id, doctor.id, 9).await;
        let second = book_at(&app.pool, patient.id, doctor.id, 10).await;
        let admin = insert_user(&app.pool, "root", Role::Admin, None, None).await;
        let token = app.token_for(&admin).await;

        let uri = format!("/api/appointments/{second}");
        let (status, _) = app
            .send("PUT", &uri, Some(&token), Some(json!({"appointment_time": "09:00:00"})))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let unchanged = appointment_rows::find_on(&mut app.pool.acquire().await.unwrap(), second)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.appointment_time, time(10, 0));

        // Direct service call with a status change leaves the slot intact.
        let current = unchanged.clone();
        let changes = AppointmentChanges {
            status: Some(AppointmentStatus::Completed),
            ..Default::default()
        };
        let done = booking::reschedule(&app.pool, &current, &changes).await.unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn patient_missing_gender_is_rejected_and_not_persisted() {
        let app = test_app().await;
        let admin = insert_user(&app.pool, "root", Role::Admin, None, None).await;
        let token = app.token_for(&admin).await;

        let (status, json) = app
            .send(
                "POST",
                "/api/patients",
                Some(&token),
                Some(json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "date_of_birth": "1815-12-10"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"], "VALIDATION_FAILED");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(&app.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        let (status, json) = app
            .send(
                "POST",
                "/api/patients",
                Some(&token),
                Some(json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "date_of_birth": "1815-12-10",
                    "gender": "female"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["patient_id"], "PAT00000001");
    }

    #[tokio::test]
    async fn admins_cannot_delete_themselves_but_can_delete_other_admins() {
        let app = test_app().await;
        let root = insert_user(&app.pool, "root", Role::Admin, None, None).await;
        let other = insert_user(&app.pool, "deputy", Role::Admin, None, None).await;
        app.token_for(&other).await;
        let token = app.token_for(&root).await;

        let (status, json) = app
            .send("DELETE", &format!("/api/users/{}", root.id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "FORBIDDEN");

        let (status, _) = app
            .send("DELETE", &format!("/api/users/{}", other.id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, json) = app.send("GET", "/api/users", Some(&token), None).await;
        assert_eq!(ids(&json, "users", "id"), vec![root.id]);
    }

    #[tokio::test]
    async fn non_admins_cannot_manage_users() {
        let app = test_app().await;
        let doctor = insert_doctor(&app.pool, "House").await;
        let user = insert_user(&app.pool, "house", Role::Doctor, None, Some(doctor.id)).await;
        let token = app.token_for(&user).await;

        let (status, _) = app.send("GET", "/api/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn register_login_me_and_logout() {
        let app = test_app().await;
        let registration = json!({
            "username": "ada",
            "email": "Ada@Example.com",
            "password": "analytical-engine",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "date_of_birth": "1815-12-10",
            "gender": "female"
        });

        let (status, json) = app
            .send("POST", "/api/auth/register", None, Some(registration.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["user"]["role"], "customer");
        assert_eq!(json["user"]["email"], "ada@example.com");
        assert!(json["user"].get("password_hash").is_none());

        let (status, json) = app
            .send("POST", "/api/auth/register", None, Some(registration))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "CONFLICT");

        let (status, _) = app
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"username": "ada", "password": "wrong-password"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, json) = app
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"username": "ada", "password": "analytical-engine"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = json["token"].as_str().unwrap().to_string();

        let (status, json) = app.send("GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["patient"]["first_name"], "Ada");

        let (status, _) = app.send("POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.send("GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn doctors_write_records_only_under_their_own_name() {
        let app = test_app().await;
        let patient = insert_patient(&app.pool, "Ada").await;
        let house = insert_doctor(&app.pool, "House").await;
        let wilson = insert_doctor(&app.pool, "Wilson").await;
        let user = insert_user(&app.pool, "house", Role::Doctor, None, Some(house.id)).await;
        let token = app.token_for(&user).await;

        let record = |doctor_id: i64| {
            json!({
                "patient_id": patient.id,
                "doctor_id": doctor_id,
                "diagnosis": "Lupus",
                "prescription": "Rest"
            })
        };

        let (status, _) = app
            .send("POST", "/api/records", Some(&token), Some(record(wilson.id)))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app
            .send("POST", "/api/records", Some(&token), Some(record(house.id)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["record_id"], "REC00000001");

        // Having written a record makes the patient visible to the doctor.
        let (_, json) = app.send("GET", "/api/patients", Some(&token), None).await;
        assert_eq!(ids(&json, "patients", "id"), vec![patient.id]);

        let customer = insert_user(&app.pool, "ada", Role::Customer, Some(patient.id), None).await;
        let customer_token = app.token_for(&customer).await;
        let (status, _) = app
            .send("POST", "/api/records", Some(&customer_token), Some(record(house.id)))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn record_appointment_must_match_patient_and_doctor() {
        let app = test_app().await;
        let ada = insert_patient(&app.pool, "Ada").await;
        let bob = insert_patient(&app.pool, "Bob").await;
        let doctor = insert_doctor(&app.pool, "House").await;
        let appointment = book_at(&app.pool, bob.id, doctor.id, 9).await;
        let admin = insert_user(&app.pool, "root", Role::Admin, None, None).await;
        let token = app.token_for(&admin).await;

        let (status, _) = app
            .send(
                "POST",
                "/api/records",
                Some(&token),
                Some(json!({
                    "patient_id": ada.id,
                    "doctor_id": doctor.id,
                    "appointment_id": appointment,
                    "diagnosis": "Flu"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn malformed_query_and_path_parameters_are_validation_failures() {
        let app = test_app().await;
        let doctor = insert_doctor(&app.pool, "House").await;
        let admin = insert_user(&app.pool, "root", Role::Admin, None, None).await;
        let token = app.token_for(&admin).await;

        let missing_time = format!(
            "/api/appointments/availability?doctor_id={}&date=2026-11-02",
            doctor.id
        );
        for uri in [
            missing_time.as_str(),
            "/api/patients/abc",
            "/api/appointments?status=bogus",
            "/api/records?patient_id=first",
        ] {
            let (status, json) = app.send("GET", uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
            assert_eq!(json["error"]["code"], "VALIDATION_FAILED", "{uri}");
        }
    }

    #[tokio::test]
    async fn blank_optional_fields_clear_stored_values() {
        let app = test_app().await;
        let patient = insert_patient(&app.pool, "Ada").await;
        let customer = insert_user(&app.pool, "ada", Role::Customer, Some(patient.id), None).await;
        let token = app.token_for(&customer).await;
        let uri = format!("/api/patients/{}", patient.id);

        let (status, json) = app
            .send("PUT", &uri, Some(&token), Some(json!({"phone": "555-0100"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["phone"], "555-0100");

        let (_, json) = app
            .send("PUT", &uri, Some(&token), Some(json!({"address": "Baker St"})))
            .await;
        assert_eq!(json["phone"], "555-0100");

        let (_, json) = app
            .send("PUT", &uri, Some(&token), Some(json!({"phone": ""})))
            .await;
        assert!(json["phone"].is_null());
        assert_eq!(json["address"], "Baker St");
    }

    #[tokio::test]
    async fn doctor_booking_brings_patient_into_scope() {
        let app = test_app().await;
        let stranger = insert_patient(&app.pool, "Stranger").await;
        let doctor = insert_doctor(&app.pool, "House").await;
        let user = insert_user(&app.pool, "house", Role::Doctor, None, Some(doctor.id)).await;
        let token = app.token_for(&user).await;

        let (_, json) = app.send("GET", "/api/patients", Some(&token), None).await;
        assert!(json["patients"].as_array().unwrap().is_empty());

        let (status, _) = app
            .send(
                "POST",
                "/api/appointments",
                Some(&token),
                Some(booking_body(9999, doctor.id, "10:00:00")),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                "POST",
                "/api/appointments",
                Some(&token),
                Some(booking_body(stranger.id, doctor.id, "10:00:00")),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, json) = app.send("GET", "/api/patients", Some(&token), None).await;
        assert_eq!(ids(&json, "patients", "id"), vec![stranger.id]);
    }
}
