//! Input normalization for write payloads. Missing keys are already rejected
//! by deserialization; these checks cover blank or malformed values.

use crate::db::models::{
    DoctorChanges, MedicalRecordChanges, NewDoctor, NewMedicalRecord, NewPatient, NewUser,
    PatientChanges, Role,
};
use crate::error::{ApiError, ApiResult};
use crate::utils::{
    cleared_text, normalize_available_days, optional_text, required_text, validate_window,
};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

/// A changed required field may not be blanked out.
fn changed_text(field: &str, value: Option<&str>) -> ApiResult<Option<String>> {
    value.map(|v| required_text(field, v)).transpose()
}

pub fn new_patient(input: &NewPatient) -> ApiResult<NewPatient> {
    Ok(NewPatient {
        first_name: required_text("first_name", &input.first_name)?,
        last_name: required_text("last_name", &input.last_name)?,
        date_of_birth: input.date_of_birth,
        gender: required_text("gender", &input.gender)?,
        phone: optional_text(input.phone.as_deref()),
        email: optional_text(input.email.as_deref()),
        address: optional_text(input.address.as_deref()),
        blood_type: optional_text(input.blood_type.as_deref()),
        emergency_contact: optional_text(input.emergency_contact.as_deref()),
    })
}

pub fn patient_changes(input: &PatientChanges) -> ApiResult<PatientChanges> {
    Ok(PatientChanges {
        first_name: changed_text("first_name", input.first_name.as_deref())?,
        last_name: changed_text("last_name", input.last_name.as_deref())?,
        date_of_birth: input.date_of_birth,
        gender: changed_text("gender", input.gender.as_deref())?,
        phone: cleared_text(input.phone.as_deref()),
        email: cleared_text(input.email.as_deref()),
        address: cleared_text(input.address.as_deref()),
        blood_type: cleared_text(input.blood_type.as_deref()),
        emergency_contact: cleared_text(input.emergency_contact.as_deref()),
    })
}

pub fn new_doctor(input: &NewDoctor) -> ApiResult<NewDoctor> {
    validate_window(input.available_start, input.available_end)?;
    Ok(NewDoctor {
        first_name: required_text("first_name", &input.first_name)?,
        last_name: required_text("last_name", &input.last_name)?,
        specialization: required_text("specialization", &input.specialization)?,
        phone: optional_text(input.phone.as_deref()),
        email: optional_text(input.email.as_deref()),
        available_days: normalize_available_days(&input.available_days)?,
        available_start: input.available_start,
        available_end: input.available_end,
    })
}

/// `current` supplies the window bound that is not being changed.
pub fn doctor_changes(
    input: &DoctorChanges,
    current: &crate::db::models::Doctor,
) -> ApiResult<DoctorChanges> {
    validate_window(
        input.available_start.unwrap_or(current.available_start),
        input.available_end.unwrap_or(current.available_end),
    )?;
    Ok(DoctorChanges {
        first_name: changed_text("first_name", input.first_name.as_deref())?,
        last_name: changed_text("last_name", input.last_name.as_deref())?,
        specialization: changed_text("specialization", input.specialization.as_deref())?,
        phone: cleared_text(input.phone.as_deref()),
        email: cleared_text(input.email.as_deref()),
        available_days: input
            .available_days
            .as_deref()
            .map(normalize_available_days)
            .transpose()?,
        available_start: input.available_start,
        available_end: input.available_end,
    })
}

pub fn new_record(input: &NewMedicalRecord) -> ApiResult<NewMedicalRecord> {
    Ok(NewMedicalRecord {
        diagnosis: required_text("diagnosis", &input.diagnosis)?,
        prescription: optional_text(input.prescription.as_deref()),
        notes: optional_text(input.notes.as_deref()),
        ..input.clone()
    })
}

pub fn record_changes(input: &MedicalRecordChanges) -> ApiResult<MedicalRecordChanges> {
    Ok(MedicalRecordChanges {
        diagnosis: changed_text("diagnosis", input.diagnosis.as_deref())?,
        prescription: cleared_text(input.prescription.as_deref()),
        notes: cleared_text(input.notes.as_deref()),
        record_date: input.record_date,
    })
}

/// Credential fields shared by self-registration and admin-created accounts.
pub fn credentials(username: &str, email: &str, password: &str) -> ApiResult<(String, String)> {
    let username = required_text("username", username)?;
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ApiError::ValidationFailed(format!(
            "username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }

    let email = required_text("email", email)?.to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::ValidationFailed("email is not valid".to_string()));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::ValidationFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok((username, email))
}

/// Each role carries exactly the link it needs: customers a patient,
/// doctors a doctor, admins nothing.
pub fn new_user(input: &NewUser) -> ApiResult<NewUser> {
    let (username, email) = credentials(&input.username, &input.email, &input.password)?;

    let links_ok = match input.role {
        Role::Admin => input.patient_id.is_none() && input.doctor_id.is_none(),
        Role::Customer => input.patient_id.is_some() && input.doctor_id.is_none(),
        Role::Doctor => input.doctor_id.is_some() && input.patient_id.is_none(),
    };
    if !links_ok {
        return Err(ApiError::ValidationFailed(
            "customer accounts need patient_id, doctor accounts need doctor_id, admin accounts take neither"
                .to_string(),
        ));
    }

    Ok(NewUser {
        username,
        email,
        ..input.clone()
    })
}
