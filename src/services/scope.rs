//! Role-scoped visibility.
//!
//! Each role has a [`ScopeResolver`] that turns the authenticated caller into
//! a [`RowFilter`]. Queries over patients, appointments and medical records
//! push that filter into their `WHERE` clause, so scoping happens in SQL and
//! never by post-filtering rows in memory.

use sqlx::{QueryBuilder, Sqlite};

use crate::db::models::{Role, User};

/// The authenticated identity behind a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            patient_id: user.patient_id,
            doctor_id: user.doctor_id,
        }
    }
}

impl Caller {
    /// Resolves the row filter for this caller through its role's resolver.
    pub fn scope(&self) -> RowFilter {
        resolver_for(self.role).resolve(self)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Which rows of a scoped table a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    All,
    Patient(i64),
    Doctor(i64),
    /// Customer or doctor account whose linked row is gone.
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Patients,
    Appointments,
    MedicalRecords,
}

impl RowFilter {
    /// Appends ` AND <predicate>` to a query that already has a `WHERE`.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Sqlite>, resource: Resource) {
        match (*self, resource) {
            (RowFilter::All, _) => {}
            (RowFilter::Nothing, _) => {
                qb.push(" AND 0 = 1");
            }
            (RowFilter::Patient(id), Resource::Patients) => {
                qb.push(" AND id = ").push_bind(id);
            }
            (RowFilter::Patient(id), _) => {
                qb.push(" AND patient_id = ").push_bind(id);
            }
            (RowFilter::Doctor(id), Resource::Patients) => {
                qb.push(" AND (id IN (SELECT patient_id FROM appointments WHERE doctor_id = ")
                    .push_bind(id)
                    .push(") OR id IN (SELECT patient_id FROM medical_records WHERE doctor_id = ")
                    .push_bind(id)
                    .push("))");
            }
            (RowFilter::Doctor(id), _) => {
                qb.push(" AND doctor_id = ").push_bind(id);
            }
        }
    }

    /// In-memory counterpart of [`push_sql`](Self::push_sql) for a row that
    /// carries both links (appointments, records).
    pub fn permits(&self, patient_id: i64, doctor_id: i64) -> bool {
        match *self {
            RowFilter::All => true,
            RowFilter::Patient(id) => id == patient_id,
            RowFilter::Doctor(id) => id == doctor_id,
            RowFilter::Nothing => false,
        }
    }
}

pub trait ScopeResolver: Send + Sync {
    fn resolve(&self, caller: &Caller) -> RowFilter;
}

pub struct AdminScope;

pub struct DoctorScope;

pub struct CustomerScope;

impl ScopeResolver for AdminScope {
    fn resolve(&self, _caller: &Caller) -> RowFilter {
        RowFilter::All
    }
}

impl ScopeResolver for DoctorScope {
    fn resolve(&self, caller: &Caller) -> RowFilter {
        caller.doctor_id.map_or(RowFilter::Nothing, RowFilter::Doctor)
    }
}

impl ScopeResolver for CustomerScope {
    fn resolve(&self, caller: &Caller) -> RowFilter {
        caller.patient_id.map_or(RowFilter::Nothing, RowFilter::Patient)
    }
}

pub fn resolver_for(role: Role) -> &'static dyn ScopeResolver {
    match role {
        Role::Admin => &AdminScope,
        Role::Doctor => &DoctorScope,
        Role::Customer => &CustomerScope,
    }
}
