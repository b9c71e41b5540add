//! Domain rules that sit between the HTTP handlers and the `db` queries.

pub mod accounts;
pub mod booking;
pub mod credentials;
pub mod ids;
pub mod scope;
pub mod sessions;
pub mod validation;
