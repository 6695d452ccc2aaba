//! Core business logic, independent of the HTTP layer.

pub mod acta;
pub mod analyst;
pub mod auth;
pub mod device;
pub mod movement;
pub mod signature;
pub mod status;
pub mod stock;
pub mod user;
