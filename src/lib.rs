//! LINC - multi-country driver's licensing records backend
//!
//! One database per enabled country, an authority resolver that scopes every
//! read and write, and a rule engine that reports every failing business rule
//! at once. All modules are public for the integration tests.

pub mod api;
pub mod authz;
pub mod codes;
pub mod country;
pub mod entities;
pub mod errors;
pub mod jobs;
pub mod seed;
pub mod session;
pub mod settings;
pub mod status;
pub mod storage;
pub mod validation;
pub mod web;
