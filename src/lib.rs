//! Carelog — role-gated REST backend for medical-visit time tracking.
//!
//! Sites own patients; users carry a primary site plus an assigned-site
//! set; every scoped read/update/delete is constrained to the caller's
//! site scope at the query level. Admins are unrestricted.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
