pub mod activities;
pub mod auth;
pub mod buildings;
pub mod health;
pub mod medical_records;
pub mod patients;
pub mod sites;
pub mod users;
