use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Gender;

/// A patient. Belongs to exactly one site (ownership), optionally one
/// building within that site. `is_active` is a business status, not a
/// deletion marker — deletes are hard deletes.
#[derive(Debug, Clone, Serialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    pub phone_number: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone_number: Option<String>,
    pub insurance: Option<String>,
    pub is_active: bool,
    pub site_id: i64,
    pub building_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

/// Patient shape returned by list/detail endpoints: entity fields plus
/// display labels joined at read time (never persisted).
#[derive(Debug, Clone, Serialize)]
pub struct PatientRow {
    #[serde(flatten)]
    pub patient: Patient,
    pub site_name: String,
    pub building_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    pub phone_number: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone_number: Option<String>,
    pub insurance: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub site_id: i64,
    pub building_id: Option<i64>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone_number: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone_number: Option<String>,
    pub insurance: Option<String>,
    pub is_active: Option<bool>,
    pub site_id: Option<i64>,
    pub building_id: Option<i64>,
}

impl PatientPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.birthdate.is_none()
            && self.gender.is_none()
            && self.phone_number.is_none()
            && self.contact_name.is_none()
            && self.contact_phone_number.is_none()
            && self.insurance.is_none()
            && self.is_active.is_none()
            && self.site_id.is_none()
            && self.building_id.is_none()
    }
}
