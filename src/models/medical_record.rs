use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A medical-record snapshot: a fixed set of boolean clinical flags for
/// one patient. Multiple records per patient are allowed; "latest" is
/// defined by creation time descending.
#[derive(Debug, Clone, Serialize)]
pub struct MedicalRecord {
    pub id: i64,
    pub patient_id: i64,
    pub bp_at_goal: bool,
    pub hospital_visit_since_last_review: bool,
    pub a1c_at_goal: bool,
    pub benzodiazepines: bool,
    pub antipsychotics: bool,
    pub opioids: bool,
    pub fall_since_last_visit: bool,
    pub created_at: NaiveDateTime,
}

/// Partial update for a record's clinical flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicalRecordPatch {
    pub bp_at_goal: Option<bool>,
    pub hospital_visit_since_last_review: Option<bool>,
    pub a1c_at_goal: Option<bool>,
    pub benzodiazepines: Option<bool>,
    pub antipsychotics: Option<bool>,
    pub opioids: Option<bool>,
    pub fall_since_last_visit: Option<bool>,
}

impl MedicalRecordPatch {
    pub fn is_empty(&self) -> bool {
        self.bp_at_goal.is_none()
            && self.hospital_visit_since_last_review.is_none()
            && self.a1c_at_goal.is_none()
            && self.benzodiazepines.is_none()
            && self.antipsychotics.is_none()
            && self.opioids.is_none()
            && self.fall_since_last_visit.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMedicalRecord {
    pub patient_id: i64,
    #[serde(default)]
    pub bp_at_goal: bool,
    #[serde(default)]
    pub hospital_visit_since_last_review: bool,
    #[serde(default)]
    pub a1c_at_goal: bool,
    #[serde(default)]
    pub benzodiazepines: bool,
    #[serde(default)]
    pub antipsychotics: bool,
    #[serde(default)]
    pub opioids: bool,
    #[serde(default)]
    pub fall_since_last_visit: bool,
}
