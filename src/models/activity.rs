use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A logged unit of patient care: one patient, one recording user, a
/// service window and a fractional-minute duration.
///
/// The activity's site is the owning patient's site, reached through the
/// patient foreign key — it is not stored on the row.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: i64,
    pub patient_id: i64,
    pub user_id: Option<i64>,
    pub activity_type: String,
    pub pharm_flag: bool,
    pub notes: String,
    pub service_start: NaiveDateTime,
    pub service_end: Option<NaiveDateTime>,
    pub duration_minutes: f64,
    pub created_at: NaiveDateTime,
}

/// Activity shape returned by list/detail endpoints, enriched with
/// read-time display labels.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRow {
    #[serde(flatten)]
    pub activity: Activity,
    pub patient_name: String,
    pub user_initials: Option<String>,
    pub site_id: i64,
    pub site_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub patient_id: i64,
    pub user_id: Option<i64>,
    pub activity_type: String,
    #[serde(default)]
    pub pharm_flag: bool,
    #[serde(default)]
    pub notes: String,
    /// Defaults to "now" when omitted.
    pub service_start: Option<NaiveDateTime>,
    pub service_end: Option<NaiveDateTime>,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPatch {
    pub patient_id: Option<i64>,
    pub user_id: Option<i64>,
    pub activity_type: Option<String>,
    pub pharm_flag: Option<bool>,
    pub notes: Option<String>,
    pub service_start: Option<NaiveDateTime>,
    pub service_end: Option<NaiveDateTime>,
    pub duration_minutes: Option<f64>,
}

impl ActivityPatch {
    pub fn is_empty(&self) -> bool {
        self.patient_id.is_none()
            && self.user_id.is_none()
            && self.activity_type.is_none()
            && self.pharm_flag.is_none()
            && self.notes.is_none()
            && self.service_start.is_none()
            && self.service_end.is_none()
            && self.duration_minutes.is_none()
    }
}
