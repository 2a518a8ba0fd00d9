use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A building within a site.
#[derive(Debug, Clone, Serialize)]
pub struct Building {
    pub id: i64,
    pub name: String,
    pub site_id: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBuilding {
    pub name: String,
    pub site_id: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildingPatch {
    pub name: Option<String>,
    pub site_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl BuildingPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.site_id.is_none() && self.is_active.is_none()
    }
}
