use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A care site — root of the access scope.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSite {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update for a site. Only fields present in the payload change;
/// presence is carried by `Option`, not value truthiness.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitePatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub is_active: Option<bool>,
}

impl SitePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip.is_none()
            && self.is_active.is_none()
    }
}

/// A site with its buildings, for the combined reference-data endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SiteWithBuildings {
    #[serde(flatten)]
    pub site: Site,
    pub buildings: Vec<super::Building>,
}
