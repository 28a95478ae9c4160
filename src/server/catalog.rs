//! Bundled story catalog
//!
//! Stories listed here were published under the non-commercial remix
//! license, so a lookup only has to answer whether the id is known.

use serde::Deserialize;
use tracing::debug;

use crate::api::StoryLicenses;
use crate::error::FolioError;
use crate::license::LicenseType;

const BUNDLED: &str = include_str!("../../data/catalog.json");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub ip_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    stories: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn bundled() -> Result<Self, FolioError> {
        Self::from_json(BUNDLED)
    }

    pub fn from_json(json: &str) -> Result<Self, FolioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Addresses compare case-insensitively
    pub fn find(&self, ip_id: &str) -> Option<&CatalogEntry> {
        self.stories.iter().find(|s| s.ip_id.eq_ignore_ascii_case(ip_id))
    }

    pub fn licenses(&self, ip_id: &str) -> Option<StoryLicenses> {
        self.find(ip_id).map(|entry| {
            debug!(ip_id = %entry.ip_id, title = %entry.title, "Catalog hit");
            StoryLicenses {
                ip_id: entry.ip_id.clone(),
                license_types: vec![LicenseType::NonCommercial],
            }
        })
    }
}
