//! Story asset API: IP asset metadata and attached licenses

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::config::Network;
use crate::api::{LicenseInfo, LicenseSummary, StorySummary};
use crate::error::FolioError;
use crate::license::{LicenseType, COMMERCIAL_USE_TERMS_ID};

/// Read side of the chain. `None` means the asset or record does not exist.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn story(&self, ip_id: &str) -> Result<Option<StorySummary>, FolioError>;

    async fn licenses(&self, ip_id: &str) -> Result<Option<Vec<LicenseInfo>>, FolioError>;
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRecord {
    #[serde(alias = "id")]
    ip_id: String,
    #[serde(default)]
    children_count: u64,
    #[serde(default)]
    parent_count: u64,
    #[serde(default, alias = "name")]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LicenseRecord {
    license_terms_id: String,
    #[serde(default)]
    license_template: String,
    #[serde(default)]
    disabled: bool,
}

pub struct StoryApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    network: Network,
}

impl StoryApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        network: Network,
        timeout: Duration,
    ) -> Result<Self, FolioError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FolioError::Internal(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            network,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, FolioError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Asset API request");

        let response = self
            .http
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .header("X-Chain", self.network.chain_name())
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let envelope: DataEnvelope<T> = response
                    .json()
                    .await
                    .map_err(|e| FolioError::Upstream(format!("Invalid asset API response: {}", e)))?;
                Ok(envelope.data)
            }
            status => Err(FolioError::Upstream(format!("Asset API returned HTTP {}", status))),
        }
    }
}

#[async_trait]
impl AssetSource for StoryApiClient {
    async fn story(&self, ip_id: &str) -> Result<Option<StorySummary>, FolioError> {
        let record: Option<AssetRecord> = self.fetch(&format!("/assets/{}", ip_id)).await?;
        Ok(record.map(|r| StorySummary {
            children_count: r.children_count,
            parent_count: r.parent_count,
            ip_id: r.ip_id,
            title: r.title.unwrap_or_default(),
            description: r.description.unwrap_or_default(),
        }))
    }

    async fn licenses(&self, ip_id: &str) -> Result<Option<Vec<LicenseInfo>>, FolioError> {
        let records: Option<Vec<LicenseRecord>> = self.fetch(&format!("/licenses/ip/terms/{}", ip_id)).await?;
        Ok(records.filter(|r| !r.is_empty()).map(|records| {
            records
                .into_iter()
                .map(|r| LicenseInfo {
                    license_type: LicenseType::from_terms_id(&r.license_terms_id),
                    license_terms_id: r.license_terms_id,
                    license_template: r.license_template,
                    enabled: !r.disabled,
                })
                .collect()
        }))
    }
}

/// Derive the license flags over the enabled licenses only
pub fn license_summary(licenses: Vec<LicenseInfo>) -> LicenseSummary {
    let enabled: Vec<&LicenseInfo> = licenses.iter().filter(|l| l.enabled).collect();

    let is_commercial_use_only = enabled.len() == 1 && enabled[0].license_terms_id == COMMERCIAL_USE_TERMS_ID;
    let allows_remix = enabled
        .iter()
        .any(|l| l.license_type.map(LicenseType::allows_derivatives).unwrap_or(false));
    let license_count = enabled.len();

    LicenseSummary {
        has_licenses: license_count > 0,
        is_commercial_use_only,
        allows_remix,
        license_count,
        licenses,
    }
}
