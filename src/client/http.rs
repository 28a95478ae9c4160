//! Registration over HTTP against a running Folio gateway

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::{ApiResponse, RegisterDerivativeRequest, RegisterStoryRequest, RegistrationClient, RegistrationData};
use crate::error::FolioError;

pub struct HttpRegistrationClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRegistrationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FolioError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FolioError::Internal(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<RegistrationData, FolioError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Calling gateway");

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Failing routes still answer with the `success: false` body
        match serde_json::from_str::<ApiResponse<RegistrationData>>(&text) {
            Ok(parsed) => parsed.into_result(),
            Err(e) if status.is_success() => {
                Err(FolioError::Upstream(format!("Invalid gateway response: {}", e)))
            }
            Err(_) => Err(FolioError::Upstream(format!("Gateway returned HTTP {}", status))),
        }
    }
}

#[async_trait]
impl RegistrationClient for HttpRegistrationClient {
    async fn register_story(&self, req: &RegisterStoryRequest) -> Result<RegistrationData, FolioError> {
        let data = self.post("/api/register-story", req).await?;
        info!(ip_id = %data.ip_id, "Gateway registered story");
        Ok(data)
    }

    async fn register_derivative(
        &self,
        req: &RegisterDerivativeRequest,
    ) -> Result<RegistrationData, FolioError> {
        let data = self.post("/api/register-derivative", req).await?;
        info!(ip_id = %data.ip_id, parent = %req.parent_ip_id, "Gateway registered derivative");
        Ok(data)
    }
}
