//! Pinata pinning client
//!
//! - `POST /pinning/pinFileToIPFS` (multipart, field `file`)
//! - `POST /pinning/pinJSONToIPFS` (`{pinataContent, pinataMetadata}`)
//!
//! Both answer with `{IpfsHash, PinSize, Timestamp}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{ipfs_url, require_cid, ContentPinner, FileUpload, PinnedContent};
use crate::error::FolioError;

pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_GATEWAY: &str = "https://gateway.pinata.cloud";

#[derive(Debug, Clone)]
pub struct PinataConfig {
    /// Pinata API base URL
    pub api_url: String,
    /// JWT used as a bearer token
    pub jwt: String,
    /// Gateway written into returned URLs
    pub gateway: String,
    pub timeout: Duration,
}

impl PinataConfig {
    pub fn new(jwt: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            jwt: jwt.into(),
            gateway: DEFAULT_GATEWAY.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash", default)]
    ipfs_hash: String,
    #[serde(rename = "PinSize", default)]
    pin_size: u64,
}

pub struct PinataClient {
    http: reqwest::Client,
    config: PinataConfig,
}

impl PinataClient {
    pub fn new(config: PinataConfig) -> Result<Self, FolioError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FolioError::Internal(format!("building HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn read_pin(&self, response: reqwest::Response, what: &str) -> Result<PinnedContent, FolioError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FolioError::Upstream(format!(
                "Pinning {} failed: HTTP {} {}",
                what,
                status,
                body.trim()
            )));
        }

        let pin: PinResponse = response
            .json()
            .await
            .map_err(|e| FolioError::Upstream(format!("Invalid pinning response: {}", e)))?;
        let cid = require_cid(pin.ipfs_hash, what)?;

        Ok(PinnedContent {
            url: ipfs_url(&self.config.gateway, &cid),
            cid,
            size: pin.pin_size,
        })
    }
}

#[async_trait]
impl ContentPinner for PinataClient {
    async fn pin_file(&self, upload: FileUpload) -> Result<PinnedContent, FolioError> {
        debug!(file = %upload.file_name, size = upload.bytes.len(), "Pinning file");

        let name = upload.file_name.clone();
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)
            .map_err(|e| FolioError::Validation(format!("Invalid mime type: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", json!({ "name": name }).to_string());

        let response = self
            .http
            .post(self.endpoint("/pinning/pinFileToIPFS"))
            .bearer_auth(&self.config.jwt)
            .multipart(form)
            .send()
            .await?;

        let pinned = self.read_pin(response, &name).await?;
        info!(cid = %pinned.cid, file = %name, "Pinned file");
        Ok(pinned)
    }

    async fn pin_json(&self, name: &str, doc: &serde_json::Value) -> Result<PinnedContent, FolioError> {
        let response = self
            .http
            .post(self.endpoint("/pinning/pinJSONToIPFS"))
            .bearer_auth(&self.config.jwt)
            .json(&json!({
                "pinataContent": doc,
                "pinataMetadata": { "name": name },
            }))
            .send()
            .await?;

        let pinned = self.read_pin(response, name).await?;
        info!(cid = %pinned.cid, doc = %name, "Pinned JSON");
        Ok(pinned)
    }

    fn gateway_url(&self, cid: &str) -> String {
        ipfs_url(&self.config.gateway, cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PinataClient {
        let mut config = PinataConfig::new("test-jwt");
        config.api_url = server.uri();
        config.gateway = "https://gw.test".to_string();
        PinataClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_pin_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pinning/pinFileToIPFS"))
            .and(header("authorization", "Bearer test-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IpfsHash": "bafkreistory",
                "PinSize": 60,
                "Timestamp": "2026-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pinned = client(&server)
            .pin_file(FileUpload {
                file_name: "story.txt".into(),
                mime_type: "text/plain".into(),
                bytes: b"Once upon a time".to_vec(),
            })
            .await
            .unwrap();

        assert_eq!(pinned.cid, "bafkreistory");
        assert_eq!(pinned.size, 60);
        assert_eq!(pinned.url, "https://gw.test/ipfs/bafkreistory");
    }

    #[tokio::test]
    async fn test_pin_json_sends_content_and_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pinning/pinJSONToIPFS"))
            .and(body_partial_json(json!({
                "pinataContent": { "title": "T" },
                "pinataMetadata": { "name": "ip-metadata.json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IpfsHash": "bafkreimeta",
                "PinSize": 120
            })))
            .mount(&server)
            .await;

        let pinned = client(&server)
            .pin_json("ip-metadata.json", &json!({ "title": "T" }))
            .await
            .unwrap();
        assert_eq!(pinned.cid, "bafkreimeta");
    }

    #[tokio::test]
    async fn test_http_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad jwt"))
            .mount(&server)
            .await;

        let err = client(&server)
            .pin_json("x.json", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Upstream(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_empty_hash_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "IpfsHash": "" })))
            .mount(&server)
            .await;

        let err = client(&server)
            .pin_json("x.json", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no content identifier"));
    }
}
