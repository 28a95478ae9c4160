//! IP registration SDK seam
//!
//! [`RelayRegistrar`] forwards registrations to an SDK sidecar that holds the
//! chain connection. Requests are signed with an HMAC of the body keyed by
//! the wallet key. [`DryRunRegistrar`] fabricates deterministic ids for dev
//! mode.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::config::{Network, WalletKey};
use crate::error::FolioError;
use crate::license::LicenseType;
use crate::pinning::sha256_hex;

pub const SIGNATURE_HEADER: &str = "X-Folio-Signature";

/// A pinned metadata document and the hash of its bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRef {
    pub uri: String,
    pub hash: String,
}

/// One set of license terms to attach at mint time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseTermsSpec {
    pub license_type: LicenseType,
    pub terms_id: String,
    pub commercial_use: bool,
    pub derivatives_allowed: bool,
    pub commercial_rev_share: u8,
}

impl From<LicenseType> for LicenseTermsSpec {
    fn from(license: LicenseType) -> Self {
        let d = license.descriptor();
        Self {
            license_type: license,
            terms_id: d.terms_id.to_string(),
            commercial_use: d.commercial,
            derivatives_allowed: d.allows_derivatives,
            commercial_rev_share: d.revenue_share,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintAndRegister {
    pub spg_nft_contract: String,
    pub recipient: String,
    pub license_template: String,
    pub license_terms: Vec<LicenseTermsSpec>,
    pub ip_metadata: MetadataRef,
    pub nft_metadata: MetadataRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintDerivative {
    pub spg_nft_contract: String,
    pub recipient: String,
    pub license_template: String,
    pub parent_ip_id: String,
    pub parent_license_terms_id: String,
    pub ip_metadata: MetadataRef,
    pub nft_metadata: MetadataRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredIp {
    pub ip_id: String,
    pub tx_hash: String,
    pub token_id: String,
    #[serde(default)]
    pub license_terms_ids: Vec<String>,
}

#[async_trait]
pub trait IpRegistrar: Send + Sync {
    /// Mint a token from the collection and register it as an IP asset with
    /// the given license terms attached
    async fn mint_and_register(&self, req: &MintAndRegister) -> Result<RegisteredIp, FolioError>;

    /// Mint and register an IP asset as a derivative of `parent_ip_id`
    async fn mint_derivative(&self, req: &MintDerivative) -> Result<RegisteredIp, FolioError>;
}

pub struct RelayRegistrar {
    http: reqwest::Client,
    base_url: String,
    key: WalletKey,
    network: Network,
}

impl RelayRegistrar {
    pub fn new(base_url: &str, key: WalletKey, network: Network, timeout: Duration) -> Result<Self, FolioError> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|e| FolioError::Validation(format!("Invalid registrar URL: {}", e)))?;

        // Plain http is only acceptable on the local machine
        let loopback = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("[::1]"));
        if url.scheme() != "https" && !(url.scheme() == "http" && loopback) {
            return Err(FolioError::Validation(format!(
                "Registrar URL must use https unless it is on localhost: {}",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FolioError::Internal(format!("building HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
            network,
        })
    }

    async fn call<B: Serialize>(&self, path: &str, body: &B) -> Result<RegisteredIp, FolioError> {
        let payload = serde_json::to_vec(body)?;
        let signature = self.key.sign(&payload)?;

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header("X-Chain-Id", self.network.chain_id().to_string())
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(path, status = %status, "Registrar rejected request");
            return Err(FolioError::Upstream(format!(
                "Registration failed: HTTP {} {}",
                status,
                body.trim()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| FolioError::Upstream(format!("Invalid registrar response: {}", e)))
    }
}

#[async_trait]
impl IpRegistrar for RelayRegistrar {
    async fn mint_and_register(&self, req: &MintAndRegister) -> Result<RegisteredIp, FolioError> {
        self.call("/ip/mint-and-register", req).await
    }

    async fn mint_derivative(&self, req: &MintDerivative) -> Result<RegisteredIp, FolioError> {
        self.call("/ip/mint-derivative", req).await
    }
}

/// Registers nothing. The IP id is derived from the IP metadata hash, so a
/// given metadata document always maps to the same id. Registration service
/// metadata carries its creation time, so repeated submissions of one story
/// still get distinct ids.
#[derive(Default)]
pub struct DryRunRegistrar {
    next_token: AtomicU64,
}

impl DryRunRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    fn fabricate(&self, ip_metadata: &MetadataRef, terms: Vec<String>) -> RegisteredIp {
        let digest = sha256_hex(ip_metadata.hash.as_bytes());
        let ip_id = format!("0x{}", &digest[2..42]);
        let tx_hash = sha256_hex(format!("tx:{}", ip_metadata.hash).as_bytes());
        let token_id = (self.next_token.fetch_add(1, Ordering::Relaxed) + 1).to_string();

        info!(ip_id = %ip_id, "Dry-run registration");
        RegisteredIp {
            ip_id,
            tx_hash,
            token_id,
            license_terms_ids: terms,
        }
    }
}

#[async_trait]
impl IpRegistrar for DryRunRegistrar {
    async fn mint_and_register(&self, req: &MintAndRegister) -> Result<RegisteredIp, FolioError> {
        let terms = req.license_terms.iter().map(|t| t.terms_id.clone()).collect();
        Ok(self.fabricate(&req.ip_metadata, terms))
    }

    async fn mint_derivative(&self, req: &MintDerivative) -> Result<RegisteredIp, FolioError> {
        Ok(self.fabricate(&req.ip_metadata, vec![req.parent_license_terms_id.clone()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::is_evm_address;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key() -> WalletKey {
        WalletKey::parse(&"ab".repeat(32)).unwrap()
    }

    fn meta(hash: &str) -> MetadataRef {
        MetadataRef {
            uri: "https://gw/ipfs/bafkrei".into(),
            hash: hash.into(),
        }
    }

    fn mint() -> MintAndRegister {
        MintAndRegister {
            spg_nft_contract: "0x1111111111111111111111111111111111111111".into(),
            recipient: "0xauthor".into(),
            license_template: "0x2222222222222222222222222222222222222222".into(),
            license_terms: vec![LicenseType::NonCommercial.into()],
            ip_metadata: meta("0xaa"),
            nft_metadata: meta("0xbb"),
        }
    }

    #[test]
    fn test_terms_spec_from_descriptor() {
        let spec = LicenseTermsSpec::from(LicenseType::CommercialRemix);
        assert_eq!(spec.terms_id, "3");
        assert_eq!(spec.commercial_rev_share, 5);
        assert!(spec.derivatives_allowed);
    }

    #[test]
    fn test_relay_refuses_remote_plain_http() {
        let err = RelayRegistrar::new("http://registrar.example.com", key(), Network::Aeneid, Duration::from_secs(1));
        assert!(err.is_err());
        assert!(RelayRegistrar::new("http://127.0.0.1:9000", key(), Network::Aeneid, Duration::from_secs(1)).is_ok());
        assert!(RelayRegistrar::new("https://registrar.example.com", key(), Network::Aeneid, Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_relay_signs_body() {
        let server = MockServer::start().await;
        let body = serde_json::to_vec(&mint()).unwrap();
        let expected = key().sign(&body).unwrap();

        Mock::given(method("POST"))
            .and(path("/ip/mint-and-register"))
            .and(header(SIGNATURE_HEADER, expected.as_str()))
            .and(header("X-Chain-Id", "1315"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ipId": "0xabc",
                "txHash": "0xtx",
                "tokenId": "9",
                "licenseTermsIds": ["1"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let relay = RelayRegistrar::new(&server.uri(), key(), Network::Aeneid, Duration::from_secs(5)).unwrap();
        let registered = relay.mint_and_register(&mint()).await.unwrap();
        assert_eq!(registered.ip_id, "0xabc");
        assert_eq!(registered.license_terms_ids, vec!["1"]);
    }

    #[tokio::test]
    async fn test_relay_failure_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists(SIGNATURE_HEADER))
            .respond_with(ResponseTemplate::new(500).set_body_string("reverted"))
            .mount(&server)
            .await;

        let relay = RelayRegistrar::new(&server.uri(), key(), Network::Aeneid, Duration::from_secs(5)).unwrap();
        let err = relay.mint_and_register(&mint()).await.unwrap_err();
        assert!(err.to_string().contains("reverted"));
    }

    #[tokio::test]
    async fn test_dry_run_ids_follow_metadata_hash() {
        let dry = DryRunRegistrar::new();
        let a = dry.mint_and_register(&mint()).await.unwrap();
        let b = dry.mint_and_register(&mint()).await.unwrap();
        assert_eq!(a.ip_id, b.ip_id);
        assert!(is_evm_address(&a.ip_id));
        assert_ne!(a.token_id, b.token_id);
        assert_eq!(a.license_terms_ids, vec!["1"]);

        let mut later = mint();
        later.ip_metadata.hash = sha256_hex(b"metadata with a later createdAt");
        let c = dry.mint_and_register(&later).await.unwrap();
        assert_ne!(c.ip_id, a.ip_id);
    }
}
