//! Shared fakes for the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use folio::api::{LicenseInfo, StorySummary};
use folio::error::FolioError;
use folio::license::LicenseType;
use folio::pinning::{compute_cid, ipfs_url, ContentPinner, FileUpload, PinnedContent};
use folio::server::registrar::{MintAndRegister, MintDerivative, RegisteredIp};
use folio::server::{AppState, AssetSource, Catalog, IpRegistrar, Network, RegistrationService};

pub const GATEWAY: &str = "https://gw.test";
pub const SPG_CONTRACT: &str = "0x4444444444444444444444444444444444444444";
pub const LICENSE_TEMPLATE: &str = "0x2E896b0b2Fdb7457499B56AAaA4AE55BCB4Cd316";
pub const REGISTERED_IP: &str = "0x7777777777777777777777777777777777777777";

// =============================================================================
// Pinning
// =============================================================================

/// Pins nothing; counts uploads and hands back real CIDs
#[derive(Default)]
pub struct CountingPinner {
    pub files: Mutex<Vec<String>>,
    pub json_docs: Mutex<Vec<serde_json::Value>>,
}

impl CountingPinner {
    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn json_count(&self) -> usize {
        self.json_docs.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentPinner for CountingPinner {
    async fn pin_file(&self, upload: FileUpload) -> Result<PinnedContent, FolioError> {
        self.files.lock().unwrap().push(upload.file_name.clone());
        let cid = compute_cid(&upload.bytes);
        Ok(PinnedContent {
            url: ipfs_url(GATEWAY, &cid),
            size: upload.bytes.len() as u64,
            cid,
        })
    }

    async fn pin_json(&self, _name: &str, doc: &serde_json::Value) -> Result<PinnedContent, FolioError> {
        self.json_docs.lock().unwrap().push(doc.clone());
        let bytes = serde_json::to_vec(doc)?;
        let cid = compute_cid(&bytes);
        Ok(PinnedContent {
            url: ipfs_url(GATEWAY, &cid),
            size: bytes.len() as u64,
            cid,
        })
    }

    fn gateway_url(&self, cid: &str) -> String {
        ipfs_url(GATEWAY, cid)
    }
}

// =============================================================================
// Registrar
// =============================================================================

/// Records every SDK call and answers with a fixed IP id
#[derive(Default)]
pub struct RecordingRegistrar {
    pub mints: Mutex<Vec<MintAndRegister>>,
    pub derivatives: Mutex<Vec<MintDerivative>>,
}

impl RecordingRegistrar {
    pub fn calls(&self) -> usize {
        self.mints.lock().unwrap().len() + self.derivatives.lock().unwrap().len()
    }
}

#[async_trait]
impl IpRegistrar for RecordingRegistrar {
    async fn mint_and_register(&self, req: &MintAndRegister) -> Result<RegisteredIp, FolioError> {
        self.mints.lock().unwrap().push(req.clone());
        Ok(RegisteredIp {
            ip_id: REGISTERED_IP.to_string(),
            tx_hash: "0xfeed".to_string(),
            token_id: "1".to_string(),
            license_terms_ids: req.license_terms.iter().map(|t| t.terms_id.clone()).collect(),
        })
    }

    async fn mint_derivative(&self, req: &MintDerivative) -> Result<RegisteredIp, FolioError> {
        self.derivatives.lock().unwrap().push(req.clone());
        Ok(RegisteredIp {
            ip_id: REGISTERED_IP.to_string(),
            tx_hash: "0xfeed".to_string(),
            token_id: "2".to_string(),
            license_terms_ids: vec![req.parent_license_terms_id.clone()],
        })
    }
}

// =============================================================================
// Asset API
// =============================================================================

#[derive(Default)]
pub struct FakeAssets {
    pub stories: HashMap<String, StorySummary>,
    pub licenses: HashMap<String, Vec<LicenseInfo>>,
    pub calls: AtomicUsize,
}

impl FakeAssets {
    pub fn with_story(mut self, story: StorySummary) -> Self {
        self.stories.insert(story.ip_id.clone(), story);
        self
    }

    pub fn with_licenses(mut self, ip_id: &str, terms: &[(&str, bool)]) -> Self {
        let licenses = terms
            .iter()
            .map(|(terms_id, enabled)| LicenseInfo {
                license_terms_id: terms_id.to_string(),
                license_template: LICENSE_TEMPLATE.to_string(),
                license_type: LicenseType::from_terms_id(terms_id),
                enabled: *enabled,
            })
            .collect();
        self.licenses.insert(ip_id.to_string(), licenses);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetSource for FakeAssets {
    async fn story(&self, ip_id: &str) -> Result<Option<StorySummary>, FolioError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.stories.get(ip_id).cloned())
    }

    async fn licenses(&self, ip_id: &str) -> Result<Option<Vec<LicenseInfo>>, FolioError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.licenses.get(ip_id).cloned())
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub fn registration(pinner: Arc<CountingPinner>, registrar: Arc<RecordingRegistrar>) -> RegistrationService {
    RegistrationService::new(
        Some(pinner as Arc<dyn ContentPinner>),
        Some(registrar as Arc<dyn IpRegistrar>),
        Network::Aeneid,
        Some(SPG_CONTRACT.to_string()),
        LICENSE_TEMPLATE,
    )
}

pub fn app_state(assets: Option<Arc<FakeAssets>>, registration: RegistrationService) -> AppState {
    AppState::new(
        assets.map(|a| a as Arc<dyn AssetSource>),
        Catalog::bundled().unwrap(),
        registration,
        Duration::from_secs(300),
        Duration::from_secs(900),
    )
}
