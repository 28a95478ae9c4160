//! Server-side registration: metadata, pinning and the registrar call
//!
//! Requests are validated before anything leaves the process, so a bad
//! request never costs a pin or a transaction.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::config::Network;
use super::registrar::{IpRegistrar, LicenseTermsSpec, MetadataRef, MintAndRegister, MintDerivative, RegisteredIp};
use crate::api::{
    is_evm_address, RegisterDerivativeRequest, RegisterStoryRequest, RegistrationClient, RegistrationData, StoryData,
};
use crate::error::FolioError;
use crate::license::{check_derivative, LicenseType};
use crate::models::{now_millis, ContentType};
use crate::pinning::{sha256_hex, ContentPinner};

/// Fields shared by both registration requests
struct StoryFields<'a> {
    title: &'a str,
    description: &'a str,
    content_cid: &'a str,
    image_cid: &'a str,
    author: &'a str,
    content_type: ContentType,
}

impl<'a> From<&'a RegisterStoryRequest> for StoryFields<'a> {
    fn from(r: &'a RegisterStoryRequest) -> Self {
        Self {
            title: r.title.trim(),
            description: r.description.trim(),
            content_cid: r.content_cid.trim(),
            image_cid: r.image_cid.trim(),
            author: r.author.trim(),
            content_type: r.content_type,
        }
    }
}

impl<'a> From<&'a RegisterDerivativeRequest> for StoryFields<'a> {
    fn from(r: &'a RegisterDerivativeRequest) -> Self {
        Self {
            title: r.title.trim(),
            description: r.description.trim(),
            content_cid: r.content_cid.trim(),
            image_cid: r.image_cid.trim(),
            author: r.author.trim(),
            content_type: r.content_type,
        }
    }
}

impl StoryFields<'_> {
    fn validate(&self) -> Result<(), FolioError> {
        let required = [
            (self.title, "Title is required"),
            (self.description, "Description is required"),
            (self.content_cid, "Content CID is required"),
            (self.image_cid, "Image CID is required"),
            (self.author, "Author is required"),
        ];
        for (value, message) in required {
            if value.is_empty() {
                return Err(FolioError::Validation(message.to_string()));
            }
        }
        if self.title.chars().count() > 100 {
            return Err(FolioError::Validation("Title must be at most 100 characters".to_string()));
        }
        Ok(())
    }
}

/// Pinned metadata for one registration
struct PinnedMetadata {
    ip: MetadataRef,
    nft: MetadataRef,
    content_url: String,
    image_url: String,
}

pub struct RegistrationService {
    pinner: Option<Arc<dyn ContentPinner>>,
    registrar: Option<Arc<dyn IpRegistrar>>,
    network: Network,
    spg_nft_contract: Option<String>,
    license_template: String,
}

impl RegistrationService {
    pub fn new(
        pinner: Option<Arc<dyn ContentPinner>>,
        registrar: Option<Arc<dyn IpRegistrar>>,
        network: Network,
        spg_nft_contract: Option<String>,
        license_template: impl Into<String>,
    ) -> Self {
        Self {
            pinner,
            registrar,
            network,
            spg_nft_contract,
            license_template: license_template.into(),
        }
    }

    fn pinner(&self) -> Result<&Arc<dyn ContentPinner>, FolioError> {
        self.pinner.as_ref().ok_or(FolioError::MissingConfig("PINATA_JWT"))
    }

    fn registrar(&self) -> Result<&Arc<dyn IpRegistrar>, FolioError> {
        self.registrar.as_ref().ok_or(FolioError::MissingConfig("REGISTRAR_URL / WALLET_PRIVATE_KEY"))
    }

    fn spg_nft_contract(&self) -> Result<&str, FolioError> {
        self.spg_nft_contract
            .as_deref()
            .ok_or(FolioError::MissingConfig("SPG_NFT_CONTRACT"))
    }

    /// Build, pin and hash the IP and NFT metadata documents
    async fn pin_metadata(
        &self,
        story: &StoryFields<'_>,
        licenses: &[LicenseType],
        parent_ip_id: Option<&str>,
    ) -> Result<PinnedMetadata, FolioError> {
        let pinner = self.pinner()?;

        let content_url = pinner.gateway_url(story.content_cid);
        let image_url = pinner.gateway_url(story.image_cid);
        let content_hash = sha256_hex(content_url.as_bytes());
        let image_hash = sha256_hex(image_url.as_bytes());

        let mut ip_metadata = json!({
            "title": story.title,
            "description": story.description,
            "createdAt": chrono::Utc::now().to_rfc3339(),
            "creators": [{
                "name": story.author,
                "address": story.author,
                "contributionPercent": 100,
            }],
            "image": image_url,
            "imageHash": image_hash,
            "mediaUrl": content_url,
            "mediaHash": content_hash,
            "mediaType": story.content_type.mime(),
            "tags": licenses.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
        });
        if let (Some(parent), Value::Object(map)) = (parent_ip_id, &mut ip_metadata) {
            map.insert("parentIpId".to_string(), json!(parent));
        }

        let nft_metadata = json!({
            "name": story.title,
            "description": story.description,
            "image": image_url,
            "attributes": [
                { "trait_type": "Author", "value": story.author },
                { "trait_type": "Content Type", "value": story.content_type.mime() },
            ],
        });

        let ip_pin = pinner.pin_json(&format!("{} - IP metadata", story.title), &ip_metadata).await?;
        let nft_pin = pinner.pin_json(&format!("{} - NFT metadata", story.title), &nft_metadata).await?;

        Ok(PinnedMetadata {
            ip: MetadataRef {
                uri: ip_pin.url,
                hash: sha256_hex(&serde_json::to_vec(&ip_metadata)?),
            },
            nft: MetadataRef {
                uri: nft_pin.url,
                hash: sha256_hex(&serde_json::to_vec(&nft_metadata)?),
            },
            content_url,
            image_url,
        })
    }

    fn registration_data(
        &self,
        story: &StoryFields<'_>,
        licenses: Vec<LicenseType>,
        metadata: PinnedMetadata,
        registered: RegisteredIp,
        parent_ip_id: Option<String>,
    ) -> Result<RegistrationData, FolioError> {
        if registered.ip_id.trim().is_empty() {
            return Err(FolioError::Upstream("Registrar returned no IP id".to_string()));
        }

        Ok(RegistrationData {
            explorer_url: self.network.ip_asset_url(&registered.ip_id),
            ip_id: registered.ip_id,
            tx_hash: registered.tx_hash,
            license_terms_ids: registered.license_terms_ids,
            token_id: registered.token_id,
            story_data: StoryData {
                title: story.title.to_string(),
                description: story.description.to_string(),
                author: story.author.to_string(),
                content_cid: story.content_cid.to_string(),
                image_cid: story.image_cid.to_string(),
                content_url: metadata.content_url,
                image_url: metadata.image_url,
                license_types: licenses,
                ip_metadata_uri: metadata.ip.uri,
                nft_metadata_uri: metadata.nft.uri,
                created_at: now_millis(),
            },
            parent_ip_id,
        })
    }

    pub async fn register_story(&self, req: &RegisterStoryRequest) -> Result<RegistrationData, FolioError> {
        let story = StoryFields::from(req);
        story.validate()?;
        validate_license_set(&req.license_types)?;

        let registrar = self.registrar()?;
        let spg_nft_contract = self.spg_nft_contract()?.to_string();

        let metadata = self.pin_metadata(&story, &req.license_types, None).await?;
        let registered = registrar
            .mint_and_register(&MintAndRegister {
                spg_nft_contract,
                recipient: story.author.to_string(),
                license_template: self.license_template.clone(),
                license_terms: req.license_types.iter().copied().map(LicenseTermsSpec::from).collect(),
                ip_metadata: metadata.ip.clone(),
                nft_metadata: metadata.nft.clone(),
            })
            .await?;

        let data = self.registration_data(&story, req.license_types.clone(), metadata, registered, None)?;
        info!(ip_id = %data.ip_id, tx_hash = %data.tx_hash, "Registered IP asset");
        Ok(data)
    }

    pub async fn register_derivative(&self, req: &RegisterDerivativeRequest) -> Result<RegistrationData, FolioError> {
        let story = StoryFields::from(req);
        story.validate()?;

        let parent_ip_id = req.parent_ip_id.trim();
        if !is_evm_address(parent_ip_id) {
            return Err(FolioError::Validation(format!("Invalid parent IP id: {}", parent_ip_id)));
        }
        let license = check_derivative(req.parent_license_terms_id.trim(), req.derivative_license_type)
            .map_err(FolioError::Validation)?;

        let registrar = self.registrar()?;
        let spg_nft_contract = self.spg_nft_contract()?.to_string();

        let metadata = self.pin_metadata(&story, &[license], Some(parent_ip_id)).await?;
        let registered = registrar
            .mint_derivative(&MintDerivative {
                spg_nft_contract,
                recipient: story.author.to_string(),
                license_template: self.license_template.clone(),
                parent_ip_id: parent_ip_id.to_string(),
                parent_license_terms_id: license.terms_id().to_string(),
                ip_metadata: metadata.ip.clone(),
                nft_metadata: metadata.nft.clone(),
            })
            .await?;

        let data = self.registration_data(&story, vec![license], metadata, registered, Some(parent_ip_id.to_string()))?;
        info!(ip_id = %data.ip_id, parent = %parent_ip_id, "Registered derivative IP asset");
        Ok(data)
    }
}

fn validate_license_set(licenses: &[LicenseType]) -> Result<(), FolioError> {
    if licenses.is_empty() {
        return Err(FolioError::Validation("At least one license type is required".to_string()));
    }
    let unique: HashSet<_> = licenses.iter().collect();
    if unique.len() != licenses.len() {
        return Err(FolioError::Validation("License types must not repeat".to_string()));
    }
    Ok(())
}

#[async_trait]
impl RegistrationClient for RegistrationService {
    async fn register_story(&self, req: &RegisterStoryRequest) -> Result<RegistrationData, FolioError> {
        RegistrationService::register_story(self, req).await
    }

    async fn register_derivative(&self, req: &RegisterDerivativeRequest) -> Result<RegistrationData, FolioError> {
        RegistrationService::register_derivative(self, req).await
    }
}
