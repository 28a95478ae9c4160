//! Wire types shared by the gateway and its clients
//!
//! Both ends of every registration call speak [`ApiResponse`], a tagged
//! union that serializes to the flat `success` shape:
//!
//! ```json
//! { "success": true, "ipId": "0x…", "txHash": "0x…", ... }
//! { "success": false, "kind": "validation", "error": "Title is required" }
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ErrorKind, FolioError};
use crate::license::LicenseType;

/// Result of a gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Ok(T),
    Err { kind: ErrorKind, message: String },
}

impl<T> ApiResponse<T> {
    pub fn from_error(err: &FolioError) -> Self {
        ApiResponse::Err {
            kind: err.kind(),
            message: err.public_message(),
        }
    }

    pub fn into_result(self) -> Result<T, FolioError> {
        match self {
            ApiResponse::Ok(data) => Ok(data),
            ApiResponse::Err { kind, message } => Err(FolioError::Remote { kind, message }),
        }
    }
}

/// Error body used by every failing gateway route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub kind: ErrorKind,
    pub error: String,
}

#[derive(Serialize)]
struct SuccessBody<'a, T> {
    success: bool,
    #[serde(flatten)]
    data: &'a T,
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ApiResponse::Ok(data) => SuccessBody { success: true, data }.serialize(serializer),
            ApiResponse::Err { kind, message } => ErrorBody {
                success: false,
                kind: *kind,
                error: message.clone(),
            }
            .serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ApiResponse<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = serde_json::Value::deserialize(deserializer)?;
        let success = value
            .get("success")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| D::Error::missing_field("success"))?;

        if success {
            T::deserialize(value).map(ApiResponse::Ok).map_err(D::Error::custom)
        } else {
            let message = value
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error")
                .to_string();
            let kind = value
                .get("kind")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or(ErrorKind::Internal);
            Ok(ApiResponse::Err { kind, message })
        }
    }
}

/// POST /api/register-story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStoryRequest {
    pub title: String,
    pub description: String,
    #[serde(rename = "contentCID")]
    pub content_cid: String,
    #[serde(rename = "imageCID")]
    pub image_cid: String,
    pub author: String,
    pub license_types: Vec<LicenseType>,
    /// Defaults to text when omitted
    #[serde(default)]
    pub content_type: crate::models::ContentType,
}

/// POST /api/register-derivative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDerivativeRequest {
    pub title: String,
    pub description: String,
    #[serde(rename = "contentCID")]
    pub content_cid: String,
    #[serde(rename = "imageCID")]
    pub image_cid: String,
    pub author: String,
    pub parent_ip_id: String,
    pub parent_license_terms_id: String,
    pub derivative_license_type: LicenseType,
    #[serde(default)]
    pub content_type: crate::models::ContentType,
}

/// Denormalized story record echoed back after registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryData {
    pub title: String,
    pub description: String,
    pub author: String,
    #[serde(rename = "contentCID")]
    pub content_cid: String,
    #[serde(rename = "imageCID")]
    pub image_cid: String,
    pub content_url: String,
    pub image_url: String,
    pub license_types: Vec<LicenseType>,
    #[serde(rename = "ipMetadataURI")]
    pub ip_metadata_uri: String,
    #[serde(rename = "nftMetadataURI")]
    pub nft_metadata_uri: String,
    pub created_at: i64,
}

/// Successful registration payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    pub ip_id: String,
    pub tx_hash: String,
    pub license_terms_ids: Vec<String>,
    pub token_id: String,
    pub story_data: StoryData,
    pub explorer_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ip_id: Option<String>,
}

/// GET /api/stories/{ipId}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySummary {
    pub children_count: u64,
    pub parent_count: u64,
    pub ip_id: String,
    pub title: String,
    pub description: String,
}

/// One license attached to an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub license_terms_id: String,
    pub license_template: String,
    /// Known flavor for this terms id, if any
    pub license_type: Option<LicenseType>,
    pub enabled: bool,
}

/// GET /api/licenses/{ipId}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSummary {
    pub has_licenses: bool,
    pub is_commercial_use_only: bool,
    pub allows_remix: bool,
    pub license_count: usize,
    pub licenses: Vec<LicenseInfo>,
}

/// GET /api/stories/{ipId}/licenses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryLicenses {
    pub ip_id: String,
    pub license_types: Vec<LicenseType>,
}

/// Something that can register stories: the gateway over HTTP, or the
/// registration service in-process.
#[async_trait]
pub trait RegistrationClient: Send + Sync {
    async fn register_story(&self, req: &RegisterStoryRequest) -> Result<RegistrationData, FolioError>;

    async fn register_derivative(
        &self,
        req: &RegisterDerivativeRequest,
    ) -> Result<RegistrationData, FolioError>;
}

/// True for an EVM address: `0x` followed by 40 hex digits
pub fn is_evm_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StorySummary {
        StorySummary {
            children_count: 2,
            parent_count: 0,
            ip_id: "0x1111111111111111111111111111111111111111".into(),
            title: "The Lantern".into(),
            description: "A tale".into(),
        }
    }

    #[test]
    fn test_ok_serializes_flat() {
        let v = serde_json::to_value(ApiResponse::Ok(sample())).unwrap();
        assert_eq!(v["success"], json!(true));
        assert_eq!(v["childrenCount"], json!(2));
        assert_eq!(v["title"], json!("The Lantern"));
    }

    #[test]
    fn test_err_serializes_with_kind() {
        let resp: ApiResponse<StorySummary> = ApiResponse::Err {
            kind: ErrorKind::Validation,
            message: "Title is required".into(),
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v, json!({"success": false, "kind": "validation", "error": "Title is required"}));

        let back: ApiResponse<StorySummary> = serde_json::from_value(v).unwrap();
        assert_eq!(back, resp);
    }

    #[test]
    fn test_failure_without_kind_decodes_as_internal() {
        let back: ApiResponse<StorySummary> =
            serde_json::from_value(json!({"success": false, "error": "boom"})).unwrap();
        match back {
            ApiResponse::Err { kind, message } => {
                assert_eq!(kind, ErrorKind::Internal);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_success_is_rejected() {
        let r: Result<ApiResponse<StorySummary>, _> = serde_json::from_value(json!({"title": "x"}));
        assert!(r.is_err());
    }

    #[test]
    fn test_register_request_field_names() {
        let body = json!({
            "title": "T",
            "description": "twelve chars",
            "contentCID": "bafkreicontent",
            "imageCID": "bafkreiimage",
            "author": "0xabc",
            "licenseTypes": ["non-commercial"]
        });
        let req: RegisterStoryRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.content_cid, "bafkreicontent");
        assert_eq!(req.license_types, vec![LicenseType::NonCommercial]);
        assert_eq!(req.content_type, crate::models::ContentType::Text);
    }

    #[test]
    fn test_is_evm_address() {
        assert!(is_evm_address("0x1111111111111111111111111111111111111111"));
        assert!(is_evm_address("0xAbCdEf1111111111111111111111111111111111"));
        assert!(!is_evm_address("1111111111111111111111111111111111111111"));
        assert!(!is_evm_address("0x1234"));
        assert!(!is_evm_address("0xzz11111111111111111111111111111111111111"));
    }
}
