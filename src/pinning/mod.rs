//! IPFS pinning
//!
//! Content goes to IPFS through a pinning service and comes back as a CID.
//! [`PinataClient`] talks to Pinata; [`LocalPinStore`] computes the same
//! kind of CIDv1 locally and keeps the bytes on disk (dev mode, tests).

pub mod local;
pub mod pinata;

use async_trait::async_trait;
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use sha2::{Digest, Sha256};

use crate::error::FolioError;

pub use local::LocalPinStore;
pub use pinata::{PinataClient, PinataConfig};

/// Multicodec for raw bytes
pub const RAW_CODEC: u64 = 0x55;

/// Bytes to pin, with the name and mime type the pinning service records
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A pinned object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedContent {
    pub cid: String,
    pub size: u64,
    /// Gateway URL written into metadata
    pub url: String,
}

#[async_trait]
pub trait ContentPinner: Send + Sync {
    async fn pin_file(&self, upload: FileUpload) -> Result<PinnedContent, FolioError>;

    async fn pin_json(&self, name: &str, doc: &serde_json::Value) -> Result<PinnedContent, FolioError>;

    /// Public URL for a CID pinned by this service
    fn gateway_url(&self, cid: &str) -> String;
}

/// CIDv1 (raw codec, sha2-256) for a byte payload
pub fn compute_cid(data: &[u8]) -> String {
    let hash = Code::Sha2_256.digest(data);
    Cid::new_v1(RAW_CODEC, hash).to_string()
}

/// `0x`-prefixed sha256 hex digest, the form metadata hashes take on chain
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Join a gateway base and a CID into `{base}/ipfs/{cid}`
pub fn ipfs_url(gateway: &str, cid: &str) -> String {
    format!("{}/ipfs/{}", gateway.trim_end_matches('/'), cid)
}

/// Reject empty identifiers coming back from a pinning service
pub(crate) fn require_cid(cid: String, what: &str) -> Result<String, FolioError> {
    if cid.trim().is_empty() {
        return Err(FolioError::Upstream(format!(
            "Pinning service returned no content identifier for {}",
            what
        )));
    }
    Ok(cid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_compute_cid_is_deterministic_v1_raw() {
        let a = compute_cid(b"Hello, Folio!");
        let b = compute_cid(b"Hello, Folio!");
        assert_eq!(a, b);
        assert!(a.starts_with("bafkrei"));

        let parsed = Cid::from_str(&a).unwrap();
        assert_eq!(parsed.codec(), RAW_CODEC);
        assert_eq!(parsed.hash().digest().len(), 32);
        assert_ne!(a, compute_cid(b"Hello, Folio?"));
    }

    #[test]
    fn test_sha256_hex() {
        // SHA256 of "hello world"
        assert_eq!(
            sha256_hex(b"hello world"),
            "0xb94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_ipfs_url() {
        assert_eq!(ipfs_url("https://gw.example/", "bafy1"), "https://gw.example/ipfs/bafy1");
        assert_eq!(ipfs_url("https://gw.example", "bafy1"), "https://gw.example/ipfs/bafy1");
    }

    #[test]
    fn test_require_cid() {
        assert!(require_cid("   ".into(), "cover image").is_err());
        assert_eq!(require_cid("bafy".into(), "x").unwrap(), "bafy");
    }
}
