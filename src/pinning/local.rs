//! Local pin store
//!
//! Computes IPFS-compatible CIDs and writes pinned bytes under a directory,
//! one file per CID. Used in dev mode when no Pinata credential is set.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::{compute_cid, ipfs_url, ContentPinner, FileUpload, PinnedContent};
use crate::error::FolioError;

pub struct LocalPinStore {
    root_dir: PathBuf,
    gateway: String,
}

impl LocalPinStore {
    pub async fn new<P: AsRef<Path>>(root_dir: P, gateway: impl Into<String>) -> Result<Self, FolioError> {
        let root_dir = root_dir.as_ref().to_path_buf();
        fs::create_dir_all(&root_dir).await?;

        info!(path = %root_dir.display(), "Initialized local pin store");

        Ok(Self {
            root_dir,
            gateway: gateway.into(),
        })
    }

    fn pin_path(&self, cid: &str) -> PathBuf {
        self.root_dir.join(cid)
    }

    async fn store(&self, bytes: &[u8]) -> Result<PinnedContent, FolioError> {
        let cid = compute_cid(bytes);
        let path = self.pin_path(&cid);

        if fs::metadata(&path).await.is_ok() {
            debug!(cid = %cid, "Already pinned");
        } else {
            fs::write(&path, bytes).await?;
        }

        Ok(PinnedContent {
            url: ipfs_url(&self.gateway, &cid),
            size: bytes.len() as u64,
            cid,
        })
    }

    /// Read back pinned bytes
    pub async fn get(&self, cid: &str) -> Result<Vec<u8>, FolioError> {
        match fs::read(self.pin_path(cid)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FolioError::NotFound(format!("No pin for {}", cid)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ContentPinner for LocalPinStore {
    async fn pin_file(&self, upload: FileUpload) -> Result<PinnedContent, FolioError> {
        let pinned = self.store(&upload.bytes).await?;
        info!(cid = %pinned.cid, file = %upload.file_name, "Pinned file locally");
        Ok(pinned)
    }

    async fn pin_json(&self, name: &str, doc: &serde_json::Value) -> Result<PinnedContent, FolioError> {
        let bytes = serde_json::to_vec(doc)?;
        let pinned = self.store(&bytes).await?;
        info!(cid = %pinned.cid, doc = %name, "Pinned JSON locally");
        Ok(pinned)
    }

    fn gateway_url(&self, cid: &str) -> String {
        ipfs_url(&self.gateway, cid)
    }
}
