//! Configuration for the Folio gateway
//!
//! CLI arguments and environment variables via clap. A `.env` file is
//! loaded by `main` before parsing.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::api::is_evm_address;
use crate::error::FolioError;

/// Programmable IP License template on Story
pub const DEFAULT_LICENSE_TEMPLATE: &str = "0x2E896b0b2Fdb7457499B56AAaA4AE55BCB4Cd316";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Network {
    Aeneid,
    Mainnet,
}

impl Network {
    /// Value of the asset API `X-Chain` header
    pub fn chain_name(self) -> &'static str {
        match self {
            Network::Aeneid => "story-aeneid",
            Network::Mainnet => "story",
        }
    }

    pub fn chain_id(self) -> u64 {
        match self {
            Network::Aeneid => 1315,
            Network::Mainnet => 1514,
        }
    }

    pub fn explorer_url(self) -> &'static str {
        match self {
            Network::Aeneid => "https://aeneid.explorer.story.foundation",
            Network::Mainnet => "https://explorer.story.foundation",
        }
    }

    pub fn ip_asset_url(self, ip_id: &str) -> String {
        format!("{}/ipa/{}", self.explorer_url(), ip_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Wallet private key. Only used to sign registrar requests; the key itself
/// never leaves the process.
///
/// The key is zeroized when dropped.
#[derive(Clone)]
pub struct WalletKey {
    key_bytes: [u8; 32],
}

impl WalletKey {
    /// Parse a 32-byte hex key, with or without `0x`
    pub fn parse(s: &str) -> Result<Self, String> {
        let hex_part = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let mut decoded = hex::decode(hex_part).map_err(|_| "WALLET_PRIVATE_KEY must be hex".to_string())?;
        if decoded.len() != 32 {
            decoded.zeroize();
            return Err("WALLET_PRIVATE_KEY must be 32 bytes".to_string());
        }

        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { key_bytes })
    }

    /// Hex HMAC-SHA256 of `payload`
    pub fn sign(&self, payload: &[u8]) -> Result<String, FolioError> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.key_bytes)
            .map_err(|e| FolioError::Internal(format!("signing key: {}", e)))?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for WalletKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WalletKey(<redacted>)")
    }
}

impl Drop for WalletKey {
    fn drop(&mut self) {
        self.key_bytes.zeroize();
    }
}

/// Folio gateway settings
#[derive(clap::Args, Debug, Clone)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Development mode: local pin store and dry-run registrar when
    /// credentials are missing
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Story network
    #[arg(long, env = "STORY_NETWORK", value_enum, default_value_t = Network::Aeneid)]
    pub network: Network,

    /// Story asset API base URL
    #[arg(long, env = "STORY_API_URL", default_value = "https://api.storyapis.com/api/v3")]
    pub story_api_url: String,

    #[arg(long, env = "STORY_API_KEY", hide_env_values = true)]
    pub story_api_key: Option<String>,

    /// Pinata JWT for IPFS pinning
    #[arg(long, env = "PINATA_JWT", hide_env_values = true)]
    pub pinata_jwt: Option<String>,

    #[arg(long, env = "PINATA_API_URL", default_value = crate::pinning::pinata::DEFAULT_API_URL)]
    pub pinata_api_url: String,

    /// Gateway used in metadata URLs
    #[arg(long, env = "IPFS_GATEWAY", default_value = crate::pinning::pinata::DEFAULT_GATEWAY)]
    pub ipfs_gateway: String,

    /// Registration SDK sidecar (e.g. "http://127.0.0.1:8545")
    #[arg(long, env = "REGISTRAR_URL")]
    pub registrar_url: Option<String>,

    /// Signs registrar requests
    #[arg(long, env = "WALLET_PRIVATE_KEY", hide_env_values = true, value_parser = WalletKey::parse)]
    pub wallet_private_key: Option<WalletKey>,

    /// SPG NFT collection the story tokens are minted from
    #[arg(long, env = "SPG_NFT_CONTRACT")]
    pub spg_nft_contract: Option<String>,

    #[arg(long, env = "LICENSE_TEMPLATE", default_value = DEFAULT_LICENSE_TEMPLATE)]
    pub license_template: String,

    /// Client store and local pins
    #[arg(long, env = "FOLIO_DATA_DIR", default_value = ".folio")]
    pub data_dir: PathBuf,

    #[arg(long, env = "STORY_CACHE_TTL_SECS", default_value = "300")]
    pub story_cache_ttl_secs: u64,

    #[arg(long, env = "LICENSE_CACHE_TTL_SECS", default_value = "900")]
    pub license_cache_ttl_secs: u64,

    /// Timeout for every remote call
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn story_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.story_cache_ttl_secs)
    }

    pub fn license_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.license_cache_ttl_secs)
    }

    pub fn pin_dir(&self) -> PathBuf {
        self.data_dir.join("pins")
    }

    /// Credentials that are not set. Each one turns the requests that need
    /// it into a configuration error.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.story_api_key.is_none() {
            missing.push("STORY_API_KEY");
        }
        if self.pinata_jwt.is_none() {
            missing.push("PINATA_JWT");
        }
        if self.registrar_url.is_none() {
            missing.push("REGISTRAR_URL");
        }
        if self.wallet_private_key.is_none() {
            missing.push("WALLET_PRIVATE_KEY");
        }
        if self.spg_nft_contract.is_none() {
            missing.push("SPG_NFT_CONTRACT");
        }
        missing
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref contract) = self.spg_nft_contract {
            if !is_evm_address(contract) {
                return Err(format!("SPG_NFT_CONTRACT is not a valid address: {}", contract));
            }
        }

        if !is_evm_address(&self.license_template) {
            return Err(format!("LICENSE_TEMPLATE is not a valid address: {}", self.license_template));
        }

        if self.story_cache_ttl_secs == 0 || self.license_cache_ttl_secs == 0 {
            return Err("Cache TTLs must be greater than zero".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        for (name, url) in [
            ("STORY_API_URL", Some(&self.story_api_url)),
            ("PINATA_API_URL", Some(&self.pinata_api_url)),
            ("IPFS_GATEWAY", Some(&self.ipfs_gateway)),
            ("REGISTRAR_URL", self.registrar_url.as_ref()),
        ] {
            if let Some(url) = url {
                if reqwest::Url::parse(url).is_err() {
                    return Err(format!("{} is not a valid URL: {}", name, url));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: Config,
    }

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["folio"];
        argv.extend_from_slice(args);
        TestCli::parse_from(argv).config
    }

    #[test]
    fn test_wallet_key_parse() {
        assert!(WalletKey::parse(KEY).is_ok());
        assert!(WalletKey::parse(KEY.trim_start_matches("0x")).is_ok());
        assert!(WalletKey::parse("0x1234").is_err());
        assert!(WalletKey::parse("not hex at all").is_err());
    }

    #[test]
    fn test_wallet_key_never_printed() {
        let key = WalletKey::parse(KEY).unwrap();
        let shown = format!("{:?}", key);
        assert!(!shown.contains("4c0883"));
        assert!(shown.contains("redacted"));
    }

    #[test]
    fn test_signature_is_deterministic_per_key() {
        let a = WalletKey::parse(KEY).unwrap();
        let b = WalletKey::parse(&"11".repeat(32)).unwrap();
        assert_eq!(a.sign(b"body").unwrap(), a.sign(b"body").unwrap());
        assert_ne!(a.sign(b"body").unwrap(), b.sign(b"body").unwrap());
        assert_eq!(a.sign(b"body").unwrap().len(), 64);
    }

    #[test]
    fn test_network_details() {
        assert_eq!(Network::Aeneid.chain_id(), 1315);
        assert_eq!(Network::Mainnet.chain_name(), "story");
        assert_eq!(
            Network::Aeneid.ip_asset_url("0xabc"),
            "https://aeneid.explorer.story.foundation/ipa/0xabc"
        );
    }

    #[test]
    fn test_validate() {
        let config = parse(&["--spg-nft-contract", "0x1111111111111111111111111111111111111111"]);
        assert!(config.validate().is_ok());

        let config = parse(&["--spg-nft-contract", "0x1234"]);
        assert!(config.validate().is_err());

        let config = parse(&["--story-cache-ttl-secs", "0"]);
        assert!(config.validate().is_err());

        let config = parse(&["--registrar-url", "not a url"]);
        assert!(config.validate().is_err());
    }
}
