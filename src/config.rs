use serde::Deserialize;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS, MAX_UPLOAD_BYTES,
};

fn default_api_port() -> u16 {
    3000
}

fn default_store_id() -> String {
    "default".to_string()
}

fn default_credential_profile() -> String {
    "default".to_string()
}

fn default_max_upload_bytes() -> u64 {
    MAX_UPLOAD_BYTES
}

fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_allowed_content_types() -> Vec<String> {
    DEFAULT_ALLOWED_CONTENT_TYPES
        .iter()
        .map(|t| t.to_string())
        .collect()
}

/// Server configuration file structure
///
/// ```toml
/// database_path = "data/videos.sqlite"
/// api_port = 3000
///
/// [blob]
/// store_id = "lectures"
/// credential_profile = "default"
/// callback_url = "https://example.com/api/upload-video"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// SQLite database file (created if missing)
    pub database_path: PathBuf,
    /// API server port (default: 3000)
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Blob storage settings (maps to [blob] section in TOML)
    #[serde(default)]
    pub blob: BlobConfig,
}

/// Blob storage upload settings
#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    /// Identifier of the storage bucket, embedded in issued tokens
    #[serde(default = "default_store_id")]
    pub store_id: String,
    /// Credential profile name to look up the read-write token from ~/.config/annotated_video/credentials.toml
    #[serde(default = "default_credential_profile")]
    pub credential_profile: String,
    /// URL the storage provider calls once a transfer finishes
    pub callback_url: Option<String>,
    /// Largest accepted upload in bytes (default: 500 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Lifetime of a client upload token in seconds (default: 1 hour)
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// MIME types a client may upload (default: common video containers)
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            store_id: default_store_id(),
            credential_profile: default_credential_profile(),
            callback_url: None,
            max_upload_bytes: default_max_upload_bytes(),
            token_ttl_secs: default_token_ttl_secs(),
            allowed_content_types: default_allowed_content_types(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        let config: ServerConfig =
            toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }

    /// Validate values serde cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path must not be empty".to_string());
        }
        if self.blob.token_ttl_secs == 0 {
            return Err("[blob] token_ttl_secs must be greater than zero".to_string());
        }
        if self.blob.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(format!(
                "[blob] token_ttl_secs must be at most {} (7 days)",
                MAX_TOKEN_TTL_SECS
            ));
        }
        if self.blob.max_upload_bytes == 0 {
            return Err("[blob] max_upload_bytes must be greater than zero".to_string());
        }
        if self.blob.allowed_content_types.is_empty() {
            return Err("[blob] allowed_content_types must list at least one type".to_string());
        }
        Ok(())
    }
}
