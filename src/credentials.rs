use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::constants::BLOB_TOKEN_ENV;

/// Credentials file structure
///
/// Format:
/// ```toml
/// [blob.profile_name]
/// token = "your_blob_read_write_token_here"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Credentials {
    #[serde(default)]
    pub blob: HashMap<String, CredentialProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialProfile {
    pub token: String,
}

/// Get the default credentials file path: ~/.config/annotated_video/credentials.toml
/// Returns None when HOME is not set
pub fn get_credentials_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("annotated_video")
            .join("credentials.toml"),
    )
}

/// Load credentials from the default location
/// Returns None if the file doesn't exist
pub fn load_credentials() -> Result<Option<Credentials>, Box<dyn std::error::Error + Send + Sync>> {
    let creds_path = match get_credentials_path() {
        Some(path) if path.exists() => path,
        _ => return Ok(None),
    };

    let content = std::fs::read_to_string(&creds_path)?;
    let credentials: Credentials = toml::from_str(&content)?;

    Ok(Some(credentials))
}

/// Look up the blob storage read-write token for a profile
pub fn get_blob_token(credentials: &Option<Credentials>, profile: &str) -> Result<String, String> {
    match credentials {
        Some(creds) => creds
            .blob
            .get(profile)
            .map(|p| p.token.clone())
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                format!(
                    "Credential profile '[blob.{}]' not found in credentials file",
                    profile
                )
            }),
        None => Err(format!(
            "Credentials file not found. Expected at: {}",
            get_credentials_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "~/.config/annotated_video/credentials.toml".to_string())
        )),
    }
}

/// Resolve the blob token, preferring the environment over the credentials file
pub fn resolve_blob_token(credentials: &Option<Credentials>, profile: &str) -> Result<String, String> {
    if let Ok(token) = std::env::var(BLOB_TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(token);
        }
    }
    get_blob_token(credentials, profile)
        .map_err(|e| format!("{} is not set and {}", BLOB_TOKEN_ENV, e))
}
