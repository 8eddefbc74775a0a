use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalog::DEFAULT_MAX_AGE_HOURS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Which blob backend to use: `"filesystem"` or `"s3"`.
    pub backend: String,
    #[serde(default)]
    pub filesystem: Option<FsStorageConfig>,
    #[serde(default)]
    pub s3: Option<S3StorageConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FsStorageConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3StorageConfig {
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    /// Base URL for symptom/diagnosis/issue lookups.
    pub endpoint: String,
    /// Login endpoint; also the exact string the login signature is
    /// computed over.
    pub auth_endpoint: String,
    #[serde(default)]
    pub token_policy: TokenPolicy,
}

/// How long a session token is kept by one client instance.
///
/// The reference deployment re-authenticates per logical operation, which is
/// the default here; longer-lived processes can opt into token reuse.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPolicy {
    /// Establish a fresh token for every logical operation.
    #[default]
    PerCall,
    /// Authenticate once per client instance and reuse the token.
    Reuse,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: i64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
        }
    }
}

fn default_max_age_hours() -> i64 {
    DEFAULT_MAX_AGE_HOURS
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate storage
    match config.storage.backend.as_str() {
        "filesystem" => {
            if config.storage.filesystem.is_none() {
                anyhow::bail!("storage.backend is 'filesystem' but [storage.filesystem] is missing");
            }
        }
        "s3" => {
            let s3 = config
                .storage
                .s3
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("storage.backend is 's3' but [storage.s3] is missing"))?;
            if s3.bucket.is_empty() {
                anyhow::bail!("storage.s3.bucket must not be empty");
            }
        }
        other => anyhow::bail!(
            "Unknown storage backend: '{}'. Must be filesystem or s3.",
            other
        ),
    }

    // Validate knowledge service endpoints
    if config.knowledge.endpoint.is_empty() {
        anyhow::bail!("knowledge.endpoint must not be empty");
    }
    if config.knowledge.auth_endpoint.is_empty() {
        anyhow::bail!("knowledge.auth_endpoint must not be empty");
    }

    // Validate catalog
    if config.catalog.max_age_hours < 1 {
        anyhow::bail!("catalog.max_age_hours must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("triage.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_minimal_filesystem_config() {
        let (_tmp, path) = write_config(
            r#"[storage]
backend = "filesystem"

[storage.filesystem]
root = "./data"

[knowledge]
endpoint = "https://healthservice.example"
auth_endpoint = "https://authservice.example/login"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.storage.backend, "filesystem");
        assert_eq!(cfg.knowledge.token_policy, TokenPolicy::PerCall);
        assert_eq!(cfg.catalog.max_age_hours, 24);
    }

    #[test]
    fn test_s3_config_with_policy_override() {
        let (_tmp, path) = write_config(
            r#"[storage]
backend = "s3"

[storage.s3]
bucket = "triage-data"
region = "eu-west-1"

[knowledge]
endpoint = "https://healthservice.example"
auth_endpoint = "https://authservice.example/login"
token_policy = "reuse"

[catalog]
max_age_hours = 12
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.storage.s3.unwrap().region, "eu-west-1");
        assert_eq!(cfg.knowledge.token_policy, TokenPolicy::Reuse);
        assert_eq!(cfg.catalog.max_age_hours, 12);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let (_tmp, path) = write_config(
            r#"[storage]
backend = "dynamo"

[knowledge]
endpoint = "https://healthservice.example"
auth_endpoint = "https://authservice.example/login"
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_s3_backend_requires_bucket_table() {
        let (_tmp, path) = write_config(
            r#"[storage]
backend = "s3"

[knowledge]
endpoint = "https://healthservice.example"
auth_endpoint = "https://authservice.example/login"
"#,
        );
        assert!(load_config(&path).is_err());
    }
}
