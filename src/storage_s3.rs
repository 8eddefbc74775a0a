//! Amazon S3 [`BlobStore`] implementation.
//!
//! Talks to the S3 REST API directly with AWS Signature V4 authentication,
//! using only pure-Rust dependencies (`hmac`, `sha2`) for signing — no C
//! library dependencies, making it compatible with all build environments.
//! Supports custom endpoints for S3-compatible services (MinIO, LocalStack).
//!
//! # Environment Variables
//!
//! Credentials are read from environment variables:
//! - `AWS_ACCESS_KEY_ID` — required
//! - `AWS_SECRET_ACCESS_KEY` — required
//! - `AWS_SESSION_TOKEN` — optional (for temporary credentials / IAM roles)
//!
//! # Failure policy
//!
//! Per the [`BlobStore`] contract, request failures do not propagate: a
//! failed or 404 `GetObject` reports the blob as absent and a failed
//! `PutObject` returns `false`, with the cause logged.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::S3StorageConfig;
use crate::storage::BlobStore;

type HmacSha256 = Hmac<Sha256>;

/// AWS credentials loaded from environment variables.
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// Blob store backed by an S3 bucket, one object per key.
pub struct S3BlobStore {
    config: S3StorageConfig,
    creds: AwsCredentials,
    client: reqwest::Client,
}

impl S3BlobStore {
    /// Create a store for the configured bucket, reading AWS credentials
    /// from the environment.
    pub fn from_env(config: S3StorageConfig) -> Result<Self> {
        Ok(Self {
            config,
            creds: AwsCredentials::from_env()?,
            client: reqwest::Client::new(),
        })
    }

    /// Compute the S3 hostname for the configured bucket and region.
    ///
    /// A custom `endpoint_url` (MinIO, LocalStack) overrides the standard
    /// `<bucket>.s3.<region>.amazonaws.com` form.
    fn host(&self) -> String {
        if let Some(ref endpoint) = self.config.endpoint_url {
            endpoint
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string()
        } else {
            format!("{}.s3.{}.amazonaws.com", self.config.bucket, self.config.region)
        }
    }

    /// Build a signed request for `method` on `key` and attach all SigV4
    /// headers. `payload_hash` must be the hex SHA-256 of the request body.
    fn signed_request(
        &self,
        method: &str,
        key: &str,
        payload_hash: &str,
    ) -> (String, reqwest::RequestBuilder) {
        let host = self.host();
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        let canonical_uri = format!("/{}", encoded_key);
        let url = format!("https://{}{}", host, canonical_uri);

        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let mut headers = vec![
            ("host".to_string(), host),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method, canonical_uri, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.config.region,
            "s3",
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.creds.access_key_id, credential_scope, signed_headers, signature
        );

        let mut builder = match method {
            "PUT" => self.client.put(&url),
            _ => self.client.get(&url),
        };
        builder = builder
            .header("Authorization", authorization)
            .header("x-amz-content-sha256", payload_hash)
            .header("x-amz-date", amz_date);
        if let Some(ref token) = self.creds.session_token {
            builder = builder.header("x-amz-security-token", token);
        }

        (url, builder)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let payload_hash = hex_sha256(b"");
        let (url, request) = self.signed_request("GET", key, &payload_hash);

        let resp = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(key, %url, error = %e, "S3 GetObject request failed");
                return None;
            }
        };

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return None;
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                key,
                %status,
                body = %body.chars().take(500).collect::<String>(),
                "S3 GetObject failed"
            );
            return None;
        }

        match resp.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                warn!(key, error = %e, "S3 GetObject body read failed");
                None
            }
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> bool {
        let payload_hash = hex_sha256(bytes);
        let (url, request) = self.signed_request("PUT", key, &payload_hash);

        let resp = match request
            .header("Content-Type", "application/json")
            .body(bytes.to_vec())
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(key, %url, error = %e, "S3 PutObject request failed");
                return false;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                key,
                %status,
                body = %body.chars().take(500).collect::<String>(),
                "S3 PutObject failed"
            );
            return false;
        }
        true
    }
}

// ============ AWS SigV4 Helpers ============

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute hex-encoded HMAC-SHA256.
fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986 (used in SigV4 canonical requests).
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // Signing key vector from the AWS SigV4 documentation examples.
    #[test]
    fn test_derive_signing_key_matches_aws_example() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20150830",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn test_uri_encode_escapes_reserved_bytes() {
        assert_eq!(uri_encode("a@x.com-history.json"), "a%40x.com-history.json");
        assert_eq!(uri_encode("plain-key_1.json~"), "plain-key_1.json~");
    }

    #[test]
    fn test_hex_sha256_empty_payload() {
        assert_eq!(
            hex_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
