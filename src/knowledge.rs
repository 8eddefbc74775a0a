//! Client for the external medical knowledge service.
//!
//! The service authenticates callers with a keyed signature: an HMAC-MD5
//! digest of the login endpoint URL, keyed by a shared secret and sent as
//! `Authorization: Bearer {user}:{digest}`. A successful login returns a
//! short-lived session token that every subsequent lookup attaches as a
//! query credential.
//!
//! Each client instance owns its token exclusively — there is no process-wide
//! singleton, so per-request instances coexist safely. Whether a token is
//! re-established per logical operation or reused for the instance's lifetime
//! is a configuration choice (see [`TokenPolicy`](crate::config::TokenPolicy)).
//!
//! Lookups are single outbound requests with no retry or backoff; all calls
//! are read-only on the remote side, so no idempotency key is needed. Remote
//! failures surface as [`Error::Upstream`] with a truncated diagnostic.

use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Datelike, Utc};
use hmac::{Hmac, Mac};
use md5::Md5;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{KnowledgeConfig, TokenPolicy};
use crate::error::{Error, Result};
use crate::models::Gender;

type HmacMd5 = Hmac<Md5>;

/// Response format requested from the knowledge service.
const RESPONSE_FORMAT: &str = "json";
/// Catalog language requested from the knowledge service.
const LANGUAGE: &str = "en-gb";

/// Session credential returned by the login endpoint.
///
/// The adapter does not track an expiry; the service invalidates tokens on
/// its own schedule and an expired token simply fails the next call.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub value: String,
}

/// Shared-secret credentials for the knowledge service.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    /// Public identifier presented at login.
    pub username: String,
    /// Shared secret used to key the login signature. Never sent directly.
    pub secret: String,
}

impl ApiCredentials {
    /// Load credentials from `API_MEDIC_USERNAME` / `API_MEDIC_PASSWORD`.
    pub fn from_env() -> anyhow::Result<Self> {
        let username = std::env::var("API_MEDIC_USERNAME")
            .context("API_MEDIC_USERNAME environment variable not set")?;
        let secret = std::env::var("API_MEDIC_PASSWORD")
            .context("API_MEDIC_PASSWORD environment variable not set")?;
        Ok(Self { username, secret })
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "Token")]
    token: String,
}

/// Source of the symptom catalog, as consumed by the catalog cache.
///
/// Splitting this seam out of [`KnowledgeClient`] lets the cache be tested
/// against a canned source without network access.
#[async_trait]
pub trait SymptomSource: Send {
    /// Make sure a usable session exists, authenticating if the configured
    /// policy requires it.
    async fn ensure_session(&mut self) -> Result<()>;

    /// Fetch the full symptom catalog.
    async fn fetch_symptoms(&mut self) -> Result<Vec<Value>>;
}

/// Knowledge service adapter holding one session token.
pub struct KnowledgeClient {
    http: reqwest::Client,
    config: KnowledgeConfig,
    creds: ApiCredentials,
    token: Option<SessionToken>,
}

impl KnowledgeClient {
    pub fn new(config: KnowledgeConfig, creds: ApiCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            creds,
            token: None,
        }
    }

    /// Create a client with credentials from the environment.
    pub fn from_env(config: KnowledgeConfig) -> anyhow::Result<Self> {
        Ok(Self::new(config, ApiCredentials::from_env()?))
    }

    /// Exchange the signed login request for a session token.
    ///
    /// Must complete before any lookup; lookups made without a token fail
    /// with `NotAuthenticated`.
    pub async fn authenticate(&mut self) -> Result<()> {
        let digest = sign_login_uri(&self.creds.secret, &self.config.auth_endpoint);
        let authorization = format!("Bearer {}:{}", self.creds.username, digest);

        let resp = self
            .http
            .post(&self.config.auth_endpoint)
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                call: "authenticate",
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                call: "authenticate",
                message: format!("HTTP {}: {}", status, truncate(&body)),
            });
        }

        let login: LoginResponse = resp.json().await.map_err(|e| Error::Upstream {
            call: "authenticate",
            message: format!("malformed login response: {}", e),
        })?;

        self.token = Some(SessionToken { value: login.token });
        Ok(())
    }

    /// Whether this client currently holds a session token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Fetch the full symptom catalog as opaque records.
    pub async fn fetch_symptoms(&self) -> Result<Vec<Value>> {
        let url = format!("{}/symptoms", self.config.endpoint.trim_end_matches('/'));
        let result = self.get_json("fetch_symptoms", &url, Vec::new()).await?;
        match result {
            Value::Array(records) => Ok(records),
            other => Err(Error::Upstream {
                call: "fetch_symptoms",
                message: format!("expected a JSON array of symptoms, got {}", other),
            }),
        }
    }

    /// Fetch diagnosis proposals for a set of symptom ids.
    ///
    /// The service keys age by birth year, so `age_years` is converted to a
    /// `year_of_birth` query parameter. The response schema belongs to the
    /// service and is passed through untouched.
    pub async fn fetch_diagnosis(
        &self,
        symptom_ids: &[i64],
        age_years: i32,
        gender: Gender,
    ) -> Result<Value> {
        let url = format!("{}/diagnosis", self.config.endpoint.trim_end_matches('/'));
        let symptoms = serde_json::to_string(symptom_ids).map_err(|e| Error::Upstream {
            call: "fetch_diagnosis",
            message: format!("could not encode symptom ids: {}", e),
        })?;
        let year_of_birth = Utc::now().year() - age_years;
        let params = vec![
            ("symptoms".to_string(), symptoms),
            ("gender".to_string(), gender.as_str().to_string()),
            ("year_of_birth".to_string(), year_of_birth.to_string()),
        ];
        self.get_json("fetch_diagnosis", &url, params).await
    }

    /// Fetch detail for one issue.
    pub async fn fetch_issue(&self, issue_id: i64) -> Result<Value> {
        let url = format!(
            "{}/issues/{}/info",
            self.config.endpoint.trim_end_matches('/'),
            issue_id
        );
        self.get_json("fetch_issue", &url, Vec::new()).await
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_ref()
            .map(|t| t.value.as_str())
            .ok_or(Error::NotAuthenticated)
    }

    /// Single signed GET against the service. Attaches the session token and
    /// the fixed format/language parameters, then passes the JSON body
    /// through without validating its schema.
    async fn get_json(
        &self,
        call: &'static str,
        url: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<Value> {
        let token = self.token()?;
        params.push(("token".to_string(), token.to_string()));
        params.push(("format".to_string(), RESPONSE_FORMAT.to_string()));
        params.push(("language".to_string(), LANGUAGE.to_string()));

        let resp = self
            .http
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                call,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                call,
                message: format!("HTTP {}: {}", status, truncate(&body)),
            });
        }

        resp.json().await.map_err(|e| Error::Upstream {
            call,
            message: format!("malformed response body: {}", e),
        })
    }
}

#[async_trait]
impl SymptomSource for KnowledgeClient {
    async fn ensure_session(&mut self) -> Result<()> {
        match self.config.token_policy {
            TokenPolicy::PerCall => self.authenticate().await,
            TokenPolicy::Reuse => {
                if self.token.is_none() {
                    self.authenticate().await
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn fetch_symptoms(&mut self) -> Result<Vec<Value>> {
        KnowledgeClient::fetch_symptoms(self).await
    }
}

/// Base64-encoded HMAC-MD5 of the login endpoint URL, keyed by the shared
/// secret. This is the credential the service expects alongside the public
/// username.
fn sign_login_uri(secret: &str, auth_endpoint: &str) -> String {
    BASE64.encode(hmac_md5(secret.as_bytes(), auth_endpoint.as_bytes()))
}

fn hmac_md5(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacMd5::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn truncate(body: &str) -> String {
    body.chars().take(500).collect()
}
