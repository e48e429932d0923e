//! Authorization header construction.
//!
//! CloudSight accepts either a static key (`CloudSight <key>`) or a
//! single-leg OAuth1 HMAC-SHA1 signature over the request parameters.

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use reqwest::Method;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::models::params::Params;

const OAUTH_SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_ENTROPY_BYTES: usize = 20;

/// Header value plus the parameter set it was computed over.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub header: String,
    /// Caller parameters plus any injected `oauth_*` fields. The caller's own
    /// map is never modified.
    pub params: Params,
}

#[derive(Clone)]
pub enum Signer {
    Static { key: String },
    OAuth { key: String, secret: String },
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signer::Static { key } => f.debug_struct("Static").field("key", key).finish(),
            Signer::OAuth { key, .. } => f
                .debug_struct("OAuth")
                .field("key", key)
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

impl Signer {
    /// OAuth mode when a secret is given, static mode otherwise.
    pub fn new(key: impl Into<String>, secret: Option<String>) -> Self {
        match secret {
            Some(secret) => Signer::OAuth {
                key: key.into(),
                secret,
            },
            None => Signer::Static { key: key.into() },
        }
    }

    pub fn is_oauth(&self) -> bool {
        matches!(self, Signer::OAuth { .. })
    }

    /// Build the `Authorization` header for a request.
    pub fn sign(
        &self,
        method: &Method,
        url: &str,
        params: &Params,
    ) -> Result<Authorization, SignerError> {
        self.sign_at(method, url, params, chrono::Utc::now())
    }

    /// Same as [`Signer::sign`] with an explicit signing time.
    pub fn sign_at(
        &self,
        method: &Method,
        url: &str,
        params: &Params,
        now: DateTime<Utc>,
    ) -> Result<Authorization, SignerError> {
        match self {
            Signer::Static { key } => Ok(Authorization {
                header: format!("CloudSight {key}"),
                params: params.clone(),
            }),
            Signer::OAuth { key, secret } => {
                let nonce = generate_nonce()?;
                let timestamp = now.timestamp();
                sign_oauth(key, secret, method, url, params, &nonce, timestamp)
            }
        }
    }
}

/// SHA-256 over fresh OS randomness, hex-encoded.
fn generate_nonce() -> Result<String, SignerError> {
    let mut entropy = [0u8; NONCE_ENTROPY_BYTES];
    OsRng.try_fill_bytes(&mut entropy)?;
    Ok(hex::encode(Sha256::digest(entropy)))
}

fn sign_oauth(
    key: &str,
    secret: &str,
    method: &Method,
    url: &str,
    params: &Params,
    nonce: &str,
    timestamp: i64,
) -> Result<Authorization, SignerError> {
    let mut params = params.clone();
    params
        .insert("oauth_consumer_key", key)
        .insert("oauth_nonce", nonce)
        .insert("oauth_signature_method", OAUTH_SIGNATURE_METHOD)
        .insert("oauth_timestamp", timestamp.to_string())
        .insert("oauth_version", OAUTH_VERSION);

    let base_string = signature_base_string(method, url, &params);

    // No token secret in the single-leg flow, hence the bare trailing '&'.
    let signing_key = format!("{}&", escape(secret));
    let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
        .map_err(|_| SignerError::InvalidKey)?;
    mac.update(base_string.as_bytes());
    let signature =
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    let header = format!(
        "OAuth oauth_consumer_key=\"{key}\", oauth_nonce=\"{nonce}\", \
         oauth_signature=\"{signature}\", oauth_signature_method=\"{OAUTH_SIGNATURE_METHOD}\", \
         oauth_timestamp=\"{timestamp}\", oauth_version=\"{OAUTH_VERSION}\""
    );

    Ok(Authorization { header, params })
}

/// `METHOD&escape(url)&escape(sorted form encoding of params)`.
pub fn signature_base_string(method: &Method, url: &str, params: &Params) -> String {
    [
        method.as_str().to_uppercase(),
        escape(url),
        escape(&params.encode()),
    ]
    .join("&")
}

/// Query-component escaping (space becomes `+`).
fn escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Secure random source unavailable: {0}")]
    Entropy(#[from] rand::Error),

    #[error("Invalid HMAC signing key")]
    InvalidKey,
}
