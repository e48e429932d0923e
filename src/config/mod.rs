use std::time::Duration;

use serde::Deserialize;

/// Base API URL.
pub const DEFAULT_BASE_URL: &str = "https://api.cloudsightapi.com";

/// How to treat a non-2xx response whose body carries no `error` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Log a warning and use the body anyway.
    #[default]
    Lenient,
    /// Fail the request.
    Strict,
}

/// Client settings, read from `CLOUDSIGHT_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// API key (`CLOUDSIGHT_API_KEY`)
    pub api_key: String,

    /// API secret. When set, requests are signed with OAuth1 instead of
    /// sending the bare key.
    #[serde(default)]
    pub api_secret: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Fail on unexpected HTTP status codes instead of logging them.
    #[serde(default)]
    pub strict_status: bool,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("CLOUDSIGHT_").from_env()
    }

    /// Key-only configuration with defaults for everything else.
    pub fn simple(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: None,
            base_url: default_base_url(),
            strict_status: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn oauth(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_secret: Some(api_secret.into()),
            ..Self::simple(api_key)
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.strict_status = policy == StatusPolicy::Strict;
        self
    }

    pub fn status_policy(&self) -> StatusPolicy {
        if self.strict_status {
            StatusPolicy::Strict
        } else {
            StatusPolicy::Lenient
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
