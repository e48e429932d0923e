use serde::Deserialize;

use crate::models::job::{JobState, JobStatus, SkipReason};

/// JSON body shared by submission and poll responses. Every field may be
/// missing or null.
#[derive(Debug, Default, Deserialize)]
pub struct ApiResponse {
    pub categories: Option<Vec<String>>,
    /// Presence means the request failed.
    pub error: Option<serde_json::Value>,
    pub name: Option<String>,
    pub reason: Option<String>,
    pub status: Option<String>,
    pub ttl: Option<f64>,
    pub token: Option<String>,
    pub url: Option<String>,
}

impl ApiResponse {
    /// Service-reported error message, if the payload carries one.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|error| match error {
            serde_json::Value::String(message) => message.clone(),
            other => other.to_string(),
        })
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from(self.status.clone().unwrap_or_default())
    }

    /// State of a freshly submitted job.
    pub fn into_state(self) -> JobState {
        let status = self.status();
        JobState {
            token: self.token.unwrap_or_default(),
            status,
            categories: self.categories.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            ttl: self.ttl.unwrap_or_default(),
            skip_reason: SkipReason::from(self.reason.unwrap_or_default()),
            url: normalize_image_url(self.url.unwrap_or_default()),
        }
    }

    /// Overwrite the fields a poll refreshes. Token and URL stay as they were.
    pub fn apply_to(self, state: &mut JobState) {
        state.status = self.status();
        state.categories = self.categories.unwrap_or_default();
        state.name = self.name.unwrap_or_default();
        state.ttl = self.ttl.unwrap_or_default();
        state.skip_reason = SkipReason::from(self.reason.unwrap_or_default());
    }
}

/// CloudSight returns protocol-relative image URLs (`//host/path`).
pub fn normalize_image_url(url: String) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url
    }
}
