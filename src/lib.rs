//! CloudSight API client
//!
//! Submit an image (bytes or a remote URL) to the CloudSight recognition
//! service, then poll the returned [`Job`] until the service has annotated
//! it. Requests are authenticated with the bare API key or signed with
//! OAuth1 HMAC-SHA1 when a secret is configured.

pub mod config;
pub mod models;
pub mod services;

pub use config::{ClientConfig, StatusPolicy};
pub use models::job::{Job, JobState, JobStatus, SkipReason};
pub use models::params::{ParamError, Params, Position, RelativeFocus};
pub use services::client::{CloudSightClient, ClientError};
