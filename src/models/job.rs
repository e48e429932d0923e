use serde::Serialize;
use strum::EnumString;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// Status of a recognition job as reported by CloudSight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, EnumString)]
#[serde(into = "String")]
pub enum JobStatus {
    /// Recognition is still running; keep polling.
    #[strum(serialize = "not completed")]
    NotCompleted,
    #[strum(serialize = "completed")]
    Completed,
    #[strum(serialize = "not found")]
    NotFound,
    #[strum(serialize = "skipped")]
    Skipped,
    #[strum(serialize = "timeout")]
    Timeout,
    /// A status string this client does not know about.
    #[strum(default)]
    Unrecognized(String),
}

impl JobStatus {
    /// Wire representation of the status.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::NotCompleted => "not completed",
            JobStatus::Completed => "completed",
            JobStatus::NotFound => "not found",
            JobStatus::Skipped => "skipped",
            JobStatus::Timeout => "timeout",
            JobStatus::Unrecognized(raw) => raw,
        }
    }

    /// Every status except `NotCompleted` is final for the poller.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::NotCompleted)
    }

    /// Human-readable explanation of the status.
    pub fn description(&self) -> String {
        match self {
            JobStatus::NotCompleted => "Recognition has not yet been completed for this image. \
                Continue polling until response has been marked completed."
                .to_string(),
            JobStatus::Completed => "Recognition has been completed. Annotation can be found in \
                the name and categories of the job."
                .to_string(),
            JobStatus::NotFound => "Token supplied on URL does not match an image.".to_string(),
            JobStatus::Skipped => "Image couldn't be recognized because of a specific reason. \
                Check the skip reason."
                .to_string(),
            JobStatus::Timeout => "Recognition process exceeded the allowed TTL setting.".to_string(),
            JobStatus::Unrecognized(raw) => format!("Unknown status: {raw:?}."),
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        raw.as_str()
            .parse()
            .unwrap_or_else(|_| JobStatus::Unrecognized(raw))
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the service declined to annotate an image. Only meaningful when the
/// job status is `Skipped`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, EnumString)]
#[serde(into = "String")]
#[strum(serialize_all = "lowercase")]
pub enum SkipReason {
    /// The image has not been skipped.
    #[default]
    #[strum(disabled)]
    None,
    Offensive,
    Blurry,
    Close,
    Dark,
    Bright,
    Unsure,
    #[strum(default)]
    Unrecognized(String),
}

impl SkipReason {
    pub fn as_str(&self) -> &str {
        match self {
            SkipReason::None => "",
            SkipReason::Offensive => "offensive",
            SkipReason::Blurry => "blurry",
            SkipReason::Close => "close",
            SkipReason::Dark => "dark",
            SkipReason::Bright => "bright",
            SkipReason::Unsure => "unsure",
            SkipReason::Unrecognized(raw) => raw,
        }
    }

    pub fn description(&self) -> String {
        match self {
            SkipReason::None => "The image hasn't been skipped.".to_string(),
            SkipReason::Offensive => "Offensive image content.".to_string(),
            SkipReason::Blurry => "Too blurry to identify.".to_string(),
            SkipReason::Close => "Too close to identify.".to_string(),
            SkipReason::Dark => "Too dark to identify.".to_string(),
            SkipReason::Bright => "Too bright to identify.".to_string(),
            SkipReason::Unsure => "Content could not be identified.".to_string(),
            SkipReason::Unrecognized(raw) => format!("Unknown reason: {raw:?}."),
        }
    }
}

impl From<String> for SkipReason {
    fn from(raw: String) -> Self {
        if raw.is_empty() {
            return SkipReason::None;
        }
        raw.as_str()
            .parse()
            .unwrap_or_else(|_| SkipReason::Unrecognized(raw))
    }
}

impl From<SkipReason> for String {
    fn from(reason: SkipReason) -> Self {
        reason.as_str().to_string()
    }
}

/// Point-in-time copy of a job's observable fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobState {
    pub token: String,
    pub status: JobStatus,
    pub categories: Vec<String>,
    pub name: String,
    pub ttl: f64,
    pub skip_reason: SkipReason,
    /// Image URL as stored on CloudSight servers.
    pub url: String,
}

/// Fields behind the per-job guard.
#[derive(Debug)]
pub(crate) struct JobInner {
    pub(crate) state: JobState,
    /// Base of the quiet period before the first poll.
    pub(crate) created_at: Instant,
}

/// A recognition request in flight.
///
/// The token is fixed at submission. Everything else is refreshed by the
/// client's poll operations and sits behind an async mutex owned by the job,
/// so concurrent polls of one job are serialized while different jobs never
/// contend.
#[derive(Debug)]
pub struct Job {
    token: String,
    inner: Mutex<JobInner>,
}

impl Job {
    pub(crate) fn new(state: JobState) -> Self {
        Self {
            token: state.token.clone(),
            inner: Mutex::new(JobInner {
                state,
                created_at: Instant::now(),
            }),
        }
    }

    /// Rebuild a handle for a job submitted earlier, e.g. by another process.
    ///
    /// The job starts as `NotCompleted` and the quiet period is counted from
    /// now.
    pub fn resume(token: impl Into<String>) -> Self {
        Self::new(JobState {
            token: token.into(),
            status: JobStatus::NotCompleted,
            categories: Vec::new(),
            name: String::new(),
            ttl: 0.0,
            skip_reason: SkipReason::None,
            url: String::new(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn status(&self) -> JobStatus {
        self.inner.lock().await.state.status.clone()
    }

    pub async fn snapshot(&self) -> JobState {
        self.inner.lock().await.state.clone()
    }

    pub async fn created_at(&self) -> Instant {
        self.inner.lock().await.created_at
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, JobInner> {
        self.inner.lock().await
    }
}
