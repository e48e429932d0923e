use std::time::Duration;

use reqwest::Method;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, StatusPolicy};
use crate::models::job::{Job, JobInner, JobStatus};
use crate::models::params::{ParamError, Params, DEFAULT_LOCALE, LOCALE_KEY, REMOTE_IMAGE_URL_KEY};
use crate::models::response::ApiResponse;
use crate::services::signer::{Signer, SignerError};
use crate::services::transport::{HttpRequest, HttpResponse, HttpTransport, RequestBody, Transport};

/// No poll happens earlier than this after submission; recognition takes
/// 6-12 seconds on the service side.
pub const POLL_MIN_WAIT: Duration = Duration::from_secs(4);

/// Delay between two polls of [`CloudSightClient::wait_job`].
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

const IMAGE_FIELD: &str = "image_request[image]";

/// Client for the CloudSight image recognition API.
#[derive(Debug)]
pub struct CloudSightClient<T = HttpTransport> {
    transport: T,
    signer: Signer,
    base_url: String,
    status_policy: StatusPolicy,
}

impl CloudSightClient<HttpTransport> {
    /// Client authenticating with the bare API key.
    pub fn new_simple(key: impl Into<String>) -> Result<Self, ClientError> {
        Self::from_config(&ClientConfig::simple(key))
    }

    /// Client signing every request with OAuth1.
    pub fn new_oauth(key: impl Into<String>, secret: impl Into<String>) -> Result<Self, ClientError> {
        Self::from_config(&ClientConfig::oauth(key, secret))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> CloudSightClient<T> {
    /// Build a client over any [`Transport`]. Fails when the key is empty, or
    /// when a secret is configured but empty.
    pub fn with_transport(config: &ClientConfig, transport: T) -> Result<Self, ClientError> {
        if config.api_key.is_empty() {
            return Err(ClientError::MissingKey);
        }
        if config.api_secret.as_deref() == Some("") {
            return Err(ClientError::MissingSecret);
        }

        Ok(Self {
            transport,
            signer: Signer::new(config.api_key.clone(), config.api_secret.clone()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            status_policy: config.status_policy(),
        })
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    fn requests_url(&self) -> String {
        format!("{}/image_requests", self.base_url)
    }

    fn responses_url(&self, token: &str) -> String {
        format!("{}/image_responses/{}", self.base_url, token)
    }

    fn repost_url(&self, token: &str) -> String {
        format!("{}/image_requests/{}/repost", self.base_url, token)
    }

    /// Upload an image for recognition.
    ///
    /// The returned job is usually still `NotCompleted`; follow up with
    /// [`Self::update_job`] or [`Self::wait_job`].
    pub async fn image_request(
        &self,
        image: impl Into<Vec<u8>>,
        filename: &str,
        params: Option<Params>,
    ) -> Result<Job, ClientError> {
        let params = with_default_locale(params);
        let url = self.requests_url();
        let auth = self.signer.sign(&Method::POST, &url, &params)?;

        let data = image.into();
        let content_type = image::guess_format(&data)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");

        debug!(filename, bytes = data.len(), content_type, "Uploading image");

        let request = HttpRequest {
            method: Method::POST,
            url,
            authorization: auth.header,
            body: RequestBody::Multipart {
                field: IMAGE_FIELD.to_string(),
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                data,
                fields: form_fields(&params),
            },
        };

        self.submit(request).await
    }

    /// Ask the service to fetch and recognize the image at `image_url`.
    pub async fn remote_image_request(
        &self,
        image_url: &str,
        params: Option<Params>,
    ) -> Result<Job, ClientError> {
        let mut params = with_default_locale(params);
        params.insert(REMOTE_IMAGE_URL_KEY, image_url);

        let url = self.requests_url();
        let auth = self.signer.sign(&Method::POST, &url, &params)?;

        debug!(image_url, "Requesting remote image recognition");

        let request = HttpRequest {
            method: Method::POST,
            url,
            authorization: auth.header,
            body: RequestBody::Form(form_fields(&params)),
        };

        self.submit(request).await
    }

    async fn submit(&self, request: HttpRequest) -> Result<Job, ClientError> {
        metrics::counter!("cloudsight_requests_total").increment(1);

        let response = self.transport.send(request).await?;
        let state = self.decode(&response)?.into_state();

        info!(token = %state.token, status = %state.status, "Image request submitted");

        Ok(Job::new(state))
    }

    /// Refresh the job from the service.
    ///
    /// Does nothing once the job has left `NotCompleted`. Concurrent calls on
    /// the same job are serialized by the job's own lock.
    pub async fn update_job(&self, job: &Job) -> Result<(), ClientError> {
        self.poll(job).await.map(|_| ())
    }

    /// Poll once and report the status observed afterwards.
    async fn poll(&self, job: &Job) -> Result<JobStatus, ClientError> {
        let mut inner = job.lock().await;
        if inner.state.status.is_terminal() {
            return Ok(inner.state.status.clone());
        }
        self.poll_locked(&mut inner).await?;
        Ok(inner.state.status.clone())
    }

    async fn poll_locked(&self, inner: &mut JobInner) -> Result<(), ClientError> {
        let token = inner.state.token.clone();
        let url = self.responses_url(&token);
        let auth = self.signer.sign(&Method::GET, &url, &Params::new())?;

        metrics::counter!("cloudsight_polls_total").increment(1);
        debug!(token = %token, "Polling job status");

        let response = self
            .transport
            .send(HttpRequest {
                method: Method::GET,
                url,
                authorization: auth.header,
                body: RequestBody::Empty,
            })
            .await?;

        self.decode(&response)?.apply_to(&mut inner.state);

        if inner.state.status.is_terminal() {
            info!(
                token = %token,
                status = %inner.state.status,
                name = %inner.state.name,
                "Job finished"
            );
        }

        Ok(())
    }

    /// Block until the job leaves `NotCompleted`, polling every
    /// [`POLL_INTERVAL`] once [`POLL_MIN_WAIT`] has passed since submission.
    ///
    /// A zero `timeout` waits forever, as does one too large to represent.
    /// On [`ClientError::Timeout`] the job keeps whatever state the last poll
    /// produced.
    pub async fn wait_job(&self, job: &Job, timeout: Duration) -> Result<(), ClientError> {
        // A deadline past the clock's range is as good as none.
        let deadline = (!timeout.is_zero())
            .then(|| Instant::now().checked_add(timeout))
            .flatten();

        let poll_from = job.created_at().await + POLL_MIN_WAIT;
        if Instant::now() < poll_from {
            sleep_until(poll_from).await;
        }

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() > deadline {
                    metrics::counter!("cloudsight_wait_timeouts_total").increment(1);
                    warn!(token = %job.token(), timeout_secs = timeout.as_secs_f64(), "Wait timed out");
                    return Err(ClientError::Timeout);
                }
            }

            if self.poll(job).await?.is_terminal() {
                return Ok(());
            }

            sleep(POLL_INTERVAL).await;
        }
    }

    /// Resubmit a job that ended with `Timeout`, then poll it once.
    ///
    /// Any other status is rejected before a request is made. After a
    /// successful repost the job is back in flight and the quiet period of
    /// [`Self::wait_job`] starts over.
    pub async fn repost_job(&self, job: &Job) -> Result<(), ClientError> {
        let mut inner = job.lock().await;
        if inner.state.status != JobStatus::Timeout {
            return Err(ClientError::InvalidRepostStatus(inner.state.status.clone()));
        }

        let url = self.repost_url(job.token());
        let auth = self.signer.sign(&Method::POST, &url, &Params::new())?;

        info!(token = %job.token(), "Reposting timed out job");

        let response = self
            .transport
            .send(HttpRequest {
                method: Method::POST,
                url,
                authorization: auth.header,
                body: RequestBody::Empty,
            })
            .await?;

        if !response.is_success() {
            return Err(ClientError::Repost {
                status: response.status,
                body: response.text(),
            });
        }

        inner.state.status = JobStatus::NotCompleted;
        inner.created_at = Instant::now();

        self.poll_locked(&mut inner).await
    }

    /// Decode a response body, surfacing service-reported errors.
    fn decode(&self, response: &HttpResponse) -> Result<ApiResponse, ClientError> {
        let decoded = serde_json::from_slice::<ApiResponse>(&response.body);

        if let Ok(api) = &decoded {
            if let Some(message) = api.error_message() {
                return Err(ClientError::Api {
                    status: response.status,
                    message,
                });
            }
        }

        if !response.is_success() {
            match self.status_policy {
                StatusPolicy::Strict => {
                    return Err(ClientError::UnexpectedStatus {
                        status: response.status,
                        body: response.text(),
                    });
                }
                StatusPolicy::Lenient => {
                    warn!(http_status = response.status, "Unexpected HTTP status from CloudSight");
                }
            }
        }

        Ok(decoded?)
    }
}

fn with_default_locale(params: Option<Params>) -> Params {
    let mut params = params.unwrap_or_default();
    if !params.contains_key(LOCALE_KEY) {
        params.set_locale(DEFAULT_LOCALE);
    }
    params
}

fn form_fields(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("API key cannot be empty")]
    MissingKey,

    #[error("API secret cannot be empty")]
    MissingSecret,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode CloudSight response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("API error: {message}, status code: {status}")]
    Api { status: u16, message: String },

    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Error reposting job: {body}, status: {status}")]
    Repost { status: u16, body: String },

    #[error("Poll timed out")]
    Timeout,

    #[error("The job needs to have the timeout status, got {0:?}")]
    InvalidRepostStatus(JobStatus),

    #[error("Request signing failed: {0}")]
    Signer(#[from] SignerError),

    #[error("Invalid request parameters: {0}")]
    Param(#[from] ParamError),
}
