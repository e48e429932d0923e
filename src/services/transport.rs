use std::future::Future;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::multipart;
use reqwest::Method;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("cloudsight-rs/", env!("CARGO_PKG_VERSION"));

/// Request body shapes the CloudSight API accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded` fields.
    Form(Vec<(String, String)>),
    /// Image upload plus text fields.
    Multipart {
        field: String,
        filename: String,
        content_type: String,
        data: Vec<u8>,
        fields: Vec<(String, String)>,
    },
}

/// An authenticated request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub authorization: String,
    pub body: RequestBody,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests on behalf of the client. Connection pooling and
/// transport-level timeouts belong to the implementation.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, reqwest::Error>> + Send;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
        let is_post = request.method == Method::POST;
        let builder = self
            .http
            .request(request.method, &request.url)
            .header(AUTHORIZATION, request.authorization);

        let builder = match request.body {
            RequestBody::Empty if is_post => builder.header(CONTENT_LENGTH, 0),
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart {
                field,
                filename,
                content_type,
                data,
                fields,
            } => {
                let part = multipart::Part::bytes(data)
                    .file_name(filename)
                    .mime_str(&content_type)?;
                let form = fields
                    .into_iter()
                    .fold(multipart::Form::new().part(field, part), |form, (k, v)| {
                        form.text(k, v)
                    });
                builder.multipart(form)
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}
