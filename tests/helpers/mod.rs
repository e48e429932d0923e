//! Test helpers: an in-memory transport that replays scripted responses and
//! records every request with the (possibly paused) tokio clock.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cloudsight::services::transport::{HttpRequest, HttpResponse, RequestBody, Transport};
use cloudsight::{ClientConfig, CloudSightClient, Job};
use reqwest::Method;
use serde_json::Value;
use tokio::time::Instant;

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub authorization: String,
    pub body: RequestBody,
    pub at: Instant,
}

#[derive(Default)]
struct Script {
    queued: VecDeque<HttpResponse>,
    fallback: Option<HttpResponse>,
    calls: Vec<RecordedCall>,
}

/// Replays queued responses in order, then repeats the fallback forever.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.script.lock().unwrap().queued.push_back(json_response(status, body));
        self
    }

    pub fn push_raw(&self, status: u16, body: &str) -> &Self {
        self.script.lock().unwrap().queued.push_back(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        });
        self
    }

    pub fn fallback_json(&self, status: u16, body: Value) -> &Self {
        self.script.lock().unwrap().fallback = Some(json_response(status, body));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Calls made against the poll endpoint.
    pub fn polls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == Method::GET && call.url.contains("/image_responses/"))
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(RecordedCall {
            method: request.method,
            url: request.url,
            authorization: request.authorization,
            body: request.body,
            at: Instant::now(),
        });
        let response = script
            .queued
            .pop_front()
            .or_else(|| script.fallback.clone())
            .expect("scripted transport ran out of responses");
        Ok(response)
    }
}

fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

pub const TEST_BASE_URL: &str = "http://cloudsight.test";

pub fn scripted_client(transport: &ScriptedTransport) -> CloudSightClient<ScriptedTransport> {
    let config = ClientConfig::simple("test-key").with_base_url(TEST_BASE_URL);
    CloudSightClient::with_transport(&config, transport.clone()).unwrap()
}

/// Submit a remote image and get back a job in the given status.
pub async fn submitted_job(
    client: &CloudSightClient<ScriptedTransport>,
    transport: &ScriptedTransport,
    status: &str,
) -> Job {
    transport.push_json(200, serde_json::json!({ "token": "abc", "status": status, "ttl": 0 }));
    client
        .remote_image_request("http://example.com/cat.jpg", None)
        .await
        .unwrap()
}
