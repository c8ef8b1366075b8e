//! Ingress API client (event producer → evrelay ingress).

use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::objects::{ErrorResponse, EventSubmission, StatusResponse};

/// Typed HTTP client for the evrelay ingress.
///
/// The shared token travels inside the submission body, so the client itself
/// holds no credentials.
#[derive(Debug, Clone)]
pub struct IngressClient {
    http: Client,
    base_url: Url,
}

impl IngressClient {
    /// Create a new `IngressClient`.
    ///
    /// * `base_url` – root URL of the ingress (e.g. `https://relay.example.com`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /` – liveness check. Returns the plain-text banner.
    pub async fn liveness(&self) -> Result<String, ClientError> {
        let url = self.base_url.join("/")?;
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(api_error(status, body));
        }
        Ok(body)
    }

    /// `POST /process` – submit one event for queueing.
    pub async fn submit(&self, submission: &EventSubmission) -> Result<StatusResponse, ClientError> {
        let url = self.base_url.join("/process")?;
        let resp = self.http.post(url).json(submission).send().await?;
        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(api_error(status, body));
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

fn api_error(status: reqwest::StatusCode, body: String) -> ClientError {
    let error = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .map(|e| e.error);
    ClientError::Api {
        status,
        error,
        body,
    }
}
