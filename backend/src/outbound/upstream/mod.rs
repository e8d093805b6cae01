//! Reqwest-backed client for the hardware tier.
//!
//! Owns transport details only: URL assembly, request timeout, HTTP error
//! mapping, and decoding of the hardware tier's JSON bodies. Error bodies
//! that carry the `{code, message}` envelope are relayed as domain errors;
//! everything else is a transport failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::domain::ports::{
    PumpStateChange, UpstreamError, UpstreamForwardError, UpstreamPumpService,
};
use crate::domain::{Error, PumpAction, PumpName};

/// Default per-request timeout for forwarded commands.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the hardware tier's pump API.
pub struct HttpPumpClient {
    client: Client,
    base_url: String,
}

impl HttpPumpClient {
    /// Build a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { client, base_url })
    }

    fn command_url(&self, name: &PumpName, action: PumpAction) -> String {
        format!("{}/pump/{}/{}", self.base_url, name, action.as_str())
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

fn map_transport_error(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::timeout(error.to_string())
    } else {
        UpstreamError::transport(error.to_string())
    }
}

/// Turn a non-success downstream response into a forwardable error.
///
/// A decodable `{code, message}` body is relayed verbatim; anything else
/// reports the status with a short body preview.
fn map_status_error(status: StatusCode, body: &[u8]) -> UpstreamForwardError {
    if let Ok(error) = serde_json::from_slice::<Error>(body) {
        return UpstreamForwardError::Downstream(error);
    }

    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };
    UpstreamForwardError::Transport(UpstreamError::transport(message))
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

fn decode_state_change(body: &[u8]) -> Result<PumpStateChange, UpstreamError> {
    serde_json::from_slice(body)
        .map_err(|error| UpstreamError::transport(format!("invalid pump service payload: {error}")))
}

#[async_trait]
impl UpstreamPumpService for HttpPumpClient {
    async fn set_state(
        &self,
        name: &PumpName,
        action: PumpAction,
    ) -> Result<PumpStateChange, UpstreamForwardError> {
        let response = self
            .client
            .post(self.command_url(name, action))
            .send()
            .await
            .map_err(|err| UpstreamForwardError::Transport(map_transport_error(err)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| UpstreamForwardError::Transport(map_transport_error(err)))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        decode_state_change(body.as_ref()).map_err(UpstreamForwardError::Transport)
    }

    async fn health(&self) -> Result<serde_json::Value, UpstreamError> {
        let response = self
            .client
            .get(self.health_url())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(UpstreamError::transport(format!(
                "status {}: {}",
                status.as_u16(),
                body_preview(body.as_ref())
            )));
        }

        serde_json::from_slice(body.as_ref()).map_err(|error| {
            UpstreamError::transport(format!("invalid health payload: {error}"))
        })
    }
}
