//! Upstream chat driver client
//!
//! Every completion is a single `POST {api}/drivers/call` against the
//! `puter-chat-completion` interface, authorized with the browser session
//! token and dressed up with the headers the web app itself would send.

use reqwest::header::{
    HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::{
    chat::UpstreamRequest,
    config::Config,
    error::{AppError, AppResult, UpstreamFailure},
    session::Credential,
    streaming::{decode_json_lines, EventStream},
};

const DRIVER_INTERFACE: &str = "puter-chat-completion";
const DRIVER_METHOD: &str = "complete";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Serialize)]
struct DriverCall<'a> {
    interface: &'static str,
    driver: &'a str,
    test_mode: bool,
    method: &'static str,
    args: DriverArgs<'a>,
}

#[derive(Debug, Serialize)]
struct DriverArgs<'a> {
    #[serde(flatten)]
    request: &'a UpstreamRequest,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

impl<'a> DriverCall<'a> {
    fn new(request: &'a UpstreamRequest, stream: bool) -> Self {
        Self {
            interface: DRIVER_INTERFACE,
            driver: &request.driver,
            test_mode: true,
            method: DRIVER_METHOD,
            args: DriverArgs { request, stream },
        }
    }
}

/// Client for the upstream driver endpoint
pub struct UpstreamClient {
    client: reqwest::Client,
    api_url: String,
    site_url: String,
}

impl UpstreamClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.puter_api_url.clone(),
            site_url: config.puter_site_url.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/drivers/call", self.api_url)
    }

    /// Perform a non-streaming completion and return the decoded body.
    #[instrument(
        skip(self, request, credential),
        fields(driver = %request.driver, model = %request.model, token = %credential.preview())
    )]
    pub async fn call(&self, request: &UpstreamRequest, credential: &Credential) -> AppResult<Value> {
        let url = self.endpoint();
        let response = self.send(&url, request, credential, false).await?;
        let status = response.status().as_u16();

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|e| {
            error!(status, body_len = bytes.len(), "Upstream returned a non-JSON body");
            AppError::Upstream(UpstreamFailure::from_message(
                Some(status),
                format!("invalid json response body at {} reason: {}", url, e),
            ))
        })?;

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let failure = UpstreamFailure::from_body(Some(status), body);
            error!(failure = %failure, "Upstream reported an unsuccessful call");
            return Err(AppError::Upstream(failure));
        }

        debug!(status, "Upstream completion received");
        Ok(body)
    }

    /// Open a streaming completion.
    ///
    /// Only the response status is checked here; the returned events are
    /// decoded lazily as the body arrives.
    #[instrument(
        skip(self, request, credential),
        fields(driver = %request.driver, model = %request.model, token = %credential.preview())
    )]
    pub async fn call_stream(
        &self,
        request: &UpstreamRequest,
        credential: &Credential,
    ) -> AppResult<EventStream> {
        let url = self.endpoint();
        let response = self.send(&url, request, credential, true).await?;

        debug!(status = %response.status(), "Upstream stream opened");
        Ok(decode_json_lines(response.bytes_stream()))
    }

    async fn send(
        &self,
        url: &str,
        request: &UpstreamRequest,
        credential: &Credential,
        stream: bool,
    ) -> AppResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .headers(self.headers(credential)?)
            .json(&DriverCall::new(request, stream))
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Failed to reach upstream");
                e
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let failure = match serde_json::from_str::<Value>(&text) {
            Ok(body) => UpstreamFailure::from_body(Some(status), body),
            Err(_) if text.trim().is_empty() => {
                UpstreamFailure::from_message(Some(status), format!("HTTP {}", status))
            }
            Err(_) => UpstreamFailure::from_message(Some(status), text),
        };

        error!(failure = %failure, "Upstream call failed");
        Err(AppError::Upstream(failure))
    }

    fn headers(&self, credential: &Credential) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", credential.as_str())).map_err(|_| {
                AppError::ChannelError("session token is not a valid header value".to_string())
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ORIGIN, header_value(&self.site_url)?);
        headers.insert(REFERER, header_value(&format!("{}/", self.site_url))?);
        Ok(headers)
    }
}

fn header_value(value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid header value {:?}: {}", value, e)))
}
