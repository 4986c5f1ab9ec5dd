// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP implementation of the vendor control API.
//!
//! Devices are controlled through a cloud endpoint: one signed JSON POST
//! per request, `/device/control` for single devices and
//! `/deviceGroup/control` for groups. The signature covers the serialized
//! body, the millisecond timestamp and the app secret.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::config::{APP_VERSION, CLIENT_MODEL, CLIENT_VERSION};
use crate::error::ControlError;

use super::{ControlClient, ControlRequest, StatusCode};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response envelope returned by the control endpoint.
#[derive(Debug, Deserialize)]
struct ControlResponse {
    code: String,
}

/// HTTP client for the Duwi control endpoint.
///
/// # Examples
///
/// ```no_run
/// use duwi_bridge::control::HttpControlClient;
///
/// let client = HttpControlClient::builder()
///     .base_url("https://api.duwi.example")
///     .app_key("key")
///     .app_secret("secret")
///     .access_token("token")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct HttpControlClient {
    http: Client,
    base_url: String,
    app_key: String,
    app_secret: String,
    access_token: String,
}

impl HttpControlClient {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> HttpControlClientBuilder {
        HttpControlClientBuilder::default()
    }

    /// Signs a request body: hex sha256 over key, body, timestamp, secret.
    fn sign(&self, body: &str, timestamp: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.app_key.as_bytes());
        hasher.update(body.as_bytes());
        hasher.update(timestamp.to_string().as_bytes());
        hasher.update(self.app_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn endpoint(&self, is_group: bool) -> String {
        if is_group {
            format!("{}/deviceGroup/control", self.base_url)
        } else {
            format!("{}/device/control", self.base_url)
        }
    }
}

#[async_trait]
impl ControlClient for HttpControlClient {
    async fn control(&self, request: &ControlRequest) -> Result<StatusCode, ControlError> {
        let device_field = if request.is_group {
            "deviceGroupNo"
        } else {
            "deviceNo"
        };
        let body = json!({
            device_field: request.device_no,
            "houseNo": request.house_no,
            "commands": request.params,
        })
        .to_string();

        let timestamp = chrono::Utc::now().timestamp_millis();
        let url = self.endpoint(request.is_group);

        tracing::debug!(url = %url, device = %request.device_no, "Sending control request");

        let response = self
            .http
            .post(&url)
            .header("appkey", &self.app_key)
            .header("accesstoken", &self.access_token)
            .header("time", timestamp.to_string())
            .header("sign", self.sign(&body, timestamp))
            .header("appVersion", APP_VERSION)
            .header("clientVersion", CLIENT_VERSION)
            .header("clientModel", CLIENT_MODEL)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(ControlError::Http)?;

        if !response.status().is_success() {
            return Err(ControlError::UnexpectedResponse(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let parsed: ControlResponse = response
            .json()
            .await
            .map_err(|e| ControlError::UnexpectedResponse(e.to_string()))?;

        let status = StatusCode::from_code(&parsed.code);
        tracing::debug!(device = %request.device_no, status = %status, "Control response");
        Ok(status)
    }
}

/// Builder for [`HttpControlClient`].
#[derive(Debug, Default)]
pub struct HttpControlClientBuilder {
    base_url: Option<String>,
    app_key: Option<String>,
    app_secret: Option<String>,
    access_token: Option<String>,
    timeout: Option<Duration>,
}

impl HttpControlClientBuilder {
    /// Sets the API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the application key.
    #[must_use]
    pub fn app_key(mut self, key: impl Into<String>) -> Self {
        self.app_key = Some(key.into());
        self
    }

    /// Sets the application secret used for request signing.
    #[must_use]
    pub fn app_secret(mut self, secret: impl Into<String>) -> Self {
        self.app_secret = Some(secret.into());
        self
    }

    /// Sets the access token.
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the request timeout (default 10 s).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidAddress` if the base URL is missing or
    /// not HTTP(S), or an HTTP error if the underlying client cannot be
    /// constructed.
    pub fn build(self) -> Result<HttpControlClient, ControlError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ControlError::InvalidAddress("base URL is required".to_string()))?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ControlError::InvalidAddress(base_url));
        }
        let base_url = base_url.trim_end_matches('/').to_string();

        let http = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(ControlError::Http)?;

        Ok(HttpControlClient {
            http,
            base_url,
            app_key: self.app_key.unwrap_or_default(),
            app_secret: self.app_secret.unwrap_or_default(),
            access_token: self.access_token.unwrap_or_default(),
        })
    }
}
