// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Version reported to the vendor API.
pub const APP_VERSION: &str = "0.1.1";

/// Client version reported to the vendor API.
pub const CLIENT_VERSION: &str = "0.1.1";

/// Client model reported to the vendor API.
pub const CLIENT_MODEL: &str = "rust";

/// Default bounded wait on control calls.
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials and tuning for one bridge instance.
///
/// # Examples
///
/// ```
/// use duwi_bridge::config::BridgeConfig;
///
/// let config: BridgeConfig = serde_json::from_str(r#"{
///     "app_key": "key",
///     "app_secret": "secret",
///     "access_token": "token",
///     "house_no": "h1"
/// }"#).unwrap();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.control_timeout.as_secs(), 10);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Application key issued by the vendor.
    pub app_key: String,
    /// Application secret used for request signing.
    pub app_secret: String,
    /// Session access token.
    pub access_token: String,
    /// Refresh token, if the host rotates sessions.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// House the bridge synchronizes.
    pub house_no: String,
    /// Display name of the house.
    #[serde(default)]
    pub house_name: Option<String>,
    /// Control API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bounded wait on control calls.
    #[serde(default = "default_control_timeout", with = "duration_secs")]
    pub control_timeout: Duration,
    /// Quiet period for debounced publishes.
    #[serde(default = "default_publish_delay", with = "duration_secs")]
    pub publish_delay: Duration,
}

fn default_control_timeout() -> Duration {
    DEFAULT_CONTROL_TIMEOUT
}

fn default_publish_delay() -> Duration {
    crate::publish::DEFAULT_PUBLISH_DELAY
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

impl BridgeConfig {
    /// Creates a configuration with default tuning.
    #[must_use]
    pub fn new(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        access_token: impl Into<String>,
        house_no: impl Into<String>,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            access_token: access_token.into(),
            refresh_token: None,
            house_no: house_no.into(),
            house_name: None,
            base_url: None,
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
            publish_delay: crate::publish::DEFAULT_PUBLISH_DELAY,
        }
    }

    /// Checks that all required values are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` for blank credentials, or
    /// `ConfigError::Invalid` for a zero control timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_key.trim().is_empty() {
            return Err(ConfigError::Missing("app_key"));
        }
        if self.app_secret.trim().is_empty() {
            return Err(ConfigError::Missing("app_secret"));
        }
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::Missing("access_token"));
        }
        if self.house_no.trim().is_empty() {
            return Err(ConfigError::Missing("house_no"));
        }
        if self.control_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "control_timeout",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults() {
        let config = BridgeConfig::new("k", "s", "t", "h");
        assert_eq!(config.control_timeout, DEFAULT_CONTROL_TIMEOUT);
        assert_eq!(config.publish_delay.as_secs(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let config = BridgeConfig::new(" ", "s", "t", "h");
        assert_eq!(config.validate(), Err(ConfigError::Missing("app_key")));

        let config = BridgeConfig::new("k", "s", "t", "");
        assert_eq!(config.validate(), Err(ConfigError::Missing("house_no")));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = BridgeConfig::new("k", "s", "t", "h");
        config.control_timeout = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "control_timeout", .. })
        ));
    }

    #[test]
    fn deserializes_with_custom_tuning() {
        let config: BridgeConfig = serde_json::from_str(
            r#"{
                "app_key": "k",
                "app_secret": "s",
                "access_token": "t",
                "house_no": "h",
                "control_timeout": 5,
                "publish_delay": 0.5
            }"#,
        )
        .unwrap();
        assert_eq!(config.control_timeout, Duration::from_secs(5));
        assert_eq!(config.publish_delay, Duration::from_millis(500));
    }
}
