// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vendor control-call contract.
//!
//! This module defines the seam to the Duwi control API: the
//! [`ControlClient`] trait, the [`ControlRequest`] carrying one batch of
//! parameter changes, the [`PendingCommand`] composer entities accumulate
//! parameters into, and the [`StatusCode`] taxonomy of call outcomes.
//!
//! Only the call contract lives here; the HTTP transport is behind the
//! `http` feature in [`HttpControlClient`].

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpControlClient, HttpControlClientBuilder};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::ControlError;

/// Status of a control call.
///
/// The core treats every non-success value uniformly as failure; the
/// variants exist for logging and user-visible messages. `Timeout` and
/// `Unreachable` are synthesized client-side when the bounded wait expires
/// or the transport fails before the API could answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCode {
    /// The command was accepted.
    Success,
    /// Generic server-side error.
    SysError,
    /// The session is not logged in or has expired.
    LoginError,
    /// The application key was rejected.
    AppKeyError,
    /// The request timestamp was outside the accepted window.
    TimestampTimeout,
    /// Global rate limit hit.
    SystemRateLimit,
    /// Per-minute rate limit hit.
    SystemMinuteRateLimit,
    /// Per-hour rate limit hit.
    SystemHourRateLimit,
    /// The gateway reported an internal error.
    GatewaySysError,
    /// The bounded wait on the control call expired (client-side).
    Timeout,
    /// The transport failed before the API answered (client-side).
    Unreachable,
    /// A code this library does not know.
    Other(String),
}

impl StatusCode {
    /// Wire code for success responses.
    pub const SUCCESS_CODE: &'static str = "10000";

    /// Returns `true` for [`StatusCode::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Parses a wire code string.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            Self::SUCCESS_CODE => Self::Success,
            "10001" => Self::SysError,
            "10002" => Self::LoginError,
            "10003" => Self::AppKeyError,
            "10004" => Self::TimestampTimeout,
            "10005" => Self::SystemRateLimit,
            "10006" => Self::SystemMinuteRateLimit,
            "10007" => Self::SystemHourRateLimit,
            "20001" => Self::GatewaySysError,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire code string.
    #[must_use]
    pub fn as_code(&self) -> &str {
        match self {
            Self::Success => Self::SUCCESS_CODE,
            Self::SysError => "10001",
            Self::LoginError => "10002",
            Self::AppKeyError => "10003",
            Self::TimestampTimeout => "10004",
            Self::SystemRateLimit => "10005",
            Self::SystemMinuteRateLimit => "10006",
            Self::SystemHourRateLimit => "10007",
            Self::GatewaySysError => "20001",
            Self::Timeout => "client.timeout",
            Self::Unreachable => "client.unreachable",
            Self::Other(code) => code,
        }
    }

    /// Returns a human-readable message for the user-visible log.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success => "Success",
            Self::SysError => "System Error",
            Self::LoginError => "Login Error",
            Self::AppKeyError => "App Key Error",
            Self::TimestampTimeout => "Timestamp Timeout",
            Self::SystemRateLimit => "System Rate Limit",
            Self::SystemMinuteRateLimit => "System Minute Rate Limit",
            Self::SystemHourRateLimit => "System Hour Rate Limit",
            Self::GatewaySysError => "Gateway System Error",
            Self::Timeout => "Control Call Timed Out",
            Self::Unreachable => "Control API Unreachable",
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.as_code())
    }
}

/// One parameter change in a control request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    /// Parameter name as the API expects it, e.g. `switch` or `color_temp`.
    pub code: &'static str,
    /// Parameter value.
    pub value: Value,
}

/// Ordered accumulator for the parameters of one control call.
///
/// Parameters collected by consecutive mutation methods are sent as a
/// single request. [`PendingCommand::take`] drains the accumulator, so a
/// composition never spans two dispatches.
///
/// # Examples
///
/// ```
/// use duwi_bridge::control::PendingCommand;
/// use serde_json::json;
///
/// let mut pending = PendingCommand::new();
/// pending.add("switch", json!("on"));
/// pending.add("light", json!(80));
/// assert_eq!(pending.len(), 2);
///
/// let params = pending.take();
/// assert_eq!(params.len(), 2);
/// assert!(pending.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PendingCommand {
    params: Vec<Param>,
}

impl PendingCommand {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Appends a parameter.
    pub fn add(&mut self, code: &'static str, value: Value) {
        self.params.push(Param { code, value });
    }

    /// Drains all accumulated parameters.
    #[must_use]
    pub fn take(&mut self) -> Vec<Param> {
        std::mem::take(&mut self.params)
    }

    /// Returns the number of accumulated parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if nothing has been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// One batch of parameter changes addressed to a device or device group.
#[derive(Debug, Clone, Serialize)]
pub struct ControlRequest {
    /// Device (or device group) number.
    pub device_no: String,
    /// House the device belongs to.
    pub house_no: String,
    /// Whether `device_no` addresses a device group.
    pub is_group: bool,
    /// Ordered parameter changes.
    pub params: Vec<Param>,
}

/// Client for the vendor control API.
///
/// Implementations only need to deliver one request and report the API's
/// status code; bounding the wait and interpreting the status is the
/// caller's job.
#[async_trait]
pub trait ControlClient: Send + Sync {
    /// Sends one control request and returns the API status.
    ///
    /// # Errors
    ///
    /// Returns a [`ControlError`] if the request could not be delivered or
    /// the response could not be interpreted.
    async fn control(&self, request: &ControlRequest) -> Result<StatusCode, ControlError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_code_round_trip() {
        for code in ["10000", "10001", "10004", "20001"] {
            assert_eq!(StatusCode::from_code(code).as_code(), code);
        }
    }

    #[test]
    fn unknown_code_is_preserved() {
        let status = StatusCode::from_code("31337");
        assert_eq!(status, StatusCode::Other("31337".to_string()));
        assert_eq!(status.as_code(), "31337");
        assert!(!status.is_success());
    }

    #[test]
    fn only_success_is_success() {
        assert!(StatusCode::Success.is_success());
        assert!(!StatusCode::Timeout.is_success());
        assert!(!StatusCode::GatewaySysError.is_success());
    }

    #[test]
    fn status_display() {
        assert_eq!(StatusCode::SysError.to_string(), "System Error (10001)");
    }

    #[test]
    fn pending_command_accumulates_in_order() {
        let mut pending = PendingCommand::new();
        pending.add("color_temp", json!(4500));
        pending.add("switch", json!("on"));

        let params = pending.take();
        assert_eq!(params[0].code, "color_temp");
        assert_eq!(params[1].code, "switch");
    }

    #[test]
    fn take_clears_unconditionally() {
        let mut pending = PendingCommand::new();
        pending.add("switch", json!("off"));
        let _ = pending.take();
        assert!(pending.is_empty());
        assert!(pending.take().is_empty());
    }

    #[test]
    fn duplicate_codes_are_kept() {
        // Some firmware expects the same parameter under two spellings.
        let mut pending = PendingCommand::new();
        pending.add("play_mode", json!("all"));
        pending.add("play_mode", json!("order"));
        assert_eq!(pending.len(), 2);
    }
}
