// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Duwi bridge library.
//!
//! This module provides the error hierarchy for failures across the
//! library: value validation, push-message parsing, control transport,
//! and configuration loading.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while parsing a push message or API payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred while talking to the vendor control API.
    #[error("control error: {0}")]
    Control(#[from] ControlError),

    /// Error occurred while loading or validating configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to value validation and constraints.
///
/// These errors occur when attempting to create constrained types
/// with invalid values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// A hue value is outside the valid range (0-360).
    #[error("hue value {0} is out of range [0, 360]")]
    InvalidHue(u16),

    /// A saturation value is outside the valid range (0-100).
    #[error("saturation value {0} is out of range [0, 100]")]
    InvalidSaturation(u8),

    /// A fractional level is outside [0.0, 1.0].
    #[error("level {0} is out of range [0.0, 1.0]")]
    InvalidLevel(f32),

    /// A color temperature range is empty or inverted.
    #[error("color temperature range [{min}, {max}] is empty")]
    EmptyRange {
        /// Lower bound of the rejected range, in Kelvin.
        min: u16,
        /// Upper bound of the rejected range, in Kelvin.
        max: u16,
    },

    /// A playback progress string is not in `mm:ss` form.
    #[error("invalid playback progress: {0}")]
    InvalidProgress(String),
}

/// Errors related to parsing push messages and API responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the message.
    #[error("missing field in message: {0}")]
    MissingField(String),

    /// Unexpected message format.
    #[error("unexpected message format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Errors related to the vendor control transport.
#[derive(Debug, Error)]
pub enum ControlError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Control call timed out.
    #[error("control call timed out after {0} ms")]
    Timeout(u64),

    /// The API answered with a body the client could not interpret.
    #[error("unexpected control response: {0}")]
    UnexpectedResponse(String),
}

/// Errors related to bridge configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required credential or identifier is empty.
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    /// A configuration value is present but unusable.
    #[error("invalid configuration value for {field}: {message}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
