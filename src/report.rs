// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User-visible failure reporting.
//!
//! Failed control calls are not surfaced through return values alone; they
//! are appended to a persistent, user-visible log so automations and users
//! can see why a device did not react. The host supplies the sink; the
//! in-memory [`MessageLog`] is the default.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::control::StatusCode;

/// Sink for user-visible failure and status messages.
pub trait FailureLog: Send + Sync {
    /// Records one failed control attempt.
    fn record_failure(&self, device_no: &str, status: StatusCode);

    /// Records a free-form status message.
    fn record_message(&self, message: &str);
}

/// One recorded entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    /// Device the failure belongs to, if any.
    pub device_no: Option<String>,
    /// Status of the failed call, if the entry came from one.
    pub status: Option<StatusCode>,
    /// Human-readable message.
    pub message: String,
    /// When the entry was recorded.
    pub at: DateTime<Utc>,
}

/// Append-only in-memory failure log.
///
/// # Examples
///
/// ```
/// use duwi_bridge::control::StatusCode;
/// use duwi_bridge::report::{FailureLog, MessageLog};
///
/// let log = MessageLog::new();
/// log.record_failure("d1", StatusCode::SysError);
/// assert_eq!(log.len(), 1);
/// assert!(log.records()[0].message.contains("System Error"));
/// ```
#[derive(Debug, Default)]
pub struct MessageLog {
    records: RwLock<Vec<FailureRecord>>,
}

impl MessageLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log behind an `Arc`, ready to share with a bridge.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns a snapshot of all records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<FailureRecord> {
        self.records.read().clone()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl FailureLog for MessageLog {
    fn record_failure(&self, device_no: &str, status: StatusCode) {
        tracing::warn!(device = %device_no, status = %status, "Control call failed");
        self.records.write().push(FailureRecord {
            device_no: Some(device_no.to_string()),
            message: format!("{}: {}", device_no, status.message()),
            status: Some(status),
            at: Utc::now(),
        });
    }

    fn record_message(&self, message: &str) {
        self.records.write().push(FailureRecord {
            device_no: None,
            status: None,
            message: message.to_string(),
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_appended_in_order() {
        let log = MessageLog::new();
        log.record_failure("d1", StatusCode::SysError);
        log.record_failure("d2", StatusCode::Timeout);

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].device_no.as_deref(), Some("d1"));
        assert_eq!(records[1].status, Some(StatusCode::Timeout));
    }

    #[test]
    fn messages_have_no_device() {
        let log = MessageLog::new();
        log.record_message("Successfully initialized bridge");
        let records = log.records();
        assert!(records[0].device_no.is_none());
        assert!(records[0].status.is_none());
    }

    #[test]
    fn empty_log() {
        let log = MessageLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
    }
}
