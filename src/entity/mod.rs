// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local entity types and the shared command/update machinery.
//!
//! Every device type follows the same pattern: attribute mutations are
//! composed into a pending command and dispatched once. With the control
//! gate open (a user command) the parameters go to the vendor API and a
//! confirmed change publishes immediately; with the gate closed (an
//! inbound echo) the network call is skipped and the publish is debounced.
//! [`Controller`] is that pattern, shared by all entity types.

mod binary_sensor;
mod cover;
mod light;
mod media_player;
mod sensor;
mod switch;

pub use binary_sensor::{BinarySensor, BinarySensorAttrs};
pub use cover::{Cover, CoverAttrs, CoverKind};
pub use light::{ColorMode, Light, LightAttrs, LightKind, TurnOnRequest};
pub use media_player::{MediaAttrs, MediaKind, MediaPlayer, PlaybackState};
pub use sensor::{Sensor, SensorAttrs};
pub use switch::{Switch, SwitchAttrs};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::config::DEFAULT_CONTROL_TIMEOUT;
use crate::control::{ControlClient, ControlRequest, PendingCommand, StatusCode};
use crate::gate::{ControlGate, GateGuard};
use crate::model::DeviceInfo;
use crate::publish::{DEFAULT_PUBLISH_DELAY, StatePublisher};
use crate::report::FailureLog;

/// Area assigned to entities whose device carries no room information.
pub const DEFAULT_ROOM: &str = "default room";

/// Services shared by every entity of one bridge instance.
pub struct EntityContext {
    /// Vendor control client.
    pub control: Arc<dyn ControlClient>,
    /// User-visible failure sink.
    pub failures: Arc<dyn FailureLog>,
    /// Bounded wait applied to each control call.
    pub control_timeout: Duration,
    /// Quiet period for debounced publishes.
    pub publish_delay: Duration,
}

impl EntityContext {
    /// Creates a context with default tuning.
    #[must_use]
    pub fn new(control: Arc<dyn ControlClient>, failures: Arc<dyn FailureLog>) -> Self {
        Self {
            control,
            failures,
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
            publish_delay: DEFAULT_PUBLISH_DELAY,
        }
    }

    /// Overrides the control-call timeout.
    #[must_use]
    pub fn with_control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    /// Overrides the publish debounce delay.
    #[must_use]
    pub fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = delay;
        self
    }
}

impl std::fmt::Debug for EntityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityContext")
            .field("control_timeout", &self.control_timeout)
            .field("publish_delay", &self.publish_delay)
            .finish()
    }
}

/// Identity and location of one entity.
#[derive(Debug, Clone, Default)]
pub struct EntityInfo {
    /// Stable device (or device group) number.
    pub device_no: String,
    /// Display name of the device.
    pub device_name: String,
    /// House the device belongs to.
    pub house_no: String,
    /// Room display name.
    pub room_name: Option<String>,
    /// Floor display name.
    pub floor_name: Option<String>,
    /// Terminal the device hangs off.
    pub terminal_sequence: String,
    /// Route number on the terminal.
    pub route_num: u8,
    /// Whether the number addresses a device group.
    pub is_group: bool,
}

impl EntityInfo {
    /// Builds entity identity from a discovery record.
    #[must_use]
    pub fn from_device(device: &DeviceInfo) -> Self {
        let device_no = if device.device_no.is_empty() {
            device.device_group_no.clone().unwrap_or_default()
        } else {
            device.device_no.clone()
        };
        Self {
            device_no,
            device_name: device.device_name.clone(),
            house_no: device.house_no.clone(),
            room_name: device.room_name.clone(),
            floor_name: device.floor_name.clone(),
            terminal_sequence: device.terminal_sequence.clone(),
            route_num: device.route_num,
            is_group: device.is_group(),
        }
    }

    /// Returns the user-facing name: room name plus device name.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.room_name.as_deref() {
            Some(room) if !room.is_empty() => format!("{room} {}", self.device_name),
            _ => self.device_name.clone(),
        }
    }

    /// Returns the suggested area: floor plus room, or the default room.
    #[must_use]
    pub fn suggested_area(&self) -> String {
        match (self.floor_name.as_deref(), self.room_name.as_deref()) {
            (Some(floor), Some(room)) if !room.is_empty() => format!("{floor} {room}"),
            (None, Some(room)) if !room.is_empty() => room.to_string(),
            _ => DEFAULT_ROOM.to_string(),
        }
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The vendor API confirmed the command; state was published.
    Sent,
    /// The gate was closed: no network call, publish debounced.
    Suppressed,
    /// Nothing was pending; the dispatch was a no-op.
    Empty,
    /// The vendor API rejected the command (or the call never completed).
    Failed(StatusCode),
}

impl DispatchOutcome {
    /// Returns `true` for [`DispatchOutcome::Failed`].
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Shared command/update machinery of one entity.
///
/// Owns the control gate, the pending command and the publisher, and runs
/// the dispatch routine every entity type shares.
pub(crate) struct Controller {
    device_no: String,
    house_no: String,
    is_group: bool,
    ctx: Arc<EntityContext>,
    publisher: StatePublisher,
    gate: ControlGate,
    pending: Mutex<PendingCommand>,
}

impl Controller {
    pub(crate) fn new(info: &EntityInfo, ctx: Arc<EntityContext>, publisher: StatePublisher) -> Self {
        Self {
            device_no: info.device_no.clone(),
            house_no: info.house_no.clone(),
            is_group: info.is_group,
            ctx,
            publisher,
            gate: ControlGate::new(),
            pending: Mutex::new(PendingCommand::new()),
        }
    }

    /// Appends a parameter to the pending command.
    pub(crate) fn add_param(&self, code: &'static str, value: Value) {
        self.pending.lock().add(code, value);
    }

    /// Returns the number of pending parameters.
    pub(crate) fn param_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Closes the gate for the duration of an inbound transition.
    pub(crate) fn close_gate(&self) -> GateGuard<'_> {
        self.gate.close()
    }

    pub(crate) fn publisher(&self) -> &StatePublisher {
        &self.publisher
    }

    /// Dispatches the pending command.
    ///
    /// The pending parameters are cleared unconditionally: a composition
    /// never spans two dispatches, and a failed call is not retried with
    /// the same set.
    pub(crate) async fn dispatch(&self) -> DispatchOutcome {
        let params = self.pending.lock().take();

        if !self.gate.is_open() {
            self.publisher.schedule_publish();
            return DispatchOutcome::Suppressed;
        }
        if params.is_empty() {
            tracing::debug!(device = %self.device_no, "No pending parameters, skipping dispatch");
            return DispatchOutcome::Empty;
        }

        let request = ControlRequest {
            device_no: self.device_no.clone(),
            house_no: self.house_no.clone(),
            is_group: self.is_group,
            params,
        };
        let status = match tokio::time::timeout(
            self.ctx.control_timeout,
            self.ctx.control.control(&request),
        )
        .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(error)) => {
                tracing::warn!(device = %self.device_no, error = %error, "Control transport failed");
                StatusCode::Unreachable
            }
            Err(_) => StatusCode::Timeout,
        };

        if status.is_success() {
            self.publisher.publish_now();
            DispatchOutcome::Sent
        } else {
            self.ctx.failures.record_failure(&self.device_no, status.clone());
            DispatchOutcome::Failed(status)
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("device_no", &self.device_no)
            .field("gate_open", &self.gate.is_open())
            .field("pending", &self.param_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::publish::StateSink;

    use super::*;

    #[derive(Default)]
    struct MockControl {
        calls: AtomicU32,
        fail_with: parking_lot::Mutex<Option<StatusCode>>,
    }

    #[async_trait]
    impl ControlClient for MockControl {
        async fn control(
            &self,
            _request: &ControlRequest,
        ) -> Result<StatusCode, crate::error::ControlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .fail_with
                .lock()
                .take()
                .unwrap_or(StatusCode::Success))
        }
    }

    struct CountingSink(AtomicU32);

    impl StateSink for CountingSink {
        fn publish(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn controller() -> (Arc<MockControl>, Arc<CountingSink>, Controller) {
        let control = Arc::new(MockControl::default());
        let failures = Arc::new(crate::report::MessageLog::new());
        let sink = Arc::new(CountingSink(AtomicU32::new(0)));
        let ctx = Arc::new(EntityContext::new(
            Arc::clone(&control) as Arc<dyn ControlClient>,
            failures as Arc<dyn FailureLog>,
        ));
        let info = EntityInfo {
            device_no: "d1".to_string(),
            house_no: "h1".to_string(),
            ..EntityInfo::default()
        };
        let publisher = StatePublisher::with_delay(
            Arc::clone(&sink) as Arc<dyn StateSink>,
            ctx.publish_delay,
        );
        let ctrl = Controller::new(&info, ctx, publisher);
        (control, sink, ctrl)
    }

    #[tokio::test]
    async fn empty_dispatch_is_a_no_op() {
        let (control, sink, ctrl) = controller();
        let outcome = ctrl.dispatch().await;
        assert_eq!(outcome, DispatchOutcome::Empty);
        assert_eq!(control.calls.load(Ordering::SeqCst), 0);
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn open_gate_sends_and_publishes() {
        let (control, sink, ctrl) = controller();
        ctrl.add_param("switch", json!("on"));
        let outcome = ctrl.dispatch().await;
        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(control.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn closed_gate_suppresses_the_call() {
        let (control, _sink, ctrl) = controller();
        ctrl.add_param("switch", json!("on"));
        let guard = ctrl.close_gate();
        let outcome = ctrl.dispatch().await;
        drop(guard);
        assert_eq!(outcome, DispatchOutcome::Suppressed);
        assert_eq!(control.calls.load(Ordering::SeqCst), 0);
        // The suppressed dispatch still cleared the composition.
        assert_eq!(ctrl.param_count(), 0);
    }

    #[tokio::test]
    async fn failure_clears_pending_and_reports() {
        let (control, sink, ctrl) = controller();
        *control.fail_with.lock() = Some(StatusCode::SysError);
        ctrl.add_param("switch", json!("on"));
        let outcome = ctrl.dispatch().await;
        assert_eq!(outcome, DispatchOutcome::Failed(StatusCode::SysError));
        assert_eq!(ctrl.param_count(), 0);
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn display_name_includes_room() {
        let info = EntityInfo {
            device_name: "Ceiling Light".to_string(),
            room_name: Some("Kitchen".to_string()),
            ..EntityInfo::default()
        };
        assert_eq!(info.display_name(), "Kitchen Ceiling Light");
    }

    #[test]
    fn display_name_without_room() {
        let info = EntityInfo {
            device_name: "Ceiling Light".to_string(),
            ..EntityInfo::default()
        };
        assert_eq!(info.display_name(), "Ceiling Light");
    }

    #[test]
    fn suggested_area_fallback() {
        let info = EntityInfo::default();
        assert_eq!(info.suggested_area(), DEFAULT_ROOM);

        let info = EntityInfo {
            floor_name: Some("First Floor".to_string()),
            room_name: Some("Kitchen".to_string()),
            ..EntityInfo::default()
        };
        assert_eq!(info.suggested_area(), "First Floor Kitchen");
    }

    #[test]
    fn entity_info_prefers_device_no() {
        let device = DeviceInfo {
            device_no: String::new(),
            device_group_no: Some("g7".to_string()),
            ..DeviceInfo::default()
        };
        let info = EntityInfo::from_device(&device);
        assert_eq!(info.device_no, "g7");
        assert!(info.is_group);
    }
}
