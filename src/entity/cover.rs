// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cover entity.
//!
//! Roll covers move between 0 (closed) and 100 (open); shutters add a
//! slat tilt, sent to the device as an angle in degrees under both wire
//! spellings the firmware understands.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;

use crate::model::DeviceInfo;
use crate::publish::{StatePublisher, StateSink};
use crate::push::{Action, EntityUpdate};
use crate::registry::{DeviceRegistry, EntityKey, UpdateHandler};
use crate::types::{Position, TiltPosition};

use super::{Controller, DispatchOutcome, EntityContext, EntityInfo};

/// The cover kinds Duwi ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverKind {
    /// Roller blind with position control only.
    Roll,
    /// Shutter with position and slat tilt.
    Shutter,
}

impl CoverKind {
    /// Parses the vendor type string (`roll`, `shutter`).
    #[must_use]
    pub fn from_type(value: &str) -> Option<Self> {
        match value {
            "roll" => Some(Self::Roll),
            "shutter" => Some(Self::Shutter),
            _ => None,
        }
    }

    /// Returns `true` if the cover has tilt control.
    #[must_use]
    pub const fn supports_tilt(&self) -> bool {
        matches!(self, Self::Shutter)
    }
}

/// Attribute snapshot of a cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverAttrs {
    /// Whether the device is reachable.
    pub available: bool,
    /// Current position.
    pub position: Position,
    /// Current tilt, for shutters.
    pub tilt: Option<TiltPosition>,
    /// Whether the cover is fully closed.
    pub is_closed: bool,
}

/// One cover.
pub struct Cover {
    info: EntityInfo,
    kind: CoverKind,
    attrs: RwLock<CoverAttrs>,
    ctrl: Controller,
}

impl Cover {
    /// Creates a cover entity.
    #[must_use]
    pub fn new(
        info: EntityInfo,
        kind: CoverKind,
        ctx: Arc<EntityContext>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let publisher = StatePublisher::with_delay(sink, ctx.publish_delay);
        Self {
            ctrl: Controller::new(&info, ctx, publisher),
            info,
            kind,
            attrs: RwLock::new(CoverAttrs {
                is_closed: true,
                ..CoverAttrs::default()
            }),
        }
    }

    /// Creates a cover from a discovery record, seeding its state.
    #[must_use]
    pub fn from_device(
        device: &DeviceInfo,
        kind: CoverKind,
        ctx: Arc<EntityContext>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let cover = Self::new(EntityInfo::from_device(device), kind, ctx, sink);
        {
            let mut attrs = cover.attrs.write();
            attrs.available = device.value_bool("online").unwrap_or(false);
            if let Some(pct) = device.value_f64("control_percent") {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let position = Position::clamped(pct.round().clamp(0.0, 100.0) as u8);
                attrs.position = position;
                attrs.is_closed = position.is_closed();
            }
            if kind.supports_tilt() {
                let angle = device
                    .value_f64("angle_degree")
                    .or_else(|| device.value_f64("light_angle"));
                if let Some(angle) = angle {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let tilt = TiltPosition::from_angle(angle.round().clamp(0.0, 360.0) as u16);
                    attrs.tilt = Some(tilt);
                }
            }
        }
        cover
    }

    /// Returns the entity's registry key.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey::device(&self.info.device_no)
    }

    /// Returns the entity's identity.
    #[must_use]
    pub fn info(&self) -> &EntityInfo {
        &self.info
    }

    /// Returns the cover kind.
    #[must_use]
    pub fn kind(&self) -> CoverKind {
        self.kind
    }

    /// Returns the current attribute snapshot.
    #[must_use]
    pub fn attrs(&self) -> CoverAttrs {
        self.attrs.read().clone()
    }

    /// Registers this entity's update handler under its own key and its
    /// terminal.
    pub fn attach(self: &Arc<Self>, registry: &DeviceRegistry) {
        let entity = Arc::clone(self);
        let handler: UpdateHandler = Arc::new(move |update| {
            let entity = Arc::clone(&entity);
            Box::pin(async move { entity.handle_update(update).await })
        });
        registry.register(self.key(), Arc::clone(&handler));
        registry.register_under_terminal(self.info.terminal_sequence.clone(), self.key(), handler);
    }

    fn apply_set_position(&self, position: Position) {
        let mut attrs = self.attrs.write();
        attrs.position = position;
        attrs.is_closed = position.is_closed();
        self.ctrl
            .add_param("control_percent", json!(position.value()));
    }

    fn apply_set_tilt(&self, tilt: TiltPosition) {
        self.attrs.write().tilt = Some(tilt);
        let angle = tilt.to_angle();
        // The firmware understands either spelling depending on model.
        self.ctrl.add_param("angle_degree", json!(angle));
        self.ctrl.add_param("light_angle", json!(angle));
    }

    async fn dispatch_with_rollback(&self, snapshot: CoverAttrs) -> DispatchOutcome {
        let outcome = self.ctrl.dispatch().await;
        if outcome.is_failure() {
            *self.attrs.write() = snapshot;
        }
        outcome
    }

    /// Opens the cover completely.
    pub async fn open(&self) -> DispatchOutcome {
        self.set_position(Position::OPEN).await
    }

    /// Closes the cover completely.
    pub async fn close(&self) -> DispatchOutcome {
        self.set_position(Position::CLOSED).await
    }

    /// Moves the cover to a position.
    pub async fn set_position(&self, position: Position) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_set_position(position);
        self.dispatch_with_rollback(snapshot).await
    }

    /// Stops the cover mid-travel.
    pub async fn stop(&self) -> DispatchOutcome {
        self.ctrl.add_param("control", json!("stop"));
        self.ctrl.dispatch().await
    }

    /// Opens the slat tilt completely.
    pub async fn open_tilt(&self) -> DispatchOutcome {
        self.set_tilt(TiltPosition::OPEN).await
    }

    /// Closes the slat tilt completely.
    pub async fn close_tilt(&self) -> DispatchOutcome {
        self.set_tilt(TiltPosition::CLOSED).await
    }

    /// Moves the slat tilt to a position.
    pub async fn set_tilt(&self, tilt: TiltPosition) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_set_tilt(tilt);
        self.dispatch_with_rollback(snapshot).await
    }

    /// Stops a tilt movement.
    pub async fn stop_tilt(&self) -> DispatchOutcome {
        self.ctrl.add_param("control", json!("stop"));
        self.ctrl.dispatch().await
    }

    fn set_available(&self, online: bool) {
        self.attrs.write().available = online;
        self.ctrl.publisher().publish_now();
    }

    /// Applies one inbound update.
    pub async fn handle_update(&self, update: EntityUpdate) {
        let _gate = self.ctrl.close_gate();
        match update.action {
            Action::SetCoverPosition { position } => {
                self.apply_set_position(position);
                let _ = self.ctrl.dispatch().await;
            }
            Action::SetCoverTiltPosition { tilt } => {
                self.apply_set_tilt(tilt);
                let _ = self.ctrl.dispatch().await;
            }
            Action::Availability { online } => self.set_available(online),
            _ => {
                if let Some(online) = update.payload.online {
                    self.set_available(online);
                }
            }
        }
    }
}

impl std::fmt::Debug for Cover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cover")
            .field("device_no", &self.info.device_no)
            .field("kind", &self.kind)
            .field("attrs", &self.attrs())
            .finish()
    }
}
