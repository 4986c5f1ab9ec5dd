// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switch entity.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;

use crate::model::DeviceInfo;
use crate::publish::{StatePublisher, StateSink};
use crate::push::{Action, EntityUpdate};
use crate::registry::{DeviceRegistry, EntityKey, UpdateHandler};

use super::{Controller, DispatchOutcome, EntityContext, EntityInfo};

/// Attribute snapshot of a switch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchAttrs {
    /// Whether the device is reachable.
    pub available: bool,
    /// Whether the relay is on.
    pub is_on: bool,
}

/// One on/off relay.
pub struct Switch {
    info: EntityInfo,
    attrs: RwLock<SwitchAttrs>,
    ctrl: Controller,
}

impl Switch {
    /// Creates a switch entity.
    #[must_use]
    pub fn new(info: EntityInfo, ctx: Arc<EntityContext>, sink: Arc<dyn StateSink>) -> Self {
        let publisher = StatePublisher::with_delay(sink, ctx.publish_delay);
        Self {
            ctrl: Controller::new(&info, ctx, publisher),
            info,
            attrs: RwLock::new(SwitchAttrs::default()),
        }
    }

    /// Creates a switch from a discovery record, seeding its state.
    #[must_use]
    pub fn from_device(
        device: &DeviceInfo,
        ctx: Arc<EntityContext>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let switch = Self::new(EntityInfo::from_device(device), ctx, sink);
        {
            let mut attrs = switch.attrs.write();
            attrs.is_on = device.value_str("switch") == Some("on");
            attrs.available = device.value_bool("online").unwrap_or(false);
        }
        switch
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

    /// Returns the current attribute snapshot.
    #[must_use]
    pub fn attrs(&self) -> SwitchAttrs {
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

    fn apply_turn_on(&self) {
        self.attrs.write().is_on = true;
        self.ctrl.add_param("switch", json!("on"));
    }

    fn apply_turn_off(&self) {
        self.attrs.write().is_on = false;
        self.ctrl.add_param("switch", json!("off"));
    }

    async fn dispatch_with_rollback(&self, snapshot: SwitchAttrs) -> DispatchOutcome {
        let outcome = self.ctrl.dispatch().await;
        if outcome.is_failure() {
            *self.attrs.write() = snapshot;
        }
        outcome
    }

    /// Turns the switch on.
    pub async fn turn_on(&self) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_turn_on();
        self.dispatch_with_rollback(snapshot).await
    }

    /// Turns the switch off.
    pub async fn turn_off(&self) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_turn_off();
        self.dispatch_with_rollback(snapshot).await
    }

    /// Flips the switch.
    pub async fn toggle(&self) -> DispatchOutcome {
        if self.attrs.read().is_on {
            self.turn_off().await
        } else {
            self.turn_on().await
        }
    }

    /// Applies one inbound update.
    pub async fn handle_update(&self, update: EntityUpdate) {
        let _gate = self.ctrl.close_gate();
        match update.action {
            Action::TurnOn => {
                self.apply_turn_on();
                let _ = self.ctrl.dispatch().await;
            }
            Action::TurnOff => {
                self.apply_turn_off();
                let _ = self.ctrl.dispatch().await;
            }
            Action::Toggle => {
                if self.attrs.read().is_on {
                    self.apply_turn_off();
                } else {
                    self.apply_turn_on();
                }
                let _ = self.ctrl.dispatch().await;
            }
            Action::Availability { online } => {
                self.attrs.write().available = online;
                self.ctrl.publisher().publish_now();
            }
            _ => {
                if let Some(online) = update.payload.online {
                    self.attrs.write().available = online;
                    self.ctrl.publisher().publish_now();
                }
            }
        }
    }
}

impl std::fmt::Debug for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switch")
            .field("device_no", &self.info.device_no)
            .field("attrs", &self.attrs())
            .finish()
    }
}
