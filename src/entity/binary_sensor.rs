// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary sensor entity.
//!
//! Motion and contact states of Duwi sensor devices. Read-only like
//! [`Sensor`](super::Sensor): every update goes to the debounced publish
//! path.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::DeviceInfo;
use crate::publish::{StatePublisher, StateSink};
use crate::push::{Action, BinaryField, EntityUpdate};
use crate::registry::{DeviceRegistry, EntityKey, UpdateHandler};

use super::{EntityContext, EntityInfo};

impl BinaryField {
    /// Returns the device class the host should render this kind as.
    #[must_use]
    pub const fn device_class(&self) -> &'static str {
        match self {
            Self::Human => "motion",
            Self::Trigger => "opening",
        }
    }
}

/// Attribute snapshot of a binary sensor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinarySensorAttrs {
    /// Whether the device is reachable.
    pub available: bool,
    /// Whether the sensor is triggered.
    pub is_on: bool,
}

/// One binary state of a sensor device.
pub struct BinarySensor {
    info: EntityInfo,
    kind: BinaryField,
    attrs: RwLock<BinarySensorAttrs>,
    publisher: StatePublisher,
}

impl BinarySensor {
    /// Creates a binary sensor entity.
    #[must_use]
    pub fn new(
        info: EntityInfo,
        kind: BinaryField,
        ctx: &EntityContext,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        Self {
            publisher: StatePublisher::with_delay(sink, ctx.publish_delay),
            info,
            kind,
            attrs: RwLock::new(BinarySensorAttrs::default()),
        }
    }

    /// Creates a binary sensor from a discovery record, seeding its state.
    #[must_use]
    pub fn from_device(
        device: &DeviceInfo,
        kind: BinaryField,
        ctx: &EntityContext,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let sensor = Self::new(EntityInfo::from_device(device), kind, ctx, sink);
        {
            let mut attrs = sensor.attrs.write();
            attrs.available = device.value_bool("online").unwrap_or(false);
            attrs.is_on = device.value_bool(kind.field_name()).unwrap_or(false);
        }
        sensor
    }

    /// Returns the entity's registry key, scoped by kind.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey::scoped(self.kind.slug(), &self.info.device_no)
    }

    /// Returns the entity's identity.
    #[must_use]
    pub fn info(&self) -> &EntityInfo {
        &self.info
    }

    /// Returns the sensor kind.
    #[must_use]
    pub fn kind(&self) -> BinaryField {
        self.kind
    }

    /// Returns the current attribute snapshot.
    #[must_use]
    pub fn attrs(&self) -> BinarySensorAttrs {
        self.attrs.read().clone()
    }

    /// Registers this entity's update handler under its scoped key and its
    /// terminal.
    pub fn attach(self: &Arc<Self>, registry: &DeviceRegistry) {
        let entity = Arc::clone(self);
        let handler: UpdateHandler = Arc::new(move |update| {
            let entity = Arc::clone(&entity);
            Box::pin(async move { entity.handle_update(update) })
        });
        registry.register(self.key(), Arc::clone(&handler));
        registry.register_under_terminal(self.info.terminal_sequence.clone(), self.key(), handler);
    }

    /// Applies one inbound update and schedules a debounced publish.
    pub fn handle_update(&self, update: EntityUpdate) {
        match update.action {
            Action::BinaryValue { value } => {
                self.attrs.write().is_on = value;
            }
            Action::Availability { online } => {
                self.attrs.write().available = online;
            }
            _ => {
                if let Some(online) = update.payload.online {
                    self.attrs.write().available = online;
                }
            }
        }
        self.publisher.schedule_publish();
    }
}

impl std::fmt::Debug for BinarySensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinarySensor")
            .field("device_no", &self.info.device_no)
            .field("kind", &self.kind)
            .field("attrs", &self.attrs())
            .finish()
    }
}
