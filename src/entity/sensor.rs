// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric sensor entity.
//!
//! One physical Duwi sensor device reports several measurements in one
//! frame; each measurement becomes its own entity, registered under a key
//! scoped by the sensor kind. Sensors are read-only: there is no control
//! gate and no command composer, every update goes straight to the
//! debounced publish path.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::DeviceInfo;
use crate::publish::{StatePublisher, StateSink};
use crate::push::{Action, EntityUpdate, SensorField};
use crate::registry::{DeviceRegistry, EntityKey, UpdateHandler};

use super::{EntityContext, EntityInfo};

impl SensorField {
    /// Returns the measurement unit, if the kind has a fixed one.
    #[must_use]
    pub const fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Temperature => Some("°C"),
            Self::Humidity => Some("%"),
            Self::Illuminance => Some("lx"),
            Self::Formaldehyde
            | Self::Pm25
            | Self::CarbonDioxide
            | Self::AirQuality
            | Self::CarbonMonoxide
            | Self::Tvoc => Some("ppm"),
        }
    }
}

/// Attribute snapshot of a sensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorAttrs {
    /// Whether the device is reachable.
    pub available: bool,
    /// Last reading, if any was received.
    pub value: Option<f64>,
}

/// One numeric measurement of a sensor device.
pub struct Sensor {
    info: EntityInfo,
    kind: SensorField,
    attrs: RwLock<SensorAttrs>,
    publisher: StatePublisher,
}

impl Sensor {
    /// Creates a sensor entity.
    #[must_use]
    pub fn new(
        info: EntityInfo,
        kind: SensorField,
        ctx: &EntityContext,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        Self {
            publisher: StatePublisher::with_delay(sink, ctx.publish_delay),
            info,
            kind,
            attrs: RwLock::new(SensorAttrs::default()),
        }
    }

    /// Creates a sensor from a discovery record, seeding its state.
    #[must_use]
    pub fn from_device(
        device: &DeviceInfo,
        kind: SensorField,
        ctx: &EntityContext,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let sensor = Self::new(EntityInfo::from_device(device), kind, ctx, sink);
        {
            let mut attrs = sensor.attrs.write();
            attrs.available = device.value_bool("online").unwrap_or(false);
            attrs.value = device.value_f64(kind.field_name());
        }
        sensor
    }

    /// Returns the entity's registry key, scoped by sensor kind.
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
    pub fn kind(&self) -> SensorField {
        self.kind
    }

    /// Returns the current attribute snapshot.
    #[must_use]
    pub fn attrs(&self) -> SensorAttrs {
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
            Action::SensorValue { value } => {
                self.attrs.write().value = Some(value);
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

impl std::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sensor")
            .field("device_no", &self.info.device_no)
            .field("kind", &self.kind)
            .field("attrs", &self.attrs())
            .finish()
    }
}
