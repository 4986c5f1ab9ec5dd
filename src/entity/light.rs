// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light entity.
//!
//! Covers the seven Duwi light kinds, from plain on/off relays to
//! RGB+CCT fixtures. Brightness, color temperature and HS color changes
//! all accumulate into one control call, so setting a color adjusts hue,
//! saturation and value together.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;

use crate::model::DeviceInfo;
use crate::publish::{StatePublisher, StateSink};
use crate::push::{Action, DevicePayload, EntityUpdate};
use crate::registry::{DeviceRegistry, EntityKey, UpdateHandler};
use crate::types::{Brightness, ColorTempRange, HsColor, HsvColor, Mired};

use super::{Controller, DispatchOutcome, EntityContext, EntityInfo};

/// The light kinds Duwi ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Plain on/off relay.
    OnOff,
    /// Dimmable white.
    Dimmable,
    /// Tunable white without dimming.
    ColorTemp,
    /// Dimmable tunable white.
    DimmableColorTemp,
    /// RGB color.
    Rgb,
    /// RGB plus white channel.
    Rgbw,
    /// RGB plus tunable white channels.
    Rgbcw,
}

impl LightKind {
    /// Parses the vendor type string (`on`, `dim`, `temp`, `dim_temp`,
    /// `rgb`, `rgbw`, `rgbcw`).
    #[must_use]
    pub fn from_type(value: &str) -> Option<Self> {
        match value {
            "on" => Some(Self::OnOff),
            "dim" => Some(Self::Dimmable),
            "temp" => Some(Self::ColorTemp),
            "dim_temp" => Some(Self::DimmableColorTemp),
            "rgb" => Some(Self::Rgb),
            "rgbw" => Some(Self::Rgbw),
            "rgbcw" => Some(Self::Rgbcw),
            _ => None,
        }
    }

    /// Returns `true` if the light has a color channel.
    #[must_use]
    pub const fn is_color(&self) -> bool {
        matches!(self, Self::Rgb | Self::Rgbw | Self::Rgbcw)
    }

    /// Returns `true` if the light accepts a brightness.
    #[must_use]
    pub const fn supports_brightness(&self) -> bool {
        !matches!(self, Self::OnOff | Self::ColorTemp)
    }

    /// Returns `true` if the light accepts a color temperature.
    #[must_use]
    pub const fn supports_color_temp(&self) -> bool {
        matches!(self, Self::ColorTemp | Self::DimmableColorTemp | Self::Rgbcw)
    }
}

/// Active color mode of a light.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// No channel beyond on/off.
    #[default]
    OnOff,
    /// Brightness only.
    Brightness,
    /// Tunable white.
    ColorTemp,
    /// Hue/saturation color.
    Hs,
}

/// Attribute snapshot of a light.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightAttrs {
    /// Whether the device is reachable.
    pub available: bool,
    /// Whether the light is on.
    pub is_on: bool,
    /// Brightness, for kinds that support it.
    pub brightness: Option<Brightness>,
    /// Color temperature, for kinds that support it.
    pub color_temp: Option<Mired>,
    /// Hue/saturation, for color kinds.
    pub hs_color: Option<HsColor>,
    /// Currently active color mode.
    pub color_mode: ColorMode,
}

/// Attributes a turn-on command may set alongside the power state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnOnRequest {
    /// New brightness.
    pub brightness: Option<Brightness>,
    /// New color temperature.
    pub color_temp: Option<Mired>,
    /// New color.
    pub hs_color: Option<HsColor>,
}

impl TurnOnRequest {
    /// A bare turn-on without attribute changes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the brightness.
    #[must_use]
    pub fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = Some(brightness);
        self
    }

    /// Sets the color temperature.
    #[must_use]
    pub fn with_color_temp(mut self, mired: Mired) -> Self {
        self.color_temp = Some(mired);
        self
    }

    /// Sets the color.
    #[must_use]
    pub fn with_hs_color(mut self, color: HsColor) -> Self {
        self.hs_color = Some(color);
        self
    }
}

/// One light fixture.
pub struct Light {
    info: EntityInfo,
    kind: LightKind,
    color_temp_range: ColorTempRange,
    attrs: RwLock<LightAttrs>,
    ctrl: Controller,
}

impl Light {
    /// Creates a light entity.
    #[must_use]
    pub fn new(
        info: EntityInfo,
        kind: LightKind,
        ctx: Arc<EntityContext>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let publisher = StatePublisher::with_delay(sink, ctx.publish_delay);
        Self {
            ctrl: Controller::new(&info, ctx, publisher),
            info,
            kind,
            color_temp_range: ColorTempRange::DEFAULT,
            attrs: RwLock::new(LightAttrs::default()),
        }
    }

    /// Creates a light from a discovery record, seeding its state.
    #[must_use]
    pub fn from_device(
        device: &DeviceInfo,
        kind: LightKind,
        ctx: Arc<EntityContext>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let mut light = Self::new(EntityInfo::from_device(device), kind, ctx, sink);

        if let Some(range) = device.value.get("color_temp_range") {
            let min = range.get("min").and_then(serde_json::Value::as_u64);
            let max = range.get("max").and_then(serde_json::Value::as_u64);
            if let (Some(min), Some(max)) = (min, max)
                && let Ok(range) = ColorTempRange::new(clamp_u16(min), clamp_u16(max))
            {
                light.color_temp_range = range;
            }
        }

        {
            let mut attrs = light.attrs.write();
            attrs.is_on = device.value_str("switch") == Some("on");
            attrs.available = device.value_bool("online").unwrap_or(false);

            if kind.is_color() {
                if let Some(color) = device
                    .value
                    .get("color")
                    .and_then(|v| serde_json::from_value::<HsvColor>(v.clone()).ok())
                {
                    attrs.hs_color = Some(color.hs());
                    attrs.brightness = Some(color.brightness());
                    attrs.color_mode = ColorMode::Hs;
                }
            } else if kind.supports_brightness()
                && let Some(light_pct) = device.value_f64("light")
            {
                attrs.brightness = Some(Brightness::from_percent(round_u8(light_pct)));
                attrs.color_mode = ColorMode::Brightness;
            }

            if kind.supports_color_temp()
                && let Some(kelvin) = device.value_f64("color_temp")
            {
                attrs.color_temp = Some(light.color_temp_range.to_mired(round_u16(kelvin)));
                if !kind.is_color() {
                    attrs.color_mode = ColorMode::ColorTemp;
                }
            }
        }
        light
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

    /// Returns the light kind.
    #[must_use]
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Returns the device-side color temperature range.
    #[must_use]
    pub fn color_temp_range(&self) -> ColorTempRange {
        self.color_temp_range
    }

    /// Returns the current attribute snapshot.
    #[must_use]
    pub fn attrs(&self) -> LightAttrs {
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

    fn apply_turn_on(&self, req: &TurnOnRequest) {
        let mut attrs = self.attrs.write();
        attrs.is_on = true;

        if let Some(brightness) = req.brightness {
            attrs.brightness = Some(brightness);
            if self.kind.is_color() {
                let color = attrs.hs_color.unwrap_or_default();
                self.ctrl
                    .add_param("color", json!(HsvColor::from_parts(color, brightness)));
            } else {
                self.ctrl.add_param("light", json!(brightness.percent()));
            }
        }

        if let Some(mired) = req.color_temp {
            attrs.color_mode = ColorMode::ColorTemp;
            attrs.color_temp = Some(mired);
            self.ctrl
                .add_param("color_temp", json!(self.color_temp_range.to_kelvin(mired)));
        }

        if let Some(color) = req.hs_color {
            attrs.color_mode = ColorMode::Hs;
            attrs.hs_color = Some(color);
            let brightness = attrs.brightness.unwrap_or(Brightness::MAX);
            self.ctrl
                .add_param("color", json!(HsvColor::from_parts(color, brightness)));
        }

        // A bare turn-on still has to flip the relay.
        if self.ctrl.param_count() == 0 {
            self.ctrl.add_param("switch", json!("on"));
        }
    }

    fn apply_turn_off(&self) {
        self.attrs.write().is_on = false;
        self.ctrl.add_param("switch", json!("off"));
    }

    async fn dispatch_with_rollback(&self, snapshot: LightAttrs) -> DispatchOutcome {
        let outcome = self.ctrl.dispatch().await;
        if outcome.is_failure() {
            *self.attrs.write() = snapshot;
        }
        outcome
    }

    /// Turns the light on, optionally changing brightness, color
    /// temperature or color in the same control call.
    pub async fn turn_on(&self, req: TurnOnRequest) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_turn_on(&req);
        self.dispatch_with_rollback(snapshot).await
    }

    /// Turns the light off.
    pub async fn turn_off(&self) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_turn_off();
        self.dispatch_with_rollback(snapshot).await
    }

    /// Flips the light's on/off state.
    pub async fn toggle(&self) -> DispatchOutcome {
        if self.attrs.read().is_on {
            self.turn_off().await
        } else {
            self.turn_on(TurnOnRequest::new()).await
        }
    }

    fn request_from(&self, payload: &DevicePayload) -> TurnOnRequest {
        TurnOnRequest {
            brightness: payload.brightness(),
            color_temp: payload
                .color_temp_kelvin()
                .map(|kelvin| self.color_temp_range.to_mired(kelvin)),
            hs_color: payload.color.map(|color| color.hs()),
        }
    }

    fn set_available(&self, online: bool) {
        self.attrs.write().available = online;
        self.ctrl.publisher().publish_now();
    }

    /// Applies one inbound update.
    pub async fn handle_update(&self, update: EntityUpdate) {
        let _gate = self.ctrl.close_gate();
        match update.action {
            Action::TurnOn => {
                let req = self.request_from(&update.payload);
                self.apply_turn_on(&req);
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
                    self.apply_turn_on(&TurnOnRequest::new());
                }
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

impl std::fmt::Debug for Light {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Light")
            .field("device_no", &self.info.device_no)
            .field("kind", &self.kind)
            .field("attrs", &self.attrs())
            .finish()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn clamp_u16(value: u64) -> u16 {
    value.min(u64::from(u16::MAX)) as u16
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_u16(value: f64) -> u16 {
    value.round().clamp(0.0, f64::from(u16::MAX)) as u16
}
