// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Duwi Bridge - a Rust library to synchronize Duwi smart-home devices.
//!
//! This library is the device-state synchronization layer between the Duwi
//! cloud control API and a local set of stateful entities: switches,
//! lights, covers, media players, sensors and binary sensors. Inbound push
//! notifications mutate local entity state and are published to the host
//! with trailing-edge debouncing; outbound user commands are composed into
//! single control calls and published immediately once confirmed.
//!
//! # How state flows
//!
//! - A push frame arrives: [`Bridge::handle_push`] parses it and routes it
//!   through the per-instance [`DeviceRegistry`] to the right entity.
//! - The entity closes its control gate, runs the same mutation methods a
//!   user command would run, and the dispatch, seeing the gate closed,
//!   schedules a debounced publish instead of calling the vendor API. An
//!   echo never turns back into a network call.
//! - A user command composes its parameter changes into one control call.
//!   On a success status the new state publishes immediately; on anything
//!   else the optimistic mutation is rolled back and one failure record is
//!   appended to the user-visible [`MessageLog`].
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use duwi_bridge::config::BridgeConfig;
//! use duwi_bridge::control::HttpControlClient;
//! use duwi_bridge::entity::{Light, LightKind, EntityInfo};
//! use duwi_bridge::types::Brightness;
//! use duwi_bridge::Bridge;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig::new("app-key", "app-secret", "token", "house-1");
//!     let control = Arc::new(
//!         HttpControlClient::builder()
//!             .base_url("https://api.duwi.example")
//!             .app_key("app-key")
//!             .app_secret("app-secret")
//!             .access_token("token")
//!             .build()?,
//!     );
//!     let bridge = Bridge::new(config, control)?;
//!
//!     // The host constructs entities from discovery data and attaches
//!     // them to the bridge's registry.
//!     let info = EntityInfo {
//!         device_no: "d100".to_string(),
//!         device_name: "Ceiling Light".to_string(),
//!         house_no: "house-1".to_string(),
//!         terminal_sequence: "t1".to_string(),
//!         ..EntityInfo::default()
//!     };
//!     let light = Arc::new(Light::new(
//!         info,
//!         LightKind::Dimmable,
//!         Arc::clone(bridge.context()),
//!         Arc::new(|| { /* render state */ }),
//!     ));
//!     light.attach(bridge.registry());
//!
//!     // User command: one control call, immediate publish on success.
//!     light
//!         .turn_on(
//!             duwi_bridge::entity::TurnOnRequest::new()
//!                 .with_brightness(Brightness::from_percent(75)),
//!         )
//!         .await;
//!
//!     // Push frames from the vendor channel are handed to the bridge.
//!     bridge
//!         .handle_push(r#"{"namespace": "Duwi.RPS.DeviceValue",
//!                          "result": {"msg": {"deviceNo": "d100", "switch": "off"}}}"#)
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod control;
pub mod entity;
pub mod error;
pub mod gate;
pub mod model;
pub mod publish;
pub mod push;
pub mod registry;
pub mod report;
pub mod types;

pub use bridge::{Bridge, InstanceId};
pub use config::BridgeConfig;
pub use control::{ControlClient, ControlRequest, Param, PendingCommand, StatusCode};
pub use entity::{
    BinarySensor, Cover, CoverKind, DispatchOutcome, EntityContext, EntityInfo, Light, LightKind,
    MediaKind, MediaPlayer, Sensor, Switch, TurnOnRequest,
};
pub use error::{ConfigError, ControlError, Error, ParseError, Result, ValueError};
pub use gate::{ControlGate, GateGuard};
pub use publish::{StatePublisher, StateSink};
pub use push::{Action, DevicePayload, EntityUpdate, PushFrame, parse_frame};
pub use registry::{DeviceRegistry, EntityKey, UpdateHandler};
pub use report::{FailureLog, FailureRecord, MessageLog};
