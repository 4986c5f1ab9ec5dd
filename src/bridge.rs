// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One bridge installation.
//!
//! A [`Bridge`] owns everything one house shares: the configuration, the
//! update-handler registry, the entity service context and the
//! user-visible message log. Several bridges can coexist in one process;
//! nothing here is global.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::control::ControlClient;
use crate::entity::EntityContext;
use crate::error::ConfigError;
use crate::push::{self, Action, EntityUpdate, PushFrame};
use crate::registry::{DeviceRegistry, EntityKey};
use crate::report::{FailureLog, MessageLog};

/// Identifier of one bridge installation.
///
/// Used only for logging and diagnostics; routing state lives inside the
/// bridge, not under this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Creates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One bridge installation for one house.
pub struct Bridge {
    config: BridgeConfig,
    instance_id: InstanceId,
    registry: DeviceRegistry,
    context: Arc<EntityContext>,
    messages: Arc<MessageLog>,
}

impl Bridge {
    /// Creates a bridge from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is unusable.
    pub fn new(config: BridgeConfig, control: Arc<dyn ControlClient>) -> Result<Self, ConfigError> {
        config.validate()?;

        let messages = MessageLog::shared();
        let context = Arc::new(
            EntityContext::new(control, Arc::clone(&messages) as _)
                .with_control_timeout(config.control_timeout)
                .with_publish_delay(config.publish_delay),
        );

        let instance_id = InstanceId::new();
        tracing::info!(instance = %instance_id, house = %config.house_no, "Bridge created");
        messages.record_message(&format!(
            "Successfully initialized Duwi bridge. Your house's name is: {}",
            config.house_name.as_deref().unwrap_or("unknown")
        ));

        Ok(Self {
            config,
            instance_id,
            registry: DeviceRegistry::new(),
            context,
            messages,
        })
    }

    /// Returns this installation's id.
    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the update-handler registry.
    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Returns the context entities are constructed with.
    #[must_use]
    pub fn context(&self) -> &Arc<EntityContext> {
        &self.context
    }

    /// Returns the user-visible message log.
    #[must_use]
    pub fn messages(&self) -> &Arc<MessageLog> {
        &self.messages
    }

    /// Handles one raw push-channel frame.
    ///
    /// Terminal frames fan out availability; device frames are routed to
    /// the device's own handler and, for every sensor reading they carry,
    /// to the matching kind-scoped sensor handler. Frames that cannot be
    /// parsed, or that address nothing registered, are dropped; a single
    /// bad frame never stalls the loop.
    pub async fn handle_push(&self, raw: &str) {
        let frame = match push::parse_frame(raw) {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(error) => {
                tracing::debug!(instance = %self.instance_id, error = %error, "Dropping unparseable push frame");
                return;
            }
        };

        match frame {
            PushFrame::Terminal(terminal) => {
                let reached = self
                    .registry
                    .dispatch_terminal(&terminal.sequence, terminal.online)
                    .await;
                tracing::debug!(
                    instance = %self.instance_id,
                    terminal = %terminal.sequence,
                    online = terminal.online,
                    reached,
                    "Terminal connectivity fan-out"
                );
            }
            PushFrame::Device(payload) => {
                // `parse_frame` guarantees the key.
                let Some(device_no) = payload.key().map(ToString::to_string) else {
                    return;
                };

                for (kind, value) in payload.sensor_values.clone() {
                    let update = EntityUpdate {
                        action: Action::SensorValue { value },
                        payload: payload.clone(),
                    };
                    self.registry
                        .dispatch_to(&EntityKey::scoped(kind.slug(), &device_no), update)
                        .await;
                }
                for (kind, value) in payload.binary_values.clone() {
                    let update = EntityUpdate {
                        action: Action::BinaryValue { value },
                        payload: payload.clone(),
                    };
                    self.registry
                        .dispatch_to(&EntityKey::scoped(kind.slug(), &device_no), update)
                        .await;
                }

                let update = EntityUpdate::from_payload(payload);
                self.registry
                    .dispatch_to(&EntityKey::device(device_no), update)
                    .await;
            }
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("instance_id", &self.instance_id)
            .field("house_no", &self.config.house_no)
            .field("registry", &self.registry)
            .finish()
    }
}
