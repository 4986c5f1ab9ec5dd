// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Update-handler registry and terminal fan-out.
//!
//! One registry exists per bridge instance and routes inbound updates to
//! entity handlers: by entity key for device frames, and by terminal
//! sequence for connectivity frames, where one frame fans out to every
//! entity behind the terminal. Lookups for unknown keys are dropped
//! silently; a late notification for a removed device is not an error.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::push::EntityUpdate;

/// Future returned by an update handler.
pub type UpdateFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callable that applies one update to one entity.
pub type UpdateHandler = Arc<dyn Fn(EntityUpdate) -> UpdateFuture + Send + Sync>;

/// Key an entity registers under.
///
/// Most entities use their device number directly; sensor entities scope
/// the key by kind because one physical device fans out into several
/// entities.
///
/// # Examples
///
/// ```
/// use duwi_bridge::registry::EntityKey;
///
/// let plain = EntityKey::device("d100");
/// let scoped = EntityKey::scoped("temperature", "d100");
/// assert_eq!(plain.as_str(), "d100");
/// assert_eq!(scoped.as_str(), "temperature_d100");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey(String);

impl EntityKey {
    /// Creates a key from a bare device number.
    #[must_use]
    pub fn device(device_no: impl Into<String>) -> Self {
        Self(device_no.into())
    }

    /// Creates a key scoped by a kind prefix.
    #[must_use]
    pub fn scoped(scope: &str, device_no: &str) -> Self {
        Self(format!("{scope}_{device_no}"))
    }

    /// Returns the key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct TerminalEntry {
    /// Whether entities under this terminal also follow it back online.
    follow_online: bool,
    handlers: HashMap<EntityKey, UpdateHandler>,
}

/// Per-instance routing table from entity and terminal keys to handlers.
///
/// All writes are idempotent upserts; re-registering a key replaces the
/// previous handler. The registry is owned by its [`Bridge`] and passed by
/// reference to entities at construction; there is no process-global
/// state, so multiple installations coexist.
///
/// [`Bridge`]: crate::bridge::Bridge
#[derive(Default)]
pub struct DeviceRegistry {
    handlers: RwLock<HashMap<EntityKey, UpdateHandler>>,
    terminals: RwLock<HashMap<String, TerminalEntry>>,
    /// Host terminal sequence to the slave sequences behind it.
    hosts: RwLock<HashMap<String, Vec<String>>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the handler for an entity key.
    pub fn register(&self, key: EntityKey, handler: UpdateHandler) {
        tracing::debug!(key = %key, "Registering update handler");
        self.handlers.write().insert(key, handler);
    }

    /// Registers (or replaces) the handler under a terminal sequence, for
    /// connectivity fan-out.
    pub fn register_under_terminal(
        &self,
        terminal: impl Into<String>,
        key: EntityKey,
        handler: UpdateHandler,
    ) {
        let terminal = terminal.into();
        tracing::debug!(terminal = %terminal, key = %key, "Registering under terminal");
        self.terminals
            .write()
            .entry(terminal)
            .or_default()
            .handlers
            .insert(key, handler);
    }

    /// Removes an entity's handlers from both tables.
    pub fn unregister(&self, key: &EntityKey) {
        self.handlers.write().remove(key);
        for entry in self.terminals.write().values_mut() {
            entry.handlers.remove(key);
        }
    }

    /// Marks whether entities under a slave terminal follow it back online.
    pub fn set_terminal_follow(&self, terminal: impl Into<String>, follow_online: bool) {
        self.terminals
            .write()
            .entry(terminal.into())
            .or_default()
            .follow_online = follow_online;
    }

    /// Records a slave terminal under its host.
    pub fn add_host_slave(&self, host: impl Into<String>, slave: impl Into<String>) {
        self.hosts
            .write()
            .entry(host.into())
            .or_default()
            .push(slave.into());
    }

    /// Delivers an update to the one handler registered for `key`.
    ///
    /// Returns `false` if no handler is registered; the update is dropped.
    pub async fn dispatch_to(&self, key: &EntityKey, update: EntityUpdate) -> bool {
        let handler = self.handlers.read().get(key).cloned();
        match handler {
            Some(handler) => {
                handler(update).await;
                true
            }
            None => {
                tracing::trace!(key = %key, "Dropping update for unknown entity");
                false
            }
        }
    }

    /// Fans a connectivity change out to every entity behind a terminal.
    ///
    /// A slave terminal fans out when it goes offline, or when it comes
    /// back online and is marked follow-online. A host terminal going
    /// offline takes every slave behind it (and their entities) offline
    /// too. Returns the number of handlers invoked.
    pub async fn dispatch_terminal(&self, sequence: &str, online: bool) -> usize {
        let slave_handlers = {
            let terminals = self.terminals.read();
            terminals.get(sequence).and_then(|entry| {
                if !entry.handlers.is_empty() && (entry.follow_online || !online) {
                    Some(entry.handlers.values().cloned().collect::<Vec<_>>())
                } else {
                    None
                }
            })
        };
        if let Some(handlers) = slave_handlers {
            let count = handlers.len();
            for handler in handlers {
                handler(EntityUpdate::availability(online)).await;
            }
            return count;
        }

        // Not a matching slave: a host going offline drags down every
        // slave terminal behind it.
        if online {
            return 0;
        }
        let slaves = self.hosts.read().get(sequence).cloned();
        let Some(slaves) = slaves else {
            tracing::trace!(terminal = %sequence, "Dropping connectivity change for unknown terminal");
            return 0;
        };
        let mut count = 0;
        for slave in slaves {
            let handlers = {
                let terminals = self.terminals.read();
                terminals
                    .get(&slave)
                    .map(|entry| entry.handlers.values().cloned().collect::<Vec<_>>())
                    .unwrap_or_default()
            };
            for handler in handlers {
                handler(EntityUpdate::availability(false)).await;
                count += 1;
            }
        }
        count
    }

    /// Returns the number of registered entity handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns `true` if no entity handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("handlers", &self.handler_count())
            .field("terminals", &self.terminals.read().len())
            .finish()
    }
}
