// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device registry metadata.
//!
//! These types deserialize the discovery payloads the host obtained from
//! the vendor API: devices, floors, rooms and terminals. The discovery
//! transport itself is outside this library; the host hands the data in
//! and instantiates entities from it.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::registry::DeviceRegistry;

/// One discovered device (or device group).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfo {
    /// Stable device number.
    #[serde(rename = "deviceNo", default)]
    pub device_no: String,
    /// Display name.
    #[serde(rename = "deviceName", default)]
    pub device_name: String,
    /// Group number, set when this record describes a device group.
    #[serde(rename = "deviceGroupNo", default)]
    pub device_group_no: Option<String>,
    /// House the device belongs to.
    #[serde(rename = "houseNo", default)]
    pub house_no: String,
    /// Room number, resolved to a name by [`assign_locations`].
    #[serde(rename = "roomNo", default)]
    pub room_no: Option<String>,
    /// Room display name.
    #[serde(rename = "roomName", default)]
    pub room_name: Option<String>,
    /// Floor display name.
    #[serde(rename = "floorName", default)]
    pub floor_name: Option<String>,
    /// Terminal the device hangs off.
    #[serde(rename = "terminalSequence", default)]
    pub terminal_sequence: String,
    /// Route number on the terminal.
    #[serde(rename = "routeNum", default)]
    pub route_num: u8,
    /// Last reported state values, keyed by wire field.
    #[serde(default)]
    pub value: Map<String, Value>,
}

impl DeviceInfo {
    /// Returns `true` if this record describes a device group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.device_group_no.is_some()
    }

    /// Reads a string state value.
    #[must_use]
    pub fn value_str(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    /// Reads a boolean state value.
    #[must_use]
    pub fn value_bool(&self, key: &str) -> Option<bool> {
        self.value.get(key).and_then(Value::as_bool)
    }

    /// Reads a numeric state value.
    #[must_use]
    pub fn value_f64(&self, key: &str) -> Option<f64> {
        self.value.get(key).and_then(Value::as_f64)
    }
}

/// One floor of the house.
#[derive(Debug, Clone, Deserialize)]
pub struct Floor {
    /// Floor number.
    #[serde(rename = "floorNo")]
    pub floor_no: String,
    /// Display name.
    #[serde(rename = "floorName")]
    pub floor_name: String,
}

/// One room of the house.
#[derive(Debug, Clone, Deserialize)]
pub struct Room {
    /// Room number.
    #[serde(rename = "roomNo")]
    pub room_no: String,
    /// Display name.
    #[serde(rename = "roomName")]
    pub room_name: String,
    /// Floor the room is on.
    #[serde(rename = "floorNo", default)]
    pub floor_no: Option<String>,
}

/// One gateway terminal.
#[derive(Debug, Clone, Deserialize)]
pub struct TerminalInfo {
    /// This terminal's sequence.
    #[serde(rename = "terminalSequence")]
    pub terminal_sequence: String,
    /// Sequence of the host the terminal hangs off; equals
    /// `terminal_sequence` for hosts themselves.
    #[serde(rename = "hostSequence")]
    pub host_sequence: String,
    /// Whether entities under this terminal follow it back online.
    #[serde(rename = "isFollowOnline", default)]
    pub is_follow_online: bool,
}

impl TerminalInfo {
    /// Returns `true` if this terminal is a slave of another host.
    #[must_use]
    pub fn is_slave(&self) -> bool {
        self.host_sequence != self.terminal_sequence
    }
}

/// Resolves room and floor display names onto each device.
///
/// Devices keep whatever names they already carried when the lookup has no
/// entry for them.
pub fn assign_locations(devices: &mut [DeviceInfo], floors: &[Floor], rooms: &[Room]) {
    use std::collections::HashMap;

    let floor_names: HashMap<&str, &str> = floors
        .iter()
        .map(|f| (f.floor_no.as_str(), f.floor_name.as_str()))
        .collect();
    let room_floor: HashMap<&str, &str> = rooms
        .iter()
        .filter_map(|r| Some((r.room_no.as_str(), r.floor_no.as_deref()?)))
        .collect();
    let room_names: HashMap<&str, &str> = rooms
        .iter()
        .map(|r| (r.room_no.as_str(), r.room_name.as_str()))
        .collect();

    for device in devices {
        let Some(room_no) = device.room_no.as_deref() else {
            continue;
        };
        if let Some(floor_name) = room_floor.get(room_no).and_then(|f| floor_names.get(f)) {
            device.floor_name = Some((*floor_name).to_string());
        }
        if let Some(room_name) = room_names.get(room_no) {
            device.room_name = Some((*room_name).to_string());
        }
    }
}

/// Seeds the registry's terminal tables from discovery data.
///
/// Slave terminals are recorded under their host for the host-offline
/// fan-out, and their follow-online flag is stored for the online case.
pub fn register_terminals(registry: &DeviceRegistry, terminals: &[TerminalInfo]) {
    for terminal in terminals {
        if terminal.is_slave() {
            registry.add_host_slave(&terminal.host_sequence, &terminal.terminal_sequence);
            registry.set_terminal_follow(&terminal.terminal_sequence, terminal.is_follow_online);
        }
    }
}
