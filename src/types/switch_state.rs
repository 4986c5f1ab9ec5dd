// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On/off state as used across Duwi payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary on/off state.
///
/// Serialized as the wire strings `"on"` / `"off"`, which Duwi uses for
/// switch state, playback state and mute flags alike.
///
/// # Examples
///
/// ```
/// use duwi_bridge::types::SwitchState;
///
/// assert_eq!(SwitchState::On.as_str(), "on");
/// assert!(SwitchState::from_bool(true).is_on());
/// assert_eq!(!SwitchState::On, SwitchState::Off);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    /// The device (or flag) is on.
    On,
    /// The device (or flag) is off.
    Off,
}

impl SwitchState {
    /// Returns the wire string for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Returns `true` if the state is on.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    /// Creates a state from a boolean.
    #[must_use]
    pub const fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl From<bool> for SwitchState {
    fn from(on: bool) -> Self {
        Self::from_bool(on)
    }
}

impl std::ops::Not for SwitchState {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
