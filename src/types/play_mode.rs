// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Playback mode types for media players.
//!
//! The Duwi wire format carries a single `play_mode` string that mixes
//! shuffle and repeat semantics; the local entity model keeps them as a
//! separate shuffle flag plus a [`RepeatMode`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire playback mode as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Play the playlist in order, repeating it.
    List,
    /// Repeat the current track.
    Single,
    /// Shuffle the playlist.
    Random,
    /// Play the playlist in order, once.
    Order,
    /// Alternative spelling of [`PlayMode::Order`] used by some firmware.
    All,
}

impl PlayMode {
    /// Returns the wire string for this mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Single => "single",
            Self::Random => "random",
            Self::Order => "order",
            Self::All => "all",
        }
    }

    /// Returns whether this mode implies shuffling.
    #[must_use]
    pub const fn shuffle(&self) -> bool {
        matches!(self, Self::Random)
    }

    /// Returns the repeat component of this mode.
    #[must_use]
    pub const fn repeat(&self) -> RepeatMode {
        match self {
            Self::List | Self::Random => RepeatMode::All,
            Self::Single => RepeatMode::One,
            Self::Order | Self::All => RepeatMode::Off,
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local repeat mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// No repeat.
    Off,
    /// Repeat the current track.
    One,
    /// Repeat the whole playlist.
    #[default]
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_only_for_random() {
        assert!(PlayMode::Random.shuffle());
        assert!(!PlayMode::List.shuffle());
        assert!(!PlayMode::Single.shuffle());
        assert!(!PlayMode::Order.shuffle());
    }

    #[test]
    fn repeat_mapping() {
        assert_eq!(PlayMode::List.repeat(), RepeatMode::All);
        assert_eq!(PlayMode::Random.repeat(), RepeatMode::All);
        assert_eq!(PlayMode::Single.repeat(), RepeatMode::One);
        assert_eq!(PlayMode::Order.repeat(), RepeatMode::Off);
        assert_eq!(PlayMode::All.repeat(), RepeatMode::Off);
    }

    #[test]
    fn wire_strings() {
        assert_eq!(PlayMode::Random.as_str(), "random");
        let mode: PlayMode = serde_json::from_str("\"single\"").unwrap();
        assert_eq!(mode, PlayMode::Single);
    }
}
