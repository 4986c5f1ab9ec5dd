// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Volume type for media players.
//!
//! The local entity model uses a fractional level in [0.0, 1.0]; each media
//! player style has its own integer ceiling on the device (15, 19 or 100
//! steps), while inbound push payloads always report volume out of 100.

use std::fmt;

use crate::error::ValueError;

/// Volume level as a fraction in [0.0, 1.0].
///
/// # Examples
///
/// ```
/// use duwi_bridge::types::VolumeLevel;
///
/// let vol = VolumeLevel::new(0.5).unwrap();
/// assert_eq!(vol.to_steps(100), 50);
/// assert_eq!(vol.to_steps(15), 7);
///
/// assert!(VolumeLevel::new(1.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct VolumeLevel(f32);

impl VolumeLevel {
    /// Muted/zero volume.
    pub const MIN: Self = Self(0.0);

    /// Full volume.
    pub const MAX: Self = Self(1.0);

    /// Step used by volume up/down commands.
    pub const STEP: f32 = 0.1;

    /// Creates a new volume level.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidLevel` if the level is outside
    /// [0.0, 1.0].
    pub fn new(level: f32) -> Result<Self, ValueError> {
        if !(0.0..=1.0).contains(&level) {
            return Err(ValueError::InvalidLevel(level));
        }
        Ok(Self(level))
    }

    /// Creates a volume level, clamping to [0.0, 1.0].
    #[must_use]
    pub fn clamped(level: f32) -> Self {
        Self(level.clamp(0.0, 1.0))
    }

    /// Creates a volume level from an inbound percentage (0-100).
    #[must_use]
    pub fn from_percent(percent: u8) -> Self {
        Self(f32::from(percent.min(100)) / 100.0)
    }

    /// Returns the fractional level.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.0
    }

    /// Scales the level to a device step count, truncating toward zero.
    #[must_use]
    pub fn to_steps(&self, max_steps: u8) -> u8 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (self.0 * f32::from(max_steps)) as u8;
        steps
    }

    /// Returns the level raised by one step, saturating at full volume.
    #[must_use]
    pub fn stepped_up(&self) -> Self {
        Self((self.0 + Self::STEP).min(1.0))
    }

    /// Returns the level lowered by one step, saturating at zero.
    #[must_use]
    pub fn stepped_down(&self) -> Self {
        Self((self.0 - Self::STEP).max(0.0))
    }
}

impl fmt::Display for VolumeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.0 * 100.0)
    }
}
