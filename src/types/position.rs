// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Position types for cover control.
//!
//! Cover position is a percentage (0 closed, 100 open) on both sides of the
//! bridge. Tilt position is a percentage locally but an angle in degrees on
//! the device, where angles above 90 fold back (180 degrees is fully closed
//! again).

use std::fmt;

use crate::error::ValueError;

/// Cover position as a percentage (0-100).
///
/// # Examples
///
/// ```
/// use duwi_bridge::types::Position;
///
/// let pos = Position::new(40).unwrap();
/// assert_eq!(pos.value(), 40);
/// assert!(Position::OPEN.is_open());
/// assert!(Position::CLOSED.is_closed());
/// assert!(Position::new(101).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u8);

impl Position {
    /// Fully closed.
    pub const CLOSED: Self = Self(0);

    /// Fully open.
    pub const OPEN: Self = Self(100);

    /// Creates a new position.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: u16::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a position, clamping to the valid range.
    #[must_use]
    pub const fn clamped(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// Returns the position percentage.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns `true` if the cover is fully closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the cover is fully open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.0 == 100
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Tilt position of a shutter as a percentage (0-100).
///
/// The device reports tilt as an angle in degrees (0-180); angles above 90
/// fold back toward closed. Conversions truncate toward zero.
///
/// # Examples
///
/// ```
/// use duwi_bridge::types::TiltPosition;
///
/// // 45 degrees is half open.
/// assert_eq!(TiltPosition::from_angle(45).value(), 50);
/// // 135 degrees folds back to 45.
/// assert_eq!(TiltPosition::from_angle(135).value(), 50);
/// // Converting back yields the device angle.
/// assert_eq!(TiltPosition::new(50).unwrap().to_angle(), 45);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TiltPosition(u8);

impl TiltPosition {
    /// Fully closed tilt.
    pub const CLOSED: Self = Self(0);

    /// Fully open tilt.
    pub const OPEN: Self = Self(100);

    /// Creates a new tilt position.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: u16::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Converts a device angle in degrees (0-180) into a tilt percentage.
    ///
    /// Angles above 90 fold back as `180 - angle`; anything past 180 clamps
    /// to closed.
    #[must_use]
    pub fn from_angle(angle: u16) -> Self {
        let folded = if angle > 90 {
            180u16.saturating_sub(angle)
        } else {
            angle
        };
        #[allow(clippy::cast_possible_truncation)]
        Self((folded.min(90) * 100 / 90) as u8)
    }

    /// Converts the tilt percentage into a device angle in degrees (0-90).
    #[must_use]
    pub fn to_angle(&self) -> u16 {
        u16::from(self.0) * 90 / 100
    }

    /// Returns the tilt percentage.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for TiltPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
