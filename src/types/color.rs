// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color types for light control.
//!
//! Duwi color lights speak HSV on the wire, with hue 0-360 and saturation
//! and value as percentages. The local entity model tracks hue/saturation
//! and carries the value component as [`Brightness`](super::Brightness).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

use super::Brightness;

/// Hue and saturation of a color light.
///
/// # Examples
///
/// ```
/// use duwi_bridge::types::HsColor;
///
/// let color = HsColor::new(120, 100).unwrap();
/// assert_eq!(color.hue(), 120);
/// assert_eq!(color.saturation(), 100);
///
/// assert!(HsColor::new(361, 0).is_err());
/// assert!(HsColor::new(0, 101).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HsColor {
    h: u16,
    s: u8,
}

impl HsColor {
    /// Creates a new hue/saturation pair.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidHue` if hue exceeds 360, or
    /// `ValueError::InvalidSaturation` if saturation exceeds 100.
    pub fn new(hue: u16, saturation: u8) -> Result<Self, ValueError> {
        if hue > 360 {
            return Err(ValueError::InvalidHue(hue));
        }
        if saturation > 100 {
            return Err(ValueError::InvalidSaturation(saturation));
        }
        Ok(Self {
            h: hue,
            s: saturation,
        })
    }

    /// Returns the hue (0-360).
    #[must_use]
    pub const fn hue(&self) -> u16 {
        self.h
    }

    /// Returns the saturation (0-100).
    #[must_use]
    pub const fn saturation(&self) -> u8 {
        self.s
    }
}

impl fmt::Display for HsColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hs({}, {})", self.h, self.s)
    }
}

/// Wire representation of a Duwi color value.
///
/// This is the `{"h": .., "s": .., "v": ..}` object found in both push
/// payloads and outbound control parameters. All components are percentages
/// except hue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HsvColor {
    /// Hue (0-360).
    pub h: u16,
    /// Saturation (0-100).
    pub s: u8,
    /// Value/brightness (0-100).
    pub v: u8,
}

impl HsvColor {
    /// Builds a wire color from hue/saturation plus a brightness byte.
    #[must_use]
    pub fn from_parts(color: HsColor, brightness: Brightness) -> Self {
        Self {
            h: color.hue(),
            s: color.saturation(),
            v: brightness.percent(),
        }
    }

    /// Returns the hue/saturation part, clamping out-of-range components.
    #[must_use]
    pub fn hs(&self) -> HsColor {
        HsColor {
            h: self.h.min(360),
            s: self.s.min(100),
        }
    }

    /// Returns the value component as a brightness byte.
    #[must_use]
    pub fn brightness(&self) -> Brightness {
        Brightness::from_percent(self.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hs_color_valid() {
        let color = HsColor::new(360, 100).unwrap();
        assert_eq!(color.hue(), 360);
        assert_eq!(color.saturation(), 100);
    }

    #[test]
    fn hs_color_invalid_hue() {
        assert!(matches!(
            HsColor::new(400, 50),
            Err(ValueError::InvalidHue(400))
        ));
    }

    #[test]
    fn hs_color_invalid_saturation() {
        assert!(matches!(
            HsColor::new(180, 120),
            Err(ValueError::InvalidSaturation(120))
        ));
    }

    #[test]
    fn hsv_from_parts() {
        let color = HsColor::new(120, 80).unwrap();
        let hsv = HsvColor::from_parts(color, Brightness::from_percent(50));
        assert_eq!(hsv.h, 120);
        assert_eq!(hsv.s, 80);
        assert_eq!(hsv.v, 50);
    }

    #[test]
    fn hsv_round_trip_through_parts() {
        let hsv = HsvColor { h: 200, s: 40, v: 75 };
        assert_eq!(hsv.hs(), HsColor::new(200, 40).unwrap());
        assert_eq!(hsv.brightness().percent(), 75);
    }

    #[test]
    fn hsv_deserializes_wire_object() {
        let hsv: HsvColor = serde_json::from_str(r#"{"h": 120, "s": 100, "v": 0}"#).unwrap();
        assert_eq!(hsv.h, 120);
        assert_eq!(hsv.v, 0);
    }

    #[test]
    fn hs_display() {
        assert_eq!(HsColor::new(1, 2).unwrap().to_string(), "hs(1, 2)");
    }
}
