// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Playback progress type for media players.
//!
//! Duwi media players exchange playback positions and track durations as
//! `mm:ss` strings; locally they are tracked in whole seconds.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// A playback position or duration in whole seconds.
///
/// # Examples
///
/// ```
/// use duwi_bridge::types::PlayProgress;
///
/// let progress: PlayProgress = "03:25".parse().unwrap();
/// assert_eq!(progress.seconds(), 205);
/// assert_eq!(progress.to_string(), "03:25");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayProgress(u32);

impl PlayProgress {
    /// Creates a progress value from whole seconds.
    #[must_use]
    pub const fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Returns the progress in whole seconds.
    #[must_use]
    pub const fn seconds(&self) -> u32 {
        self.0
    }
}

impl FromStr for PlayProgress {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (minutes, seconds) = s
            .split_once(':')
            .ok_or_else(|| ValueError::InvalidProgress(s.to_string()))?;
        let minutes: u32 = minutes
            .trim()
            .parse()
            .map_err(|_| ValueError::InvalidProgress(s.to_string()))?;
        let seconds: u32 = seconds
            .trim()
            .parse()
            .map_err(|_| ValueError::InvalidProgress(s.to_string()))?;
        if seconds >= 60 {
            return Err(ValueError::InvalidProgress(s.to_string()));
        }
        Ok(Self(minutes * 60 + seconds))
    }
}

impl fmt::Display for PlayProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes_and_seconds() {
        let p: PlayProgress = "00:00".parse().unwrap();
        assert_eq!(p.seconds(), 0);
        let p: PlayProgress = "10:30".parse().unwrap();
        assert_eq!(p.seconds(), 630);
    }

    #[test]
    fn rejects_bad_input() {
        assert!("".parse::<PlayProgress>().is_err());
        assert!("330".parse::<PlayProgress>().is_err());
        assert!("aa:bb".parse::<PlayProgress>().is_err());
        assert!("01:75".parse::<PlayProgress>().is_err());
    }

    #[test]
    fn formats_zero_padded() {
        assert_eq!(PlayProgress::from_seconds(65).to_string(), "01:05");
        assert_eq!(PlayProgress::from_seconds(0).to_string(), "00:00");
    }

    #[test]
    fn display_round_trip() {
        let p = PlayProgress::from_seconds(205);
        let parsed: PlayProgress = p.to_string().parse().unwrap();
        assert_eq!(parsed, p);
    }
}
