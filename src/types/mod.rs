// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the library.
//!
//! All numeric conversions between the Duwi device scale and the local
//! entity scale live here as pure functions on constrained newtypes.

mod brightness;
mod color;
mod color_temp;
mod play_mode;
mod position;
mod progress;
mod switch_state;
mod volume;

pub use brightness::Brightness;
pub use color::{HsColor, HsvColor};
pub use color_temp::{ColorTempRange, Mired};
pub use play_mode::{PlayMode, RepeatMode};
pub use position::{Position, TiltPosition};
pub use progress::PlayProgress;
pub use switch_state::SwitchState;
pub use volume::VolumeLevel;
