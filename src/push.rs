// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound push-channel frames.
//!
//! The push channel delivers JSON frames describing device state changes
//! and terminal connectivity. This module parses frames into typed
//! payloads and derives the [`Action`] an entity should run. Parsing is
//! deliberately tolerant: a field the frame got wrong drops that field (or
//! that frame), never the dispatcher loop.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::types::{
    Brightness, HsvColor, PlayMode, PlayProgress, Position, SwitchState, TiltPosition, VolumeLevel,
};

/// Frame sent by the channel to keep the connection alive.
pub const KEEPALIVE: &str = "KEEPALIVE";

/// Namespace of single-device state frames.
pub const NS_DEVICE_VALUE: &str = "Duwi.RPS.DeviceValue";

/// Namespace of terminal connectivity frames.
pub const NS_TERMINAL_ONLINE: &str = "Duwi.RPS.TerminalOnline";

/// Namespace of device-group state frames.
pub const NS_DEVICE_GROUP_VALUE: &str = "Duwi.RPS.DeviceGroupValue";

/// A parsed push frame.
#[derive(Debug, Clone)]
pub enum PushFrame {
    /// State change for one device or device group.
    Device(DevicePayload),
    /// Connectivity change for a terminal.
    Terminal(TerminalPayload),
}

/// Envelope of a raw frame.
#[derive(Debug, Deserialize)]
struct Envelope {
    namespace: Option<String>,
    result: Option<Value>,
}

/// Parses one raw frame.
///
/// Returns `Ok(None)` for keep-alives, foreign namespaces and frames
/// without a usable payload, mirroring the channel's best-effort delivery.
///
/// # Errors
///
/// Returns `ParseError::Json` only when the frame (or its string-encoded
/// `result`) is not valid JSON at all.
pub fn parse_frame(raw: &str) -> Result<Option<PushFrame>, ParseError> {
    if raw == KEEPALIVE {
        return Ok(None);
    }

    let envelope: Envelope = serde_json::from_str(raw)?;
    let Some(namespace) = envelope.namespace else {
        return Ok(None);
    };
    if !matches!(
        namespace.as_str(),
        NS_DEVICE_VALUE | NS_TERMINAL_ONLINE | NS_DEVICE_GROUP_VALUE
    ) {
        return Ok(None);
    }

    let Some(mut result) = envelope.result else {
        return Ok(None);
    };
    // The channel occasionally double-encodes the result.
    if let Value::String(inner) = &result {
        result = serde_json::from_str(inner)?;
    }
    let Some(msg) = result.get("msg") else {
        return Ok(None);
    };

    if namespace == NS_TERMINAL_ONLINE {
        let Some(sequence) = msg.get("sequence").and_then(Value::as_str) else {
            return Ok(None);
        };
        let online = msg.get("online").and_then(Value::as_bool).unwrap_or(false);
        return Ok(Some(PushFrame::Terminal(TerminalPayload {
            sequence: sequence.to_string(),
            online,
        })));
    }

    let payload = DevicePayload::from_value(msg);
    if payload.key().is_none() {
        return Ok(None);
    }
    Ok(Some(PushFrame::Device(payload)))
}

/// Connectivity payload of a terminal frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalPayload {
    /// Terminal sequence identifier.
    pub sequence: String,
    /// Whether the terminal is now online.
    pub online: bool,
}

/// Track metadata carried by a song-change frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackInfo {
    /// Performing artist.
    pub singer: Option<String>,
    /// Track title.
    pub song_name: Option<String>,
    /// Cover art URL.
    pub pic_url: Option<String>,
    /// Vendor track identifier.
    pub song_id: Option<String>,
    /// Secondary vendor track identifier.
    pub song_mid: Option<String>,
    /// Track length in seconds.
    pub duration: Option<u32>,
}

/// Typed view over a device state frame.
///
/// Every field is optional; the frame carries only what changed. Numeric
/// fields are kept as reported and converted through the accessor methods.
#[derive(Debug, Clone, Default)]
pub struct DevicePayload {
    /// Device number, present on single-device frames.
    pub device_no: Option<String>,
    /// Device group number, present on group frames.
    pub device_group_no: Option<String>,
    /// On/off state.
    pub switch: Option<SwitchState>,
    /// Availability; device frames only ever signal `true` (offline
    /// arrives through terminal frames).
    pub online: Option<bool>,
    /// Brightness percentage (0-100).
    pub light: Option<f64>,
    /// Color temperature on the device Kelvin scale.
    pub color_temp: Option<f64>,
    /// HSV color.
    pub color: Option<HsvColor>,
    /// Cover position percentage.
    pub control_percent: Option<f64>,
    /// Tilt angle in degrees (preferred spelling).
    pub light_angle: Option<f64>,
    /// Tilt angle in degrees (alternative spelling).
    pub angle_degree: Option<f64>,
    /// Playback state.
    pub play: Option<SwitchState>,
    /// Mute flag.
    pub mute: Option<SwitchState>,
    /// Volume out of 100.
    pub volume: Option<f64>,
    /// Playback mode.
    pub play_mode: Option<PlayMode>,
    /// Playback position as `mm:ss`.
    pub play_progress: Option<String>,
    /// Track duration as `mm:ss`.
    pub duration: Option<String>,
    /// Full track metadata.
    pub audio_full_info: Option<AudioInfo>,
    /// Reduced track metadata.
    pub audio_info: Option<AudioInfo>,
    /// Numeric sensor readings present in the frame, by payload field.
    pub sensor_values: Vec<(SensorField, f64)>,
    /// Binary sensor readings present in the frame, by payload field.
    pub binary_values: Vec<(BinaryField, bool)>,
}

/// Numeric sensor value fields a device frame may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorField {
    /// `temp_value`: temperature.
    Temperature,
    /// `humidity_value`: relative humidity.
    Humidity,
    /// `bright_value`: illuminance.
    Illuminance,
    /// `hcho_value`: formaldehyde.
    Formaldehyde,
    /// `pm25_value`: PM2.5.
    Pm25,
    /// `co2_value`: carbon dioxide.
    CarbonDioxide,
    /// `iaq_value`: air quality index.
    AirQuality,
    /// `co_value`: carbon monoxide.
    CarbonMonoxide,
    /// `tvoc_value`: volatile organic compounds.
    Tvoc,
}

impl SensorField {
    const ALL: [(Self, &'static str); 9] = [
        (Self::Temperature, "temp_value"),
        (Self::Humidity, "humidity_value"),
        (Self::Illuminance, "bright_value"),
        (Self::Formaldehyde, "hcho_value"),
        (Self::Pm25, "pm25_value"),
        (Self::CarbonDioxide, "co2_value"),
        (Self::AirQuality, "iaq_value"),
        (Self::CarbonMonoxide, "co_value"),
        (Self::Tvoc, "tvoc_value"),
    ];

    /// Returns the payload field name.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(kind, _)| kind == self)
            .map_or("", |(_, name)| name)
    }

    /// Returns the slug sensor entities scope their keys with.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Illuminance => "light",
            Self::Formaldehyde => "formaldehyde",
            Self::Pm25 => "pm25",
            Self::CarbonDioxide => "carbon_dioxide",
            Self::AirQuality => "air_quality",
            Self::CarbonMonoxide => "carbon_monoxide",
            Self::Tvoc => "tvoc",
        }
    }
}

/// Binary sensor value fields a device frame may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryField {
    /// `human_state`: motion/presence.
    Human,
    /// `trigger_state`: contact/opening.
    Trigger,
}

impl BinaryField {
    const ALL: [(Self, &'static str); 2] = [(Self::Human, "human_state"), (Self::Trigger, "trigger_state")];

    /// Returns the payload field name.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(kind, _)| kind == self)
            .map_or("", |(_, name)| name)
    }

    /// Returns the slug binary-sensor entities scope their keys with.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Trigger => "trigger",
        }
    }
}

/// Track metadata object as found on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioInfo {
    /// Artists; either a list of `{"name": ..}` objects or a plain string.
    #[serde(default)]
    pub singer: Option<Value>,
    /// Track title (full-info spelling).
    #[serde(default)]
    pub song_name: Option<String>,
    /// Track title (reduced-info spelling).
    #[serde(default)]
    pub name: Option<String>,
    /// Cover art URL.
    #[serde(default)]
    pub pic_url: Option<String>,
    /// Vendor track identifier.
    #[serde(default)]
    pub song_id: Option<String>,
    /// Secondary vendor track identifier.
    #[serde(default)]
    pub song_mid: Option<String>,
    /// Track duration as `mm:ss`.
    #[serde(default)]
    pub duration: Option<String>,
}

impl AudioInfo {
    /// Returns the first artist name, however the frame spelled it.
    #[must_use]
    pub fn singer_name(&self) -> Option<String> {
        match &self.singer {
            Some(Value::String(name)) => Some(name.clone()),
            Some(Value::Array(list)) => list
                .first()
                .and_then(|entry| entry.get("name"))
                .and_then(Value::as_str)
                .map(ToString::to_string),
            _ => None,
        }
    }

    /// Returns the track title, whichever spelling is present.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.song_name.clone().or_else(|| self.name.clone())
    }
}

fn as_switch(value: &Value) -> Option<SwitchState> {
    match value.as_str() {
        Some("on") => Some(SwitchState::On),
        Some("off") => Some(SwitchState::Off),
        _ => None,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    value
        .as_bool()
        .or_else(|| value.as_i64().map(|v| v != 0))
}

impl DevicePayload {
    /// Builds a payload from a frame's `msg` object, dropping (not
    /// propagating) fields of the wrong shape.
    #[must_use]
    pub fn from_value(msg: &Value) -> Self {
        let field = |name: &str| msg.get(name);
        let string = |name: &str| field(name).and_then(Value::as_str).map(ToString::to_string);
        let number = |name: &str| field(name).and_then(Value::as_f64);

        let mut sensor_values = Vec::new();
        for (kind, name) in SensorField::ALL {
            if let Some(value) = number(name) {
                sensor_values.push((kind, value));
            }
        }
        let mut binary_values = Vec::new();
        for (kind, name) in BinaryField::ALL {
            if let Some(value) = field(name).and_then(as_flag) {
                binary_values.push((kind, value));
            }
        }

        Self {
            device_no: string("deviceNo"),
            device_group_no: string("deviceGroupNo"),
            switch: field("switch").and_then(as_switch),
            online: field("online").and_then(Value::as_bool),
            light: number("light"),
            color_temp: number("color_temp"),
            color: field("color")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok()),
            control_percent: number("control_percent"),
            light_angle: number("light_angle"),
            angle_degree: number("angle_degree"),
            play: field("play").and_then(as_switch),
            mute: field("mute").and_then(as_switch),
            volume: number("volume"),
            play_mode: field("play_mode")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok()),
            play_progress: string("play_progress"),
            duration: string("duration"),
            audio_full_info: field("audio_full_info")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok()),
            audio_info: field("audio_info")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok()),
            sensor_values,
            binary_values,
        }
    }

    /// Returns the routing key: device number, or group number for group
    /// frames.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.device_no
            .as_deref()
            .or(self.device_group_no.as_deref())
    }

    /// Returns the brightness carried by the frame, preferring the color
    /// value component over the plain percentage.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        if let Some(color) = &self.color {
            return Some(color.brightness());
        }
        self.light.map(|pct| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Brightness::from_percent(pct.round().clamp(0.0, 100.0) as u8)
        })
    }

    /// Returns the color temperature in device Kelvin, rounded.
    #[must_use]
    pub fn color_temp_kelvin(&self) -> Option<u16> {
        self.color_temp.map(|k| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let kelvin = k.round().clamp(0.0, f64::from(u16::MAX)) as u16;
            kelvin
        })
    }

    /// Returns the tilt angle, preferring `light_angle`.
    #[must_use]
    pub fn angle(&self) -> Option<f64> {
        self.light_angle.or(self.angle_degree)
    }

    /// Returns whichever track metadata object is present, preferring the
    /// full one.
    #[must_use]
    pub fn audio(&self) -> Option<&AudioInfo> {
        self.audio_full_info.as_ref().or(self.audio_info.as_ref())
    }

    /// Builds the track info for a song-change transition.
    fn track_info(&self) -> Option<TrackInfo> {
        let info = self.audio()?;
        let duration = self
            .duration
            .as_deref()
            .or(info.duration.as_deref())
            .and_then(|d| d.parse::<PlayProgress>().ok())
            .map(|p| p.seconds());
        Some(TrackInfo {
            singer: info.singer_name(),
            song_name: info.title(),
            pic_url: info.pic_url.clone(),
            song_id: info.song_id.clone(),
            song_mid: info.song_mid.clone(),
            duration,
        })
    }
}

/// One recognized state transition.
///
/// The variants cover every action the original integration dispatched by
/// name; entities match exhaustively and treat variants they do not
/// recognize as an availability passthrough at most.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Turn the entity on (payload may carry brightness/color attributes).
    TurnOn,
    /// Turn the entity off.
    TurnOff,
    /// Flip the entity's on/off state.
    Toggle,
    /// Change only the availability flag.
    Availability {
        /// New availability.
        online: bool,
    },
    /// Move a cover.
    SetCoverPosition {
        /// Target position.
        position: Position,
    },
    /// Tilt a cover.
    SetCoverTiltPosition {
        /// Target tilt.
        tilt: TiltPosition,
    },
    /// Resume playback.
    MediaPlay,
    /// Pause playback.
    MediaPause,
    /// Change the mute flag.
    MediaMute {
        /// New mute state.
        mute: bool,
    },
    /// Change the volume.
    VolumeSet {
        /// New volume level.
        level: VolumeLevel,
    },
    /// Jump to a playback position.
    MediaSeek {
        /// Position in seconds.
        position: u32,
    },
    /// Change shuffle/repeat.
    PlayMode {
        /// New wire mode.
        mode: PlayMode,
    },
    /// Update the track duration.
    Duration {
        /// Duration in seconds.
        seconds: u32,
    },
    /// Switch to another track.
    CutSong {
        /// New track metadata.
        track: TrackInfo,
    },
    /// Numeric sensor reading.
    SensorValue {
        /// New reading.
        value: f64,
    },
    /// Binary sensor reading.
    BinaryValue {
        /// New state.
        value: bool,
    },
}

/// Derives the transition a device frame asks for.
///
/// Field priorities match the vendor behavior: a bare frame is a turn-on,
/// `switch: "off"` or a zero color value turns off, `online: true` alone is
/// an availability update, and cover/media fields each override the
/// default. Unparseable progress or duration strings leave the previous
/// derivation in place.
#[must_use]
pub fn derive_action(payload: &DevicePayload) -> Action {
    let mut action = match payload.switch {
        Some(SwitchState::Off) => Action::TurnOff,
        _ => Action::TurnOn,
    };

    if payload.online == Some(true) {
        action = Action::Availability { online: true };
    }
    if let Some(color) = &payload.color
        && color.v == 0
    {
        action = Action::TurnOff;
    }
    if let Some(pct) = payload.control_percent {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let position = Position::clamped(pct.round().clamp(0.0, 100.0) as u8);
        action = Action::SetCoverPosition { position };
    }
    if let Some(angle) = payload.angle() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tilt = TiltPosition::from_angle(angle.round().clamp(0.0, 360.0) as u16);
        action = Action::SetCoverTiltPosition { tilt };
    }
    if let Some(play) = payload.play {
        action = if play.is_on() {
            Action::MediaPlay
        } else {
            Action::MediaPause
        };
    }
    if let Some(mute) = payload.mute {
        action = Action::MediaMute { mute: mute.is_on() };
    }
    if let Some(volume) = payload.volume {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = volume.round().clamp(0.0, 100.0) as u8;
        action = Action::VolumeSet {
            level: VolumeLevel::from_percent(percent),
        };
    }
    if let Some(mode) = payload.play_mode {
        action = Action::PlayMode { mode };
    }
    if let Some(progress) = &payload.play_progress {
        match progress.parse::<PlayProgress>() {
            Ok(parsed) => {
                action = Action::MediaSeek {
                    position: parsed.seconds(),
                };
            }
            Err(_) => {
                tracing::debug!(progress = %progress, "Dropping unparseable play progress");
            }
        }
    }
    if let Some(track) = payload.track_info() {
        action = Action::CutSong { track };
    } else if let Some(duration) = &payload.duration {
        match duration.parse::<PlayProgress>() {
            Ok(parsed) => {
                action = Action::Duration {
                    seconds: parsed.seconds(),
                };
            }
            Err(_) => {
                tracing::debug!(duration = %duration, "Dropping unparseable duration");
            }
        }
    }

    action
}

/// An action paired with the payload it came from.
///
/// This is what gets delivered to an entity's update handler; the payload
/// carries the attribute values the transition reads.
#[derive(Debug, Clone)]
pub struct EntityUpdate {
    /// The transition to run.
    pub action: Action,
    /// The frame the transition came from.
    pub payload: DevicePayload,
}

impl EntityUpdate {
    /// Builds an update from a device frame.
    #[must_use]
    pub fn from_payload(payload: DevicePayload) -> Self {
        Self {
            action: derive_action(&payload),
            payload,
        }
    }

    /// Builds a bare availability update, as used by terminal fan-out.
    #[must_use]
    pub fn availability(online: bool) -> Self {
        Self {
            action: Action::Availability { online },
            payload: DevicePayload::default(),
        }
    }
}
