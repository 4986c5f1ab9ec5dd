// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Media player entity.
//!
//! Duwi rebrands several background-music panels; they share one wire
//! protocol but differ in volume step counts and a few mode quirks.
//! Playback position is tracked locally against wall-clock time between
//! frames, the way the panels themselves report progress only on seeks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::json;

use crate::model::DeviceInfo;
use crate::publish::{StatePublisher, StateSink};
use crate::push::{Action, EntityUpdate, TrackInfo};
use crate::registry::{DeviceRegistry, EntityKey, UpdateHandler};
use crate::types::{PlayMode, PlayProgress, RepeatMode, SwitchState, VolumeLevel};

use super::{Controller, DispatchOutcome, EntityContext, EntityInfo};

/// Artist shown when a frame carries none.
const UNKNOWN_SINGER: &str = "unknown singer";

/// Title shown when a frame carries none.
const UNKNOWN_SONG: &str = "unknown song";

/// The media player styles Duwi ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Hua Ersi panel, 15 volume steps.
    HuaErsi,
    /// Xiang Wang S7 mini 3S panel, 15 volume steps.
    XiangWangS7Mini3s,
    /// Xiang Wang S8 panel, 100 volume steps.
    XiangWangS8,
    /// Sheng Bi Ke panel, 19 volume steps.
    ShengBiKe,
    /// Bo Sheng panel, 100 volume steps.
    BoSheng,
}

impl MediaKind {
    /// Parses the vendor style string.
    #[must_use]
    pub fn from_style(value: &str) -> Option<Self> {
        match value {
            "hua_ersi_music" => Some(Self::HuaErsi),
            "xiang_wang_music_s7_mini_3s" => Some(Self::XiangWangS7Mini3s),
            "xiang_wang_music_s8" => Some(Self::XiangWangS8),
            "sheng_bi_ke_music" => Some(Self::ShengBiKe),
            "bo_sheng_music" => Some(Self::BoSheng),
            _ => None,
        }
    }

    /// Returns the device's volume step ceiling.
    #[must_use]
    pub const fn volume_max(&self) -> u8 {
        match self {
            Self::HuaErsi | Self::XiangWangS7Mini3s => 15,
            Self::ShengBiKe => 19,
            Self::XiangWangS8 | Self::BoSheng => 100,
        }
    }
}

/// Playback state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// Music is playing.
    Playing,
    /// Playback is paused.
    #[default]
    Paused,
}

/// Attribute snapshot of a media player.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAttrs {
    /// Whether the device is reachable.
    pub available: bool,
    /// Playback state.
    pub state: PlaybackState,
    /// Volume level.
    pub volume: VolumeLevel,
    /// Whether the output is muted.
    pub muted: bool,
    /// Whether the playlist is shuffled.
    pub shuffle: bool,
    /// Repeat mode.
    pub repeat: RepeatMode,
    /// Playback position in seconds, valid as of `position_updated_at`.
    pub position: u32,
    /// When the position was last adjusted.
    pub position_updated_at: DateTime<Utc>,
    /// Track duration in seconds.
    pub duration: u32,
    /// Current artist.
    pub artist: String,
    /// Current track title.
    pub title: String,
    /// Cover art URL.
    pub image_url: Option<String>,
    /// Vendor track identifier.
    pub song_id: Option<String>,
}

impl Default for MediaAttrs {
    fn default() -> Self {
        Self {
            available: false,
            state: PlaybackState::Paused,
            volume: VolumeLevel::MIN,
            muted: false,
            shuffle: false,
            repeat: RepeatMode::All,
            position: 0,
            position_updated_at: Utc::now(),
            duration: 0,
            artist: UNKNOWN_SINGER.to_string(),
            title: UNKNOWN_SONG.to_string(),
            image_url: None,
            song_id: None,
        }
    }
}

/// One background-music panel.
pub struct MediaPlayer {
    info: EntityInfo,
    kind: MediaKind,
    attrs: RwLock<MediaAttrs>,
    ctrl: Controller,
}

impl MediaPlayer {
    /// Creates a media player entity.
    #[must_use]
    pub fn new(
        info: EntityInfo,
        kind: MediaKind,
        ctx: Arc<EntityContext>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let publisher = StatePublisher::with_delay(sink, ctx.publish_delay);
        Self {
            ctrl: Controller::new(&info, ctx, publisher),
            info,
            kind,
            attrs: RwLock::new(MediaAttrs::default()),
        }
    }

    /// Creates a media player from a discovery record, seeding its state.
    #[must_use]
    pub fn from_device(
        device: &DeviceInfo,
        kind: MediaKind,
        ctx: Arc<EntityContext>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let player = Self::new(EntityInfo::from_device(device), kind, ctx, sink);
        {
            let mut attrs = player.attrs.write();
            attrs.available = device.value_bool("online").unwrap_or(false);
            attrs.state = if device.value_str("play") == Some("on") {
                PlaybackState::Playing
            } else {
                PlaybackState::Paused
            };
            if let Some(volume) = device.value_f64("volume") {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let percent = volume.round().clamp(0.0, 100.0) as u8;
                attrs.volume = VolumeLevel::from_percent(percent);
            }
            attrs.muted = device.value_str("mute") == Some("on");
            if let Some(mode) = device
                .value_str("play_mode")
                .and_then(|s| serde_json::from_value::<PlayMode>(json!(s)).ok())
            {
                attrs.shuffle = mode.shuffle();
                attrs.repeat = mode.repeat();
            }
            if let Some(progress) = device
                .value_str("play_progress")
                .and_then(|s| s.parse::<PlayProgress>().ok())
            {
                attrs.position = progress.seconds();
            }
            let audio = device
                .value
                .get("audio_full_info")
                .or_else(|| device.value.get("audio_info"));
            if let Some(audio) = audio
                && let Ok(info) = serde_json::from_value::<crate::push::AudioInfo>(audio.clone())
            {
                attrs.artist = info
                    .singer_name()
                    .unwrap_or_else(|| UNKNOWN_SINGER.to_string());
                attrs.title = info.title().unwrap_or_else(|| UNKNOWN_SONG.to_string());
                attrs.image_url = info.pic_url.clone();
                attrs.song_id = info.song_id.clone();
                if let Some(duration) = info
                    .duration
                    .as_deref()
                    .and_then(|s| s.parse::<PlayProgress>().ok())
                {
                    attrs.duration = duration.seconds();
                }
            }
            if let Some(duration) = device
                .value_str("duration")
                .and_then(|s| s.parse::<PlayProgress>().ok())
            {
                attrs.duration = duration.seconds();
            }
        }
        player
    }

    /// Returns the entity's registry key.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey::device(&self.info.device_no)
    }

    /// Returns the entity's identity.
    #[must_use]
    pub fn info(&self) -> &EntityInfo {
        &self.info
    }

    /// Returns the player style.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Returns the current attribute snapshot.
    #[must_use]
    pub fn attrs(&self) -> MediaAttrs {
        self.attrs.read().clone()
    }

    /// Registers this entity's update handler under its own key and its
    /// terminal.
    pub fn attach(self: &Arc<Self>, registry: &DeviceRegistry) {
        let entity = Arc::clone(self);
        let handler: UpdateHandler = Arc::new(move |update| {
            let entity = Arc::clone(&entity);
            Box::pin(async move { entity.handle_update(update).await })
        });
        registry.register(self.key(), Arc::clone(&handler));
        registry.register_under_terminal(self.info.terminal_sequence.clone(), self.key(), handler);
    }

    async fn dispatch_with_rollback(&self, snapshot: MediaAttrs) -> DispatchOutcome {
        let outcome = self.ctrl.dispatch().await;
        if outcome.is_failure() {
            *self.attrs.write() = snapshot;
        }
        outcome
    }

    fn apply_play(&self) {
        self.attrs.write().state = PlaybackState::Playing;
        self.ctrl.add_param("play", json!(SwitchState::On.as_str()));
    }

    fn apply_pause(&self) {
        let mut attrs = self.attrs.write();
        if attrs.state == PlaybackState::Playing {
            let elapsed = (Utc::now() - attrs.position_updated_at).num_seconds().max(0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let elapsed = elapsed as u32;
            attrs.position = attrs.position.saturating_add(elapsed);
        }
        attrs.position_updated_at = Utc::now();
        attrs.state = PlaybackState::Paused;
        self.ctrl.add_param("play", json!(SwitchState::Off.as_str()));
    }

    fn apply_seek(&self, position: u32) {
        let mut attrs = self.attrs.write();
        attrs.position = position;
        attrs.position_updated_at = Utc::now();
        self.ctrl.add_param(
            "play_progress",
            json!(PlayProgress::from_seconds(position).to_string()),
        );
    }

    fn apply_mute(&self, mute: bool) {
        self.attrs.write().muted = mute;
        self.ctrl
            .add_param("mute", json!(SwitchState::from_bool(mute).as_str()));
    }

    fn apply_set_volume(&self, level: VolumeLevel) {
        self.attrs.write().volume = level;
        self.ctrl
            .add_param("volume", json!(level.to_steps(self.kind.volume_max())));
    }

    /// Applies a repeat change, honoring the Hua Ersi panels' inability to
    /// switch repeat off: there the off request cycles one/all instead.
    ///
    /// Returns `false` when the change stayed local and nothing was queued.
    fn apply_set_repeat(&self, mut repeat: RepeatMode) -> bool {
        let mut attrs = self.attrs.write();
        if repeat == RepeatMode::Off && self.kind == MediaKind::HuaErsi {
            match attrs.repeat {
                RepeatMode::One => repeat = RepeatMode::All,
                RepeatMode::All => {
                    attrs.repeat = RepeatMode::One;
                    drop(attrs);
                    self.ctrl.publisher().schedule_publish();
                    return false;
                }
                RepeatMode::Off => {}
            }
        }
        attrs.shuffle = false;
        attrs.repeat = repeat;
        match repeat {
            RepeatMode::One => self.ctrl.add_param("play_mode", json!("single")),
            RepeatMode::All => self.ctrl.add_param("play_mode", json!("list")),
            RepeatMode::Off => {
                // The firmware expects both spellings for plain ordered play.
                self.ctrl.add_param("play_mode", json!("all"));
                self.ctrl.add_param("play_mode", json!("order"));
            }
        }
        true
    }

    /// Resumes playback.
    pub async fn play(&self) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_play();
        self.dispatch_with_rollback(snapshot).await
    }

    /// Pauses playback, folding the elapsed play time into the position.
    pub async fn pause(&self) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_pause();
        self.dispatch_with_rollback(snapshot).await
    }

    /// Seeks to a playback position in seconds.
    pub async fn seek(&self, position: u32) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_seek(position);
        self.dispatch_with_rollback(snapshot).await
    }

    /// Mutes or unmutes the output.
    pub async fn mute(&self, mute: bool) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_mute(mute);
        self.dispatch_with_rollback(snapshot).await
    }

    /// Sets the volume level.
    pub async fn set_volume(&self, level: VolumeLevel) -> DispatchOutcome {
        let snapshot = self.attrs();
        self.apply_set_volume(level);
        self.dispatch_with_rollback(snapshot).await
    }

    /// Raises the volume by one step.
    pub async fn volume_up(&self) -> DispatchOutcome {
        let level = self.attrs.read().volume.stepped_up();
        self.set_volume(level).await
    }

    /// Lowers the volume by one step.
    pub async fn volume_down(&self) -> DispatchOutcome {
        let level = self.attrs.read().volume.stepped_down();
        self.set_volume(level).await
    }

    /// Enables or disables shuffle.
    pub async fn set_shuffle(&self, shuffle: bool) -> DispatchOutcome {
        if shuffle {
            let snapshot = self.attrs();
            {
                let mut attrs = self.attrs.write();
                attrs.shuffle = true;
                attrs.repeat = RepeatMode::All;
            }
            self.ctrl.add_param("play_mode", json!("random"));
            self.dispatch_with_rollback(snapshot).await
        } else {
            // Falling back out of shuffle restores the repeat mode.
            let repeat = self.attrs.read().repeat;
            self.set_repeat(repeat).await
        }
    }

    /// Sets the repeat mode.
    pub async fn set_repeat(&self, repeat: RepeatMode) -> DispatchOutcome {
        let snapshot = self.attrs();
        if !self.apply_set_repeat(repeat) {
            return DispatchOutcome::Empty;
        }
        self.dispatch_with_rollback(snapshot).await
    }

    /// Skips to the next track.
    pub async fn next_track(&self) -> DispatchOutcome {
        self.ctrl.add_param("songs_switch", json!("next"));
        self.ctrl.dispatch().await
    }

    /// Skips to the previous track.
    pub async fn previous_track(&self) -> DispatchOutcome {
        self.ctrl.add_param("songs_switch", json!("prev"));
        self.ctrl.dispatch().await
    }

    fn apply_cut_song(&self, track: &TrackInfo) {
        let mut attrs = self.attrs.write();
        attrs.artist = track
            .singer
            .clone()
            .unwrap_or_else(|| UNKNOWN_SINGER.to_string());
        attrs.title = track
            .song_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_SONG.to_string());
        attrs.image_url = track.pic_url.clone();
        attrs.song_id = track.song_id.clone();
        if let Some(duration) = track.duration {
            attrs.duration = duration;
        }
        attrs.position = 0;
        attrs.position_updated_at = Utc::now();
    }

    fn set_available(&self, online: bool) {
        self.attrs.write().available = online;
        self.ctrl.publisher().schedule_publish();
    }

    /// Applies one inbound update.
    pub async fn handle_update(&self, update: EntityUpdate) {
        let _gate = self.ctrl.close_gate();
        match update.action {
            Action::MediaPlay => {
                self.apply_play();
                let _ = self.ctrl.dispatch().await;
            }
            Action::MediaPause => {
                self.apply_pause();
                let _ = self.ctrl.dispatch().await;
            }
            Action::MediaMute { mute } => {
                self.apply_mute(mute);
                let _ = self.ctrl.dispatch().await;
            }
            Action::VolumeSet { level } => {
                self.apply_set_volume(level);
                let _ = self.ctrl.dispatch().await;
            }
            Action::MediaSeek { position } => {
                self.apply_seek(position);
                let _ = self.ctrl.dispatch().await;
            }
            Action::PlayMode { mode } => {
                let queued = self.apply_set_repeat(mode.repeat());
                if mode.shuffle() {
                    let mut attrs = self.attrs.write();
                    attrs.shuffle = true;
                    attrs.repeat = RepeatMode::All;
                }
                if queued {
                    let _ = self.ctrl.dispatch().await;
                }
            }
            Action::Duration { seconds } => {
                self.attrs.write().duration = seconds;
                self.ctrl.publisher().schedule_publish();
            }
            Action::CutSong { track } => {
                self.apply_cut_song(&track);
                self.ctrl.publisher().schedule_publish();
            }
            Action::Availability { online } => self.set_available(online),
            _ => {
                if let Some(online) = update.payload.online {
                    self.set_available(online);
                }
            }
        }
    }
}

impl std::fmt::Debug for MediaPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPlayer")
            .field("device_no", &self.info.device_no)
            .field("kind", &self.kind)
            .finish()
    }
}
