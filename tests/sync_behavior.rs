// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the state-propagation core: debounced publishing,
//! control-gate routing, command composition, terminal fan-out and failure
//! isolation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use duwi_bridge::config::BridgeConfig;
use duwi_bridge::control::{ControlClient, ControlRequest, StatusCode};
use duwi_bridge::entity::{
    Cover, CoverKind, DispatchOutcome, EntityContext, EntityInfo, Light, LightKind, MediaKind,
    MediaPlayer, Sensor, Switch, TurnOnRequest,
};
use duwi_bridge::error::ControlError;
use duwi_bridge::publish::StateSink;
use duwi_bridge::push::SensorField;
use duwi_bridge::report::{FailureLog, MessageLog};
use duwi_bridge::types::{Brightness, HsColor, Mired, Position, VolumeLevel};
use duwi_bridge::Bridge;

// ============================================================================
// Test doubles
// ============================================================================

/// Control client that records requests and answers from a script.
#[derive(Default)]
struct MockControl {
    requests: Mutex<Vec<ControlRequest>>,
    responses: Mutex<VecDeque<StatusCode>>,
}

impl MockControl {
    fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn respond_with(&self, status: StatusCode) {
        self.responses.lock().push_back(status);
    }

    fn requests(&self) -> Vec<ControlRequest> {
        self.requests.lock().clone()
    }

    fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ControlClient for MockControl {
    async fn control(&self, request: &ControlRequest) -> Result<StatusCode, ControlError> {
        self.requests.lock().push(request.clone());
        Ok(self
            .responses
            .lock()
            .pop_front()
            .unwrap_or(StatusCode::Success))
    }
}

/// Publish sink counting how often the host was asked to render.
#[derive(Default)]
struct CountingSink(AtomicU32);

impl StateSink for CountingSink {
    fn publish(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl CountingSink {
    fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

const DEBOUNCE: Duration = Duration::from_secs(2);

fn context(control: &Arc<MockControl>, failures: &Arc<MessageLog>) -> Arc<EntityContext> {
    Arc::new(
        EntityContext::new(
            Arc::clone(control) as Arc<dyn ControlClient>,
            Arc::clone(failures) as Arc<dyn FailureLog>,
        )
        .with_publish_delay(DEBOUNCE),
    )
}

fn light_info(device_no: &str) -> EntityInfo {
    EntityInfo {
        device_no: device_no.to_string(),
        device_name: "Test Light".to_string(),
        house_no: "h1".to_string(),
        terminal_sequence: "t1".to_string(),
        ..EntityInfo::default()
    }
}

fn device_frame(msg: serde_json::Value) -> String {
    json!({"namespace": "Duwi.RPS.DeviceValue", "result": {"msg": msg}}).to_string()
}

fn terminal_frame(sequence: &str, online: bool) -> String {
    json!({
        "namespace": "Duwi.RPS.TerminalOnline",
        "result": {"msg": {"sequence": sequence, "online": online}}
    })
    .to_string()
}

fn bridge_with(control: &Arc<MockControl>) -> Bridge {
    let mut config = BridgeConfig::new("key", "secret", "token", "h1");
    config.publish_delay = DEBOUNCE;
    Bridge::new(config, Arc::clone(control) as Arc<dyn ControlClient>).unwrap()
}

// ============================================================================
// Gate routing
// ============================================================================

mod gate_routing {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn inbound_update_makes_no_control_call() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        let bridge = bridge_with(&control);

        let light = Arc::new(Light::new(
            light_info("d1"),
            LightKind::Dimmable,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));
        light.attach(bridge.registry());

        bridge
            .handle_push(&device_frame(json!({"deviceNo": "d1", "switch": "on", "light": 80})))
            .await;

        assert_eq!(control.call_count(), 0);
        assert!(light.attrs().is_on);
        assert_eq!(light.attrs().brightness.unwrap().percent(), 80);

        // The publish is debounced, not immediate.
        assert_eq!(sink.count(), 0);
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn user_command_calls_api_and_publishes_once() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();

        let light = Arc::new(Light::new(
            light_info("d1"),
            LightKind::Dimmable,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));

        let outcome = light
            .turn_on(TurnOnRequest::new().with_brightness(Brightness::from_percent(50)))
            .await;

        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(control.call_count(), 1);
        assert_eq!(sink.count(), 1);
        assert!(failures.is_empty());

        // No stray debounced publish follows the immediate one.
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_reopens_after_inbound_update() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        let bridge = bridge_with(&control);

        let switch = Arc::new(Switch::new(
            light_info("d1"),
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));
        switch.attach(bridge.registry());

        bridge
            .handle_push(&device_frame(json!({"deviceNo": "d1", "switch": "on"})))
            .await;
        assert_eq!(control.call_count(), 0);

        // A user command right after the echo goes out normally.
        let outcome = switch.turn_off().await;
        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(control.call_count(), 1);
    }
}

// ============================================================================
// Debounce coalescing
// ============================================================================

mod debounce {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_of_updates_publishes_once_with_latest_state() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        let bridge = bridge_with(&control);

        let light = Arc::new(Light::new(
            light_info("d1"),
            LightKind::Dimmable,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));
        light.attach(bridge.registry());

        for pct in [10, 20, 30, 40, 50] {
            bridge
                .handle_push(&device_frame(json!({"deviceNo": "d1", "light": pct})))
                .await;
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        assert_eq!(sink.count(), 0);
        tokio::time::sleep(DEBOUNCE).await;
        assert_eq!(sink.count(), 1);
        // The publish reads live state: the last value of the burst.
        assert_eq!(light.attrs().brightness.unwrap().percent(), 50);
        assert_eq!(control.call_count(), 0);
    }
}

// ============================================================================
// Command composition
// ============================================================================

mod composition {
    use super::*;

    #[tokio::test]
    async fn color_turn_on_composes_one_call() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();

        let light = Arc::new(Light::new(
            light_info("d1"),
            LightKind::Rgbcw,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));

        light
            .turn_on(
                TurnOnRequest::new()
                    .with_brightness(Brightness::from_percent(40))
                    .with_color_temp(Mired::clamped(326))
                    .with_hs_color(HsColor::new(120, 100).unwrap()),
            )
            .await;

        let requests = control.requests();
        assert_eq!(requests.len(), 1);
        let codes: Vec<&str> = requests[0].params.iter().map(|p| p.code).collect();
        assert_eq!(codes, vec!["color", "color_temp", "color"]);
        assert_eq!(requests[0].device_no, "d1");
        assert_eq!(requests[0].house_no, "h1");
    }

    #[tokio::test]
    async fn bare_turn_on_sends_only_the_switch() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();

        let light = Arc::new(Light::new(
            light_info("d1"),
            LightKind::OnOff,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));

        light.turn_on(TurnOnRequest::new()).await;

        let requests = control.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].params.len(), 1);
        assert_eq!(requests[0].params[0].code, "switch");
        assert_eq!(requests[0].params[0].value, json!("on"));
    }

    #[tokio::test]
    async fn composition_never_spans_two_calls() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();

        let cover = Arc::new(Cover::new(
            light_info("d1"),
            CoverKind::Shutter,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));

        cover.set_position(Position::new(40).unwrap()).await;
        cover.stop().await;

        let requests = control.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].params.len(), 1);
        assert_eq!(requests[0].params[0].code, "control_percent");
        assert_eq!(requests[1].params.len(), 1);
        assert_eq!(requests[1].params[0].code, "control");
    }

    #[tokio::test]
    async fn device_color_temp_round_trips_through_entity() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        let bridge = bridge_with(&control);

        let light = Arc::new(Light::new(
            light_info("d1"),
            LightKind::DimmableColorTemp,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));
        light.attach(bridge.registry());

        // Inbound: device reports 4500 K.
        bridge
            .handle_push(&device_frame(json!({"deviceNo": "d1", "color_temp": 4500})))
            .await;
        let mired = light.attrs().color_temp.unwrap();
        assert_eq!(mired.value(), 326);

        // Outbound: echoing that mired back yields the same device value.
        light
            .turn_on(TurnOnRequest::new().with_color_temp(mired))
            .await;
        let requests = control.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].params[0].code, "color_temp");
        assert_eq!(requests[0].params[0].value, json!(4500));
    }
}

// ============================================================================
// Terminal fan-out
// ============================================================================

mod fan_out {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn terminal_offline_marks_all_registered_entities() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let bridge = bridge_with(&control);
        let ctx = context(&control, &failures);

        let light_sink = CountingSink::shared();
        let light = Arc::new(Light::new(
            light_info("a"),
            LightKind::Dimmable,
            Arc::clone(&ctx),
            Arc::clone(&light_sink) as Arc<dyn StateSink>,
        ));
        let cover_sink = CountingSink::shared();
        let cover = Arc::new(Cover::new(
            light_info("b"),
            CoverKind::Roll,
            Arc::clone(&ctx),
            Arc::clone(&cover_sink) as Arc<dyn StateSink>,
        ));
        light.attach(bridge.registry());
        cover.attach(bridge.registry());

        bridge.handle_push(&terminal_frame("t1", false)).await;

        assert!(!light.attrs().available);
        assert!(!cover.attrs().available);
        // Availability changes publish immediately for these types.
        assert_eq!(light_sink.count(), 1);
        assert_eq!(cover_sink.count(), 1);
        // Nothing else moved.
        assert!(!light.attrs().is_on);
        assert_eq!(cover.attrs().position, Position::CLOSED);
        assert_eq!(control.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_online_needs_follow_flag() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        let bridge = bridge_with(&control);

        let light = Arc::new(Light::new(
            light_info("a"),
            LightKind::Dimmable,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));
        light.attach(bridge.registry());

        bridge.handle_push(&terminal_frame("t1", true)).await;
        assert!(!light.attrs().available);

        bridge.registry().set_terminal_follow("t1", true);
        bridge.handle_push(&terminal_frame("t1", true)).await;
        assert!(light.attrs().available);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_terminal_is_dropped() {
        let control = MockControl::shared();
        let bridge = bridge_with(&control);
        // Nothing registered; must not panic or call anything.
        bridge.handle_push(&terminal_frame("ghost", false)).await;
        assert_eq!(control.call_count(), 0);
    }
}

// ============================================================================
// Sensor routing
// ============================================================================

mod sensor_routing {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn one_frame_fans_to_scoped_sensor_entities() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let bridge = bridge_with(&control);
        let ctx = context(&control, &failures);

        let temp_sink = CountingSink::shared();
        let temp = Arc::new(Sensor::new(
            light_info("s1"),
            SensorField::Temperature,
            &ctx,
            Arc::clone(&temp_sink) as Arc<dyn StateSink>,
        ));
        let humidity_sink = CountingSink::shared();
        let humidity = Arc::new(Sensor::new(
            light_info("s1"),
            SensorField::Humidity,
            &ctx,
            Arc::clone(&humidity_sink) as Arc<dyn StateSink>,
        ));
        temp.attach(bridge.registry());
        humidity.attach(bridge.registry());

        bridge
            .handle_push(&device_frame(json!({
                "deviceNo": "s1",
                "temp_value": 21.5,
                "humidity_value": 40.0
            })))
            .await;

        assert_eq!(temp.attrs().value, Some(21.5));
        assert_eq!(humidity.attrs().value, Some(40.0));

        tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
        assert_eq!(temp_sink.count(), 1);
        assert_eq!(humidity_sink.count(), 1);
    }
}

// ============================================================================
// Failure isolation
// ============================================================================

mod failure_isolation {
    use super::*;

    #[tokio::test]
    async fn failed_call_rolls_back_and_logs_once() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        control.respond_with(StatusCode::SysError);

        let switch = Arc::new(Switch::new(
            light_info("d1"),
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));

        let outcome = switch.turn_on().await;
        assert_eq!(outcome, DispatchOutcome::Failed(StatusCode::SysError));

        // Optimistic mutation was rolled back, nothing was published.
        assert!(!switch.attrs().is_on);
        assert_eq!(sink.count(), 0);

        // Exactly one failure record.
        assert_eq!(failures.len(), 1);
        let record = &failures.records()[0];
        assert_eq!(record.device_no.as_deref(), Some("d1"));
        assert_eq!(record.status, Some(StatusCode::SysError));
    }

    #[tokio::test]
    async fn pending_command_is_cleared_after_failure() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        control.respond_with(StatusCode::GatewaySysError);

        let light = Arc::new(Light::new(
            light_info("d1"),
            LightKind::Dimmable,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));

        light
            .turn_on(TurnOnRequest::new().with_brightness(Brightness::from_percent(10)))
            .await;
        // Next command carries only its own parameters.
        light.turn_off().await;

        let requests = control.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].params.len(), 1);
        assert_eq!(requests[1].params[0].code, "switch");
    }

    #[tokio::test]
    async fn media_failure_restores_playback_state() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        control.respond_with(StatusCode::Timeout);

        let player = Arc::new(MediaPlayer::new(
            light_info("m1"),
            MediaKind::BoSheng,
            context(&control, &failures),
            Arc::clone(&sink) as Arc<dyn StateSink>,
        ));

        let before = player.attrs();
        let outcome = player.set_volume(VolumeLevel::new(0.8).unwrap()).await;
        assert!(outcome.is_failure());
        assert_eq!(player.attrs().volume, before.volume);
        assert_eq!(failures.len(), 1);
    }
}

// ============================================================================
// Media player transitions
// ============================================================================

mod media_transitions {
    use super::*;

    fn player(
        control: &Arc<MockControl>,
        failures: &Arc<MessageLog>,
        sink: &Arc<CountingSink>,
        kind: MediaKind,
    ) -> Arc<MediaPlayer> {
        Arc::new(MediaPlayer::new(
            light_info("m1"),
            kind,
            context(control, failures),
            Arc::clone(sink) as Arc<dyn StateSink>,
        ))
    }

    #[tokio::test]
    async fn volume_scales_to_device_steps() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        let player = player(&control, &failures, &sink, MediaKind::HuaErsi);

        player.set_volume(VolumeLevel::new(0.5).unwrap()).await;

        let requests = control.requests();
        assert_eq!(requests[0].params[0].code, "volume");
        assert_eq!(requests[0].params[0].value, json!(7));
    }

    #[tokio::test]
    async fn seek_formats_progress_string() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        let player = player(&control, &failures, &sink, MediaKind::BoSheng);

        player.seek(205).await;

        let requests = control.requests();
        assert_eq!(requests[0].params[0].code, "play_progress");
        assert_eq!(requests[0].params[0].value, json!("03:25"));
    }

    #[tokio::test(start_paused = true)]
    async fn song_change_frame_updates_track() {
        let control = MockControl::shared();
        let failures = MessageLog::shared();
        let sink = CountingSink::shared();
        let bridge = bridge_with(&control);
        let player = player(&control, &failures, &sink, MediaKind::BoSheng);
        player.attach(bridge.registry());

        bridge
            .handle_push(&device_frame(json!({
                "deviceNo": "m1",
                "duration": "04:10",
                "audio_full_info": {
                    "singer": [{"name": "Artist"}],
                    "song_name": "Title"
                }
            })))
            .await;

        let attrs = player.attrs();
        assert_eq!(attrs.artist, "Artist");
        assert_eq!(attrs.title, "Title");
        assert_eq!(attrs.duration, 250);
        assert_eq!(attrs.position, 0);
        assert_eq!(control.call_count(), 0);
    }
}
