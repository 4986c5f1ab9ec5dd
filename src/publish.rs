// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State publishing with trailing-edge debounce.
//!
//! The host entity framework renders entity state to users and automations.
//! Confirmed user commands publish immediately; bursts of inbound push
//! notifications are coalesced so the host sees one render per quiet
//! period instead of one per frame.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Default quiet period before a debounced publish fires.
pub const DEFAULT_PUBLISH_DELAY: Duration = Duration::from_secs(2);

/// Host-provided hook that renders the current entity state.
///
/// The sink reads live state at call time; the publisher never passes a
/// snapshot. Rendering is infallible from the bridge's point of view; any
/// host-side failure is the host's to handle.
pub trait StateSink: Send + Sync {
    /// Renders the entity's current state.
    fn publish(&self);
}

impl<F> StateSink for F
where
    F: Fn() + Send + Sync,
{
    fn publish(&self) {
        self();
    }
}

/// Per-entity publisher with an immediate path and a debounced path.
///
/// [`StatePublisher::schedule_publish`] is a trailing-edge debounce: each
/// call aborts any armed timer and arms a fresh one, so exactly one publish
/// fires once the calls stop, one delay after the last call. The publish
/// reads live state through the sink, which is what coalesces intermediate
/// values.
pub struct StatePublisher {
    sink: Arc<dyn StateSink>,
    delay: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl StatePublisher {
    /// Creates a publisher with the default delay.
    #[must_use]
    pub fn new(sink: Arc<dyn StateSink>) -> Self {
        Self::with_delay(sink, DEFAULT_PUBLISH_DELAY)
    }

    /// Creates a publisher with a custom debounce delay.
    #[must_use]
    pub fn with_delay(sink: Arc<dyn StateSink>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            timer: Mutex::new(None),
        }
    }

    /// Publishes immediately, bypassing the debounce window.
    pub fn publish_now(&self) {
        self.sink.publish();
    }

    /// Arms (or re-arms) the debounce timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_publish(&self) {
        let mut slot = self.timer.lock();
        if let Some(armed) = slot.take() {
            armed.abort();
        }
        let sink = Arc::clone(&self.sink);
        let delay = self.delay;
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.publish();
        }));
    }

    /// Returns `true` if a debounced publish is currently armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for StatePublisher {
    fn drop(&mut self) {
        if let Some(armed) = self.timer.lock().take() {
            armed.abort();
        }
    }
}

impl std::fmt::Debug for StatePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePublisher")
            .field("delay", &self.delay)
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct CountingSink(AtomicU32);

    impl StateSink for CountingSink {
        fn publish(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn publisher(delay: Duration) -> (Arc<CountingSink>, StatePublisher) {
        let sink = Arc::new(CountingSink(AtomicU32::new(0)));
        let publisher = StatePublisher::with_delay(Arc::clone(&sink) as Arc<dyn StateSink>, delay);
        (sink, publisher)
    }

    #[tokio::test(start_paused = true)]
    async fn single_call_fires_once_after_delay() {
        let (sink, publisher) = publisher(Duration::from_secs(2));

        publisher.schedule_publish();
        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_calls_coalesce_to_one_publish() {
        let (sink, publisher) = publisher(Duration::from_secs(2));

        for _ in 0..10 {
            publisher.schedule_publish();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_restarts_the_window() {
        let (sink, publisher) = publisher(Duration::from_secs(2));

        publisher.schedule_publish();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        publisher.schedule_publish();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        // 3 s after the first call, but only 1.5 s after the second.
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_now_bypasses_timer() {
        let (sink, publisher) = publisher(Duration::from_secs(2));

        publisher.publish_now();
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
        assert!(!publisher.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn armed_flag_tracks_timer() {
        let (_sink, publisher) = publisher(Duration::from_secs(2));

        assert!(!publisher.is_armed());
        publisher.schedule_publish();
        assert!(publisher.is_armed());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!publisher.is_armed());
    }
}
