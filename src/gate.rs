// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-entity control gate.
//!
//! State echoed back over the push channel re-enters the same mutation
//! methods a user command runs through. The gate is closed around those
//! inbound-triggered mutations so the ensuing dispatch publishes locally
//! instead of calling the vendor API again, which would otherwise bounce
//! the echo straight back to the cloud.

use std::sync::atomic::{AtomicU8, Ordering};

const OPEN: u8 = 0;
const CLOSED_FOR_INBOUND: u8 = 1;

/// Latch that routes dispatch either to the vendor API (open) or to the
/// local debounced publish path (closed).
///
/// The gate is a two-state atomic machine with compare-and-swap
/// transitions, safe on a multi-threaded runtime. Closing returns a
/// [`GateGuard`] that reopens on drop, so the gate cannot stay closed past
/// the inbound transition that closed it, including panic unwinds and
/// early returns.
///
/// # Examples
///
/// ```
/// use duwi_bridge::gate::ControlGate;
///
/// let gate = ControlGate::new();
/// assert!(gate.is_open());
/// {
///     let _guard = gate.close();
///     assert!(!gate.is_open());
/// }
/// assert!(gate.is_open());
/// ```
#[derive(Debug, Default)]
pub struct ControlGate {
    state: AtomicU8,
}

impl ControlGate {
    /// Creates an open gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(OPEN),
        }
    }

    /// Returns `true` if dispatch should go to the vendor API.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OPEN
    }

    /// Closes the gate for an inbound-triggered mutation.
    ///
    /// If the gate is already closed, the returned guard is a nested no-op:
    /// only the outermost guard reopens the gate when dropped.
    #[must_use = "the gate reopens when the guard is dropped"]
    pub fn close(&self) -> GateGuard<'_> {
        let acquired = self
            .state
            .compare_exchange(OPEN, CLOSED_FOR_INBOUND, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        GateGuard {
            gate: self,
            acquired,
        }
    }
}

/// Scoped handle that reopens the [`ControlGate`] on drop.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a ControlGate,
    acquired: bool,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if self.acquired {
            self.gate.state.store(OPEN, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_open() {
        assert!(ControlGate::new().is_open());
    }

    #[test]
    fn close_and_reopen() {
        let gate = ControlGate::new();
        let guard = gate.close();
        assert!(!gate.is_open());
        drop(guard);
        assert!(gate.is_open());
    }

    #[test]
    fn nested_close_keeps_outer_scope() {
        let gate = ControlGate::new();
        let outer = gate.close();
        {
            let inner = gate.close();
            assert!(!gate.is_open());
            drop(inner);
            // Still closed: the inner guard never acquired the gate.
            assert!(!gate.is_open());
        }
        drop(outer);
        assert!(gate.is_open());
    }

    #[test]
    fn reopens_after_panic() {
        let gate = ControlGate::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = gate.close();
            panic!("transition failed");
        }));
        assert!(result.is_err());
        assert!(gate.is_open());
    }
}
