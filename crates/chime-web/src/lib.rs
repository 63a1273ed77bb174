#![forbid(unsafe_code)]

//! `chime-web` runs the dashboard's state sync inside a host page.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment (JS) pushes hash changes
//!   and widget submissions, and reads back the hash, widget values and the
//!   latest render outcome.
//! - **Deterministic time**: the host advances the clock explicitly.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! This crate does not bind to `wasm-bindgen`; a thin JS shim wraps
//! [`WebSession`].

pub mod export;
pub mod session;

use chime_core::Timestamp;
use chime_runtime::Clock;

pub use export::{EXPORT_PATH, ExportRequest, export_href};
pub use session::{MAX_SETTLE_STEPS, SessionError, StepReport, WebSession};

/// Wall clock controlled by the host, in epoch milliseconds.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: u64,
}

impl DeterministicClock {
    /// Create a clock starting at the epoch.
    #[must_use]
    pub const fn new() -> Self {
        Self { now: 0 }
    }

    /// Set current time.
    pub fn set_millis(&mut self, now: u64) {
        self.now = now;
    }

    /// Advance time by `dt` milliseconds.
    pub fn advance_millis(&mut self, dt: u64) {
        self.now = self.now.saturating_add(dt);
    }
}

impl Clock for DeterministicClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_clock_advances_monotonically() {
        let mut clock = DeterministicClock::new();
        assert_eq!(clock.now(), Timestamp::from_millis(0));

        clock.advance_millis(16);
        assert_eq!(clock.now(), Timestamp::from_millis(16));

        clock.set_millis(1_000);
        clock.advance_millis(u64::MAX);
        assert_eq!(clock.now(), Timestamp::from_millis(u64::MAX));
    }
}
