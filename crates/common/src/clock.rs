//! Clock and rate-limiting utilities for playback timing.
//!
//! Live playback is anchored to a monotonic epoch captured when the
//! driver starts servicing a session. This module provides:
//! - Epoch capture and elapsed-time queries
//! - Conversions between seconds and nanoseconds
//! - A rate controller for throttling time-update notifications

use std::time::Instant;

/// A playback clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the session started).
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl PlaybackClock {
    /// Create a new playback clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get nanoseconds elapsed since the session started.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Get seconds elapsed since the session started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Convert an elapsed nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }

    /// Convert seconds to nanoseconds.
    pub fn secs_to_ns(secs: f64) -> u64 {
        (secs * 1_000_000_000.0) as u64
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Rate controller for throttling recurring notifications.
///
/// The playback driver uses this to cap its time-update signal at a
/// configured frequency instead of emitting on every service tick.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = PlaybackClock::start();
        // Should be very small but non-negative
        assert!(clock.elapsed_ns() < 1_000_000_000); // less than 1 second
    }

    #[test]
    fn test_ns_to_secs_conversion() {
        assert!((PlaybackClock::ns_to_secs(1_500_000_000) - 1.5).abs() < 1e-9);
        assert_eq!(PlaybackClock::secs_to_ns(2.0), 2_000_000_000);
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(30);
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(1_000_000)); // 1ms later, too soon
        assert!(ctrl.should_tick(34_000_000)); // ~34ms later, should fire (30Hz ~ 33.3ms)
    }

    #[test]
    fn test_rate_controller_zero_hz_clamps() {
        let ctrl = RateController::new(0);
        assert_eq!(ctrl.interval_ns(), 1_000_000_000);
    }
}
