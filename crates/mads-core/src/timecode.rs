//! Timecode computation (C7).
//!
//! A timecode is frames-since-epoch at a fixed frame rate: a floating-point
//! common time reference that lets agents on different hosts agree on "when"
//! without synchronizing clocks.

use chrono::{DateTime, Utc};

/// `seconds-since-epoch * fps` for the given instant.
pub fn timecode_at(instant: DateTime<Utc>, fps: f64) -> f64 {
    let secs = instant.timestamp() as f64 + instant.timestamp_subsec_millis() as f64 / 1000.0;
    secs * fps
}

/// Timecode for "now".
pub fn timecode_now(fps: f64) -> f64 {
    timecode_at(Utc::now(), fps)
}

/// An agent's cached offset from the broker's clock: `broker_tc - local_tc`,
/// computed once at init. Every subsequently published timecode is shifted by
/// this offset so all agents live on the broker's clock (Open Question iv).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimecodeOffset(pub f64);

impl TimecodeOffset {
    pub fn compute(broker_tc: f64, local_tc: f64) -> Self {
        Self(broker_tc - local_tc)
    }

    pub fn apply(&self, local_tc: f64) -> f64 {
        local_tc + self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timecode_at_is_seconds_times_fps() {
        let t = Utc.timestamp_opt(1_000, 0).unwrap();
        assert_eq!(timecode_at(t, 25.0), 25_000.0);
    }

    #[test]
    fn offset_is_broker_minus_local() {
        let offset = TimecodeOffset::compute(100.0, 40.0);
        assert_eq!(offset.0, 60.0);
        assert_eq!(offset.apply(40.0), 100.0);
    }

    #[test]
    fn offset_default_is_zero() {
        let offset = TimecodeOffset::default();
        assert_eq!(offset.apply(42.0), 42.0);
    }
}
