use chrono::{DateTime, SubsecRound, Utc};

/// Source of the current instant.
///
/// Registries read it once per operation so that every comparison and every
/// timestamp written by that operation agree on the same `now`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Round an instant down to the microsecond precision Postgres `timestamptz` keeps.
///
/// Instants that are written and also returned to the caller go through this,
/// so the returned value equals what a later read gives back.
pub fn stored_precision(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(6)
}

/// Wall clock backed by `Utc::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = Utc::now();
        let now = SystemClock.now();
        let after = Utc::now();
        assert!(before <= now && now <= after);
    }

    #[test]
    fn stored_precision_drops_sub_microsecond_digits() {
        let instant = DateTime::from_timestamp(1_767_225_600, 123_456_789).unwrap();
        let stored = stored_precision(instant);
        assert_eq!(stored.timestamp_subsec_nanos(), 123_456_000);
        assert_eq!(stored_precision(stored), stored);
    }
}
