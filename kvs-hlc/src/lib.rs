//! A hybrid logical clock (HLC): produces fixed-width, lexicographically
//! ordered timestamps used to order MVCC versions across the store.
//!
//! Timestamps are 24-character decimal strings: 19 digits of physical
//! nanoseconds since the epoch, followed by 5 digits of a logical counter.
//! Comparing the strings byte-for-byte yields the same order as comparing
//! the underlying `(physical, logical)` pairs.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width of the physical-time component, in decimal digits.
const PHYSICAL_WIDTH: usize = 19;
/// Width of the logical-counter component, in decimal digits.
const LOGICAL_WIDTH: usize = 5;
/// Total width of a rendered timestamp.
pub const TIMESTAMP_WIDTH: usize = PHYSICAL_WIDTH + LOGICAL_WIDTH;
/// A wall-clock advance smaller than this (in nanoseconds) is treated as the
/// same physical tick, so that strict monotonicity holds even when the clock
/// barely moves or runs slightly backwards.
const MIN_TICK_NANOS: i128 = 1_000_000;
/// Largest value the logical counter may take within a single physical tick.
const MAX_LOGICAL: u32 = 99_999;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("logical counter overflowed within a single physical tick")]
    LogicalOverflow,
}

/// A single HLC timestamp, rendered as its fixed-width string form.
///
/// `Timestamp` compares lexicographically by `Ord`/`PartialOrd`, which is
/// exactly the total order `T` described by the data model: comparing the
/// strings byte-for-byte agrees with comparing `(physical, logical)` pairs.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Timestamp(String);

impl Timestamp {
    /// Parses a rendered timestamp, rejecting anything that isn't exactly
    /// [`TIMESTAMP_WIDTH`] ASCII digits.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() == TIMESTAMP_WIDTH && s.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    /// The minimum possible timestamp, useful as a read floor.
    pub fn zero() -> Self {
        Self("0".repeat(TIMESTAMP_WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn new(physical: i128, logical: u32) -> Self {
        Self(format!(
            "{:0phys$}{:0log$}",
            physical,
            logical,
            phys = PHYSICAL_WIDTH,
            log = LOGICAL_WIDTH
        ))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

struct ClockState {
    last_physical: i128,
    logical: u32,
}

/// A monotonic hybrid logical clock.
///
/// `Now()` is guarded by an exclusive lock so that concurrent callers
/// serialize; this matches the contract in §4.1 (I1: for any two calls on
/// the same clock, the later return is lexicographically >= the earlier).
pub struct Clock {
    state: Mutex<ClockState>,
}

impl Clock {
    pub fn new() -> Self {
        Self { state: Mutex::new(ClockState { last_physical: 0, logical: 0 }) }
    }

    /// Returns the next timestamp, blocking (spinning on the physical clock)
    /// if the logical counter would otherwise overflow within one tick.
    ///
    /// This never fails: overflow is resolved by waiting for physical time
    /// to advance past the 1ms tick threshold, which preserves I1.
    pub fn now(&self) -> Timestamp {
        loop {
            match self.try_now() {
                Ok(ts) => return ts,
                Err(ClockError::LogicalOverflow) => std::hint::spin_loop(),
            }
        }
    }

    /// Like [`Clock::now`], but returns [`ClockError::LogicalOverflow`]
    /// instead of blocking when the logical counter is exhausted for the
    /// current physical tick.
    pub fn try_now(&self) -> Result<Timestamp, ClockError> {
        let physical = Self::wall_clock_nanos();
        let mut state = self.state.lock().expect("hlc mutex poisoned");

        if physical > state.last_physical && physical - state.last_physical >= MIN_TICK_NANOS {
            state.last_physical = physical;
            state.logical = 0;
        } else {
            if state.logical >= MAX_LOGICAL {
                tracing::warn!(
                    physical = state.last_physical,
                    "hlc logical counter at tick capacity, waiting for physical time to advance"
                );
                return Err(ClockError::LogicalOverflow);
            }
            state.logical += 1;
        }

        Ok(Timestamp::new(state.last_physical, state.logical))
    }

    fn wall_clock_nanos() -> i128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_nanos() as i128
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p1_monotonic_and_fixed_width() {
        let clock = Clock::new();
        let mut prev = clock.now();
        for _ in 0..10_000 {
            let ts = clock.now();
            assert_eq!(ts.as_str().len(), TIMESTAMP_WIDTH);
            assert!(ts >= prev);
            prev = ts;
        }
    }

    #[test]
    fn p2_strict_monotonicity_within_a_tick() {
        let clock = Clock::new();
        let a = clock.now();
        let b = clock.now();
        assert_ne!(a, b);
        assert_eq!(&a.as_str()[..19], &b.as_str()[..19]);
    }

    #[test]
    fn logical_overflow_within_one_tick_blocks_not_panics() {
        let clock = Clock::new();
        // Force the clock into a fixed physical tick, then exhaust the
        // logical counter to exercise the overflow path deterministically.
        {
            let mut state = clock.state.lock().unwrap();
            state.last_physical = Clock::wall_clock_nanos() + 3_600_000_000_000; // 1h in the future
            state.logical = MAX_LOGICAL;
        }
        assert!(matches!(clock.try_now(), Err(ClockError::LogicalOverflow)));
    }

    #[test]
    fn parse_rejects_wrong_width() {
        assert!(Timestamp::parse("123").is_none());
        assert!(Timestamp::parse(&"0".repeat(TIMESTAMP_WIDTH)).is_some());
    }

    proptest::proptest! {
        #[test]
        fn ordering_matches_pair_order(p1 in 0u64..1_000_000, l1 in 0u32..99_999, p2 in 0u64..1_000_000, l2 in 0u32..99_999) {
            let a = Timestamp::new(p1 as i128, l1);
            let b = Timestamp::new(p2 as i128, l2);
            let expect = (p1, l1).cmp(&(p2, l2));
            prop_assert_eq!(a.cmp(&b), expect);
        }
    }
}
