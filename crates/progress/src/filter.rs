//! Filters over a numeric sink.
//!
//! Each filter does one thing and forwards to the next sink, so they are
//! layered by the caller, e.g. an inclusive [`Bounded`] feeding a strictly
//! increasing [`Monotonic`]. Dropped values are simply not forwarded;
//! filters never fail.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tally_core::{AtomicF64, ProgressError, Result, SharedSink, Sink};
use tracing::trace;

/// Direction a [`Monotonic`] filter enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Values may only grow
    Increasing,
    /// Values may only shrink
    Decreasing,
}

/// Forwards only values that do not regress.
pub struct Monotonic {
    direction: Direction,
    strict: bool,
    last: AtomicF64,
    next: SharedSink,
}

impl Monotonic {
    /// Create a filter with an explicit direction and strictness.
    pub fn new(direction: Direction, strict: bool, next: SharedSink) -> Self {
        let start = match direction {
            Direction::Increasing => f64::NEG_INFINITY,
            Direction::Decreasing => f64::INFINITY,
        };

        Self {
            direction,
            strict,
            last: AtomicF64::new(start),
            next,
        }
    }

    /// Forward values greater than or equal to the last one.
    pub fn increasing(next: SharedSink) -> Self {
        Self::new(Direction::Increasing, false, next)
    }

    /// Forward values strictly greater than the last one.
    pub fn strictly_increasing(next: SharedSink) -> Self {
        Self::new(Direction::Increasing, true, next)
    }

    /// Forward values less than or equal to the last one.
    pub fn decreasing(next: SharedSink) -> Self {
        Self::new(Direction::Decreasing, false, next)
    }

    /// Forward values strictly less than the last one.
    pub fn strictly_decreasing(next: SharedSink) -> Self {
        Self::new(Direction::Decreasing, true, next)
    }

    fn accepts(&self, last: f64, value: f64) -> bool {
        match (self.direction, self.strict) {
            (Direction::Increasing, false) => last <= value,
            (Direction::Increasing, true) => last < value,
            (Direction::Decreasing, false) => last >= value,
            (Direction::Decreasing, true) => last > value,
        }
    }
}

impl Sink for Monotonic {
    fn report(&self, value: f64) {
        let accepted = self
            .last
            .fetch_update(|last| self.accepts(last, value).then_some(value))
            .is_ok();

        if accepted {
            self.next.report(value);
        }
    }
}

/// A non-empty numeric interval, the argument to a [`Bounded`] filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    lower: f64,
    upper: f64,
}

impl Interval {
    /// Create an interval; `lower` must be strictly below `upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !(lower < upper) {
            return Err(ProgressError::invalid(format!(
                "empty interval: lower bound {lower} is not below upper bound {upper}"
            )));
        }

        Ok(Self { lower, upper })
    }

    /// The unit interval `[0, 1]`.
    pub fn unit() -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
        }
    }

    /// Whether `value` lies in the interval.
    pub fn contains(&self, value: f64, inclusive: bool) -> bool {
        if inclusive {
            self.lower <= value && value <= self.upper
        } else {
            self.lower < value && value < self.upper
        }
    }

    /// Filter forwarding values inside the closed interval.
    pub fn inclusive(self, next: SharedSink) -> Bounded {
        Bounded {
            interval: self,
            inclusive: true,
            next,
        }
    }

    /// Filter forwarding values inside the open interval.
    pub fn exclusive(self, next: SharedSink) -> Bounded {
        Bounded {
            interval: self,
            inclusive: false,
            next,
        }
    }
}

/// Forwards only values inside an [`Interval`].
pub struct Bounded {
    interval: Interval,
    inclusive: bool,
    next: SharedSink,
}

impl Sink for Bounded {
    fn report(&self, value: f64) {
        if self.interval.contains(value, self.inclusive) {
            self.next.report(value);
        } else {
            trace!(value, interval = ?self.interval, "dropping out-of-band report");
        }
    }
}

/// Forwards at most one value per bucket of fixed width.
///
/// A value is forwarded when it falls into a higher bucket than the last
/// forwarded one. The first value is always forwarded, and so is any value
/// at or above the ceiling, when one is set.
pub struct Incremental {
    step: f64,
    ceiling: Option<f64>,
    last_bucket: AtomicI64,
    next: SharedSink,
}

// Buckets are clamped above this so a huge negative input is still a bucket.
const NO_BUCKET: i64 = i64::MIN;

impl Incremental {
    /// Create a filter with bucket width `step`.
    pub fn new(step: f64, next: SharedSink) -> Result<Self> {
        if !step.is_finite() || step <= 0.0 {
            return Err(ProgressError::invalid(format!(
                "increment must be finite and positive, got {step}"
            )));
        }

        Ok(Self {
            step,
            ceiling: None,
            last_bucket: AtomicI64::new(NO_BUCKET),
            next,
        })
    }

    /// Always forward values reaching `ceiling`, whatever their bucket.
    pub fn with_ceiling(mut self, ceiling: f64) -> Self {
        self.ceiling = Some(ceiling);
        self
    }
}

impl Sink for Incremental {
    fn report(&self, value: f64) {
        if value.is_nan() {
            return;
        }

        let bucket = ((value / self.step).floor() as i64).max(NO_BUCKET + 1);
        let crossed = self
            .last_bucket
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                (last == NO_BUCKET || bucket > last).then_some(bucket)
            })
            .is_ok();
        let at_ceiling = self.ceiling.is_some_and(|ceiling| value >= ceiling);

        if crossed || at_ceiling {
            self.next.report(value);
        }
    }
}

/// Forwards every value to each of its sinks, in order.
pub struct Zip {
    sinks: Vec<SharedSink>,
}

impl Zip {
    /// Fan out to two sinks.
    pub fn new(first: SharedSink, second: SharedSink) -> Self {
        Self {
            sinks: vec![first, second],
        }
    }

    /// Fan out to any number of sinks.
    pub fn all(sinks: impl IntoIterator<Item = SharedSink>) -> Self {
        Self {
            sinks: sinks.into_iter().collect(),
        }
    }
}

impl Sink for Zip {
    fn report(&self, value: f64) {
        for sink in &self.sinks {
            sink.report(value);
        }
    }
}

/// Inclusive `[0, 1]` bound feeding a strictly increasing filter.
///
/// This is the guard placed in front of every observer channel.
pub fn unit_monotonic(next: SharedSink) -> SharedSink {
    let monotonic: SharedSink = Arc::new(Monotonic::strictly_increasing(next));
    Arc::new(Interval::unit().inclusive(monotonic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{E, PI};
    use tally_core::Recorder;

    fn recorder() -> (Arc<Recorder>, SharedSink) {
        let recorder = Arc::new(Recorder::new());
        let sink: SharedSink = recorder.clone();
        (recorder, sink)
    }

    fn feed(sink: &dyn Sink, values: &[f64]) {
        for value in values {
            sink.report(*value);
        }
    }

    const NOISY: [f64; 21] = [
        -1.0, 0.0, -2.0, 0.0, -3.0, 0.0, 1.0, -4.0, 2.0, -4.0, -1.5, 1.0, -4.0, -2.0, -5.0, 1.5,
        3.0, -5.0, 3.0, 4.0, -6.0,
    ];

    const MIXED: [f64; 10] = [-2.0, 0.0, PI, 9.0, f64::INFINITY, 1.23, -E, 2.0, 9.0, 3.0];

    #[test]
    fn test_strictly_increasing() {
        let (recorder, sink) = recorder();
        feed(&Monotonic::strictly_increasing(sink), &NOISY);
        assert_eq!(recorder.values(), vec![-1.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_weakly_increasing_keeps_ties() {
        let (recorder, sink) = recorder();
        feed(&Monotonic::increasing(sink), &NOISY);
        assert_eq!(recorder.values(), vec![-1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 4.0]);
    }

    #[test]
    fn test_strictly_decreasing() {
        let (recorder, sink) = recorder();
        feed(&Monotonic::strictly_decreasing(sink), &[3.0, 4.0, 2.0, 2.0, 1.0, 5.0]);
        assert_eq!(recorder.values(), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_weakly_decreasing() {
        let (recorder, sink) = recorder();
        feed(&Monotonic::decreasing(sink), &[3.0, 4.0, 2.0, 2.0, 1.0, 5.0]);
        assert_eq!(recorder.values(), vec![3.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn test_monotonic_drops_nan() {
        let (recorder, sink) = recorder();
        feed(&Monotonic::increasing(sink), &[0.5, f64::NAN, 0.75]);
        assert_eq!(recorder.values(), vec![0.5, 0.75]);
    }

    #[test]
    fn test_bounded_inclusive() {
        let (recorder, sink) = recorder();
        feed(&Interval::new(0.0, PI).unwrap().inclusive(sink), &MIXED);
        assert_eq!(recorder.values(), vec![0.0, PI, 1.23, 2.0, 3.0]);
    }

    #[test]
    fn test_bounded_exclusive() {
        let (recorder, sink) = recorder();
        feed(&Interval::new(-2.0, PI).unwrap().exclusive(sink), &MIXED);
        assert_eq!(recorder.values(), vec![0.0, 1.23, 2.0, 3.0]);
    }

    #[test]
    fn test_interval_rejects_empty() {
        assert!(matches!(
            Interval::new(1.0, 1.0),
            Err(ProgressError::InvalidConfiguration(_))
        ));
        assert!(Interval::new(2.0, 1.0).is_err());
        assert!(Interval::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_incremental_buckets() {
        let (recorder, sink) = recorder();
        let filter = Incremental::new(0.25, sink).unwrap();
        feed(&filter, &[0.1, 0.2, 0.26, 0.3, 0.49, 0.9, 0.95, 1.0]);
        assert_eq!(recorder.values(), vec![0.1, 0.26, 0.9, 1.0]);
    }

    #[test]
    fn test_incremental_forwards_first_input() {
        let (recorder, sink) = recorder();
        let filter = Incremental::new(10.0, sink).unwrap();
        feed(&filter, &[-1e300, 5.0]);
        assert_eq!(recorder.values(), vec![-1e300, 5.0]);
    }

    #[test]
    fn test_incremental_negative_infinity_is_a_bucket() {
        let (recorder, sink) = recorder();
        let filter = Incremental::new(1.0, sink).unwrap();
        feed(&filter, &[f64::NEG_INFINITY, -1e300, 0.5, 0.6]);
        assert_eq!(recorder.values(), vec![f64::NEG_INFINITY, 0.5]);
    }

    #[test]
    fn test_incremental_ceiling_always_forwarded() {
        let (capped, sink) = recorder();
        let filter = Incremental::new(0.3, sink).unwrap().with_ceiling(1.0);
        feed(&filter, &[0.0, 0.3, 0.6, 0.9, 0.95, 1.0]);
        assert_eq!(capped.values(), vec![0.0, 0.3, 0.6, 0.9, 1.0]);

        let (plain, sink) = recorder();
        let filter = Incremental::new(0.3, sink).unwrap();
        feed(&filter, &[0.9, 1.0]);
        assert_eq!(plain.values(), vec![0.9]);
    }

    #[test]
    fn test_incremental_rejects_non_positive_step() {
        let (_, sink) = recorder();
        assert!(Incremental::new(0.0, sink.clone()).is_err());
        assert!(Incremental::new(-0.5, sink).is_err());
    }

    #[test]
    fn test_zip_fans_out_in_order() {
        let (first, a) = recorder();
        let (second, b) = recorder();
        feed(&Zip::new(a, b), &[0.0, 0.5, 1.0]);
        assert_eq!(first.values(), vec![0.0, 0.5, 1.0]);
        assert_eq!(second.values(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_unit_monotonic() {
        let (recorder, sink) = recorder();
        let guard = unit_monotonic(sink);
        feed(guard.as_ref(), &[-0.5, 0.0, 0.3, 0.2, 1.2, 0.3, 1.0]);
        assert_eq!(recorder.values(), vec![0.0, 0.3, 1.0]);
    }
}
