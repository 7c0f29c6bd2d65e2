//! Drivers compute a scope's own position and blend in child reports.
//!
//! - [`Iterative`]: counts completed steps out of an expected total.
//! - [`Temporal`]: elapsed wall-clock time out of an expected duration.
//! - [`Functional`]: an externally sampled, possibly non-linear metric.
//!
//! Drivers never clamp. A value outside `[0, 1]` is passed on as-is and the
//! filters in front of the observer decide what to do with it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tally_core::{AtomicF64, Fraction, ProgressError, Result};

/// Default IIR gain used by [`Functional`] to smooth its step-size estimate.
pub const DEFAULT_SMOOTHING_GAIN: f64 = 3.0 / 5.0;

/// Strategy computing a scope's advancement.
pub trait Driver: Send + Sync {
    /// Move forward by one step and return the new position.
    fn advance(&self) -> Fraction;

    /// Blend a child's `[0, 1]` report into the current position.
    ///
    /// Does not mutate state: repeated calls with the same argument return the
    /// same value until the next [`Driver::advance`].
    fn accumulate(&self, child: Fraction) -> Fraction;
}

/// Counts steps out of an expected total.
#[derive(Debug)]
pub struct Iterative {
    counter: AtomicU64,
    expected: u64,
}

impl Iterative {
    /// Create a driver expecting `expected` steps.
    pub fn new(expected: u64) -> Result<Self> {
        if expected == 0 {
            return Err(ProgressError::invalid("expected step count must be positive"));
        }

        Ok(Self {
            counter: AtomicU64::new(0),
            expected,
        })
    }

    /// Steps taken so far.
    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Total steps expected.
    pub fn expected(&self) -> u64 {
        self.expected
    }
}

impl Driver for Iterative {
    fn advance(&self) -> Fraction {
        let count = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        count as f64 / self.expected as f64
    }

    fn accumulate(&self, child: Fraction) -> Fraction {
        (self.count() as f64 + child) / self.expected as f64
    }
}

/// Elapsed time out of an expected duration.
#[derive(Debug)]
pub struct Temporal {
    start: Instant,
    duration: Duration,
}

impl Temporal {
    /// Create a driver that starts its clock now.
    pub fn new(duration: Duration) -> Result<Self> {
        if duration.is_zero() {
            return Err(ProgressError::invalid("expected duration must be positive"));
        }

        Ok(Self {
            start: Instant::now(),
            duration,
        })
    }

    /// Expected duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Driver for Temporal {
    fn advance(&self) -> Fraction {
        self.start.elapsed().as_secs_f64() / self.duration.as_secs_f64()
    }

    // Time spent in a child is already part of the elapsed time.
    fn accumulate(&self, _child: Fraction) -> Fraction {
        self.advance()
    }
}

/// An externally observed quantity whose movement measures progress.
///
/// `linearize` maps a sample onto a scale on which progress is linear, e.g.
/// the logarithm of a residual that shrinks exponentially.
pub trait Metric: Send + Sync {
    /// Sampled value type.
    type Value;

    /// Take a sample.
    fn sample(&self) -> Self::Value;

    /// Map a sample onto a linear scale.
    fn linearize(&self, value: &Self::Value) -> f64;
}

/// [`Metric`] built from a pair of closures. See [`metric`].
pub struct FnMetric<S, L> {
    sample: S,
    linearize: L,
}

/// Build a [`Metric`] from a sampling closure and a linearizing closure.
pub fn metric<T, S, L>(sample: S, linearize: L) -> FnMetric<S, L>
where
    S: Fn() -> T + Send + Sync,
    L: Fn(&T) -> f64 + Send + Sync,
{
    FnMetric { sample, linearize }
}

impl<T, S, L> Metric for FnMetric<S, L>
where
    S: Fn() -> T + Send + Sync,
    L: Fn(&T) -> f64 + Send + Sync,
{
    type Value = T;

    fn sample(&self) -> T {
        (self.sample)()
    }

    fn linearize(&self, value: &T) -> f64 {
        (self.linearize)(value)
    }
}

/// Progress of an external metric towards a target.
///
/// Between samples, child reports are extrapolated using a smoothed estimate
/// of how far the metric moves per step.
pub struct Functional<M: Metric> {
    metric: M,
    baseline: f64,
    range: f64,
    gain: f64,
    last_delta: AtomicF64,
    step: AtomicF64,
}

impl<M: Metric> Functional<M> {
    /// Create a driver tracking `metric` until it reaches `target`.
    pub fn new(target: M::Value, metric: M) -> Result<Self> {
        Self::with_gain(target, metric, DEFAULT_SMOOTHING_GAIN)
    }

    /// Same as [`Functional::new`] with an explicit smoothing gain in `(0, 1]`.
    pub fn with_gain(target: M::Value, metric: M, gain: f64) -> Result<Self> {
        if !(gain > 0.0 && gain <= 1.0) {
            return Err(ProgressError::invalid(format!(
                "smoothing gain must be in (0, 1], got {gain}"
            )));
        }

        let baseline = metric.linearize(&metric.sample());
        let range = (metric.linearize(&target) - baseline).abs();
        if !range.is_finite() || range <= 0.0 {
            return Err(ProgressError::invalid(format!(
                "metric range must be finite and positive, got {range}"
            )));
        }

        Ok(Self {
            metric,
            baseline,
            range,
            gain,
            last_delta: AtomicF64::new(0.0),
            step: AtomicF64::new(0.0),
        })
    }

    /// Distance between the baseline and the target on the linear scale.
    pub fn range(&self) -> f64 {
        self.range
    }
}

impl<M: Metric> Driver for Functional<M> {
    fn advance(&self) -> Fraction {
        let delta = (self.metric.linearize(&self.metric.sample()) - self.baseline).abs();
        let change = delta - self.last_delta.swap(delta);
        let step = self.step.load();
        self.step.store(step + self.gain * (change - step));
        delta / self.range
    }

    fn accumulate(&self, child: Fraction) -> Fraction {
        (self.last_delta.load() + self.step.load() * child) / self.range
    }
}
