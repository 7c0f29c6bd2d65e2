//! Concurrent branches reduced to one progress channel.

use crate::filter::Interval;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tally_core::{AtomicF64, ProgressError, SharedSink, Sink};
use tracing::trace;

/// Reduction applied to the last values of all branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    /// The fastest branch wins (a first-to-complete join)
    #[default]
    Max,
    /// The slowest branch bounds progress (an all-must-complete join)
    Min,
}

impl Norm {
    /// Reduce `value` together with every branch's last value.
    ///
    /// The result depends only on the set of values, not on their order.
    pub fn apply(self, value: f64, branches: impl IntoIterator<Item = f64>) -> f64 {
        branches.into_iter().fold(value, |acc, v| match self {
            Norm::Max => acc.max(v),
            Norm::Min => acc.min(v),
        })
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Norm::Max => "max",
            Norm::Min => "min",
        }
    }
}

impl std::fmt::Display for Norm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Norm {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(Norm::Max),
            "min" => Ok(Norm::Min),
            other => Err(ProgressError::invalid(format!("unknown norm: {other}"))),
        }
    }
}

/// Shared state of a set of branches forked from one parent.
pub struct Aggregator {
    parent: SharedSink,
    norm: Norm,
    values: Vec<AtomicF64>,
}

impl Aggregator {
    /// Fork `parent` into `count` branch sinks.
    ///
    /// Every report on a branch forwards `norm` over all branches to the
    /// parent. The parent is expected to filter out non-advancing values.
    /// With fewer than two branches there is nothing to reduce and the
    /// parent itself is handed back.
    pub fn fork(parent: SharedSink, norm: Norm, count: usize) -> Vec<SharedSink> {
        if count < 2 {
            return vec![parent];
        }

        let aggregator = Arc::new(Aggregator {
            parent,
            norm,
            values: (0..count).map(|_| AtomicF64::new(0.0)).collect(),
        });

        (0..count)
            .map(|index| {
                let branch: SharedSink = Arc::new(Branch {
                    aggregator: aggregator.clone(),
                    index,
                });
                branch
            })
            .collect()
    }

    /// Fork `parent` into one branch per item.
    pub fn fork_each<T>(
        parent: SharedSink,
        norm: Norm,
        items: impl IntoIterator<Item = T>,
    ) -> Vec<(T, SharedSink)> {
        let items: Vec<T> = items.into_iter().collect();
        let branches = Self::fork(parent, norm, items.len());
        items.into_iter().zip(branches).collect()
    }

    fn update(&self, index: usize, value: f64) {
        self.values[index].swap(value);
        let reduced = self
            .norm
            .apply(value, self.values.iter().map(AtomicF64::load));
        self.parent.report(reduced);
    }
}

struct Branch {
    aggregator: Arc<Aggregator>,
    index: usize,
}

impl Sink for Branch {
    fn report(&self, value: f64) {
        // Stored values stay inside [0, 1].
        if !Interval::unit().contains(value, true) {
            trace!(branch = self.index, value, "dropping out-of-range branch report");
            return;
        }
        self.aggregator.update(self.index, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Monotonic;
    use tally_core::Recorder;

    fn monotonic_parent() -> (Arc<Recorder>, SharedSink) {
        let recorder = Arc::new(Recorder::new());
        let observer: SharedSink = recorder.clone();
        (recorder, Arc::new(Monotonic::strictly_increasing(observer)))
    }

    // The trace scaled to quarters so every value stays inside [0, 1].
    fn run_trace(norm: Norm) -> Vec<f64> {
        let (recorder, parent) = monotonic_parent();
        let branches = Aggregator::fork(parent, norm, 3);
        let (a, b, c) = (&branches[0], &branches[1], &branches[2]);

        b.report(0.0);
        a.report(0.5);
        c.report(0.25);
        b.report(0.25);
        c.report(1.0);
        b.report(0.5);

        recorder.values()
    }

    #[test]
    fn test_min_norm_follows_slowest_branch() {
        assert_eq!(run_trace(Norm::Min), vec![0.0, 0.25, 0.5]);
    }

    #[test]
    fn test_max_norm_follows_fastest_branch() {
        assert_eq!(run_trace(Norm::Max), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_out_of_range_branch_report_is_dropped() {
        let (recorder, parent) = monotonic_parent();
        let branches = Aggregator::fork(parent, Norm::Max, 2);

        branches[0].report(5.0);
        branches[1].report(-1.0);
        branches[1].report(f64::NAN);
        assert!(recorder.is_empty());

        branches[1].report(0.3);
        branches[0].report(0.2);
        assert_eq!(recorder.values(), vec![0.3]);
    }

    #[test]
    fn test_degenerate_counts_write_through() {
        for count in [0, 1] {
            let recorder = Arc::new(Recorder::new());
            let parent: SharedSink = recorder.clone();

            let branches = Aggregator::fork(parent, Norm::Max, count);
            assert_eq!(branches.len(), 1);

            branches[0].report(0.7);
            assert_eq!(recorder.values(), vec![0.7]);
        }
    }

    #[test]
    fn test_fork_each_pairs_items() {
        let (recorder, parent) = monotonic_parent();
        let branches = Aggregator::fork_each(parent, Norm::Min, ["left", "right"]);
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].0, "left");

        for (_, sink) in &branches {
            sink.report(1.0);
        }
        assert_eq!(recorder.values(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_fork_each_empty() {
        let (_, parent) = monotonic_parent();
        let branches = Aggregator::fork_each(parent, Norm::Max, Vec::<u32>::new());
        assert!(branches.is_empty());
    }

    #[test]
    fn test_norm_is_order_independent() {
        let values = [0.3, 0.9, 0.1, 0.5];
        let mut reversed = values;
        reversed.reverse();

        for norm in [Norm::Max, Norm::Min] {
            assert_eq!(norm.apply(0.5, values), norm.apply(0.5, reversed));
        }
        assert_eq!(Norm::Max.apply(0.5, values), 0.9);
        assert_eq!(Norm::Min.apply(0.5, values), 0.1);
    }

    #[test]
    fn test_norm_parse() {
        assert_eq!("max".parse::<Norm>().unwrap(), Norm::Max);
        assert_eq!("MIN".parse::<Norm>().unwrap(), Norm::Min);
        assert!("median".parse::<Norm>().is_err());
        assert_eq!(Norm::Min.to_string(), "min");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_branches_report_from_many_threads() {
        let (recorder, parent) = monotonic_parent();
        let branches = Aggregator::fork(parent, Norm::Min, 4);

        let handles: Vec<_> = branches
            .into_iter()
            .map(|branch| {
                tokio::spawn(async move {
                    for step in 1..=100 {
                        branch.report(step as f64 / 100.0);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let values = recorder.values();
        assert!(values.contains(&1.0));
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
