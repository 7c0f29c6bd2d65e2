//! The public entry point for instrumenting work.

use crate::concurrent::{Aggregator, Norm};
use crate::config::ProgressConfig;
use crate::driver::{Driver, Functional, Iterative, Metric, Temporal};
use crate::filter::{unit_monotonic, Incremental, Interval, Monotonic};
use crate::reporter::{Scope, Stack};
use std::sync::Arc;
use std::time::Duration;
use tally_core::{Result, SharedSink};
use tracing::debug;

/// A progress root: one observer plus the stack of scopes reporting to it.
///
/// Scopes opened through the same root nest implicitly: each new scope
/// reports into the one opened before it, until that one is dropped.
/// ```text
/// observer ← [0,1] ← monotonic ← scope ← child scope ← ...
/// ```
/// Every root has its own stack, so independent roots never see each
/// other's scopes, even on the same thread.
pub struct Progress {
    root: SharedSink,
    stack: Arc<Stack>,
    config: ProgressConfig,
}

impl Progress {
    /// Create a root reporting to `observer` with the default configuration.
    pub fn new(observer: SharedSink) -> Self {
        Self::build(observer, ProgressConfig::default())
    }

    /// Create a root with an explicit configuration.
    pub fn with_config(observer: SharedSink, config: ProgressConfig) -> Result<Self> {
        config.validate()?;
        let sink: SharedSink = match config.increment {
            Some(increment) => Arc::new(Incremental::new(increment, observer)?.with_ceiling(1.0)),
            None => observer,
        };
        Ok(Self::build(sink, config))
    }

    fn build(sink: SharedSink, config: ProgressConfig) -> Self {
        let monotonic: SharedSink = if config.strict {
            Arc::new(Monotonic::strictly_increasing(sink))
        } else {
            Arc::new(Monotonic::increasing(sink))
        };

        Self {
            root: Arc::new(Interval::unit().inclusive(monotonic)),
            stack: Arc::new(Stack::new()),
            config,
        }
    }

    /// Open a scope of `count` steps.
    pub fn schedule(&self, count: u64) -> Result<Scope> {
        Ok(self.open(Box::new(Iterative::new(count)?), None))
    }

    /// Open a scope of `count` steps that also reports to `observer`.
    pub fn schedule_with(&self, count: u64, observer: SharedSink) -> Result<Scope> {
        Ok(self.open(Box::new(Iterative::new(count)?), Some(observer)))
    }

    /// Open a scope expected to take `duration`.
    pub fn time(&self, duration: Duration) -> Result<Scope> {
        Ok(self.open(Box::new(Temporal::new(duration)?), None))
    }

    /// Open a timed scope that also reports to `observer`.
    pub fn time_with(&self, duration: Duration, observer: SharedSink) -> Result<Scope> {
        Ok(self.open(Box::new(Temporal::new(duration)?), Some(observer)))
    }

    /// Open a scope that completes when `metric` reaches `target`.
    pub fn track<M: Metric + 'static>(&self, target: M::Value, metric: M) -> Result<Scope> {
        let driver = Functional::with_gain(target, metric, self.config.smoothing_gain)?;
        Ok(self.open(Box::new(driver), None))
    }

    /// Open a metric-driven scope that also reports to `observer`.
    pub fn track_with<M: Metric + 'static>(
        &self,
        target: M::Value,
        metric: M,
        observer: SharedSink,
    ) -> Result<Scope> {
        let driver = Functional::with_gain(target, metric, self.config.smoothing_gain)?;
        Ok(self.open(Box::new(driver), Some(observer)))
    }

    /// Fork the active scope into `count` concurrent branches.
    pub fn concurrent(&self, norm: Norm, count: usize) -> Vec<SharedSink> {
        debug!(%norm, count, depth = self.depth(), "forking concurrent branches");
        Aggregator::fork(self.parent(), norm, count)
    }

    /// Fork the active scope into one concurrent branch per item.
    pub fn concurrent_each<T>(
        &self,
        norm: Norm,
        items: impl IntoIterator<Item = T>,
    ) -> Vec<(T, SharedSink)> {
        Aggregator::fork_each(self.parent(), norm, items)
    }

    /// Fork with the configured default norm.
    pub fn fork(&self, count: usize) -> Vec<SharedSink> {
        self.concurrent(self.config.default_norm, count)
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Get the configuration.
    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Sink for concurrent branches: the active scope behind its own
    /// `[0, 1]` monotonic guard, or the already guarded root.
    fn parent(&self) -> SharedSink {
        match self.stack.top() {
            Some(top) => unit_monotonic(top),
            None => self.root.clone(),
        }
    }

    fn open(&self, driver: Box<dyn Driver>, extra: Option<SharedSink>) -> Scope {
        Scope::open(self.stack.clone(), &self.root, driver, extra)
    }
}
