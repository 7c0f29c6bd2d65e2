//! Reporters, scope guards and the per-root scope stack.
//!
//! A [`Scope`] is opened on top of whatever scope is currently active and
//! reports into it. The stack is what makes the nesting implicit: callers
//! never pass parents around. Dropping a scope emits `1`, restores the
//! previous top, and advances that parent by exactly one step.

use crate::driver::Driver;
use crate::filter::{unit_monotonic, Interval, Monotonic, Zip};
use parking_lot::Mutex;
use std::sync::Arc;
use tally_core::{Fraction, ScopeId, SharedSink, Sink};
use tracing::{debug, warn};

/// One unit of work: a driver plus the sink its position is reported to.
///
/// As a [`Sink`], a reporter accepts its children's `[0, 1]` reports and
/// forwards them blended through [`Driver::accumulate`].
pub struct Reporter {
    id: ScopeId,
    driver: Box<dyn Driver>,
    sink: SharedSink,
}

impl Reporter {
    fn new(driver: Box<dyn Driver>, upstream: SharedSink) -> Self {
        Self {
            id: ScopeId::new(),
            driver,
            sink: Arc::new(Interval::unit().inclusive(upstream)),
        }
    }

    /// Identifier of the scope this reporter belongs to.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Advance the driver by one step and report the new position.
    pub fn step(&self) {
        self.sink.report(self.driver.advance());
    }

    fn emit(&self, value: Fraction) {
        self.sink.report(value);
    }
}

impl Sink for Reporter {
    fn report(&self, child: f64) {
        self.sink.report(self.driver.accumulate(child));
    }
}

/// Stack of active reporters belonging to one root.
///
/// Only touched when scopes open or close, never while reporting.
#[derive(Default)]
pub struct Stack {
    frames: Mutex<Vec<Arc<Reporter>>>,
}

impl Stack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active reporter.
    pub fn top(&self) -> Option<Arc<Reporter>> {
        self.frames.lock().last().cloned()
    }

    /// Number of active scopes.
    pub fn depth(&self) -> usize {
        self.frames.lock().len()
    }

    /// Make `reporter` the active one, returning the one it replaces.
    pub fn push(&self, reporter: Arc<Reporter>) -> Option<Arc<Reporter>> {
        let mut frames = self.frames.lock();
        let previous = frames.last().cloned();
        frames.push(reporter);
        previous
    }

    /// Remove the reporter with `id`, restoring whatever was below it.
    fn pop(&self, id: ScopeId) {
        let mut frames = self.frames.lock();
        if frames.last().is_some_and(|top| top.id == id) {
            frames.pop();
            return;
        }

        if let Some(index) = frames.iter().position(|r| r.id == id) {
            warn!(scope = %id, depth = index + 1, "scope closed out of order");
            frames.remove(index);
        }
    }
}

/// Guard for an open unit of work.
///
/// Created by the [`Progress`](crate::Progress) facade. Emits `0` when
/// opened and `1` when dropped; dropping also counts as one step of the
/// enclosing scope, whether the work finished normally or bailed out early.
#[must_use = "a scope completes as soon as it is dropped"]
pub struct Scope {
    reporter: Arc<Reporter>,
    parent: Option<Arc<Reporter>>,
    stack: Arc<Stack>,
    depth: usize,
}

impl Scope {
    /// Open a scope on top of `stack`.
    ///
    /// The upstream is the current top of the stack, or `root` when the
    /// stack is empty. An `extra` observer gets its own strictly increasing
    /// channel alongside the parent.
    pub(crate) fn open(
        stack: Arc<Stack>,
        root: &SharedSink,
        driver: Box<dyn Driver>,
        extra: Option<SharedSink>,
    ) -> Self {
        let mut upstream: SharedSink = match stack.top() {
            Some(parent) => parent,
            None => root.clone(),
        };

        if let Some(extra) = extra {
            let fork: SharedSink = Arc::new(Monotonic::strictly_increasing(extra));
            upstream = Arc::new(Zip::new(upstream, fork));
        }

        let reporter = Arc::new(Reporter::new(driver, upstream));
        let parent = stack.push(reporter.clone());
        let depth = stack.depth();

        debug!(scope = %reporter.id, depth, "scope opened");
        reporter.emit(0.0);

        Self {
            reporter,
            parent,
            stack,
            depth,
        }
    }

    /// Record one step of work.
    pub fn report(&self) {
        self.reporter.step();
    }

    /// Identifier of this scope.
    pub fn id(&self) -> ScopeId {
        self.reporter.id
    }

    /// Nesting depth, starting at 1 for a top-level scope.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// This scope's reporter, usable as the parent of concurrent branches.
    pub fn reporter(&self) -> SharedSink {
        self.reporter.clone()
    }

    /// A standalone sink that reports into this scope.
    ///
    /// Values are bounded to `[0, 1]`, must strictly increase, and are then
    /// blended into this scope like a child's report. Code holding the sink
    /// needs no knowledge of the scope tree.
    pub fn export(&self) -> SharedSink {
        unit_monotonic(self.reporter.clone())
    }

    /// Close the scope now. Equivalent to dropping it.
    pub fn complete(self) {}
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.reporter.emit(1.0);
        self.stack.pop(self.reporter.id);
        debug!(scope = %self.reporter.id, depth = self.depth, "scope closed");

        if let Some(parent) = &self.parent {
            parent.step();
        }
    }
}
