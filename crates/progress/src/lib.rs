//! Hierarchical progress reporting.
//!
//! Nested and concurrent units of work are folded into a single completion
//! fraction in `[0, 1]` that never regresses. Work is instrumented through a
//! [`Progress`] root: each scope it opens owns a [`Driver`], reports into the
//! scope opened before it, and counts as one step of that parent when it is
//! dropped. Concurrent work forks the active scope into branch sinks reduced
//! by a [`Norm`].

#![warn(missing_docs)]

pub mod concurrent;
pub mod config;
pub mod driver;
pub mod facade;
pub mod filter;
pub mod reporter;

pub use concurrent::{Aggregator, Norm};
pub use config::ProgressConfig;
pub use driver::{metric, Driver, FnMetric, Functional, Iterative, Metric, Temporal};
pub use facade::Progress;
pub use filter::{unit_monotonic, Bounded, Direction, Incremental, Interval, Monotonic, Zip};
pub use reporter::{Reporter, Scope, Stack};

pub use tally_core::{shared, Fraction, ProgressError, Recorder, Result, SharedSink, Sink};
