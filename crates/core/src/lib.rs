//! Tally core vocabulary.
//!
//! This crate defines the types every progress component shares: the
//! [`Sink`] a report flows into, the lock-free [`AtomicF64`] cell used for
//! filter and branch state, scope identifiers, errors, and the
//! [`Recorder`] sink.

#![warn(missing_docs)]

mod atomic;
mod error;
mod event;
mod id;
mod sink;

pub use atomic::AtomicF64;
pub use error::{ProgressError, Result};
pub use event::{ProgressEvent, Recorder};
pub use id::ScopeId;
pub use sink::{shared, Fraction, SharedSink, Sink};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
