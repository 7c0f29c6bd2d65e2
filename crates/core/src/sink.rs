//! The numeric sink every progress component reports into.

use std::sync::Arc;

/// A completion fraction.
///
/// Semantically in `[0, 1]`. Values outside that range are "out-of-band"
/// and it is up to filters to drop or clamp them.
pub type Fraction = f64;

/// Something that accepts progress reports.
///
/// Reporting is total: implementations never fail and never block for long.
pub trait Sink: Send + Sync {
    /// Report a value.
    fn report(&self, value: f64);
}

/// Shared, type-erased sink.
pub type SharedSink = Arc<dyn Sink>;

impl<F> Sink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, value: f64) {
        self(value)
    }
}

/// Wrap a closure (or any sink) into a [`SharedSink`].
pub fn shared<S: Sink + 'static>(sink: S) -> SharedSink {
    Arc::new(sink)
}
