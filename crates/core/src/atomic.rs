//! Lock-free `f64` cell.

use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` stored as its bit pattern in an [`AtomicU64`].
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    /// Create a new cell.
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Load the current value.
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }

    /// Store a value.
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::SeqCst);
    }

    /// Store a value and return the previous one.
    pub fn swap(&self, value: f64) -> f64 {
        f64::from_bits(self.0.swap(value.to_bits(), Ordering::SeqCst))
    }

    /// Replace the value with `f(current)` for as long as `f` returns `Some`.
    ///
    /// Returns the previous value on success, or the observed value if `f`
    /// declined the update.
    pub fn fetch_update<F>(&self, mut f: F) -> Result<f64, f64>
    where
        F: FnMut(f64) -> Option<f64>,
    {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                f(f64::from_bits(bits)).map(f64::to_bits)
            })
            .map(f64::from_bits)
            .map_err(f64::from_bits)
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_returns_previous() {
        let cell = AtomicF64::new(0.5);
        assert_eq!(cell.swap(0.75), 0.5);
        assert_eq!(cell.load(), 0.75);
    }

    #[test]
    fn test_fetch_update_declined() {
        let cell = AtomicF64::new(f64::NEG_INFINITY);
        assert_eq!(cell.fetch_update(|last| (last < 1.0).then_some(1.0)), Ok(f64::NEG_INFINITY));
        assert_eq!(cell.fetch_update(|last| (last < 1.0).then_some(1.0)), Err(1.0));
    }
}
