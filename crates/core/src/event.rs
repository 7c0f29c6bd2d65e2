//! Recorded progress observations.

use crate::sink::Sink;
use crate::Time;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A single observed report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Reported value
    pub value: f64,

    /// When it was observed
    pub at: Time,
}

impl ProgressEvent {
    /// Create an event stamped with the current time.
    pub fn now(value: f64) -> Self {
        Self {
            value,
            at: chrono::Utc::now(),
        }
    }
}

/// Sink that keeps every value it receives.
///
/// This is the only place reported history is retained; nothing is persisted
/// unless the caller serializes it explicitly.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<ProgressEvent>>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded values, in arrival order.
    pub fn values(&self) -> Vec<f64> {
        self.events.lock().iter().map(|e| e.value).collect()
    }

    /// Recorded events, in arrival order.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Most recent value.
    pub fn last(&self) -> Option<f64> {
        self.events.lock().last().map(|e| e.value)
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Serialize the recording as pretty JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(&*self.events.lock())?)
    }
}

impl Sink for Recorder {
    fn report(&self, value: f64) {
        self.events.lock().push(ProgressEvent::now(value));
    }
}
