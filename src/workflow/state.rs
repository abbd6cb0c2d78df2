use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Per-action request state. Each of the three workflow actions carries its
/// own gate so a second invocation while one is in flight is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Idle,
    Submitting,
    Fetching,
}

/// One action's in-flight gate.
///
/// Shared behind an `Arc` so detached best-effort tasks can release their
/// own gate when they complete.
#[derive(Debug, Clone)]
pub struct ActionGate {
    action: &'static str,
    state: Arc<Mutex<RequestState>>,
}

impl ActionGate {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            state: Arc::new(Mutex::new(RequestState::Idle)),
        }
    }

    /// Move from `Idle` into `next`, or reject if a request is in flight.
    pub fn try_begin(&self, next: RequestState) -> AppResult<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != RequestState::Idle {
            return Err(AppError::busy(self.action));
        }
        *state = next;
        Ok(())
    }

    /// Return to `Idle`. Runs on success and failure alike.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = RequestState::Idle;
    }

    pub fn state(&self) -> RequestState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Outcome of a successful prediction. Immutable once set; replaced
/// wholesale on the next successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    pub annotated_image_ref: String,
}

/// Treatment summary lifecycle: cleared at the start of every lookup,
/// populated on success, replaced by a user-visible placeholder on failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TreatmentInfo {
    #[default]
    Absent,
    Pending,
    Ready(String),
    Failed(String),
}

impl TreatmentInfo {
    /// The text a front end should render, if any.
    pub fn summary(&self) -> Option<&str> {
        match self {
            TreatmentInfo::Ready(text) | TreatmentInfo::Failed(text) => Some(text),
            TreatmentInfo::Absent | TreatmentInfo::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TreatmentInfo::Pending)
    }
}
