//! Per-request observability state.
//!
//! A [`RequestCtx`] is created by the request-ID middleware and carried in
//! the request's extensions. The handle is cheap to clone; all clones share
//! one state cell, so the upload handler can record an outcome mid-request
//! and the logging/metrics middleware read it after the handler returns.
//! The cell belongs to exactly one in-flight request and is never shared
//! across requests.

use std::sync::{Arc, Mutex, MutexGuard};

/// Terminal classification of a conversion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Timeout,
    Failed,
}

#[derive(Debug, Default)]
struct CtxState {
    outcome: Option<Outcome>,
    log_error: Option<String>,
}

#[derive(Debug)]
struct CtxInner {
    id: String,
    state: Mutex<CtxState>,
}

/// Handle to one request's correlation ID and deferred outcome fields.
#[derive(Debug, Clone)]
pub struct RequestCtx {
    inner: Arc<CtxInner>,
}

impl RequestCtx {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CtxInner {
                id: id.into(),
                state: Mutex::new(CtxState::default()),
            }),
        }
    }

    /// The correlation ID, immutable for the life of the request.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Record the conversion outcome. Last write wins.
    pub fn set_outcome(&self, outcome: Outcome) {
        self.lock().outcome = Some(outcome);
    }

    /// The recorded outcome, or `None` if the request never set one.
    pub fn outcome(&self) -> Option<Outcome> {
        self.lock().outcome
    }

    /// Record a human-readable error reason for the structured log line.
    /// Internal detail only; never surfaced in a response body.
    pub fn set_log_error(&self, reason: impl Into<String>) {
        self.lock().log_error = Some(reason.into());
    }

    pub fn log_error(&self) -> Option<String> {
        self.lock().log_error.clone()
    }

    fn lock(&self) -> MutexGuard<'_, CtxState> {
        // The cell is request-local, so contention is impossible; recover
        // from poisoning rather than propagate a panic.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_retained() {
        let ctx = RequestCtx::new("abc-123");
        assert_eq!(ctx.id(), "abc-123");
    }

    #[test]
    fn outcome_defaults_to_unset() {
        let ctx = RequestCtx::new("id");
        assert_eq!(ctx.outcome(), None);
        assert_eq!(ctx.log_error(), None);
    }

    #[test]
    fn last_outcome_write_wins() {
        let ctx = RequestCtx::new("id");
        ctx.set_outcome(Outcome::Timeout);
        ctx.set_outcome(Outcome::Success);
        assert_eq!(ctx.outcome(), Some(Outcome::Success));
    }

    #[test]
    fn clones_share_state() {
        let ctx = RequestCtx::new("id");
        let clone = ctx.clone();
        clone.set_log_error("conversion exploded");
        assert_eq!(ctx.log_error().as_deref(), Some("conversion exploded"));
    }
}
