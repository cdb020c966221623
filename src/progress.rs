// src/progress.rs

//! Progress reporting and cooperative cancellation.
//!
//! The engine reports progress through a caller-supplied callback and polls
//! a shared cancellation flag at page and task boundaries. Callbacks may be
//! invoked from enrichment task context; callers embedding the engine in a
//! multi-threaded host are responsible for serializing their own handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Callback signature: message, current step, total steps.
///
/// `current`/`total` are absent for messages that are not part of a counted
/// sequence (e.g. per-page scan lines).
pub type ProgressFn = dyn Fn(&str, Option<usize>, Option<usize>) + Send + Sync;

/// Cheap cloneable handle around an optional progress callback.
#[derive(Clone, Default)]
pub struct Progress(Option<Arc<ProgressFn>>);

impl Progress {
    /// Wrap a callback.
    pub fn new(f: impl Fn(&str, Option<usize>, Option<usize>) + Send + Sync + 'static) -> Self {
        Self(Some(Arc::new(f)))
    }

    /// A progress handle that discards all events.
    pub fn none() -> Self {
        Self(None)
    }

    /// Emit an uncounted message.
    pub fn emit(&self, message: &str) {
        if let Some(f) = &self.0 {
            f(message, None, None);
        }
    }

    /// Emit a counted step.
    pub fn step(&self, message: &str, current: usize, total: usize) {
        if let Some(f) = &self.0 {
            f(message, Some(current), Some(total));
        }
    }
}

/// Cooperative cancellation flag shared between the caller and the engine.
///
/// Cancellation is polled, not interrupt-driven: the engine checks the flag
/// before fetching each page and before launching each enrichment task.
/// In-flight work is allowed to finish.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn progress_none_is_silent() {
        // Must not panic with no callback installed.
        let progress = Progress::none();
        progress.emit("ignored");
        progress.step("ignored", 1, 2);
    }

    #[test]
    fn progress_forwards_counts() {
        use std::sync::Mutex;
        let seen: Arc<Mutex<Vec<(String, Option<usize>, Option<usize>)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |msg, cur, total| {
            sink.lock().unwrap().push((msg.to_string(), cur, total));
        });

        progress.emit("scanning");
        progress.step("enriched", 3, 10);

        let events = seen.lock().unwrap();
        assert_eq!(events[0], ("scanning".to_string(), None, None));
        assert_eq!(events[1], ("enriched".to_string(), Some(3), Some(10)));
    }
}
