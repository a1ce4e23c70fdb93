//! Cooperative cancellation.
//!
//! Searches never get killed from outside. Instead every packer and
//! generator polls a [`CancelToken`] at its decision points and unwinds on
//! its own, keeping whatever best-so-far result it has.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cancellation signal: a shared flag plus an optional deadline.
///
/// Clones share the flag, so [`CancelToken::cancel`] on any clone stops
/// every holder. The deadline is per token; [`CancelToken::child`] derives
/// a token with a tighter deadline that still observes the parent's flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// A token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A token sharing this token's flag whose deadline is the earlier of
    /// the current one and `timeout` from now. Expiry of the child does not
    /// cancel the parent.
    pub fn child(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(current) if current < candidate => current,
            _ => candidate,
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(deadline),
        }
    }

    /// Signals cancellation to every clone.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// Returns true only if [`CancelToken::cancel`] was called.
    pub fn is_flagged(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// The raw shared flag, for code that only speaks `Arc<AtomicBool>`.
    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}
