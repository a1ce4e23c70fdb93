//! Per-run search context.

use crate::cancel::CancelToken;
use crate::instance::Instance;
use crate::result::PackResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Smallest packing published by a run so far.
///
/// Clones share the slot, so whoever started the run can read the best
/// packing even when the worker never returns.
#[derive(Debug, Clone, Default)]
pub struct BestSlot {
    inner: Arc<Mutex<Option<Instance>>>,
}

impl BestSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a copy of `candidate` unless the slot holds a packing that is
    /// at least as small.
    pub fn publish(&self, candidate: &Instance) {
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().map_or(true, |best| candidate.area() < best.area()) {
            *slot = Some(candidate.clone());
        }
    }

    /// Area of the stored packing.
    pub fn area(&self) -> Option<u64> {
        let slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(Instance::area)
    }

    /// Removes and returns the stored packing.
    pub fn take(&self) -> Option<Instance> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// State threaded by reference through every generator and packer call of
/// one run: the cancellation token, a label for log lines, and counters.
///
/// The context is `Sync`, so parallel fitness evaluation can share it.
#[derive(Debug)]
pub struct SearchContext {
    token: CancelToken,
    label: String,
    started: Instant,
    nodes: AtomicU64,
    packs: AtomicU64,
    best: BestSlot,
}

impl SearchContext {
    /// Creates a context around a token.
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            label: String::from("search"),
            started: Instant::now(),
            nodes: AtomicU64::new(0),
            packs: AtomicU64::new(0),
            best: BestSlot::new(),
        }
    }

    /// A context that never cancels on its own.
    pub fn unbounded() -> Self {
        Self::new(CancelToken::new())
    }

    /// Sets the label used as prefix in log lines.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Publishes improvements into `slot` instead of a private one.
    pub fn with_best_slot(mut self, slot: BestSlot) -> Self {
        self.best = slot;
        self
    }

    /// A fresh context for a sub-search that shares this context's flag
    /// and best slot but stops after at most `timeout`.
    pub fn child(&self, timeout: Duration) -> Self {
        Self::new(self.token.child(timeout))
            .with_label(self.label.clone())
            .with_best_slot(self.best.clone())
    }

    /// Where improvements of this run are published.
    pub fn best_slot(&self) -> &BestSlot {
        &self.best
    }

    /// Offers `candidate` to `result` and publishes it when it improves.
    pub fn offer(&self, result: &mut PackResult, candidate: Instance) -> bool {
        if !result.offer(candidate) {
            return false;
        }
        if let Some(best) = &result.best {
            self.best.publish(best);
        }
        true
    }

    /// The cancellation token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Log label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns true once the run should stop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Counts one search node and reports whether the run should stop.
    #[inline]
    pub fn tick(&self) -> bool {
        self.nodes.fetch_add(1, Ordering::Relaxed);
        self.token.is_cancelled()
    }

    /// Counts one packer invocation.
    pub fn record_pack(&self) {
        self.packs.fetch_add(1, Ordering::Relaxed);
    }

    /// Search nodes visited so far.
    pub fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    /// Packer invocations so far.
    pub fn packs(&self) -> u64 {
        self.packs.load(Ordering::Relaxed)
    }

    /// Time since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let ctx = SearchContext::unbounded().with_label("unit");
        assert!(!ctx.tick());
        assert!(!ctx.tick());
        ctx.record_pack();
        assert_eq!(ctx.nodes(), 2);
        assert_eq!(ctx.packs(), 1);
        assert_eq!(ctx.label(), "unit");
    }

    #[test]
    fn test_tick_reports_cancellation() {
        let ctx = SearchContext::unbounded();
        ctx.token().cancel();
        assert!(ctx.tick());
        assert!(ctx.child(Duration::from_secs(10)).is_cancelled());
    }

    #[test]
    fn test_offer_publishes_improvements() {
        let slot = BestSlot::new();
        let ctx = SearchContext::unbounded().with_best_slot(slot.clone());
        let mut result = PackResult::new("unit");

        let mut wide = Instance::from_dimensions(false, None, &[(2, 2), (2, 2)]);
        wide.set_position(0, 0, 0);
        wide.set_position(1, 4, 0);
        wide.set_box(6, 2);
        assert!(ctx.offer(&mut result, wide.clone()));
        assert_eq!(slot.area(), Some(12));

        let mut tight = wide.clone();
        tight.set_position(1, 2, 0);
        tight.set_box(4, 2);
        assert!(ctx.child(Duration::from_secs(1)).offer(&mut result, tight));
        assert_eq!(slot.area(), Some(8));

        assert!(!ctx.offer(&mut result, wide));
        assert_eq!(slot.take().map(|best| best.area()), Some(8));
        assert!(slot.take().is_none());
    }
}
