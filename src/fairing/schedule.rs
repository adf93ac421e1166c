//! Deferred rebuild bookkeeping.
//!
//! Edits only set a dirty bit. The owner drains it once per tick, so any number
//! of edits between two ticks collapse into one rebuild that sees all of them.

use serde::Serialize;

/// What an edit invalidated. A payload change forces a rescan and implies a
/// shape rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Invalidation {
    /// Cone controls, thickness or layout changed; the cached profile is reused.
    Shape,
    /// The payload (or anything the scan reads) changed.
    Payload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildScheduler {
    pending: Option<Invalidation>,
    requests_since_drain: usize,
    drained: usize,
}

impl RebuildScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the shape dirty. Repeated requests merge; `Payload` dominates.
    pub fn request(&mut self, what: Invalidation) {
        self.requests_since_drain += 1;
        self.pending = Some(self.pending.map_or(what, |prev| prev.max(what)));
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn pending(&self) -> Option<Invalidation> {
        self.pending
    }

    /// Drain the pending request, if any.
    pub fn take(&mut self) -> Option<DrainedRequest> {
        let what = self.pending.take()?;
        let merged = std::mem::take(&mut self.requests_since_drain);
        self.drained += 1;
        Some(DrainedRequest { what, merged })
    }

    /// Put a drained request back after a failed rebuild.
    pub fn restore(&mut self, request: DrainedRequest) {
        self.drained = self.drained.saturating_sub(1);
        self.requests_since_drain += request.merged;
        self.pending = Some(self.pending.map_or(request.what, |prev| prev.max(request.what)));
    }

    /// Number of requests drained so far.
    #[must_use]
    pub fn drained(&self) -> usize {
        self.drained
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainedRequest {
    pub what: Invalidation,
    /// Edits folded into this request.
    pub merged: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_between_ticks_drain_once() {
        let mut s = RebuildScheduler::new();
        s.request(Invalidation::Shape);
        s.request(Invalidation::Shape);
        s.request(Invalidation::Shape);
        let drained = s.take().unwrap();
        assert_eq!(drained, DrainedRequest { what: Invalidation::Shape, merged: 3 });
        assert!(s.take().is_none());
        assert_eq!(s.drained(), 1);
    }

    #[test]
    fn payload_dominates_shape() {
        let mut s = RebuildScheduler::new();
        s.request(Invalidation::Payload);
        s.request(Invalidation::Shape);
        assert_eq!(s.pending(), Some(Invalidation::Payload));
    }

    #[test]
    fn restore_requeues_a_failed_drain() {
        let mut s = RebuildScheduler::new();
        s.request(Invalidation::Payload);
        let drained = s.take().unwrap();
        s.request(Invalidation::Shape);
        s.restore(drained);
        assert_eq!(s.pending(), Some(Invalidation::Payload));
        assert_eq!(s.take().unwrap().merged, 2);
    }
}
