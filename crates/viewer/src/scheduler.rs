//! Decides when camera movement triggers a depth re-sort.
//!
//! Sorting mid-drag is wasted work, so rotations arm a short deadline
//! that each further rotation pushes back. The event loop polls the
//! deadline; releasing the mouse fires any pending sort at once.

use std::time::{Duration, Instant};

const DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Sort after rotation settles (the default).
    Deferred,
    /// Sort synchronously on every rotation.
    Immediate,
    /// Never re-sort.
    Disabled,
}

pub struct SortScheduler {
    mode: SortMode,
    deadline: Option<Instant>,
}

impl SortScheduler {
    pub fn new(mode: SortMode) -> Self {
        Self {
            mode,
            deadline: None,
        }
    }

    pub fn mode(&self) -> SortMode {
        self.mode
    }

    /// Changing mode drops any pending sort.
    pub fn set_mode(&mut self, mode: SortMode) {
        self.mode = mode;
        self.deadline = None;
    }

    /// Reports a rotation. Returns true when the caller must sort now
    /// (immediate mode); otherwise the debounce deadline is re-armed.
    pub fn rotated(&mut self, now: Instant) -> bool {
        match self.mode {
            SortMode::Immediate => true,
            SortMode::Deferred => {
                self.deadline = Some(now + DEBOUNCE);
                false
            }
            SortMode::Disabled => false,
        }
    }

    /// Mouse released: a pending sort fires immediately.
    pub fn finish_drag(&mut self) -> bool {
        self.deadline.take().is_some() && self.mode == SortMode::Deferred
    }

    /// Polled from the event loop; true once the deadline passes.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline && self.mode == SortMode::Deferred => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> Instant {
        Instant::now()
    }

    #[test]
    fn deferred_fires_once_after_deadline() {
        let start = t0();
        let mut sched = SortScheduler::new(SortMode::Deferred);
        assert!(!sched.rotated(start));
        assert!(!sched.poll(start + Duration::from_millis(10)));
        assert!(sched.poll(start + Duration::from_millis(60)));
        // One-shot
        assert!(!sched.poll(start + Duration::from_millis(120)));
    }

    #[test]
    fn each_rotation_pushes_the_deadline_back() {
        let start = t0();
        let mut sched = SortScheduler::new(SortMode::Deferred);
        sched.rotated(start);
        sched.rotated(start + Duration::from_millis(40));
        // First deadline has passed but was re-armed by the second event
        assert!(!sched.poll(start + Duration::from_millis(60)));
        assert!(sched.poll(start + Duration::from_millis(95)));
    }

    #[test]
    fn mouse_up_fires_pending_sort() {
        let start = t0();
        let mut sched = SortScheduler::new(SortMode::Deferred);
        sched.rotated(start);
        assert!(sched.finish_drag());
        // Consumed: nothing left for the poll
        assert!(!sched.poll(start + Duration::from_millis(100)));
        // No rotation since, nothing to fire
        assert!(!sched.finish_drag());
    }

    #[test]
    fn immediate_mode_sorts_every_rotation() {
        let start = t0();
        let mut sched = SortScheduler::new(SortMode::Immediate);
        assert!(sched.rotated(start));
        assert!(sched.rotated(start + Duration::from_millis(1)));
        assert!(!sched.poll(start + Duration::from_millis(100)));
    }

    #[test]
    fn disabled_mode_never_sorts() {
        let start = t0();
        let mut sched = SortScheduler::new(SortMode::Disabled);
        assert!(!sched.rotated(start));
        assert!(!sched.finish_drag());
        assert!(!sched.poll(start + Duration::from_millis(100)));
    }

}
