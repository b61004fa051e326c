//! Deadline-ordered task queue driven by the game clock.
//!
//! The [`Scheduler`] is a min-heap of `(deadline, sequence)` pairs. The
//! controller pops every task whose deadline is at or before "now" in a
//! single tick; nothing here sleeps or spawns threads.
//!
//! Ties on the deadline fire in insertion order (the sequence number is the
//! tie-breaker). Cancellation is lazy: the task payload is dropped from the
//! lookup table immediately and the stale heap entry is skipped when it
//! surfaces.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::time::Duration;

use supermart_types::PresentationId;

use crate::clock::{ClockError, GameInstant};

/// Handle returned by [`Scheduler::schedule_at`], used to cancel a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

/// The timed work the store controller schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTask {
    /// The current day has run its full duration.
    EndOfDay,
    /// Time to present the next random crisis.
    NextCrisis,
    /// A walk-in customer arrives at the counter.
    CustomerArrival,
    /// The player did not answer this presentation in time.
    DecisionTimeout(PresentationId),
}

/// Min-heap of deadlines with cancellable payloads.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    queue: BinaryHeap<Reverse<(GameInstant, u64)>>,
    tasks: BTreeMap<u64, (GameInstant, T)>,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler.
    pub const fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            tasks: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `task` to fire at `deadline`.
    pub fn schedule_at(&mut self, deadline: GameInstant, task: T) -> TaskHandle {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.queue.push(Reverse((deadline, seq)));
        self.tasks.insert(seq, (deadline, task));
        TaskHandle(seq)
    }

    /// Schedule `task` to fire `delay` after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Overflow`] if the deadline is not representable.
    pub fn schedule_after(
        &mut self,
        now: GameInstant,
        delay: Duration,
        task: T,
    ) -> Result<TaskHandle, ClockError> {
        let deadline = now.checked_add(delay).ok_or(ClockError::Overflow)?;
        Ok(self.schedule_at(deadline, task))
    }

    /// Cancel a pending task. Returns its payload if it had not fired yet.
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        self.tasks.remove(&handle.0).map(|(_, task)| task)
    }

    /// Whether the task behind `handle` is still pending.
    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle.0)
    }

    /// Deadline of a pending task.
    pub fn deadline_of(&self, handle: TaskHandle) -> Option<GameInstant> {
        self.tasks.get(&handle.0).map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest task whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: GameInstant) -> Option<(GameInstant, T)> {
        loop {
            let Reverse((deadline, seq)) = *self.queue.peek()?;
            if deadline > now {
                return None;
            }
            self.queue.pop();
            if let Some((_, task)) = self.tasks.remove(&seq) {
                return Some((deadline, task));
            }
            // Cancelled; keep looking.
        }
    }

    /// The earliest pending deadline, skipping cancelled entries.
    pub fn next_deadline(&mut self) -> Option<GameInstant> {
        while let Some(Reverse((deadline, seq))) = self.queue.peek().copied() {
            if self.tasks.contains_key(&seq) {
                return Some(deadline);
            }
            self.queue.pop();
        }
        None
    }

    /// Keep only the pending tasks for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.tasks.retain(|_, (_, task)| keep(task));
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.tasks.clear();
    }

    /// Number of pending (not cancelled) tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(millis: u64) -> GameInstant {
        GameInstant::from_millis(millis)
    }

    #[test]
    fn pops_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(at(300), "c");
        scheduler.schedule_at(at(100), "a");
        scheduler.schedule_at(at(200), "b");

        let fired: Vec<_> = std::iter::from_fn(|| scheduler.pop_due(at(1000)))
            .map(|(_, task)| task)
            .collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_fire_in_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(at(50), 1);
        scheduler.schedule_at(at(50), 2);
        scheduler.schedule_at(at(50), 3);

        assert_eq!(scheduler.pop_due(at(50)).map(|(_, t)| t), Some(1));
        assert_eq!(scheduler.pop_due(at(50)).map(|(_, t)| t), Some(2));
        assert_eq!(scheduler.pop_due(at(50)).map(|(_, t)| t), Some(3));
    }

    #[test]
    fn nothing_due_before_deadline() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(at(500), ());
        assert!(scheduler.pop_due(at(499)).is_none());
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.pop_due(at(500)).is_some());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut scheduler = Scheduler::new();
        let doomed = scheduler.schedule_at(at(10), "doomed");
        scheduler.schedule_at(at(20), "kept");

        assert_eq!(scheduler.cancel(doomed), Some("doomed"));
        assert!(!scheduler.is_scheduled(doomed));
        assert_eq!(scheduler.cancel(doomed), None);

        assert_eq!(scheduler.next_deadline(), Some(at(20)));
        assert_eq!(scheduler.pop_due(at(100)).map(|(_, t)| t), Some("kept"));
        assert!(scheduler.pop_due(at(100)).is_none());
    }

    #[test]
    fn schedule_after_offsets_from_now() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler
            .schedule_after(at(1_000), Duration::from_secs(10), StoreTask::EndOfDay)
            .unwrap();
        assert_eq!(scheduler.deadline_of(handle), Some(at(11_000)));
    }

    #[test]
    fn schedule_after_overflow_is_error() {
        let mut scheduler = Scheduler::new();
        let result =
            scheduler.schedule_after(at(u64::MAX), Duration::from_millis(1), StoreTask::NextCrisis);
        assert!(result.is_err());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn retain_filters_payloads() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(at(1), StoreTask::EndOfDay);
        scheduler.schedule_at(at(2), StoreTask::DecisionTimeout(PresentationId(4)));
        scheduler.schedule_at(at(3), StoreTask::CustomerArrival);

        scheduler.retain(|task| matches!(task, StoreTask::DecisionTimeout(_)));

        assert_eq!(scheduler.len(), 1);
        assert_eq!(
            scheduler.pop_due(at(10)).map(|(_, t)| t),
            Some(StoreTask::DecisionTimeout(PresentationId(4)))
        );
    }
}
