use std::time::Duration;

/// Handle identifying a pending entry. Currently only used to keep entries
/// addressable; a cancel primitive can be layered on without reshaping the queue.
pub type TimerId = u64;

struct Entry<E> {
    id: TimerId,
    remaining: Duration,
    event: E,
}

/// Cooperative delayed-event queue.
///
/// GUI toolkit timers tend to misbehave with many concurrently pending delays,
/// so the session schedules everything here and an external driver calls
/// [`TimerQueue::tick`] once per fixed quantum. Events are returned from `tick`
/// rather than invoked as callbacks; anything scheduled in reaction to a tick's
/// events is therefore only examined by later ticks, never the one that produced
/// them.
pub struct TimerQueue<E> {
    pending: Vec<Entry<E>>,
    next_id: TimerId,
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Register `event` to fire no earlier than `delay` from now. Never blocks.
    pub fn schedule(&mut self, delay: Duration, event: E) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(Entry {
            id,
            remaining: delay,
            event,
        });
        id
    }

    /// Advance every pending entry by `quantum` and return the entries that are
    /// now due, in registration order. Entries not yet due stay queued. Due
    /// events may fire up to one quantum late, never early.
    pub fn tick(&mut self, quantum: Duration) -> Vec<E> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            let entry = &mut self.pending[i];
            entry.remaining = entry.remaining.saturating_sub(quantum);
            if entry.remaining.is_zero() {
                due.push(self.pending.remove(i).event);
            } else {
                i += 1;
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Ids of the pending entries, in registration order.
    pub fn pending_ids(&self) -> impl Iterator<Item = TimerId> + '_ {
        self.pending.iter().map(|e| e.id)
    }
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
