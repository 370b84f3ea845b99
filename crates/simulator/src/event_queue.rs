//! Deterministic event ordering.

use podrelay_types::{Address, Hash};
use std::collections::BTreeMap;
use std::time::Duration;

/// Key for ordering events: simulated time, then insertion order.
///
/// The sequence number makes same-time events pop in the order they were
/// scheduled, so a run depends only on its seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    pub time: Duration,
    pub seq: u64,
}

/// Something that happens at a point in simulated time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// Produce block `height`.
    Block { height: u64 },

    /// `caller` tries to execute a job.
    Attempt {
        job_hash: Hash,
        caller: Address,
        gas_price: u128,
    },
}

impl SimEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            SimEvent::Block { .. } => "Block",
            SimEvent::Attempt { .. } => "Attempt",
        }
    }
}

/// Time-ordered queue of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BTreeMap<EventKey, SimEvent>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` at `time`.
    pub fn schedule(&mut self, time: Duration, event: SimEvent) {
        let key = EventKey {
            time,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.events.insert(key, event);
    }

    /// Remove and return the earliest event.
    pub fn pop(&mut self) -> Option<(Duration, SimEvent)> {
        self.events
            .pop_first()
            .map(|(key, event)| (key.time, event))
    }

    /// Time of the earliest event.
    pub fn peek_time(&self) -> Option<Duration> {
        self.events.keys().next().map(|key| key.time)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_by_time_then_insertion() {
        let mut queue = EventQueue::new();
        queue.schedule(Duration::from_secs(5), SimEvent::Block { height: 2 });
        queue.schedule(Duration::from_secs(1), SimEvent::Block { height: 1 });
        queue.schedule(Duration::from_secs(5), SimEvent::Block { height: 3 });

        assert_eq!(queue.peek_time(), Some(Duration::from_secs(1)));
        let heights: Vec<u64> = std::iter::from_fn(|| queue.pop())
            .map(|(_, event)| match event {
                SimEvent::Block { height } => height,
                SimEvent::Attempt { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(heights, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }
}
