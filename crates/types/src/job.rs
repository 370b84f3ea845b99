//! Pending operator job record.

use crate::{Address, BlockHeight, Hash, PodId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metadata of a pending job, keyed by its job hash.
///
/// `OperatorJob::default()` is the "not found" sentinel: pod 0, zero
/// operator, zero gas price and no fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorJob {
    /// Pod the assignee was drawn from.
    pub pod: PodId,

    /// Length of each exclusivity slot.
    pub window: Duration,

    /// Assignee with the first right of execution, or `Address::ZERO`.
    pub operator: Address,

    /// Block the job was created in.
    pub start_block: BlockHeight,

    /// Timestamp every slot is measured from.
    pub start_timestamp: Duration,

    /// Gas the sender paid for.
    pub gas_limit: u64,

    /// Gas price recorded at creation.
    pub gas_price: u128,

    /// Pod members eligible after each elapsed slot, in rotation order.
    /// Distinct, never containing the assignee.
    pub fallback_operators: Vec<Address>,

    /// Seed the assignment was derived from.
    pub selection_seed: Hash,
}

/// Who may execute a job at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionWindow {
    /// Only the assignee (slot 0).
    Exclusive(Address),

    /// The assignee or the fallback operator designated for this slot.
    Fallback {
        /// 1-based slot number.
        slot: u64,
        /// Designated fallback operator.
        operator: Address,
    },

    /// Any caller.
    Open,
}

impl OperatorJob {
    /// Whether this is the "not found" sentinel.
    pub fn is_empty(&self) -> bool {
        self.pod.is_none()
    }

    /// Whether a real operator was assigned.
    pub fn has_operator(&self) -> bool {
        !self.operator.is_zero()
    }

    /// Number of whole windows elapsed since the job started.
    pub fn slot_at(&self, now: Duration) -> u64 {
        let elapsed = now.saturating_sub(self.start_timestamp);
        if self.window.is_zero() {
            return u64::MAX;
        }
        (elapsed.as_nanos() / self.window.as_nanos()).min(u64::MAX as u128) as u64
    }

    /// Execution rights at `now`, before pod membership is taken into account.
    pub fn window_at(&self, now: Duration) -> ExecutionWindow {
        if !self.has_operator() {
            return ExecutionWindow::Open;
        }
        match self.slot_at(now) {
            0 => ExecutionWindow::Exclusive(self.operator),
            slot => usize::try_from(slot - 1)
                .ok()
                .and_then(|i| self.fallback_operators.get(i))
                .map(|&operator| ExecutionWindow::Fallback { slot, operator })
                .unwrap_or(ExecutionWindow::Open),
        }
    }

    /// When the last designated fallback slot ends and execution opens to anyone.
    pub fn open_at(&self) -> Duration {
        let slots = self.fallback_operators.len() as u32 + 1;
        self.start_timestamp + self.window * slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_with_fallbacks(n: usize) -> OperatorJob {
        OperatorJob {
            pod: PodId::FIRST,
            window: Duration::from_secs(60),
            operator: Address::derive(b"primary"),
            start_timestamp: Duration::from_secs(1_000),
            gas_limit: 100_000,
            gas_price: 10,
            fallback_operators: (0..n)
                .map(|i| Address::derive(format!("fallback-{i}").as_bytes()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_is_sentinel() {
        let job = OperatorJob::default();
        assert!(job.is_empty());
        assert!(!job.has_operator());
        assert_eq!(job.gas_price, 0);
        assert!(job.fallback_operators.is_empty());
    }

    #[test]
    fn test_window_rotation() {
        let job = job_with_fallbacks(2);
        let start = job.start_timestamp;

        assert_eq!(
            job.window_at(start + Duration::from_secs(59)),
            ExecutionWindow::Exclusive(job.operator)
        );
        assert_eq!(
            job.window_at(start + Duration::from_secs(60)),
            ExecutionWindow::Fallback {
                slot: 1,
                operator: job.fallback_operators[0]
            }
        );
        assert_eq!(
            job.window_at(start + Duration::from_secs(150)),
            ExecutionWindow::Fallback {
                slot: 2,
                operator: job.fallback_operators[1]
            }
        );
        assert_eq!(
            job.window_at(start + Duration::from_secs(180)),
            ExecutionWindow::Open
        );
        assert_eq!(job.open_at(), start + Duration::from_secs(180));
    }

    #[test]
    fn test_unassigned_job_is_open_immediately() {
        let job = OperatorJob {
            operator: Address::ZERO,
            ..job_with_fallbacks(0)
        };
        assert_eq!(job.window_at(job.start_timestamp), ExecutionWindow::Open);
    }

    #[test]
    fn test_time_before_start_counts_as_slot_zero() {
        let job = job_with_fallbacks(1);
        assert_eq!(job.slot_at(Duration::ZERO), 0);
    }
}
