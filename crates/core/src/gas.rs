//! Deterministic gas metering.
//!
//! The relay runs inside a host that charges for every storage access,
//! hash and notification. `GasMeter` tracks what a call has spent against
//! the allowance the caller supplied; `GasSchedule` prices each operation.
//! Both are pure, so the same call on the same state always costs the same.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a charge exceeds the remaining allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("out of gas: limit {limit}, used {used}, requested {requested}")]
pub struct OutOfGas {
    /// Meter limit.
    pub limit: u64,
    /// Gas used before the failing charge.
    pub used: u64,
    /// Size of the failing charge.
    pub requested: u64,
}

impl From<OutOfGas> for crate::RelayError {
    fn from(err: OutOfGas) -> Self {
        crate::RelayError::OutOfGas { limit: err.limit }
    }
}

/// Tracks gas spent against a fixed allowance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Create a meter with the given allowance.
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// The allowance.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas spent so far.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Gas still available.
    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    /// Spend `amount`. On failure the whole allowance is consumed.
    pub fn charge(&mut self, amount: u64) -> Result<(), OutOfGas> {
        if amount > self.remaining() {
            let err = OutOfGas {
                limit: self.limit,
                used: self.used,
                requested: amount,
            };
            self.used = self.limit;
            return Err(err);
        }
        self.used += amount;
        Ok(())
    }

    /// Spend up to `amount`, never failing.
    ///
    /// Used for bookkeeping after the point where a call can no longer fail.
    pub fn charge_saturating(&mut self, amount: u64) {
        self.used = self.used.saturating_add(amount).min(self.limit);
    }

    /// A nested meter capped at `cap` and at what remains here.
    pub fn child(&self, cap: u64) -> GasMeter {
        GasMeter::new(cap.min(self.remaining()))
    }

    /// Fold a nested meter's spend back into this one.
    pub fn absorb(&mut self, child: &GasMeter) {
        self.charge_saturating(child.used());
    }
}

/// Gas price of each metered operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    /// Reading a storage slot.
    pub storage_read: u64,
    /// Writing a previously empty slot.
    pub storage_write: u64,
    /// Updating a non-empty slot.
    pub storage_update: u64,
    /// Clearing a slot.
    pub storage_clear: u64,
    /// Fixed cost of a hash.
    pub hash_base: u64,
    /// Per 32-byte word hashed.
    pub hash_per_word: u64,
    /// Fixed cost of a notification.
    pub event_base: u64,
    /// Per byte of notification data.
    pub event_per_byte: u64,
    /// Fixed cost of a forwarding call.
    pub call_base: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            storage_read: 2_100,
            storage_write: 20_000,
            storage_update: 5_000,
            storage_clear: 5_000,
            hash_base: 30,
            hash_per_word: 6,
            event_base: 375,
            event_per_byte: 8,
            call_base: 2_600,
        }
    }
}

impl GasSchedule {
    /// Cost of hashing `len` bytes.
    pub fn hash(&self, len: usize) -> u64 {
        self.hash_base + self.hash_per_word * (len as u64).div_ceil(32)
    }

    /// Cost of emitting a notification carrying `len` bytes.
    pub fn event(&self, len: usize) -> u64 {
        self.event_base + self.event_per_byte * len as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_and_remaining() {
        let mut meter = GasMeter::new(100);
        meter.charge(40).unwrap();
        assert_eq!(meter.used(), 40);
        assert_eq!(meter.remaining(), 60);
    }

    #[test]
    fn test_failed_charge_consumes_everything() {
        let mut meter = GasMeter::new(100);
        meter.charge(30).unwrap();
        let err = meter.charge(80).unwrap_err();
        assert_eq!(
            err,
            OutOfGas {
                limit: 100,
                used: 30,
                requested: 80
            }
        );
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn test_child_is_capped_and_absorbed() {
        let mut meter = GasMeter::new(1_000);
        meter.charge(900).unwrap();

        let mut child = meter.child(500);
        assert_eq!(child.limit(), 100);
        child.charge(60).unwrap();

        meter.absorb(&child);
        assert_eq!(meter.used(), 960);
    }

    #[test]
    fn test_schedule_hash_rounds_up_words() {
        let schedule = GasSchedule::default();
        assert_eq!(schedule.hash(0), 30);
        assert_eq!(schedule.hash(1), 36);
        assert_eq!(schedule.hash(33), 42);
        assert_eq!(schedule.event(10), 375 + 80);
    }
}
