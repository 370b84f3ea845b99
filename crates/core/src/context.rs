//! Per-call and per-block context supplied by the host.

use podrelay_types::{Address, BlockHeight, Hash};
use std::time::Duration;

/// Who is calling, with how much gas, at what price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Authenticated sender of the call.
    pub caller: Address,

    /// Gas allowance for the call.
    pub gas_limit: u64,

    /// Gas price the caller declared for the call.
    pub gas_price: u128,
}

impl CallContext {
    /// Default allowance for calls built with [`CallContext::new`].
    pub const DEFAULT_GAS_LIMIT: u64 = 10_000_000;

    /// Create a context with the default allowance and a zero gas price.
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            gas_limit: Self::DEFAULT_GAS_LIMIT,
            gas_price: 0,
        }
    }

    /// Set the gas allowance.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Set the declared gas price.
    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }
}

/// The block the next calls execute in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockContext {
    /// Block height.
    pub height: BlockHeight,

    /// Block timestamp as a duration since the epoch.
    pub timestamp: Duration,

    /// Entropy of the parent block (its hash). Not influenced by any caller.
    pub entropy: Hash,
}

impl BlockContext {
    /// Create a block context.
    pub fn new(height: BlockHeight, timestamp: Duration, entropy: Hash) -> Self {
        Self {
            height,
            timestamp,
            entropy,
        }
    }
}
