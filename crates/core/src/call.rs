//! Inbound calls accepted by the relay state machine.

use crate::Notification;
use podrelay_types::{Address, Amount, ChainId, PodId};
use serde::{Deserialize, Serialize};

/// A mutating call. Read-only queries are plain methods on the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    // ═══════════════════════════════════════════════════════════════════════
    // Jobs
    // ═══════════════════════════════════════════════════════════════════════
    /// Inbound payload delivered by the messaging adapter.
    CrossChainMessage { payload: Vec<u8> },

    /// Execute a pending job.
    ExecuteJob { payload: Vec<u8> },

    /// Re-forward a job whose inner request failed (admin only).
    RecoverJob { payload: Vec<u8> },

    /// Wrap a bridge-out request for the messaging adapter (bridge only).
    SendOutbound {
        to_chain: ChainId,
        inner: Vec<u8>,
        gas_limit: u64,
        gas_price: u128,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Bonding
    // ═══════════════════════════════════════════════════════════════════════
    /// Bond `amount` for `operator` into `pod`, paid by the caller.
    Bond {
        operator: Address,
        amount: Amount,
        pod: PodId,
    },

    /// Add stake to a bonded operator, paid by the caller.
    Topup { operator: Address, amount: Amount },

    /// Withdraw an operator's full stake to `recipient`.
    Unbond { operator: Address, recipient: Address },

    // ═══════════════════════════════════════════════════════════════════════
    // Administration
    // ═══════════════════════════════════════════════════════════════════════
    /// One-time bootstrap of balances and bonds.
    Initialize(Genesis),

    SetAdmin(Address),
    SetUtilityToken(Address),
    SetBridge(Address),
    SetMessagingModule(Address),
    SetRegistry(Address),
    SetMinGasPrice(u128),
}

impl Call {
    /// Get a human-readable name for this call type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Call::CrossChainMessage { .. } => "CrossChainMessage",
            Call::ExecuteJob { .. } => "ExecuteJob",
            Call::RecoverJob { .. } => "RecoverJob",
            Call::SendOutbound { .. } => "SendOutbound",
            Call::Bond { .. } => "Bond",
            Call::Topup { .. } => "Topup",
            Call::Unbond { .. } => "Unbond",
            Call::Initialize(_) => "Initialize",
            Call::SetAdmin(_) => "SetAdmin",
            Call::SetUtilityToken(_) => "SetUtilityToken",
            Call::SetBridge(_) => "SetBridge",
            Call::SetMessagingModule(_) => "SetMessagingModule",
            Call::SetRegistry(_) => "SetRegistry",
            Call::SetMinGasPrice(_) => "SetMinGasPrice",
        }
    }

    /// Check if this is an administrative call.
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Call::RecoverJob { .. }
                | Call::Initialize(_)
                | Call::SetAdmin(_)
                | Call::SetUtilityToken(_)
                | Call::SetBridge(_)
                | Call::SetMessagingModule(_)
                | Call::SetRegistry(_)
                | Call::SetMinGasPrice(_)
        )
    }
}

/// Initial utility-token balances and bonds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Genesis {
    /// Balances minted before any bond.
    pub balances: Vec<GenesisBalance>,

    /// Bonds performed, each paid by the operator itself.
    pub bonds: Vec<GenesisBond>,
}

/// A minted balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub account: Address,
    pub amount: Amount,
}

/// A bond performed at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBond {
    pub operator: Address,
    pub amount: Amount,
    pub pod: PodId,
}

/// What an accepted call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallReceipt {
    /// Notifications in emission order.
    pub notifications: Vec<Notification>,

    /// Gas charged to the caller.
    pub gas_used: u64,
}

impl CallReceipt {
    /// Iterate notifications of jobs that reached a final outcome.
    pub fn resolutions(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().filter(|n| n.is_resolution())
    }
}
