//! Host knowledge about accounts.

use podrelay_types::Address;
use std::collections::HashMap;

/// Tells the relay which addresses are contracts and who controls them.
pub trait AccountDirectory: Send + Sync {
    /// Controller of a contract account, `None` for externally owned accounts.
    fn controller_of(&self, account: &Address) -> Option<Address>;

    /// Whether `caller` may act for `account`.
    ///
    /// Externally owned accounts act for themselves; contract accounts are
    /// acted for by their controller.
    fn may_act_for(&self, caller: &Address, account: &Address) -> bool {
        match self.controller_of(account) {
            Some(controller) => controller == *caller,
            None => caller == account,
        }
    }
}

/// A fixed map of contract accounts to their controllers.
#[derive(Debug, Clone, Default)]
pub struct StaticAccounts {
    controllers: HashMap<Address, Address>,
}

impl StaticAccounts {
    /// Create an empty directory (every account is externally owned).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `contract` as a contract account controlled by `controller`.
    pub fn with_contract(mut self, contract: Address, controller: Address) -> Self {
        self.controllers.insert(contract, controller);
        self
    }
}

impl AccountDirectory for StaticAccounts {
    fn controller_of(&self, account: &Address) -> Option<Address> {
        self.controllers.get(account).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_may_act_for() {
        let eoa = Address::derive(b"eoa");
        let contract = Address::derive(b"contract");
        let owner = Address::derive(b"owner");
        let accounts = StaticAccounts::new().with_contract(contract, owner);

        assert!(accounts.may_act_for(&eoa, &eoa));
        assert!(!accounts.may_act_for(&owner, &eoa));
        assert!(accounts.may_act_for(&owner, &contract));
        assert!(!accounts.may_act_for(&contract, &contract));
    }
}
