//! Utility-token balances.

use podrelay_core::RelayError;
use podrelay_types::{Address, Amount};

/// Balances of the utility token that stake is denominated in.
#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    balances: im::HashMap<Address, Amount>,
    total_supply: Amount,
}

impl TokenLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Create `amount` new tokens for `account`.
    pub fn mint(&mut self, account: Address, amount: Amount) -> Result<(), RelayError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(RelayError::AmountOverflow)?;
        let balance = self
            .balance_of(&account)
            .checked_add(amount)
            .ok_or(RelayError::AmountOverflow)?;
        self.balances.insert(account, balance);
        self.total_supply = supply;
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), RelayError> {
        let available = self.balance_of(&from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(RelayError::InsufficientBalance {
                available,
                required: amount,
            })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(RelayError::AmountOverflow)?;
        self.set(from, remaining);
        self.set(to, credited);
        Ok(())
    }

    fn set(&mut self, account: Address, amount: Amount) {
        if amount.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_moves_balance() {
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");
        let mut tokens = TokenLedger::new();
        tokens.mint(alice, Amount(100)).unwrap();

        tokens.transfer(alice, bob, Amount(40)).unwrap();
        assert_eq!(tokens.balance_of(&alice), Amount(60));
        assert_eq!(tokens.balance_of(&bob), Amount(40));
        assert_eq!(tokens.total_supply(), Amount(100));
    }

    #[test]
    fn test_transfer_rejects_overdraft() {
        let alice = Address::derive(b"alice");
        let mut tokens = TokenLedger::new();
        tokens.mint(alice, Amount(10)).unwrap();

        assert_eq!(
            tokens.transfer(alice, Address::derive(b"bob"), Amount(11)),
            Err(RelayError::InsufficientBalance {
                available: Amount(10),
                required: Amount(11)
            })
        );
        assert_eq!(tokens.balance_of(&alice), Amount(10));
    }

    #[test]
    fn test_mint_overflow() {
        let alice = Address::derive(b"alice");
        let mut tokens = TokenLedger::new();
        tokens.mint(alice, Amount(u128::MAX)).unwrap();
        assert_eq!(
            tokens.mint(Address::derive(b"bob"), Amount(1)),
            Err(RelayError::AmountOverflow)
        );
    }
}
