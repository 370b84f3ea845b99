//! Administrative calls.

use crate::{OperatorScheduler, Roles};
use podrelay_core::{BridgeTarget, CallContext, GasMeter, Genesis, Notification, RelayError};
use tracing::info;

impl<T: BridgeTarget> OperatorScheduler<T> {
    fn require_admin(&self, ctx: &CallContext) -> Result<(), RelayError> {
        if ctx.caller != self.state.roles.admin {
            return Err(RelayError::AdminOnlyCall);
        }
        Ok(())
    }

    pub(crate) fn set_role(
        &mut self,
        ctx: &CallContext,
        meter: &mut GasMeter,
        update: impl FnOnce(&mut Roles),
    ) -> Result<(), RelayError> {
        self.require_admin(ctx)?;
        meter.charge(self.config.gas.storage_update)?;
        update(&mut self.state.roles);
        info!(roles = ?self.state.roles, "Roles updated");
        Ok(())
    }

    pub(crate) fn on_set_min_gas_price(
        &mut self,
        ctx: &CallContext,
        price: u128,
        meter: &mut GasMeter,
    ) -> Result<(), RelayError> {
        self.require_admin(ctx)?;
        meter.charge(self.config.gas.storage_update)?;
        self.state.min_gas_price = price;
        info!(min_gas_price = price, "Minimum gas price updated");
        Ok(())
    }

    /// Mint genesis balances, then perform genesis bonds, each paid by the
    /// bonding operator.
    pub(crate) fn on_initialize(
        &mut self,
        ctx: &CallContext,
        genesis: Genesis,
        meter: &mut GasMeter,
        out: &mut Vec<Notification>,
    ) -> Result<(), RelayError> {
        self.require_admin(ctx)?;
        if self.state.initialized {
            return Err(RelayError::AlreadyInitialized);
        }

        for balance in &genesis.balances {
            meter.charge(self.config.gas.storage_write)?;
            self.state.ledger.mint(balance.account, balance.amount)?;
        }
        for bond in &genesis.bonds {
            meter.charge(self.config.gas.storage_write * 3)?;
            let transfers =
                self.state
                    .ledger
                    .bond(bond.operator, bond.operator, bond.amount, bond.pod)?;
            for notification in transfers {
                self.emit(meter, out, notification);
            }
        }
        self.state.initialized = true;

        info!(
            balances = genesis.balances.len(),
            bonds = genesis.bonds.len(),
            pods = self.state.ledger.pods().pod_count(),
            "Genesis applied"
        );
        Ok(())
    }
}
