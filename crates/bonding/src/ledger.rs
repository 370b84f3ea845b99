//! Bond ledger: stake custody, pod membership and slashing.
//!
//! The ledger exclusively owns stake balances. Bonded tokens sit in the
//! custody account of the utility-token ledger; each operator's share is
//! recorded in `stakes`. The pod directory is a derived index that only
//! bond, unbond and slash mutate.

use crate::{BondingConfig, PodDirectory, TokenLedger};
use podrelay_core::{AccountDirectory, Notification, RelayError, TransferReason};
use podrelay_types::{Address, Amount, PodId};
use tracing::{debug, info, warn};

/// An operator's bonded position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stake {
    /// Tokens held in custody for the operator.
    pub amount: Amount,
    /// Pod the operator belongs to.
    pub pod: PodId,
}

/// Result of slashing a delinquent operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashReport {
    /// Stake moved to the executor.
    pub slashed: Amount,
    /// Leftover stake returned to the delinquent when removed.
    pub refunded: Amount,
    /// Whether the delinquent fell below the base bond and left its pod.
    pub removed: bool,
    /// Stake movements, in order.
    pub notifications: Vec<Notification>,
}

/// Stake custody and pod membership.
#[derive(Debug, Clone)]
pub struct BondLedger {
    config: BondingConfig,
    tokens: TokenLedger,
    stakes: im::HashMap<Address, Stake>,
    pods: PodDirectory,
    /// Pending jobs each operator is the assignee of.
    obligations: im::HashMap<Address, u32>,
}

impl BondLedger {
    /// Create an empty ledger.
    pub fn new(config: BondingConfig) -> Self {
        Self {
            config,
            tokens: TokenLedger::new(),
            stakes: im::HashMap::new(),
            pods: PodDirectory::new(),
            obligations: im::HashMap::new(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &BondingConfig {
        &self.config
    }

    /// Escrow account holding bonded tokens.
    pub fn custody(&self) -> Address {
        self.config.custody
    }

    /// Pod membership index.
    pub fn pods(&self) -> &PodDirectory {
        &self.pods
    }

    /// Utility-token balances.
    pub fn tokens(&self) -> &TokenLedger {
        &self.tokens
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════

    /// Stake of `operator`, if bonded.
    pub fn stake(&self, operator: &Address) -> Option<Stake> {
        self.stakes.get(operator).copied()
    }

    /// Whether `operator` is bonded.
    pub fn is_bonded(&self, operator: &Address) -> bool {
        self.stakes.contains_key(operator)
    }

    /// Bonded amount of `operator`, zero when unbonded.
    pub fn bonded_amount(&self, operator: &Address) -> Amount {
        self.stake(operator).map(|s| s.amount).unwrap_or_default()
    }

    /// Pod of `operator`, `PodId::NONE` when unbonded.
    pub fn bonded_pod(&self, operator: &Address) -> PodId {
        self.stake(operator).map(|s| s.pod).unwrap_or_default()
    }

    /// Sum of every operator's stake.
    pub fn total_staked(&self) -> Amount {
        self.stakes
            .values()
            .fold(Amount::ZERO, |acc, s| Amount(acc.get().saturating_add(s.amount.get())))
    }

    /// `(base, current)` bond amounts of an existing pod.
    pub fn pod_bond_amounts(&self, pod: PodId) -> Result<(Amount, Amount), RelayError> {
        let population = self.pods.len(pod)?;
        Ok((
            self.config.curve.base_amount(pod),
            self.config.curve.current_amount(pod, population),
        ))
    }

    /// Stake required to join `pod` now. Defined for pods not created yet.
    pub fn bond_requirement(&self, pod: PodId) -> Amount {
        self.config
            .curve
            .current_amount(pod, self.pods.population(pod))
    }

    /// Utility-token balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.tokens.balance_of(account)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Obligations
    // ═══════════════════════════════════════════════════════════════════════

    /// Number of pending jobs `operator` is assigned to.
    pub fn active_obligations(&self, operator: &Address) -> u32 {
        self.obligations.get(operator).copied().unwrap_or(0)
    }

    /// Record that `operator` was assigned a pending job.
    pub fn hold_obligation(&mut self, operator: Address) {
        let count = self.active_obligations(&operator).saturating_add(1);
        self.obligations.insert(operator, count);
    }

    /// Record that one of `operator`'s pending jobs resolved.
    pub fn release_obligation(&mut self, operator: &Address) {
        match self.active_obligations(operator) {
            0 | 1 => {
                self.obligations.remove(operator);
            }
            count => {
                self.obligations.insert(*operator, count - 1);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mutations
    // ═══════════════════════════════════════════════════════════════════════

    /// Mint utility tokens (genesis only).
    pub fn mint(&mut self, account: Address, amount: Amount) -> Result<(), RelayError> {
        self.tokens.mint(account, amount)
    }

    /// Bond `amount` for `operator` into `pod`, paid by `payer`.
    pub fn bond(
        &mut self,
        payer: Address,
        operator: Address,
        amount: Amount,
        pod: PodId,
    ) -> Result<Vec<Notification>, RelayError> {
        if pod.is_none() {
            return Err(RelayError::PodDoesNotExist(pod));
        }
        if self.is_bonded(&operator) {
            return Err(RelayError::OperatorIsBonded);
        }
        let required = self.bond_requirement(pod);
        if amount < required {
            return Err(RelayError::BondAmountTooSmall {
                required,
                offered: amount,
            });
        }
        let available = self.tokens.balance_of(&payer);
        if available < amount {
            return Err(RelayError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        if self.pods.population(pod) >= self.config.max_pod_size {
            return Err(RelayError::TooManyOperators(pod));
        }

        self.tokens.transfer(payer, self.config.custody, amount)?;
        self.pods.add(pod, operator, self.config.max_pod_size)?;
        self.stakes.insert(operator, Stake { amount, pod });

        info!(
            operator = %operator,
            payer = %payer,
            pod = pod.0,
            amount = %amount,
            "Operator bonded"
        );

        Ok(vec![Notification::StakeTransfer {
            from: payer,
            to: self.config.custody,
            amount,
            reason: TransferReason::Bond,
        }])
    }

    /// Add `amount` to a bonded operator's stake, paid by `payer`.
    pub fn topup(
        &mut self,
        payer: Address,
        operator: Address,
        amount: Amount,
    ) -> Result<Vec<Notification>, RelayError> {
        let stake = self.stake(&operator).ok_or(RelayError::OperatorNotBonded)?;
        let total = stake
            .amount
            .checked_add(amount)
            .ok_or(RelayError::AmountOverflow)?;

        self.tokens.transfer(payer, self.config.custody, amount)?;
        self.stakes.insert(
            operator,
            Stake {
                amount: total,
                ..stake
            },
        );

        debug!(operator = %operator, amount = %amount, total = %total, "Stake topped up");

        Ok(vec![Notification::StakeTransfer {
            from: payer,
            to: self.config.custody,
            amount,
            reason: TransferReason::Topup,
        }])
    }

    /// Withdraw `operator`'s full stake to `recipient` and leave its pod.
    pub fn unbond(
        &mut self,
        caller: Address,
        operator: Address,
        recipient: Address,
        accounts: &dyn AccountDirectory,
    ) -> Result<Vec<Notification>, RelayError> {
        let stake = self.stake(&operator).ok_or(RelayError::OperatorNotBonded)?;
        if !accounts.may_act_for(&caller, &operator) {
            return Err(RelayError::SenderNotAuthorized);
        }
        if self.active_obligations(&operator) > 0 {
            return Err(RelayError::OperatorHasActiveJob);
        }

        self.tokens
            .transfer(self.config.custody, recipient, stake.amount)?;
        self.stakes.remove(&operator);
        self.pods.remove(stake.pod, &operator);

        info!(
            operator = %operator,
            recipient = %recipient,
            pod = stake.pod.0,
            amount = %stake.amount,
            "Operator unbonded"
        );

        Ok(vec![Notification::StakeTransfer {
            from: self.config.custody,
            to: recipient,
            amount: stake.amount,
            reason: TransferReason::Unbond,
        }])
    }

    /// Move the delinquent's penalty to `executor`.
    ///
    /// The penalty is the pod's current bond amount, capped at the
    /// delinquent's stake. A bonded executor has it added to their stake; an
    /// unbonded executor receives tokens. A delinquent left below the pod's
    /// base bond is removed from the pod and refunded the rest. Slashing an
    /// operator that is no longer bonded moves nothing.
    pub fn slash(
        &mut self,
        delinquent: Address,
        executor: Address,
    ) -> Result<SlashReport, RelayError> {
        let Some(stake) = self.stake(&delinquent) else {
            debug!(delinquent = %delinquent, "Delinquent no longer bonded, nothing to slash");
            return Ok(SlashReport::default());
        };
        let curve = &self.config.curve;
        let penalty = curve
            .current_amount(stake.pod, self.pods.population(stake.pod))
            .min(stake.amount);
        let remaining = stake.amount.saturating_sub(penalty);
        let base = curve.base_amount(stake.pod);

        let executor_stake = match self.stake(&executor) {
            Some(s) => Some(Stake {
                amount: s.amount.checked_add(penalty).ok_or(RelayError::AmountOverflow)?,
                ..s
            }),
            None => None,
        };

        let mut report = SlashReport {
            slashed: penalty,
            ..Default::default()
        };

        if !penalty.is_zero() {
            match executor_stake {
                Some(credited) => {
                    self.stakes.insert(executor, credited);
                }
                None => {
                    self.tokens
                        .transfer(self.config.custody, executor, penalty)?;
                }
            }
            report.notifications.push(Notification::StakeTransfer {
                from: delinquent,
                to: executor,
                amount: penalty,
                reason: TransferReason::Slash,
            });
        }

        if remaining < base {
            self.stakes.remove(&delinquent);
            self.pods.remove(stake.pod, &delinquent);
            report.removed = true;
            if !remaining.is_zero() {
                self.tokens
                    .transfer(self.config.custody, delinquent, remaining)?;
                report.refunded = remaining;
                report.notifications.push(Notification::StakeTransfer {
                    from: self.config.custody,
                    to: delinquent,
                    amount: remaining,
                    reason: TransferReason::Refund,
                });
            }
        } else {
            self.stakes.insert(
                delinquent,
                Stake {
                    amount: remaining,
                    ..stake
                },
            );
        }

        warn!(
            delinquent = %delinquent,
            executor = %executor,
            pod = stake.pod.0,
            slashed = %penalty,
            removed = report.removed,
            "Operator slashed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlatCurve, MAX_POD_SIZE};
    use podrelay_core::StaticAccounts;
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn addr(label: &str) -> Address {
        Address::derive(label.as_bytes())
    }

    fn funded_ledger(accounts: &[&str]) -> BondLedger {
        let mut ledger = BondLedger::new(BondingConfig::default());
        for account in accounts {
            ledger.mint(addr(account), Amount::tokens(10_000)).unwrap();
        }
        ledger
    }

    fn assert_custody_matches_stakes(ledger: &BondLedger) {
        assert_eq!(ledger.balance_of(&ledger.custody()), ledger.total_staked());
    }

    #[test]
    #[traced_test]
    fn test_bond_and_rebond() {
        let mut ledger = funded_ledger(&["op"]);
        let op = addr("op");

        let notifications = ledger
            .bond(op, op, Amount::tokens(100), PodId(1))
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(ledger.bonded_amount(&op), Amount::tokens(100));
        assert_eq!(ledger.bonded_pod(&op), PodId(1));
        assert_eq!(ledger.pods().members(PodId(1)).unwrap(), vec![op]);
        assert_eq!(ledger.balance_of(&op), Amount::tokens(9_900));
        assert_custody_matches_stakes(&ledger);

        assert_eq!(
            ledger.bond(op, op, Amount::tokens(100), PodId(1)),
            Err(RelayError::OperatorIsBonded)
        );
        assert!(logs_contain("Operator bonded"));
    }

    #[test]
    fn test_bond_validation() {
        let mut ledger = funded_ledger(&["op"]);
        let op = addr("op");
        let poor = addr("poor");

        assert_eq!(
            ledger.bond(op, op, Amount::tokens(100), PodId::NONE),
            Err(RelayError::PodDoesNotExist(PodId::NONE))
        );
        assert_eq!(
            ledger.bond(op, op, Amount::tokens(100), PodId(2)),
            Err(RelayError::BondAmountTooSmall {
                required: Amount::tokens(200),
                offered: Amount::tokens(100)
            })
        );
        assert_eq!(
            ledger.bond(poor, poor, Amount::tokens(100), PodId(1)),
            Err(RelayError::InsufficientBalance {
                available: Amount::ZERO,
                required: Amount::tokens(100)
            })
        );
        assert!(!ledger.is_bonded(&op));
        assert_eq!(ledger.pods().pod_count(), 0);
    }

    #[test]
    fn test_bond_into_higher_pod_creates_lower_pods() {
        let mut ledger = funded_ledger(&["op"]);
        let op = addr("op");
        ledger.bond(op, op, Amount::tokens(400), PodId(3)).unwrap();

        assert_eq!(ledger.pods().pod_count(), 3);
        assert_eq!(
            ledger.pod_bond_amounts(PodId(1)).unwrap(),
            (Amount::tokens(100), Amount::tokens(100))
        );
        assert_eq!(
            ledger.pod_bond_amounts(PodId(4)),
            Err(RelayError::PodDoesNotExist(PodId(4)))
        );
        assert_eq!(ledger.bond_requirement(PodId(4)), Amount::tokens(800));
    }

    #[test]
    fn test_pod_capacity() {
        let config = BondingConfig::default().with_max_pod_size(1);
        let mut ledger = BondLedger::new(config);
        ledger.mint(addr("a"), Amount::tokens(1_000)).unwrap();
        ledger.mint(addr("b"), Amount::tokens(1_000)).unwrap();

        ledger
            .bond(addr("a"), addr("a"), Amount::tokens(100), PodId(1))
            .unwrap();
        assert_eq!(
            ledger.bond(addr("b"), addr("b"), Amount::tokens(100), PodId(1)),
            Err(RelayError::TooManyOperators(PodId(1)))
        );
        assert_eq!(ledger.balance_of(&addr("b")), Amount::tokens(1_000));
        assert!(MAX_POD_SIZE >= ledger.config().max_pod_size);
    }

    #[test]
    fn test_third_party_pays_bond_and_topup() {
        let mut ledger = funded_ledger(&["sponsor"]);
        let sponsor = addr("sponsor");
        let op = addr("op");

        ledger.bond(sponsor, op, Amount::tokens(100), PodId(1)).unwrap();
        ledger.topup(sponsor, op, Amount::tokens(50)).unwrap();

        assert_eq!(ledger.bonded_amount(&op), Amount::tokens(150));
        assert_eq!(ledger.balance_of(&sponsor), Amount::tokens(9_850));
        assert_eq!(
            ledger.topup(sponsor, addr("nobody"), Amount::tokens(1)),
            Err(RelayError::OperatorNotBonded)
        );
        assert_custody_matches_stakes(&ledger);
    }

    #[test]
    fn test_unbond_authorization() {
        let mut ledger = funded_ledger(&["op", "vault", "owner"]);
        let op = addr("op");
        let vault = addr("vault");
        let owner = addr("owner");
        let accounts = StaticAccounts::new().with_contract(vault, owner);

        ledger.bond(op, op, Amount::tokens(100), PodId(1)).unwrap();
        ledger.bond(vault, vault, Amount::tokens(100), PodId(1)).unwrap();

        assert_eq!(
            ledger.unbond(owner, op, owner, &accounts),
            Err(RelayError::SenderNotAuthorized)
        );
        assert_eq!(
            ledger.unbond(vault, vault, vault, &accounts),
            Err(RelayError::SenderNotAuthorized)
        );

        ledger.unbond(owner, vault, owner, &accounts).unwrap();
        assert_eq!(ledger.balance_of(&owner), Amount::tokens(10_100));
        assert!(!ledger.is_bonded(&vault));
        assert_eq!(ledger.pods().members(PodId(1)).unwrap(), vec![op]);

        ledger.unbond(op, op, op, &accounts).unwrap();
        assert_eq!(ledger.balance_of(&op), Amount::tokens(10_000));
        assert_eq!(
            ledger.unbond(op, op, op, &accounts),
            Err(RelayError::OperatorNotBonded)
        );
        assert_custody_matches_stakes(&ledger);
    }

    #[test]
    fn test_unbond_blocked_by_obligation() {
        let mut ledger = funded_ledger(&["op"]);
        let op = addr("op");
        let accounts = StaticAccounts::new();
        ledger.bond(op, op, Amount::tokens(100), PodId(1)).unwrap();

        ledger.hold_obligation(op);
        ledger.hold_obligation(op);
        assert_eq!(
            ledger.unbond(op, op, op, &accounts),
            Err(RelayError::OperatorHasActiveJob)
        );

        ledger.release_obligation(&op);
        assert_eq!(ledger.active_obligations(&op), 1);
        ledger.release_obligation(&op);
        assert!(ledger.unbond(op, op, op, &accounts).is_ok());
    }

    #[test]
    #[traced_test]
    fn test_slash_to_unbonded_executor_removes_delinquent() {
        let mut ledger = funded_ledger(&["lazy"]);
        let lazy = addr("lazy");
        let executor = addr("executor");
        ledger.bond(lazy, lazy, Amount::tokens(150), PodId(1)).unwrap();

        let report = ledger.slash(lazy, executor).unwrap();

        // Penalty is the pod's current bond; 50 left is below the 100 base.
        assert_eq!(report.slashed, Amount::tokens(100));
        assert_eq!(report.refunded, Amount::tokens(50));
        assert!(report.removed);
        assert_eq!(report.notifications.len(), 2);
        assert_eq!(ledger.balance_of(&executor), Amount::tokens(100));
        assert_eq!(ledger.balance_of(&lazy), Amount::tokens(9_900));
        assert!(!ledger.is_bonded(&lazy));
        assert!(ledger.pods().members(PodId(1)).unwrap().is_empty());
        assert_custody_matches_stakes(&ledger);
        assert!(logs_contain("Operator slashed"));
    }

    #[test]
    fn test_slash_to_bonded_executor_credits_stake() {
        let mut ledger = funded_ledger(&["lazy", "worker"]);
        let lazy = addr("lazy");
        let worker = addr("worker");
        ledger.bond(lazy, lazy, Amount::tokens(300), PodId(1)).unwrap();
        ledger.bond(worker, worker, Amount::tokens(100), PodId(1)).unwrap();
        let supply = ledger.tokens().total_supply();

        let report = ledger.slash(lazy, worker).unwrap();

        assert!(!report.removed);
        assert_eq!(ledger.bonded_amount(&lazy), Amount::tokens(200));
        assert_eq!(ledger.bonded_amount(&worker), Amount::tokens(200));
        assert_eq!(ledger.balance_of(&worker), Amount::tokens(9_900));
        assert_eq!(ledger.tokens().total_supply(), supply);
        assert_custody_matches_stakes(&ledger);
    }

    #[test]
    fn test_slash_capped_at_stake() {
        let config = BondingConfig::default().with_curve(Arc::new(FlatCurve {
            base: Amount::tokens(100),
            multiplier: 2,
        }));
        let mut ledger = BondLedger::new(config);
        let lazy = addr("lazy");
        ledger.mint(lazy, Amount::tokens(100)).unwrap();
        ledger.bond(lazy, lazy, Amount::tokens(100), PodId(1)).unwrap();

        let report = ledger.slash(lazy, addr("executor")).unwrap();
        assert_eq!(report.slashed, Amount::tokens(100));
        assert_eq!(report.refunded, Amount::ZERO);
        assert_eq!(report.notifications.len(), 1);
        assert!(report.removed);

        // Already out: a second slash moves nothing.
        assert_eq!(
            ledger.slash(lazy, addr("executor")).unwrap(),
            SlashReport::default()
        );
    }

    #[test]
    fn test_snapshot_restores_everything() {
        let mut ledger = funded_ledger(&["op"]);
        let op = addr("op");
        let snapshot = ledger.clone();

        ledger.bond(op, op, Amount::tokens(100), PodId(1)).unwrap();
        ledger.hold_obligation(op);

        ledger = snapshot;
        assert!(!ledger.is_bonded(&op));
        assert_eq!(ledger.active_obligations(&op), 0);
        assert_eq!(ledger.balance_of(&op), Amount::tokens(10_000));
    }
}
