//! Operator scheduler state machine.

use crate::execution::OutboundRequest;
use crate::{assign, JobRegistry, Roles, SchedulerConfig};
use podrelay_bonding::BondLedger;
use podrelay_core::{
    AccountDirectory, BlockContext, BridgeTarget, Call, CallContext, CallReceipt, GasMeter,
    Notification, RelayError, SelectionBeacon, SelectionInput, SelectionProof, StateMachine,
};
use podrelay_types::{Address, Amount, Hash, OperatorJob, PodId};
use std::sync::Arc;
use tracing::{debug, trace};

/// Everything a call can change. Cloning it is the pre-call snapshot.
#[derive(Debug, Clone)]
pub(crate) struct RelayState {
    pub(crate) ledger: BondLedger,
    pub(crate) registry: JobRegistry,
    pub(crate) roles: Roles,
    pub(crate) min_gas_price: u128,
    pub(crate) initialized: bool,
}

/// Job registry and scheduler.
///
/// Receives inbound jobs from the messaging module, assigns each to a pod
/// member, and governs who may execute it as its windows elapse. Executions
/// by anyone other than the assignee slash the assignee's stake.
///
/// # State Machine
///
/// Per job: `nonexistent → pending → resolved`. A job is cleared before its
/// inner request is forwarded, so exactly one execution attempt resolves it.
///
/// Every call runs against a snapshot of the relay state; any error restores
/// the snapshot, so a rejected call leaves no trace.
#[derive(Clone)]
pub struct OperatorScheduler<T: BridgeTarget> {
    pub(crate) config: SchedulerConfig,
    pub(crate) state: RelayState,
    pub(crate) target: T,
    pub(crate) beacon: Arc<dyn SelectionBeacon>,
    pub(crate) accounts: Arc<dyn AccountDirectory>,
    pub(crate) block: BlockContext,
}

impl<T: BridgeTarget> std::fmt::Debug for OperatorScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorScheduler")
            .field("beacon", &self.beacon.name())
            .field("block", &self.block)
            .field("pending_jobs", &self.state.registry.pending_len())
            .field("failed_jobs", &self.state.registry.failed_len())
            .field("pods", &self.state.ledger.pods().pod_count())
            .finish()
    }
}

impl<T: BridgeTarget> OperatorScheduler<T> {
    /// Create a scheduler.
    pub fn new(
        config: SchedulerConfig,
        target: T,
        beacon: Arc<dyn SelectionBeacon>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Self {
        let state = RelayState {
            ledger: BondLedger::new(config.bonding.clone()),
            registry: JobRegistry::new(),
            roles: config.roles,
            min_gas_price: config.min_gas_price,
            initialized: false,
        };
        Self {
            config,
            state,
            target,
            beacon,
            accounts,
            block: BlockContext::default(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get the bridge target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Get the bond ledger.
    pub fn ledger(&self) -> &BondLedger {
        &self.state.ledger
    }

    /// Get the job registry.
    pub fn registry(&self) -> &JobRegistry {
        &self.state.registry
    }

    /// Get the selection beacon.
    pub fn beacon(&self) -> &dyn SelectionBeacon {
        self.beacon.as_ref()
    }

    fn dispatch(
        &mut self,
        ctx: &CallContext,
        call: Call,
        meter: &mut GasMeter,
        out: &mut Vec<Notification>,
    ) -> Result<(), RelayError> {
        match call {
            Call::CrossChainMessage { payload } => {
                self.on_cross_chain_message(ctx, &payload, meter, out)
            }
            Call::ExecuteJob { payload } => self.on_execute_job(ctx, &payload, meter, out),
            Call::RecoverJob { payload } => self.on_recover_job(ctx, &payload, meter, out),
            Call::SendOutbound {
                to_chain,
                inner,
                gas_limit,
                gas_price,
            } => {
                let request = OutboundRequest {
                    to_chain,
                    inner,
                    gas_limit,
                    gas_price,
                };
                self.on_send_outbound(ctx, request, meter, out)
            }
            Call::Bond {
                operator,
                amount,
                pod,
            } => {
                meter.charge(self.config.gas.storage_write * 3)?;
                out.extend(self.state.ledger.bond(ctx.caller, operator, amount, pod)?);
                Ok(())
            }
            Call::Topup { operator, amount } => {
                meter.charge(self.config.gas.storage_update * 3)?;
                out.extend(self.state.ledger.topup(ctx.caller, operator, amount)?);
                Ok(())
            }
            Call::Unbond {
                operator,
                recipient,
            } => {
                meter.charge(self.config.gas.storage_read + self.config.gas.storage_clear * 3)?;
                out.extend(self.state.ledger.unbond(
                    ctx.caller,
                    operator,
                    recipient,
                    self.accounts.as_ref(),
                )?);
                Ok(())
            }
            Call::Initialize(genesis) => self.on_initialize(ctx, genesis, meter, out),
            Call::SetAdmin(address) => self.set_role(ctx, meter, |r| r.admin = address),
            Call::SetUtilityToken(address) => {
                self.set_role(ctx, meter, |r| r.utility_token = address)
            }
            Call::SetBridge(address) => self.set_role(ctx, meter, |r| r.bridge = address),
            Call::SetMessagingModule(address) => {
                self.set_role(ctx, meter, |r| r.messaging_module = address)
            }
            Call::SetRegistry(address) => self.set_role(ctx, meter, |r| r.registry = address),
            Call::SetMinGasPrice(price) => self.on_set_min_gas_price(ctx, price, meter),
        }
    }

    /// Charge for a notification and queue it.
    pub(crate) fn emit(
        &self,
        meter: &mut GasMeter,
        out: &mut Vec<Notification>,
        notification: Notification,
    ) {
        meter.charge_saturating(self.config.gas.event(notification.data_len()));
        out.push(notification);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Pending job with `job_hash`, or the empty sentinel.
    pub fn job_details(&self, job_hash: &Hash) -> OperatorJob {
        self.state.registry.details(job_hash)
    }

    /// Whether `job_hash` resolved with a failed inner request.
    pub fn is_failed_job(&self, job_hash: &Hash) -> bool {
        self.state.registry.is_failed(job_hash)
    }

    /// Number of pods created.
    pub fn pod_count(&self) -> usize {
        self.state.ledger.pods().pod_count()
    }

    /// Number of members in `pod`.
    pub fn pod_operators_len(&self, pod: PodId) -> Result<usize, RelayError> {
        self.state.ledger.pods().len(pod)
    }

    /// Members of `pod`.
    pub fn pod_operators(&self, pod: PodId) -> Result<Vec<Address>, RelayError> {
        self.state.ledger.pods().members(pod)
    }

    /// Up to `limit` members of `pod` from `offset`.
    pub fn pod_operators_range(
        &self,
        pod: PodId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Address>, RelayError> {
        self.state.ledger.pods().members_range(pod, offset, limit)
    }

    /// `(base, current)` bond amounts of `pod`.
    pub fn pod_bond_amounts(&self, pod: PodId) -> Result<(Amount, Amount), RelayError> {
        self.state.ledger.pod_bond_amounts(pod)
    }

    /// Stake of `operator`.
    pub fn bonded_amount(&self, operator: &Address) -> Amount {
        self.state.ledger.bonded_amount(operator)
    }

    /// Pod of `operator`, `PodId::NONE` when unbonded.
    pub fn bonded_pod(&self, operator: &Address) -> PodId {
        self.state.ledger.bonded_pod(operator)
    }

    /// Utility-token balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.ledger.balance_of(account)
    }

    /// Check an assignment announced in `OperatorJobAssigned`.
    ///
    /// The proof must verify against the beacon, and while the job is pending
    /// its recorded seed must match the proof.
    pub fn verify_selection(&self, input: &SelectionInput, proof: &SelectionProof) -> bool {
        if !self.beacon.verify(input, proof) {
            return false;
        }
        match self.state.registry.get(&input.job_hash) {
            Some(job) => job.selection_seed == proof.seed,
            None => true,
        }
    }

    /// Recompute the assignment a seed yields for `pod` as it stands now.
    pub fn draw_assignment(&self, pod: PodId, seed: &Hash) -> crate::Assignment {
        let pods = self.state.ledger.pods();
        let len = pods.population(pod);
        assign(
            len,
            |i| pods.member_at(pod, i).ok().flatten(),
            seed,
            self.config.max_fallback_operators,
        )
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Roles
    // ═══════════════════════════════════════════════════════════════════════

    pub fn admin(&self) -> Address {
        self.state.roles.admin
    }

    pub fn messaging_module(&self) -> Address {
        self.state.roles.messaging_module
    }

    pub fn bridge(&self) -> Address {
        self.state.roles.bridge
    }

    pub fn registry_address(&self) -> Address {
        self.state.roles.registry
    }

    pub fn utility_token(&self) -> Address {
        self.state.roles.utility_token
    }

    pub fn min_gas_price(&self) -> u128 {
        self.state.min_gas_price
    }

    /// Whether genesis has been applied.
    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }
}

impl<T: BridgeTarget> StateMachine for OperatorScheduler<T> {
    fn handle(&mut self, ctx: &CallContext, call: Call) -> Result<CallReceipt, RelayError> {
        let snapshot = self.state.clone();
        let call_type = call.type_name();
        let mut meter = GasMeter::new(ctx.gas_limit);
        let mut notifications = Vec::new();

        trace!(call = call_type, caller = %ctx.caller, "Handling call");

        match self.dispatch(ctx, call, &mut meter, &mut notifications) {
            Ok(()) => Ok(CallReceipt {
                notifications,
                gas_used: meter.used(),
            }),
            Err(error) => {
                self.state = snapshot;
                debug!(
                    call = call_type,
                    caller = %ctx.caller,
                    error = %error,
                    "Call rejected"
                );
                Err(error)
            }
        }
    }

    fn set_block(&mut self, block: BlockContext) {
        self.block = block;
    }

    fn block(&self) -> &BlockContext {
        &self.block
    }
}
