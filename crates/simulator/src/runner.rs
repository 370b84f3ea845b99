//! Discrete-event simulation of operators racing for jobs.

use crate::config::{BeaconKind, SimulatorConfig};
use crate::event_queue::{EventQueue, SimEvent};
use crate::metrics::{MetricsCollector, RunSummary, SimulationReport};
use crate::operators::OperatorSet;
use crate::workload::JobWorkload;
use crate::SimError;
use podrelay_core::{
    BlockContext, Call, CallContext, CallReceipt, Genesis, GenesisBalance, GenesisBond,
    Notification, RelayError, SelectionBeacon, StateMachine, StaticAccounts, TransferReason,
};
use podrelay_scheduler::{BlockEntropyBeacon, BlsBeacon, ExecutionRight, OperatorScheduler};
use podrelay_test_helpers::ScriptedBridgeTarget;
use podrelay_types::{Address, BlockHeight, Hash, JobPayload, PodId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timestamp of the genesis block.
const GENESIS_TIME: Duration = Duration::from_secs(1_000_000);

/// A job the simulation is waiting on.
#[derive(Debug, Clone)]
struct TrackedJob {
    payload: Vec<u8>,
    created_at: Duration,
    gas_price: u128,
}

/// Deterministic simulation of a bonded operator set serving jobs.
///
/// Blocks arrive at a fixed interval and deliver jobs. Each job's assignee,
/// fallbacks and an unbonded keeper get attempts scheduled according to
/// their profiles. Every attempt is checked with the scheduler's read-only
/// eligibility query first and submitted only if it would pass; refusals
/// are counted by reason.
pub struct Simulator {
    config: SimulatorConfig,
    scheduler: OperatorScheduler<ScriptedBridgeTarget>,
    operators: OperatorSet,
    workload: JobWorkload,
    queue: EventQueue,
    rng: ChaCha8Rng,
    metrics: MetricsCollector,
    jobs: HashMap<Hash, TrackedJob>,
    keeper: Address,
    height: u64,
    now: Duration,
}

impl Simulator {
    /// Build the scheduler, apply genesis and schedule the first block.
    pub fn new(config: SimulatorConfig) -> Result<Self, SimError> {
        let beacon: Arc<dyn SelectionBeacon> = match config.beacon {
            BeaconKind::BlockEntropy => Arc::new(BlockEntropyBeacon),
            BeaconKind::Bls => {
                let key_seed = Hash::from_parts(&[
                    b"podrelay-sim-beacon".as_slice(),
                    &config.seed.to_le_bytes(),
                ]);
                Arc::new(BlsBeacon::from_seed(key_seed.as_bytes())?)
            }
        };

        let scheduler = OperatorScheduler::new(
            config.scheduler_config(),
            ScriptedBridgeTarget::new(),
            beacon,
            Arc::new(StaticAccounts::new()),
        );
        let operators = OperatorSet::from_mix(&config.operators);

        let mut simulator = Self {
            workload: JobWorkload::new(config.workload.clone()),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            metrics: MetricsCollector::new()?,
            queue: EventQueue::new(),
            jobs: HashMap::new(),
            keeper: Address::derive(b"podrelay-sim-keeper"),
            height: 0,
            now: GENESIS_TIME,
            scheduler,
            operators,
            config,
        };
        simulator.apply_genesis()?;
        let first_block = GENESIS_TIME + simulator.config.block_time();
        simulator
            .queue
            .schedule(first_block, SimEvent::Block { height: 1 });

        info!(
            seed = simulator.config.seed,
            blocks = simulator.config.blocks,
            operators = simulator.operators.len(),
            beacon = simulator.scheduler.beacon().name(),
            "Simulation initialized"
        );
        Ok(simulator)
    }

    fn apply_genesis(&mut self) -> Result<(), SimError> {
        self.set_block();
        let genesis = Genesis {
            balances: self
                .operators
                .iter()
                .map(|operator| GenesisBalance {
                    account: operator.address,
                    amount: self.config.initial_balance,
                })
                .collect(),
            bonds: self
                .operators
                .iter()
                .map(|operator| GenesisBond {
                    operator: operator.address,
                    amount: self.config.stake,
                    pod: PodId::FIRST,
                })
                .collect(),
        };
        let admin = self.scheduler.admin();
        self.scheduler
            .handle(&CallContext::new(admin), Call::Initialize(genesis))?;
        Ok(())
    }

    /// The scheduler under simulation.
    pub fn scheduler(&self) -> &OperatorScheduler<ScriptedBridgeTarget> {
        &self.scheduler
    }

    /// The simulated operators.
    pub fn operators(&self) -> &OperatorSet {
        &self.operators
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Jobs created but not resolved yet.
    pub fn outstanding(&self) -> usize {
        self.jobs.len()
    }

    /// Process the next event. Returns `false` once the queue is empty.
    pub fn step(&mut self) -> bool {
        let Some((time, event)) = self.queue.pop() else {
            return false;
        };
        self.now = time;
        match event {
            SimEvent::Block { height } => self.on_block(height),
            SimEvent::Attempt {
                job_hash,
                caller,
                gas_price,
            } => self.on_attempt(job_hash, caller, gas_price),
        }
        true
    }

    /// Run every block, then drain outstanding attempts.
    pub fn run(&mut self) -> SimulationReport {
        while self.step() {}

        let report = self.report();
        info!(
            jobs_created = report.jobs_created,
            jobs_resolved = report.jobs_resolved,
            outstanding = report.jobs_outstanding,
            slashes = report.slashes,
            "Simulation complete"
        );
        report
    }

    /// Report on the run so far.
    pub fn report(&self) -> SimulationReport {
        self.metrics.report(RunSummary {
            seed: self.config.seed,
            blocks: self.height,
            operators: self.operators.len(),
            simulated: self.now.saturating_sub(GENESIS_TIME),
            outstanding: self.jobs.len(),
            total_staked: self.scheduler.ledger().total_staked(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════

    fn set_block(&mut self) {
        let entropy = Hash::from_parts(&[
            b"podrelay-sim-block".as_slice(),
            &self.config.seed.to_le_bytes(),
            &self.height.to_le_bytes(),
        ]);
        self.scheduler
            .set_block(BlockContext::new(BlockHeight(self.height), self.now, entropy));
    }

    fn on_block(&mut self, height: u64) {
        self.height = height;
        self.set_block();

        let messaging = self.scheduler.messaging_module();
        for job in self.workload.generate_block(&mut self.rng) {
            let ctx = CallContext::new(messaging);
            let call = Call::CrossChainMessage {
                payload: job.payload.clone(),
            };
            match self.scheduler.handle(&ctx, call) {
                Ok(receipt) => self.track(job.payload, &receipt),
                Err(error) => {
                    warn!(height, error = %error, "Delivery rejected");
                    self.metrics.record_rejected(error.reason());
                }
            }
        }

        if height < self.config.blocks {
            self.queue.schedule(
                self.now + self.config.block_time(),
                SimEvent::Block { height: height + 1 },
            );
        }
    }

    fn track(&mut self, payload: Vec<u8>, receipt: &CallReceipt) {
        let Some(Notification::OperatorJobAssigned {
            job_hash,
            operator,
            fallback_operators,
            ..
        }) = receipt
            .notifications
            .iter()
            .find(|n| matches!(n, Notification::OperatorJobAssigned { .. }))
        else {
            return;
        };
        let gas_price = JobPayload::decode(&payload)
            .map(|decoded| decoded.gas_price)
            .unwrap_or_default();

        self.metrics.record_created();
        self.jobs.insert(
            *job_hash,
            TrackedJob {
                payload,
                created_at: self.now,
                gas_price,
            },
        );
        self.schedule_attempts(*job_hash, *operator, fallback_operators, gas_price);
    }

    fn schedule_attempts(
        &mut self,
        job_hash: Hash,
        assignee: Address,
        fallbacks: &[Address],
        gas_price: u128,
    ) {
        let window = self.scheduler.config().job_window;
        let spiked = gas_price.saturating_mul(self.scheduler.config().gas_spike_multiplier);

        if self
            .operators
            .profile(&assignee)
            .is_some_and(|profile| profile.serves_assignments())
        {
            let at = self.now + self.reaction();
            self.attempt(at, job_hash, assignee, gas_price);
        }

        for (i, fallback) in fallbacks.iter().enumerate() {
            if !self
                .operators
                .profile(fallback)
                .is_some_and(|profile| profile.serves_fallbacks())
            {
                continue;
            }
            let price = if self.workload.spike(&mut self.rng) {
                spiked
            } else {
                gas_price
            };
            let at = self.now + window * (i as u32 + 1) + self.reaction();
            self.attempt(at, job_hash, *fallback, price);
        }

        // The keeper pokes early and again once the job opens to anyone.
        let early = self.now + self.reaction();
        self.attempt(early, job_hash, self.keeper, gas_price);
        let open = self.now + window * (fallbacks.len() as u32 + 1) + self.reaction();
        self.attempt(open, job_hash, self.keeper, gas_price);
    }

    fn attempt(&mut self, at: Duration, job_hash: Hash, caller: Address, gas_price: u128) {
        self.queue.schedule(
            at,
            SimEvent::Attempt {
                job_hash,
                caller,
                gas_price,
            },
        );
    }

    fn reaction(&mut self) -> Duration {
        Duration::from_secs(self.workload.reaction_secs(&mut self.rng))
    }

    fn on_attempt(&mut self, job_hash: Hash, caller: Address, gas_price: u128) {
        self.set_block();

        let right = match self.scheduler.check_execution(&caller, gas_price, &job_hash) {
            Ok(right) => right,
            Err(error) => {
                debug!(job_hash = %job_hash, caller = %caller, error = %error, "Attempt refused");
                self.metrics.record_rejected(error.reason());
                if error == RelayError::GasSpikeDetected {
                    self.retry_at_recorded_price(job_hash, caller);
                }
                return;
            }
        };

        let Some(job) = self.jobs.get(&job_hash).cloned() else {
            self.metrics.record_rejected(RelayError::InvalidJob.reason());
            return;
        };
        let ctx = CallContext::new(caller).with_gas_price(gas_price);
        let call = Call::ExecuteJob {
            payload: job.payload,
        };
        match self.scheduler.handle(&ctx, call) {
            Ok(receipt) => self.on_resolved(job_hash, right, job.created_at, &receipt),
            Err(error) => {
                warn!(job_hash = %job_hash, caller = %caller, error = %error, "Execution rejected");
                self.metrics.record_rejected(error.reason());
            }
        }
    }

    fn retry_at_recorded_price(&mut self, job_hash: Hash, caller: Address) {
        if let Some(gas_price) = self.jobs.get(&job_hash).map(|job| job.gas_price) {
            let at = self.now + self.reaction();
            self.attempt(at, job_hash, caller, gas_price);
        }
    }

    fn on_resolved(
        &mut self,
        job_hash: Hash,
        right: ExecutionRight,
        created_at: Duration,
        receipt: &CallReceipt,
    ) {
        let mut failed = false;
        for notification in &receipt.notifications {
            match notification {
                Notification::StakeTransfer {
                    from,
                    amount,
                    reason: TransferReason::Slash,
                    ..
                } => {
                    let removed = !self.scheduler.ledger().is_bonded(from);
                    self.metrics.record_slash(*amount, removed);
                }
                Notification::FailedOperatorJob { .. } => failed = true,
                _ => {}
            }
        }

        let latency = self.now.saturating_sub(created_at);
        debug!(
            job_hash = %job_hash,
            right = ?right,
            latency_secs = latency.as_secs(),
            failed,
            "Job resolved"
        );
        self.metrics.record_resolved(right, latency, failed);
        self.jobs.remove(&job_hash);
    }
}
