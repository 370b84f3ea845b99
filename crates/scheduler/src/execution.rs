//! Job creation, execution, recovery and outbound sends.

use crate::OperatorScheduler;
use podrelay_core::{
    BridgeTarget, CallContext, ForwardOutcome, ForwardRequest, GasMeter, Notification,
    RelayError, SelectionInput,
};
use podrelay_types::{
    job_hash, Address, ChainId, ExecutionWindow, Hash, JobPayload, OperatorJob,
};
use tracing::{debug, info, warn};

/// Capacity in which a caller executes a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionRight {
    /// The assignee (or its controller).
    Assignee,
    /// The fallback operator designated for this slot.
    Fallback {
        /// 1-based slot number.
        slot: u64,
    },
    /// Anyone: no assignee, fallbacks exhausted, or the designated fallback
    /// left the pod.
    Open,
}

/// Who executes, and in which capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Eligibility {
    pub(crate) right: ExecutionRight,
    /// Account credited with the execution (and any slashed stake).
    pub(crate) executor: Address,
}

/// Arguments of an outbound send.
pub(crate) struct OutboundRequest {
    pub(crate) to_chain: ChainId,
    pub(crate) inner: Vec<u8>,
    pub(crate) gas_limit: u64,
    pub(crate) gas_price: u128,
}

impl<T: BridgeTarget> OperatorScheduler<T> {
    // ═══════════════════════════════════════════════════════════════════════
    // Eligibility
    // ═══════════════════════════════════════════════════════════════════════

    /// Who may execute `job` right now, as seen by `caller`.
    pub(crate) fn eligibility(
        &self,
        caller: &Address,
        job: &OperatorJob,
    ) -> Result<Eligibility, RelayError> {
        if !job.has_operator() {
            return Ok(Eligibility {
                right: ExecutionRight::Open,
                executor: *caller,
            });
        }
        if self.accounts.may_act_for(caller, &job.operator) {
            return Ok(Eligibility {
                right: ExecutionRight::Assignee,
                executor: job.operator,
            });
        }

        match job.window_at(self.block.timestamp) {
            ExecutionWindow::Exclusive(_) => Err(RelayError::OperatorHasTime),
            ExecutionWindow::Fallback { slot, operator } => {
                if !self.state.ledger.pods().contains(job.pod, &operator) {
                    return Ok(Eligibility {
                        right: ExecutionRight::Open,
                        executor: *caller,
                    });
                }
                if !self.accounts.may_act_for(caller, &operator) {
                    return Err(RelayError::InvalidFallback);
                }
                Ok(Eligibility {
                    right: ExecutionRight::Fallback { slot },
                    executor: operator,
                })
            }
            ExecutionWindow::Open => Ok(Eligibility {
                right: ExecutionRight::Open,
                executor: *caller,
            }),
        }
    }

    /// Reject non-assignee executions priced at or above the spike threshold.
    fn check_gas_spike(
        &self,
        gas_price: u128,
        job: &OperatorJob,
        right: ExecutionRight,
    ) -> Result<(), RelayError> {
        if right == ExecutionRight::Assignee || job.gas_price == 0 {
            return Ok(());
        }
        let threshold = job
            .gas_price
            .saturating_mul(self.config.gas_spike_multiplier);
        if gas_price >= threshold {
            return Err(RelayError::GasSpikeDetected);
        }
        Ok(())
    }

    /// Whether `caller` could execute `job_hash` now at `gas_price`.
    ///
    /// Performs every check of an execution except the gas allowance.
    pub fn check_execution(
        &self,
        caller: &Address,
        gas_price: u128,
        job_hash: &Hash,
    ) -> Result<ExecutionRight, RelayError> {
        let job = self
            .state
            .registry
            .get(job_hash)
            .ok_or(RelayError::InvalidJob)?;
        let eligibility = self.eligibility(caller, job)?;
        self.check_gas_spike(gas_price, job, eligibility.right)?;
        Ok(eligibility.right)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Creation
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn on_cross_chain_message(
        &mut self,
        ctx: &CallContext,
        payload: &[u8],
        meter: &mut GasMeter,
        out: &mut Vec<Notification>,
    ) -> Result<(), RelayError> {
        if ctx.caller != self.state.roles.messaging_module {
            return Err(RelayError::MessagingOnlyCall);
        }
        let gas = &self.config.gas;

        meter.charge(gas.hash(payload.len()))?;
        let job_hash = job_hash(payload);
        let decoded = JobPayload::decode(payload)?;

        meter.charge(gas.storage_read)?;
        if self.state.registry.is_known(&job_hash) {
            return Err(RelayError::JobAlreadyExists);
        }

        let pod = self.config.pod_for_value(decoded.value());
        let input = SelectionInput {
            job_hash,
            job_nonce: self.state.registry.next_job_nonce(),
            height: self.block.height,
            entropy: self.block.entropy,
        };
        let proof = self.beacon.draw(&input);
        let assignment = self.draw_assignment(pod, &proof.seed);
        meter.charge(gas.storage_read * (1 + assignment.fallback_operators.len() as u64))?;

        let job = OperatorJob {
            pod,
            window: self.config.job_window,
            operator: assignment.operator,
            start_block: self.block.height,
            start_timestamp: self.block.timestamp,
            gas_limit: decoded.gas_limit,
            gas_price: decoded.gas_price,
            fallback_operators: assignment.fallback_operators.clone(),
            selection_seed: proof.seed,
        };

        meter.charge(gas.storage_write * 2)?;
        self.state.registry.insert(job_hash, job)?;
        if !assignment.operator.is_zero() {
            self.state.ledger.hold_obligation(assignment.operator);
        }

        info!(
            job_hash = %job_hash,
            pod = pod.0,
            operator = %assignment.operator,
            fallbacks = assignment.fallback_operators.len(),
            beacon = self.beacon.name(),
            "Job created"
        );

        self.emit(
            meter,
            out,
            Notification::AvailableOperatorJob {
                job_hash,
                payload: payload.to_vec(),
            },
        );
        self.emit(
            meter,
            out,
            Notification::OperatorJobAssigned {
                job_hash,
                pod,
                operator: assignment.operator,
                fallback_operators: assignment.fallback_operators,
                input,
                proof,
            },
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Execution
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn on_execute_job(
        &mut self,
        ctx: &CallContext,
        payload: &[u8],
        meter: &mut GasMeter,
        out: &mut Vec<Notification>,
    ) -> Result<(), RelayError> {
        meter.charge(self.config.gas.hash(payload.len()))?;
        let job_hash = job_hash(payload);

        meter.charge(self.config.gas.storage_read)?;
        let job = self
            .state
            .registry
            .get(&job_hash)
            .cloned()
            .ok_or(RelayError::InvalidJob)?;

        let required = self.config.required_execution_gas(job.gas_limit);
        if meter.remaining() <= required {
            return Err(RelayError::NotEnoughGasLeft {
                required,
                remaining: meter.remaining(),
            });
        }

        meter.charge(self.config.gas.storage_read)?;
        let eligibility = self.eligibility(&ctx.caller, &job)?;
        self.check_gas_spike(ctx.gas_price, &job, eligibility.right)?;

        let decoded = JobPayload::decode(payload)?;
        self.resolve(job_hash, &job, &decoded, eligibility, meter, out)?;
        Ok(())
    }

    /// Clear the job, settle the assignee's obligation and forward.
    ///
    /// Nothing after the forward can fail: the inner outcome is recorded as
    /// a notification, never as an error.
    pub(crate) fn resolve(
        &mut self,
        job_hash: Hash,
        job: &OperatorJob,
        payload: &JobPayload,
        eligibility: Eligibility,
        meter: &mut GasMeter,
        out: &mut Vec<Notification>,
    ) -> Result<ForwardOutcome, RelayError> {
        let executor = eligibility.executor;

        meter.charge(self.config.gas.storage_clear)?;
        self.state.registry.clear(&job_hash);

        if job.has_operator() {
            meter.charge(self.config.gas.storage_update)?;
            self.state.ledger.release_obligation(&job.operator);

            if executor != job.operator {
                meter.charge(self.config.gas.storage_update * 2)?;
                let report = self.state.ledger.slash(job.operator, executor)?;
                for notification in report.notifications {
                    self.emit(meter, out, notification);
                }
            }
        }

        meter.charge(self.config.gas.call_base)?;
        let mut child = meter.child(payload.gas_limit);
        let request = ForwardRequest {
            job_hash,
            from_chain: payload.from_chain,
            nonce: payload.nonce,
            inner: &payload.inner,
            executor,
        };
        let outcome = self.target.forward(&request, &mut child);
        meter.absorb(&child);

        match &outcome {
            ForwardOutcome::Ok => {
                info!(
                    job_hash = %job_hash,
                    executor = %executor,
                    right = ?eligibility.right,
                    gas_used = child.used(),
                    "Job executed"
                );
                self.emit(
                    meter,
                    out,
                    Notification::FinishedOperatorJob { job_hash, executor },
                );
            }
            ForwardOutcome::Failed { reason } => {
                warn!(
                    job_hash = %job_hash,
                    executor = %executor,
                    right = ?eligibility.right,
                    reason = %reason,
                    "Job inner request failed"
                );
                meter.charge_saturating(self.config.gas.storage_write);
                self.state.registry.mark_failed(job_hash);
                self.emit(meter, out, Notification::FailedOperatorJob { job_hash });
            }
        }

        Ok(outcome)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Recovery
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn on_recover_job(
        &mut self,
        ctx: &CallContext,
        payload: &[u8],
        meter: &mut GasMeter,
        out: &mut Vec<Notification>,
    ) -> Result<(), RelayError> {
        if ctx.caller != self.state.roles.admin {
            return Err(RelayError::AdminOnlyCall);
        }
        meter.charge(self.config.gas.hash(payload.len()))?;
        let job_hash = job_hash(payload);

        meter.charge(self.config.gas.storage_clear)?;
        if !self.state.registry.take_failed(&job_hash) {
            return Err(RelayError::JobNotFailed);
        }
        let decoded = JobPayload::decode(payload)?;

        meter.charge(self.config.gas.call_base)?;
        let mut child = meter.child(decoded.gas_limit);
        let request = ForwardRequest {
            job_hash,
            from_chain: decoded.from_chain,
            nonce: decoded.nonce,
            inner: &decoded.inner,
            executor: ctx.caller,
        };
        let outcome = self.target.forward(&request, &mut child);
        meter.absorb(&child);

        let succeeded = outcome.is_ok();
        if let ForwardOutcome::Failed { reason } = &outcome {
            warn!(job_hash = %job_hash, reason = %reason, "Recovery of failed job failed again");
            meter.charge_saturating(self.config.gas.storage_write);
            self.state.registry.mark_failed(job_hash);
        } else {
            info!(job_hash = %job_hash, "Failed job recovered");
        }

        self.emit(
            meter,
            out,
            Notification::FailedJobRecovered {
                job_hash,
                succeeded,
            },
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Outbound
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn on_send_outbound(
        &mut self,
        ctx: &CallContext,
        request: OutboundRequest,
        meter: &mut GasMeter,
        out: &mut Vec<Notification>,
    ) -> Result<(), RelayError> {
        if ctx.caller != self.state.roles.bridge {
            return Err(RelayError::BridgeOnlyCall);
        }

        meter.charge(self.config.gas.storage_update)?;
        let envelope = JobPayload {
            nonce: self.state.registry.next_outbound_nonce(),
            from_chain: self.config.local_chain,
            inner: request.inner,
            gas_limit: request.gas_limit,
            gas_price: request.gas_price.max(self.state.min_gas_price),
        };
        let payload = envelope.encode();

        meter.charge(self.config.gas.hash(payload.len()))?;
        let job_hash = job_hash(&payload);

        debug!(
            job_hash = %job_hash,
            to_chain = request.to_chain.0,
            nonce = envelope.nonce,
            gas_price = envelope.gas_price,
            "Outbound message sent"
        );

        self.emit(
            meter,
            out,
            Notification::CrossChainMessageSent {
                to_chain: request.to_chain,
                job_hash,
                payload,
            },
        );
        Ok(())
    }
}
