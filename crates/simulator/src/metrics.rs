//! Run metrics and the final report.

use crate::SimError;
use hdrhistogram::Histogram;
use podrelay_scheduler::ExecutionRight;
use podrelay_types::Amount;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Collects counters while a simulation runs.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    jobs_created: u64,
    by_assignee: u64,
    by_fallback: u64,
    by_open: u64,
    inner_failures: u64,
    rejected: BTreeMap<String, u64>,
    slashes: u64,
    total_slashed: Amount,
    operators_slashed_out: u64,
    /// Seconds from creation to resolution.
    latency: Histogram<u64>,
}

impl MetricsCollector {
    pub fn new() -> Result<Self, SimError> {
        Ok(Self {
            jobs_created: 0,
            by_assignee: 0,
            by_fallback: 0,
            by_open: 0,
            inner_failures: 0,
            rejected: BTreeMap::new(),
            slashes: 0,
            total_slashed: Amount::ZERO,
            operators_slashed_out: 0,
            latency: Histogram::new(3)?,
        })
    }

    pub fn record_created(&mut self) {
        self.jobs_created += 1;
    }

    /// Record a resolution in `right` after `latency`.
    pub fn record_resolved(&mut self, right: ExecutionRight, latency: Duration, failed: bool) {
        match right {
            ExecutionRight::Assignee => self.by_assignee += 1,
            ExecutionRight::Fallback { .. } => self.by_fallback += 1,
            ExecutionRight::Open => self.by_open += 1,
        }
        if failed {
            self.inner_failures += 1;
        }
        self.latency.saturating_record(latency.as_secs());
    }

    /// Record an attempt refused with `reason`.
    pub fn record_rejected(&mut self, reason: &str) {
        *self.rejected.entry(reason.to_string()).or_default() += 1;
    }

    /// Record a slash of `amount`, and whether it removed the operator.
    pub fn record_slash(&mut self, amount: Amount, removed: bool) {
        self.slashes += 1;
        self.total_slashed = self.total_slashed.saturating_add(amount);
        if removed {
            self.operators_slashed_out += 1;
        }
    }

    pub fn resolved(&self) -> u64 {
        self.by_assignee + self.by_fallback + self.by_open
    }

    /// Freeze into a report.
    pub fn report(&self, run: RunSummary) -> SimulationReport {
        let latency = if self.latency.len() == 0 {
            LatencyReport::default()
        } else {
            LatencyReport {
                mean_secs: self.latency.mean(),
                p50_secs: self.latency.value_at_quantile(0.5),
                p99_secs: self.latency.value_at_quantile(0.99),
                max_secs: self.latency.max(),
            }
        };
        SimulationReport {
            seed: run.seed,
            blocks: run.blocks,
            operators: run.operators,
            simulated_secs: run.simulated.as_secs(),
            jobs_created: self.jobs_created,
            jobs_resolved: self.resolved(),
            jobs_outstanding: run.outstanding,
            resolved_by_assignee: self.by_assignee,
            resolved_by_fallback: self.by_fallback,
            resolved_open: self.by_open,
            inner_failures: self.inner_failures,
            rejected: self.rejected.clone(),
            slashes: self.slashes,
            total_slashed: self.total_slashed,
            operators_slashed_out: self.operators_slashed_out,
            total_staked: run.total_staked,
            latency,
        }
    }
}

/// Run facts the collector does not observe.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub seed: u64,
    pub blocks: u64,
    pub operators: usize,
    pub simulated: Duration,
    pub outstanding: usize,
    pub total_staked: Amount,
}

/// Resolution latency in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencyReport {
    pub mean_secs: f64,
    pub p50_secs: u64,
    pub p99_secs: u64,
    pub max_secs: u64,
}

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub blocks: u64,
    pub operators: usize,
    pub simulated_secs: u64,
    pub jobs_created: u64,
    pub jobs_resolved: u64,
    pub jobs_outstanding: usize,
    pub resolved_by_assignee: u64,
    pub resolved_by_fallback: u64,
    pub resolved_open: u64,
    pub inner_failures: u64,
    /// Refused attempts by reason.
    pub rejected: BTreeMap<String, u64>,
    pub slashes: u64,
    pub total_slashed: Amount,
    pub operators_slashed_out: u64,
    /// Stake held by the ledger at the end of the run.
    pub total_staked: Amount,
    pub latency: LatencyReport,
}

impl SimulationReport {
    /// Share of resolved jobs executed by their assignee.
    pub fn assignee_ratio(&self) -> f64 {
        if self.jobs_resolved == 0 {
            return 0.0;
        }
        self.resolved_by_assignee as f64 / self.jobs_resolved as f64
    }

    /// Total refused attempts.
    pub fn total_rejected(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// Print a human-readable summary.
    pub fn print(&self) {
        println!("=== Simulation Report ===");
        println!(
            "Seed {} | {} blocks | {} operators | {}s simulated",
            self.seed, self.blocks, self.operators, self.simulated_secs
        );
        println!();
        println!("Jobs created:     {}", self.jobs_created);
        println!("Jobs resolved:    {}", self.jobs_resolved);
        println!("Jobs outstanding: {}", self.jobs_outstanding);
        println!(
            "  by assignee {} ({:.1}%), by fallback {}, open {}",
            self.resolved_by_assignee,
            self.assignee_ratio() * 100.0,
            self.resolved_by_fallback,
            self.resolved_open
        );
        println!("  inner failures {}", self.inner_failures);
        println!();
        println!("Rejected attempts: {}", self.total_rejected());
        for (reason, count) in &self.rejected {
            println!("  {reason}: {count}");
        }
        println!();
        println!(
            "Slashes: {} totalling {} ({} operators slashed out)",
            self.slashes, self.total_slashed, self.operators_slashed_out
        );
        println!("Total staked: {}", self.total_staked);
        println!();
        println!(
            "Latency: mean {:.1}s, p50 {}s, p99 {}s, max {}s",
            self.latency.mean_secs,
            self.latency.p50_secs,
            self.latency.p99_secs,
            self.latency.max_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            seed: 1,
            blocks: 10,
            operators: 3,
            simulated: Duration::from_secs(120),
            outstanding: 0,
            total_staked: Amount::tokens(300),
        }
    }

    #[test]
    fn test_counts_resolutions_and_rejections() {
        let mut metrics = MetricsCollector::new().unwrap();
        metrics.record_created();
        metrics.record_created();
        metrics.record_resolved(ExecutionRight::Assignee, Duration::from_secs(4), false);
        metrics.record_resolved(
            ExecutionRight::Fallback { slot: 1 },
            Duration::from_secs(70),
            true,
        );
        metrics.record_rejected("operator has time");
        metrics.record_rejected("operator has time");
        metrics.record_slash(Amount::tokens(100), true);

        let report = metrics.report(summary());
        assert_eq!(report.jobs_created, 2);
        assert_eq!(report.jobs_resolved, 2);
        assert_eq!(report.resolved_by_fallback, 1);
        assert_eq!(report.inner_failures, 1);
        assert_eq!(report.rejected["operator has time"], 2);
        assert_eq!(report.total_rejected(), 2);
        assert_eq!(report.total_slashed, Amount::tokens(100));
        assert_eq!(report.operators_slashed_out, 1);
        assert_eq!(report.latency.max_secs, 70);
        assert!((report.assignee_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_report_serializes() {
        let metrics = MetricsCollector::new().unwrap();
        let json = serde_json::to_value(metrics.report(summary())).unwrap();
        assert_eq!(json["total_staked"], "300000000000000000000");
        assert_eq!(json["latency"]["max_secs"], 0);
    }
}
