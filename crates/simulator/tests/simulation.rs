//! Whole-run behaviour of the simulator.

use podrelay_simulator::{
    BeaconKind, OperatorMix, SchedulerParams, Simulator, SimulatorConfig, WorkloadConfig,
};
use podrelay_types::Amount;
use tracing_test::traced_test;

fn small(seed: u64) -> SimulatorConfig {
    SimulatorConfig::default().with_seed(seed).with_blocks(60)
}

fn assert_conserved(simulator: &Simulator) {
    let ledger = simulator.scheduler().ledger();
    assert_eq!(ledger.balance_of(&ledger.custody()), ledger.total_staked());
}

#[test]
#[traced_test]
fn test_every_job_resolves() {
    let mut simulator = Simulator::new(small(1)).unwrap();
    let report = simulator.run();

    assert!(report.jobs_created > 0);
    assert_eq!(report.jobs_resolved, report.jobs_created);
    assert_eq!(report.jobs_outstanding, 0);
    assert_eq!(simulator.scheduler().registry().pending_len(), 0);
    assert_conserved(&simulator);
    assert!(logs_contain("Simulation complete"));
}

#[test]
fn test_same_seed_same_report() {
    let a = Simulator::new(small(5)).unwrap().run();
    let b = Simulator::new(small(5)).unwrap().run();
    let c = Simulator::new(small(6)).unwrap().run();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_reliable_set_resolves_by_assignee() {
    let config = small(2).with_operators(OperatorMix {
        reliable: 6,
        lazy: 0,
        offline: 0,
    });
    let report = Simulator::new(config).unwrap().run();

    assert_eq!(report.resolved_by_assignee, report.jobs_resolved);
    assert_eq!(report.slashes, 0);
    assert_eq!(report.total_slashed, Amount::ZERO);
    assert!(report.latency.max_secs <= 20);
    // The keeper's early pokes are refused.
    assert!(report.rejected.get("operator has time").copied().unwrap_or(0) > 0);
}

#[test]
fn test_negligent_operators_get_slashed() {
    let config = small(3)
        .with_blocks(150)
        .with_operators(OperatorMix {
            reliable: 3,
            lazy: 2,
            offline: 3,
        })
        .with_workload(WorkloadConfig {
            jobs_per_block: 2.0,
            ..WorkloadConfig::default()
        });
    let mut simulator = Simulator::new(config).unwrap();
    let report = simulator.run();

    assert!(report.slashes > 0);
    assert!(report.total_slashed > Amount::ZERO);
    assert!(report.resolved_by_fallback + report.resolved_open > 0);
    assert!(report.operators_slashed_out > 0);
    assert_eq!(report.jobs_outstanding, 0);
    assert_conserved(&simulator);
}

#[test]
fn test_gas_spikes_are_refused_then_retried() {
    let config = small(4)
        .with_operators(OperatorMix {
            reliable: 2,
            lazy: 4,
            offline: 0,
        })
        .with_workload(WorkloadConfig {
            spike_ratio: 1.0,
            ..WorkloadConfig::default()
        });
    let report = Simulator::new(config).unwrap().run();

    assert!(report.rejected.get("gas spike detected").copied().unwrap_or(0) > 0);
    assert_eq!(report.jobs_outstanding, 0);
}

#[test]
fn test_empty_operator_set_opens_jobs() {
    let config = small(8).with_operators(OperatorMix {
        reliable: 0,
        lazy: 0,
        offline: 0,
    });
    let report = Simulator::new(config).unwrap().run();

    assert!(report.jobs_created > 0);
    assert_eq!(report.resolved_open, report.jobs_resolved);
    assert_eq!(report.jobs_outstanding, 0);
}

#[test]
fn test_bls_beacon_run() {
    let config = small(9)
        .with_blocks(20)
        .with_beacon(BeaconKind::Bls)
        .with_scheduler(SchedulerParams {
            max_fallback_operators: 2,
            ..SchedulerParams::default()
        });
    let mut simulator = Simulator::new(config).unwrap();
    assert_eq!(simulator.scheduler().beacon().name(), "bls");
    let report = simulator.run();
    assert_eq!(report.jobs_outstanding, 0);
}

#[test]
fn test_bundled_scenarios_parse() {
    for text in [
        include_str!("../scenarios/default.toml"),
        include_str!("../scenarios/unreliable.toml"),
    ] {
        let config = SimulatorConfig::from_toml_str(text).unwrap();
        assert!(config.blocks > 0);
        assert!(config.operators.total() > 0);
    }
    let default = SimulatorConfig::from_toml_str(include_str!("../scenarios/default.toml")).unwrap();
    assert_eq!(default, SimulatorConfig::default());
}
