//! podrelay simulator
//!
//! A deterministic discrete-event simulation of a bonded operator set
//! serving relay jobs, built directly on the scheduler state machine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Simulator                         │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Event Queue (BTreeMap<EventKey, SimEvent>)       │ │
//! │  │   Ordered by: time, sequence                       │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │            Block ─────────┼──────── Attempt             │
//! │              │                         │                │
//! │              ▼                         ▼                │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   OperatorScheduler (deliver / check / execute)    │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Notifications → metrics, new attempts            │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Given the same scenario and seed, a run produces an identical report.
//!
//! # Example
//!
//! ```ignore
//! use podrelay_simulator::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::default().with_seed(7).with_blocks(100);
//! let mut simulator = Simulator::new(config)?;
//! let report = simulator.run();
//! report.print();
//! ```

pub mod config;
pub mod event_queue;
pub mod metrics;
pub mod operators;
pub mod runner;
pub mod workload;

pub use config::{BeaconKind, OperatorMix, SchedulerParams, SimulatorConfig, WorkloadConfig};
pub use event_queue::{EventKey, EventQueue, SimEvent};
pub use metrics::{LatencyReport, MetricsCollector, SimulationReport};
pub use operators::{OperatorProfile, OperatorSet, SimOperator};
pub use runner::Simulator;
pub use workload::{GeneratedJob, JobWorkload};

use podrelay_core::RelayError;
use podrelay_types::CryptoError;
use thiserror::Error;

/// Errors setting up or configuring a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render scenario: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("genesis rejected: {0}")]
    Relay(#[from] RelayError),

    #[error("beacon key: {0}")]
    Crypto(#[from] CryptoError),

    #[error("metrics: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}
