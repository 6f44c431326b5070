//! Environment lifecycle, registry, and parallel stepping for Orrery.
//!
//! An [`Environment`] owns one simulation state, shares one model, and
//! drives its plugins and offscreen cameras through the fixed stage
//! order control, integrate, passive, render, last-stage. The
//! [`EnvironmentRegistry`] associates state handles with environment
//! status from any thread. A [`ParallelEnvironment`] moves an
//! environment onto its own stepping thread and provisions its
//! namespace through an external [`ProvisioningService`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod environment;
pub mod metrics;
pub mod parallel;
pub mod provisioning;
pub mod registry;
mod stepper;

pub use config::{ConfigError, ParallelConfig, SimSettings};
pub use environment::{EnvConfig, Environment};
pub use metrics::StepMetrics;
pub use parallel::{ControlError, ControlReply, ControlRequest, ParallelEnvironment};
pub use provisioning::{
    BootstrapRequest, ProvisionOutcome, ProvisioningService, ShutdownRequest, Unmanaged,
};
pub use registry::{EnvironmentInfo, EnvironmentRegistry};
