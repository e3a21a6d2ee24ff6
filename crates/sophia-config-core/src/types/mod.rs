//! Core types shared by the detector, resolver, validator and report builder

mod environment;
mod entry;
mod health;
mod report;
mod cancellation;

pub use environment::{Environment, SignalMatch};
pub use entry::{ConfigSource, ConfigurationEntry, ResolvedEntries};
pub use health::{HealthCheck, HealthCheckResult, HealthLevel, RepairAction};
pub use report::ConfigurationReport;
pub use cancellation::CancellationToken;
