//! Sophia Config Core
//!
//! Environment detection, configuration and secret resolution, health
//! validation and automatic repair for Sophia AI services. Hosts (the CLI,
//! the Python bindings) talk to an [`Engine`] through two contracts:
//! `get(key)` for values and `report()` for the overall state.
//!
//! ## Pipeline
//!
//! ```text
//! EnvironmentDetector -> ConfigResolver -> HealthValidator
//!     -> AutoRepairEngine (when degraded) -> ReportBuilder -> PersistentWriter
//! ```
//!
//! ```rust,ignore
//! use sophia_config_core::{Engine, EngineSettings};
//!
//! let engine = Engine::new(EngineSettings::load()?);
//! let report = engine.startup().await;
//! if report.is_critical() {
//!     eprintln!("{}", report.errors.join("\n"));
//! }
//! let openai = engine.get("openai_api_key");
//! ```

pub mod types;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod process;
pub mod schema;
pub mod detect;
pub mod resolver;
pub mod health;
pub mod report;
pub mod persist;
pub mod engine;

// Re-export commonly used types
pub use types::{
    CancellationToken, ConfigSource, ConfigurationEntry, ConfigurationReport, Environment, HealthCheck,
    HealthCheckResult, HealthLevel, RepairAction, ResolvedEntries,
};

pub use secrets::{
    ChainSecretStore, EnvSecretStore, EscSecretStore, KeychainSecretStore, MemorySecretStore, SecretHit,
    SecretStore, SecretStoreError, SecretStoreResult,
};

pub use logging::{LogLevel, Logger, MemoryLogger, SharedLogger, TracingLogger};

pub use config::{ConfigError, ConfigResult, EngineSettings, PersistMode};

pub use process::{CommandRunner, InfraCli, ProcessRunner, ScriptedResponse, ScriptedRunner};

pub use schema::{ConfigurationSchemaEntry, SCHEMA};

pub use detect::{DetectedEnvironment, DetectionStrategy, EnvironmentDetector};

pub use resolver::ConfigResolver;

pub use health::{AutoRepairEngine, HealthValidator};

pub use report::ReportBuilder;

pub use persist::{PersistSummary, PersistentWriter};

pub use engine::{global, install_global, Engine, EngineBuilder, EngineError, EngineResult};
