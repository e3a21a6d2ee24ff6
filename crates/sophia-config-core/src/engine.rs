//! The engine: owner of detection, resolution, health and repair state
//!
//! ```rust,ignore
//! use sophia_config_core::{Engine, EngineSettings};
//!
//! let engine = Engine::builder().settings(EngineSettings::load()?).build();
//! let report = engine.startup().await;
//! let key = engine.require("openai_api_key")?;
//! ```

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use thiserror::Error;

use crate::config::{EngineSettings, PersistMode};
use crate::detect::{DetectedEnvironment, EnvironmentDetector};
use crate::health::{AutoRepairEngine, HealthValidator};
use crate::logging::{SharedLogger, TracingLogger};
use crate::persist::{PersistSummary, PersistentWriter};
use crate::process::{CommandRunner, InfraCli, ProcessRunner};
use crate::report::ReportBuilder;
use crate::resolver::ConfigResolver;
use crate::schema::SCHEMA;
use crate::secrets::{ChainSecretStore, EnvSecretStore, EscSecretStore, KeychainSecretStore, SecretStore};
use crate::types::{
    CancellationToken, ConfigurationEntry, ConfigurationReport, HealthCheckResult, RepairAction, ResolvedEntries,
};
use crate::{log_debug, log_error, log_info};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration has not been resolved yet")]
    NotResolved,

    #[error("missing required configuration key: {0}")]
    MissingRequiredKey(String),

    #[error("a global engine is already installed")]
    AlreadyInitialized,
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Default)]
struct EngineState {
    detected: Option<DetectedEnvironment>,
    entries: Option<ResolvedEntries>,
    health: Option<HealthCheckResult>,
    repairs: Vec<RepairAction>,
}

/// Builder for [`Engine`]; every part has a production default
#[derive(Default)]
pub struct EngineBuilder {
    settings: Option<EngineSettings>,
    runner: Option<Arc<dyn CommandRunner>>,
    env: Option<EnvSecretStore>,
    logger: Option<SharedLogger>,
    secret_stores: Option<Vec<Arc<dyn SecretStore>>>,
    cancel: CancellationToken,
}

impl EngineBuilder {
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Replace the process runner (defaults to [`ProcessRunner`])
    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Replace the environment variable store (defaults to the process environment)
    pub fn env(mut self, env: EnvSecretStore) -> Self {
        self.env = Some(env);
        self
    }

    pub fn logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Use these stores for the secret-store tier instead of the remote
    /// context snapshot and keychain
    pub fn secret_stores(mut self, stores: Vec<Arc<dyn SecretStore>>) -> Self {
        self.secret_stores = Some(stores);
        self
    }

    /// Token aborting in-flight calls of the default process runner
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn build(self) -> Engine {
        let settings = Arc::new(self.settings.unwrap_or_default());
        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger::default()));
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(ProcessRunner::with_cancellation(self.cancel.clone())));
        let env = Arc::new(self.env.unwrap_or_default());
        let cli = InfraCli::new(runner, settings.clone()).with_env(env.clone());

        Engine {
            detector: EnvironmentDetector::standard(cli.clone(), settings.clone(), env.clone(), logger.clone()),
            validator: HealthValidator::new(cli.clone(), logger.clone()),
            repairer: AutoRepairEngine::new(cli.clone(), settings.clone(), env.clone(), logger.clone()),
            secret_stores: self.secret_stores,
            cancel: self.cancel,
            state: RwLock::new(EngineState::default()),
            settings,
            cli,
            env,
            logger,
        }
    }
}

/// Configuration engine
///
/// Async operations talk to external tools; `get`, `require`, `report` and
/// `persist` only read the state left by the last async call.
pub struct Engine {
    settings: Arc<EngineSettings>,
    cli: InfraCli,
    env: Arc<EnvSecretStore>,
    logger: SharedLogger,
    detector: EnvironmentDetector,
    validator: HealthValidator,
    repairer: AutoRepairEngine,
    secret_stores: Option<Vec<Arc<dyn SecretStore>>>,
    cancel: CancellationToken,
    state: RwLock<EngineState>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Engine with default collaborators and the given settings
    pub fn new(settings: EngineSettings) -> Self {
        Self::builder().settings(settings).build()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn env(&self) -> &EnvSecretStore {
        &self.env
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run detection and remember the result
    pub async fn detect(&self) -> DetectedEnvironment {
        let detected = self.detector.detect().await;
        self.state.write().detected = Some(detected.clone());
        detected
    }

    /// The remembered detection result, if any
    pub fn detected(&self) -> Option<DetectedEnvironment> {
        self.state.read().detected.clone()
    }

    async fn ensure_detected(&self) -> DetectedEnvironment {
        match self.detected() {
            Some(detected) => detected,
            None => self.detect().await,
        }
    }

    async fn secret_store_chain(&self, detected: &DetectedEnvironment) -> Arc<ChainSecretStore> {
        if let Some(stores) = &self.secret_stores {
            return Arc::new(ChainSecretStore::new(stores.clone()));
        }

        let esc = EscSecretStore::load(&self.cli, &detected.context_path(), &self.logger).await;
        let mut stores: Vec<Arc<dyn SecretStore>> = vec![Arc::new(esc)];
        if let Some(service) = &self.settings.keychain_service {
            let keychain = KeychainSecretStore::with_service(service.clone());
            if keychain.is_available() {
                stores.push(Arc::new(keychain));
            } else {
                log_debug!(self.logger, "keychain service {} unavailable", service);
            }
        }
        Arc::new(ChainSecretStore::new(stores))
    }

    /// Resolve every schema key, replacing the previous entries
    pub async fn resolve(&self) -> ResolvedEntries {
        let detected = self.ensure_detected().await;
        let chain = self.secret_store_chain(&detected).await;
        let resolver = ConfigResolver::new(chain, self.env.clone(), self.settings.project_root.clone(), self.logger.clone());

        let entries = resolver.resolve(&detected, SCHEMA);
        self.state.write().entries = Some(entries.clone());
        entries
    }

    /// Run the health checks, replacing the previous result
    pub async fn validate(&self) -> HealthCheckResult {
        let detected = self.ensure_detected().await;
        let health = self.validator.validate(&detected).await;
        self.state.write().health = Some(health.clone());
        health
    }

    /// Repair against the last health result (validating first if there is none)
    pub async fn repair(&self) -> Vec<RepairAction> {
        let detected = self.ensure_detected().await;
        let health = match self.last_health() {
            Some(health) => health,
            None => self.validate().await,
        };
        let repairs = self.repairer.repair(&detected, &health).await;
        self.state.write().repairs = repairs.clone();
        repairs
    }

    /// Full startup: detect, resolve, validate, repair if degraded, report
    ///
    /// After a repair that changed anything, health and values are refreshed.
    pub async fn startup(&self) -> ConfigurationReport {
        let detected = self.detect().await;
        log_info!(
            self.logger,
            "starting in {} ({})",
            detected.environment,
            detected.context_path()
        );

        self.resolve().await;
        let health = self.validate().await;
        if !health.is_healthy() {
            let repairs = self.repair().await;
            if repairs.iter().any(|a| a.succeeded) {
                self.validate().await;
                self.resolve().await;
            }
        }

        let report = self.report();
        if report.is_critical() {
            log_error!(self.logger, "configuration is critical: {}", report.errors.join("; "));
        }
        report
    }

    /// Resolved value of `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.entry(key).map(|e| e.value)
    }

    /// Resolved entry of `key`, including provenance
    pub fn entry(&self, key: &str) -> Option<ConfigurationEntry> {
        self.state
            .read()
            .entries
            .as_ref()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Resolved value of `key`, or an error naming it
    pub fn require(&self, key: &str) -> EngineResult<String> {
        let state = self.state.read();
        let entries = state.entries.as_ref().ok_or(EngineError::NotResolved)?;
        entries
            .get(key)
            .map(|e| e.value.clone())
            .ok_or_else(|| EngineError::MissingRequiredKey(key.to_string()))
    }

    /// Entries from the last resolution (empty before the first)
    pub fn entries(&self) -> ResolvedEntries {
        self.state.read().entries.clone().unwrap_or_default()
    }

    pub fn is_resolved(&self) -> bool {
        self.state.read().entries.is_some()
    }

    pub fn last_health(&self) -> Option<HealthCheckResult> {
        self.state.read().health.clone()
    }

    pub fn last_repairs(&self) -> Vec<RepairAction> {
        self.state.read().repairs.clone()
    }

    /// Report over the current state
    pub fn report(&self) -> ConfigurationReport {
        let state = self.state.read();
        let empty = ResolvedEntries::new();
        ReportBuilder::new(SCHEMA, &self.settings)
            .detected(state.detected.as_ref())
            .health(state.health.as_ref())
            .repairs(&state.repairs)
            .build(state.entries.as_ref().unwrap_or(&empty))
    }

    /// Write identity variables to shell profiles using the configured mode
    pub fn persist(&self) -> PersistSummary {
        self.persist_with_mode(self.settings.persist_mode)
    }

    /// Nothing is written before the environment has been detected
    pub fn persist_with_mode(&self, mode: PersistMode) -> PersistSummary {
        let Some(detected) = self.detected() else {
            log_debug!(self.logger, "persist skipped, environment not detected yet");
            return PersistSummary::default();
        };
        let writer = PersistentWriter::new(self.settings.shell_profile_paths(), mode, self.logger.clone());
        writer.persist(&detected)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("detector", &self.detector)
            .field("detected", &self.detected())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

static GLOBAL_ENGINE: OnceCell<Arc<Engine>> = OnceCell::new();

/// Install the process-wide engine; only the first call succeeds
pub fn install_global(engine: Engine) -> EngineResult<Arc<Engine>> {
    let engine = Arc::new(engine);
    GLOBAL_ENGINE
        .set(engine.clone())
        .map_err(|_| EngineError::AlreadyInitialized)?;
    Ok(engine)
}

/// The process-wide engine, if one was installed
pub fn global() -> Option<Arc<Engine>> {
    GLOBAL_ENGINE.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogger;
    use crate::process::{ScriptedResponse, ScriptedRunner};
    use crate::secrets::MemorySecretStore;
    use crate::types::{ConfigSource, Environment, HealthLevel};

    fn engine(runner: ScriptedRunner, env: EnvSecretStore) -> Engine {
        let root = std::env::temp_dir().join("sophia-engine-unit-no-root");
        Engine::builder()
            .settings(EngineSettings::default().with_project_root(root))
            .runner(Arc::new(runner))
            .env(env)
            .logger(Arc::new(MemoryLogger::new()))
            .build()
    }

    #[tokio::test]
    async fn test_require_before_resolve() {
        let engine = engine(ScriptedRunner::new(), EnvSecretStore::isolated(Vec::<(String, String)>::new()));
        assert!(matches!(engine.require("environment"), Err(EngineError::NotResolved)));
        assert_eq!(engine.get("environment"), None);
    }

    #[tokio::test]
    async fn test_resolve_then_get() {
        let engine = engine(
            ScriptedRunner::new(),
            EnvSecretStore::isolated([("ENVIRONMENT", "dev"), ("OPENAI_API_KEY", "sk-env")]),
        );
        engine.resolve().await;

        assert_eq!(engine.detected().map(|d| d.environment), Some(Environment::Development));
        assert_eq!(engine.require("openai_api_key").unwrap(), "sk-env");
        assert!(matches!(
            engine.require("pinecone_api_key"),
            Err(EngineError::MissingRequiredKey(key)) if key == "pinecone_api_key"
        ));
        assert_eq!(engine.entry("openai_api_key").unwrap().source, ConfigSource::ProcessEnv);
    }

    #[tokio::test]
    async fn test_secret_store_override() {
        let engine = Engine::builder()
            .runner(Arc::new(ScriptedRunner::new()))
            .env(EnvSecretStore::isolated(Vec::<(String, String)>::new()))
            .logger(Arc::new(MemoryLogger::new()))
            .secret_stores(vec![Arc::new(MemorySecretStore::from_pairs([("openai_api_key", "sk-mem")]))])
            .build();
        engine.resolve().await;

        let entry = engine.entry("openai_api_key").unwrap();
        assert_eq!(entry.source, ConfigSource::SecretStore);
        assert_eq!(entry.value, "sk-mem");
    }

    #[tokio::test]
    async fn test_esc_snapshot_feeds_resolution() {
        let runner = ScriptedRunner::new().on(
            "esc",
            &["env", "open", "sophia-ai/sophia-staging", "--format", "json"],
            ScriptedResponse::ok(r#"{"OPENAI_API_KEY": "sk-esc"}"#),
        );
        let engine = engine(runner, EnvSecretStore::isolated([("ENVIRONMENT", "staging")]));
        engine.resolve().await;

        let entry = engine.entry("openai_api_key").unwrap();
        assert_eq!(entry.source, ConfigSource::SecretStore);
        assert_eq!(entry.source_detail, "secret store (esc)");
    }

    #[test]
    fn test_persist_before_detection_writes_nothing() {
        let engine = engine(ScriptedRunner::new(), EnvSecretStore::isolated([("ENVIRONMENT", "dev")]));
        assert_eq!(engine.persist(), PersistSummary::default());
    }

    #[tokio::test]
    async fn test_report_before_anything() {
        let engine = engine(ScriptedRunner::new(), EnvSecretStore::isolated(Vec::<(String, String)>::new()));
        let report = engine.report();
        assert_eq!(report.health_level, HealthLevel::Critical);
        assert_eq!(report.loaded_count, 0);
        assert!(report.environment.is_none());
    }

    #[test]
    fn test_global_installs_once() {
        let first = install_global(Engine::builder().logger(Arc::new(MemoryLogger::new())).build());
        let second = install_global(Engine::builder().logger(Arc::new(MemoryLogger::new())).build());

        // another test may have installed it first; either way only one wins
        assert!(first.is_ok() || matches!(first, Err(EngineError::AlreadyInitialized)));
        assert!(matches!(second, Err(EngineError::AlreadyInitialized)));
        assert!(global().is_some());
    }
}
