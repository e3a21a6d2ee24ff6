//! Ordered strategy runner

use std::sync::Arc;

use serde::Serialize;

use super::strategies::{BranchName, ExplicitSignal, Fallback, LocalFile, StackContext};
use super::DetectionStrategy;
use crate::config::EngineSettings;
use crate::logging::SharedLogger;
use crate::process::InfraCli;
use crate::secrets::EnvSecretStore;
use crate::types::Environment;
use crate::{log_info, log_warn};

/// The chosen environment with the fields derived from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedEnvironment {
    pub environment: Environment,
    /// Remote stack name from the settings' stack map
    pub stack: String,
    pub organization: String,
    /// Name of the strategy that decided
    pub strategy: String,
}

impl DetectedEnvironment {
    /// `{organization}/{stack}`
    pub fn context_path(&self) -> String {
        format!("{}/{}", self.organization, self.stack)
    }

    /// Value detection fixed for an identity key (`environment`, `pulumi_org`)
    ///
    /// Other keys return `None`.
    pub fn identity(&self, key: &str) -> Option<&str> {
        match key {
            "environment" => Some(self.environment.as_str()),
            "pulumi_org" => Some(&self.organization),
            _ => None,
        }
    }

    /// Whether `value` names the same identity detection chose for `key`
    pub fn agrees(&self, key: &str, value: &str) -> bool {
        match key {
            "environment" => Environment::from_signal(value)
                .is_some_and(|m| m.recognized && m.environment == self.environment),
            _ => self.identity(key).is_some_and(|id| id == value.trim()),
        }
    }
}

pub struct EnvironmentDetector {
    strategies: Vec<Box<dyn DetectionStrategy>>,
    settings: Arc<EngineSettings>,
    env: Arc<EnvSecretStore>,
    logger: SharedLogger,
}

impl EnvironmentDetector {
    pub fn new(
        strategies: Vec<Box<dyn DetectionStrategy>>,
        settings: Arc<EngineSettings>,
        env: Arc<EnvSecretStore>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            strategies,
            settings,
            env,
            logger,
        }
    }

    /// Explicit signal, branch name, stack context, local files, then production
    pub fn standard(
        cli: InfraCli,
        settings: Arc<EngineSettings>,
        env: Arc<EnvSecretStore>,
        logger: SharedLogger,
    ) -> Self {
        let strategies: Vec<Box<dyn DetectionStrategy>> = vec![
            Box::new(ExplicitSignal::new(
                env.clone(),
                settings.environment_vars.clone(),
                logger.clone(),
            )),
            Box::new(BranchName::new(cli.clone(), logger.clone())),
            Box::new(StackContext::new(cli, logger.clone())),
            Box::new(LocalFile::new(settings.clone(), logger.clone())),
            Box::new(Fallback),
        ];
        Self::new(strategies, settings, env, logger)
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Organization from its variable, or the configured default
    pub fn organization(&self) -> String {
        self.env
            .var(&self.settings.organization_var)
            .map(|org| org.trim().to_string())
            .unwrap_or_else(|| self.settings.organization_default.clone())
    }

    pub async fn detect(&self) -> DetectedEnvironment {
        for strategy in &self.strategies {
            if let Some(environment) = strategy.try_detect().await {
                log_info!(
                    self.logger,
                    "environment {} detected by {}",
                    environment,
                    strategy.name()
                );
                return self.finish(environment, strategy.name());
            }
        }
        log_warn!(
            self.logger,
            "no detection strategy answered, defaulting to {}",
            Environment::Production
        );
        self.finish(Environment::Production, "fallback")
    }

    fn finish(&self, environment: Environment, strategy: &str) -> DetectedEnvironment {
        DetectedEnvironment {
            environment,
            stack: self.settings.stacks.stack_for(environment).to_string(),
            organization: self.organization(),
            strategy: strategy.to_string(),
        }
    }
}

impl std::fmt::Debug for EnvironmentDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentDetector")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger};
    use crate::process::{ScriptedResponse, ScriptedRunner};

    fn detector(runner: ScriptedRunner, env: EnvSecretStore) -> (EnvironmentDetector, Arc<MemoryLogger>) {
        let memory = Arc::new(MemoryLogger::new());
        let dir = std::env::temp_dir().join("sophia-detector-no-such-root");
        let settings = Arc::new(EngineSettings::default().with_project_root(dir));
        let cli = InfraCli::new(Arc::new(runner), settings.clone());
        let detector = EnvironmentDetector::standard(cli, settings, Arc::new(env), memory.clone());
        (detector, memory)
    }

    #[tokio::test]
    async fn test_standard_order() {
        let (detector, _) = detector(ScriptedRunner::new(), EnvSecretStore::isolated(Vec::<(String, String)>::new()));
        assert_eq!(
            detector.strategy_names(),
            vec!["explicit_signal", "branch_name", "stack_context", "local_file", "fallback"]
        );
    }

    #[tokio::test]
    async fn test_explicit_signal_beats_branch() {
        let runner = ScriptedRunner::new().on("git", &["rev-parse"], ScriptedResponse::ok("main"));
        let (detector, _) = detector(runner, EnvSecretStore::isolated([("ENVIRONMENT", "staging")]));

        let detected = detector.detect().await;
        assert_eq!(detected.environment, Environment::Staging);
        assert_eq!(detected.stack, "sophia-staging");
        assert_eq!(detected.strategy, "explicit_signal");
    }

    #[tokio::test]
    async fn test_stack_used_when_branch_fails() {
        let runner = ScriptedRunner::new()
            .on("git", &[], ScriptedResponse::fail(128, "fatal: not a git repository"))
            .on("pulumi", &["stack"], ScriptedResponse::ok("sophia-dev"));
        let (detector, memory) = detector(runner, EnvSecretStore::isolated([("PULUMI_ORG", "acme")]));

        let detected = detector.detect().await;
        assert_eq!(detected.environment, Environment::Development);
        assert_eq!(detected.organization, "acme");
        assert_eq!(detected.context_path(), "acme/sophia-dev");
        assert!(memory.contains(LogLevel::Warn, "branch lookup failed"));
    }

    #[tokio::test]
    async fn test_no_signals_is_production() {
        let (detector, _) = detector(ScriptedRunner::new(), EnvSecretStore::isolated(Vec::<(String, String)>::new()));
        for _ in 0..3 {
            let detected = detector.detect().await;
            assert_eq!(detected.environment, Environment::Production);
            assert_eq!(detected.strategy, "fallback");
            assert_eq!(detected.organization, "sophia-ai");
        }
    }

    #[test]
    fn test_identity_values() {
        let detected = DetectedEnvironment {
            environment: Environment::Staging,
            stack: "sophia-staging".to_string(),
            organization: "acme".to_string(),
            strategy: "explicit_signal".to_string(),
        };
        assert_eq!(detected.identity("environment"), Some("staging"));
        assert_eq!(detected.identity("pulumi_org"), Some("acme"));
        assert_eq!(detected.identity("log_level"), None);

        assert!(detected.agrees("environment", "STG"));
        assert!(!detected.agrees("environment", "dev"));
        assert!(!detected.agrees("environment", "qa"));
        assert!(detected.agrees("pulumi_org", " acme "));
        assert!(!detected.agrees("pulumi_org", "other"));
        assert!(!detected.agrees("log_level", "INFO"));
    }

    #[tokio::test]
    async fn test_empty_strategy_list_is_production() {
        let memory = Arc::new(MemoryLogger::new());
        let detector = EnvironmentDetector::new(
            Vec::new(),
            Arc::new(EngineSettings::default()),
            Arc::new(EnvSecretStore::isolated(Vec::<(String, String)>::new())),
            memory.clone(),
        );
        let detected = detector.detect().await;
        assert_eq!(detected.environment, Environment::Production);
        assert_eq!(detected.stack, "sophia-prod");
        assert!(memory.contains(LogLevel::Warn, "no detection strategy answered"));
    }
}
