//! Best-effort remediation of a degraded health result
//!
//! Every action is idempotent and reports its own outcome; nothing here
//! returns an error.

use std::sync::Arc;

use crate::config::EngineSettings;
use crate::detect::DetectedEnvironment;
use crate::logging::SharedLogger;
use crate::process::{CreateOutcome, InfraCli};
use crate::secrets::EnvSecretStore;
use crate::types::{HealthCheckResult, RepairAction};
use crate::{log_info, log_warn};

pub const SET_ORGANIZATION_VARIABLE: &str = "set_organization_variable";
pub const LOGIN: &str = "login";
pub const CREATE_CONTEXT: &str = "create_context";

pub struct AutoRepairEngine {
    cli: InfraCli,
    settings: Arc<EngineSettings>,
    env: Arc<EnvSecretStore>,
    logger: SharedLogger,
}

impl AutoRepairEngine {
    pub fn new(
        cli: InfraCli,
        settings: Arc<EngineSettings>,
        env: Arc<EnvSecretStore>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            cli,
            settings,
            env,
            logger,
        }
    }

    /// Run the actions relevant to `health`; empty when it is healthy
    pub async fn repair(&self, detected: &DetectedEnvironment, health: &HealthCheckResult) -> Vec<RepairAction> {
        if health.is_healthy() {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if let Some(action) = self.set_organization_variable(detected) {
            actions.push(action);
        }
        if health.failed(HealthCheckResult::AUTH) {
            actions.push(self.login().await);
        }
        if health.failed(HealthCheckResult::CONTEXT_ACCESSIBLE) {
            actions.push(self.create_context(detected).await);
        }

        for action in &actions {
            if action.is_failure() {
                log_warn!(self.logger, "repair {} failed: {}", action.name, action.detail);
            } else {
                log_info!(self.logger, "repair {}: {}", action.name, action.detail);
            }
        }
        actions
    }

    fn set_organization_variable(&self, detected: &DetectedEnvironment) -> Option<RepairAction> {
        let variable = &self.settings.organization_var;
        if self.env.var(variable).is_some() {
            return None;
        }
        self.env.set_var(variable, &detected.organization);
        Some(RepairAction::succeeded(
            SET_ORGANIZATION_VARIABLE,
            format!("{}={}", variable, detected.organization),
        ))
    }

    async fn login(&self) -> RepairAction {
        let token_var = &self.settings.access_token_var;
        let Some(token) = self.env.var(token_var) else {
            return RepairAction::skipped(LOGIN, format!("{} is not set", token_var));
        };
        match self.cli.login(&token).await {
            Ok(()) => RepairAction::succeeded(LOGIN, "logged in non-interactively"),
            Err(e) => RepairAction::failed(LOGIN, e.to_string()),
        }
    }

    async fn create_context(&self, detected: &DetectedEnvironment) -> RepairAction {
        let context = detected.context_path();
        match self.cli.create_context(&context).await {
            Ok(CreateOutcome::Created) => RepairAction::succeeded(CREATE_CONTEXT, format!("created {}", context)),
            Ok(CreateOutcome::AlreadyExists) => {
                RepairAction::succeeded(CREATE_CONTEXT, format!("{} already exists", context))
            }
            Err(e) => RepairAction::failed(CREATE_CONTEXT, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::logging::MemoryLogger;
    use crate::process::{ScriptedResponse, ScriptedRunner};
    use crate::types::{Environment, HealthCheck};

    fn detected() -> DetectedEnvironment {
        DetectedEnvironment {
            environment: Environment::Staging,
            stack: "sophia-staging".to_string(),
            organization: "sophia-ai".to_string(),
            strategy: "fallback".to_string(),
        }
    }

    fn degraded() -> HealthCheckResult {
        HealthCheckResult::new()
            .with_check(HealthCheckResult::AUTH, HealthCheck::failed(1, "not logged in"))
            .with_check(HealthCheckResult::CONTEXT_ACCESSIBLE, HealthCheck::failed(1, "no such env"))
            .with_check(HealthCheckResult::SECRETS_LOADABLE, HealthCheck::failed(1, "no such env"))
    }

    fn engine(runner: Arc<ScriptedRunner>, env: Arc<EnvSecretStore>) -> AutoRepairEngine {
        let settings = Arc::new(EngineSettings::default());
        let cli = InfraCli::new(runner, settings.clone()).with_env(env.clone());
        AutoRepairEngine::new(cli, settings, env, Arc::new(MemoryLogger::new()))
    }

    #[tokio::test]
    async fn test_healthy_needs_nothing() {
        let runner = Arc::new(ScriptedRunner::new());
        let env = Arc::new(EnvSecretStore::isolated(Vec::<(String, String)>::new()));
        let healthy = HealthCheckResult::new().with_check(HealthCheckResult::AUTH, HealthCheck::passed(1));

        let actions = engine(runner.clone(), env).repair(&detected(), &healthy).await;
        assert!(actions.is_empty());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_all_actions_in_order() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .on("pulumi", &["login"], ScriptedResponse::ok("Logged in"))
                .on("esc", &["env", "init"], ScriptedResponse::ok("Environment created")),
        );
        let env = Arc::new(EnvSecretStore::isolated([("PULUMI_ACCESS_TOKEN", "pul-1")]));

        let actions = engine(runner.clone(), env.clone()).repair(&detected(), &degraded()).await;
        let names: Vec<_> = actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec![SET_ORGANIZATION_VARIABLE, LOGIN, CREATE_CONTEXT]);
        assert!(actions.iter().all(|a| a.succeeded));
        assert_eq!(env.var("PULUMI_ORG"), Some("sophia-ai".to_string()));

        // the variable reaches later children without touching the process env
        let org = ("PULUMI_ORG".to_string(), "sophia-ai".to_string());
        assert!(runner.calls().iter().all(|c| c.envs.contains(&org)));
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_login_without_token_not_attempted() {
        let runner = Arc::new(ScriptedRunner::new());
        let env = Arc::new(EnvSecretStore::isolated([("PULUMI_ORG", "acme")]));
        let health = HealthCheckResult::new().with_check(HealthCheckResult::AUTH, HealthCheck::failed(1, "x"));

        let actions = engine(runner.clone(), env).repair(&detected(), &health).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name, LOGIN);
        assert!(!actions[0].attempted);
        assert!(!actions[0].is_failure());
        assert_eq!(runner.call_count("pulumi", &["login"]), 0);
    }

    #[tokio::test]
    async fn test_repair_twice_is_idempotent() {
        let runner = Arc::new(ScriptedRunner::new().on_sequence(
            "esc",
            &["env", "init"],
            vec![
                ScriptedResponse::ok("Environment created"),
                ScriptedResponse::fail(1, "error: environment sophia-ai/sophia-staging already exists"),
            ],
        ));
        let env = Arc::new(EnvSecretStore::isolated(Vec::<(String, String)>::new()));
        let engine = engine(runner, env);
        let health = HealthCheckResult::new()
            .with_check(HealthCheckResult::CONTEXT_ACCESSIBLE, HealthCheck::failed(1, "x"));

        let first = engine.repair(&detected(), &health).await;
        let second = engine.repair(&detected(), &health).await;

        let failures = |actions: &[RepairAction]| actions.iter().filter(|a| a.is_failure()).count();
        assert_eq!(failures(&first), 0);
        assert!(failures(&second) <= failures(&first));
        // organization variable was set by the first run
        assert_eq!(second.len(), 1);
        assert!(second[0].detail.contains("already exists"));
    }

    #[tokio::test]
    async fn test_failed_create_is_reported() {
        let runner = Arc::new(ScriptedRunner::new().on(
            "esc",
            &["env", "init"],
            ScriptedResponse::fail(1, "error: unauthorized"),
        ));
        let env = Arc::new(EnvSecretStore::isolated([("PULUMI_ORG", "acme")]));
        let health = HealthCheckResult::new()
            .with_check(HealthCheckResult::CONTEXT_ACCESSIBLE, HealthCheck::failed(1, "x"));

        let actions = engine(runner, env).repair(&detected(), &health).await;
        assert!(actions[0].is_failure());
        assert!(actions[0].detail.contains("unauthorized"));
    }
}
