//! Built-in detection strategies, in the order the detector runs them

use std::sync::Arc;

use async_trait::async_trait;

use super::DetectionStrategy;
use crate::config::{read_dotenv_var, EngineSettings};
use crate::logging::SharedLogger;
use crate::process::InfraCli;
use crate::secrets::EnvSecretStore;
use crate::types::{Environment, SignalMatch};
use crate::{log_debug, log_warn};

fn accept(logger: &SharedLogger, origin: &str, value: &str, matched: SignalMatch) -> Environment {
    if !matched.recognized {
        log_warn!(
            logger,
            "unrecognized environment '{}' from {}, assuming {}",
            value,
            origin,
            matched.environment
        );
    }
    matched.environment
}

/// Explicit environment variables (`ENVIRONMENT`, then `SOPHIA_ENVIRONMENT`)
pub struct ExplicitSignal {
    env: Arc<EnvSecretStore>,
    variables: Vec<String>,
    logger: SharedLogger,
}

impl ExplicitSignal {
    pub fn new(env: Arc<EnvSecretStore>, variables: Vec<String>, logger: SharedLogger) -> Self {
        Self { env, variables, logger }
    }
}

#[async_trait]
impl DetectionStrategy for ExplicitSignal {
    fn name(&self) -> &str {
        "explicit_signal"
    }

    async fn try_detect(&self) -> Option<Environment> {
        let (variable, value) = self.env.first_of(&self.variables)?;
        let matched = Environment::from_signal(&value)?;
        Some(accept(&self.logger, &format!("${}", variable), &value, matched))
    }
}

/// Branch-name heuristic over the VCS checkout at the project root
pub struct BranchName {
    cli: InfraCli,
    logger: SharedLogger,
}

impl BranchName {
    pub fn new(cli: InfraCli, logger: SharedLogger) -> Self {
        Self { cli, logger }
    }
}

#[async_trait]
impl DetectionStrategy for BranchName {
    fn name(&self) -> &str {
        "branch_name"
    }

    async fn try_detect(&self) -> Option<Environment> {
        let branch = match self.cli.current_branch().await {
            Ok(branch) => branch,
            Err(e) => {
                log_warn!(self.logger, "branch lookup failed: {}", e);
                return None;
            }
        };
        let matched = Environment::from_branch(&branch)?;
        Some(accept(&self.logger, &format!("branch {}", branch), &branch, matched))
    }
}

/// Stack currently selected in the infrastructure tool
pub struct StackContext {
    cli: InfraCli,
    logger: SharedLogger,
}

impl StackContext {
    pub fn new(cli: InfraCli, logger: SharedLogger) -> Self {
        Self { cli, logger }
    }
}

#[async_trait]
impl DetectionStrategy for StackContext {
    fn name(&self) -> &str {
        "stack_context"
    }

    async fn try_detect(&self) -> Option<Environment> {
        match self.cli.selected_stack().await {
            Ok(stack) => {
                let environment = Environment::from_stack_name(&stack);
                if environment.is_none() {
                    log_debug!(self.logger, "stack '{}' names no known environment", stack);
                }
                environment
            }
            Err(e) => {
                log_warn!(self.logger, "stack lookup failed: {}", e);
                None
            }
        }
    }
}

/// Dotenv-style files under the project root assigning an explicit signal variable
///
/// Only the environment name is taken from these files; they are never a
/// value source for the resolver.
pub struct LocalFile {
    settings: Arc<EngineSettings>,
    logger: SharedLogger,
}

impl LocalFile {
    pub fn new(settings: Arc<EngineSettings>, logger: SharedLogger) -> Self {
        Self { settings, logger }
    }
}

#[async_trait]
impl DetectionStrategy for LocalFile {
    fn name(&self) -> &str {
        "local_file"
    }

    async fn try_detect(&self) -> Option<Environment> {
        self.settings.detection_files.iter().find_map(|file| {
            let path = self.settings.project_root.join(file);
            let (variable, value) = read_dotenv_var(&path, &self.settings.environment_vars)?;
            let matched = Environment::from_signal(&value)?;
            let origin = format!("{} in {}", variable, path.display());
            Some(accept(&self.logger, &origin, &value, matched))
        })
    }
}

/// Terminal strategy: always production
#[derive(Debug, Default)]
pub struct Fallback;

#[async_trait]
impl DetectionStrategy for Fallback {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn try_detect(&self) -> Option<Environment> {
        Some(Environment::Production)
    }
}
