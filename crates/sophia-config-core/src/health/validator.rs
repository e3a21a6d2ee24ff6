//! Connectivity checks against the infrastructure and secrets tools

use std::time::Instant;

use crate::detect::DetectedEnvironment;
use crate::logging::SharedLogger;
use crate::process::{InfraCli, ToolResult};
use crate::types::{HealthCheck, HealthCheckResult};
use crate::{log_info, log_warn};

/// Runs the three independent checks concurrently
pub struct HealthValidator {
    cli: InfraCli,
    logger: SharedLogger,
}

impl HealthValidator {
    pub fn new(cli: InfraCli, logger: SharedLogger) -> Self {
        Self { cli, logger }
    }

    pub async fn validate(&self, detected: &DetectedEnvironment) -> HealthCheckResult {
        let context = detected.context_path();

        let (auth, accessible, loadable) = futures::join!(
            timed(self.cli.whoami()),
            timed(self.cli.open_context(&context)),
            timed(self.cli.load_context(&context)),
        );

        let result = HealthCheckResult::new()
            .with_check(HealthCheckResult::AUTH, self.check(HealthCheckResult::AUTH, auth))
            .with_check(
                HealthCheckResult::CONTEXT_ACCESSIBLE,
                self.check(HealthCheckResult::CONTEXT_ACCESSIBLE, accessible),
            )
            .with_check(
                HealthCheckResult::SECRETS_LOADABLE,
                self.check(HealthCheckResult::SECRETS_LOADABLE, loadable),
            );

        log_info!(self.logger, "health of {}: {}", context, result.level());
        result
    }

    fn check<T>(&self, name: &str, (outcome, latency_ms): (ToolResult<T>, u64)) -> HealthCheck {
        match outcome {
            Ok(_) => HealthCheck::passed(latency_ms),
            Err(e) => {
                log_warn!(self.logger, "health check {} failed: {}", name, e);
                HealthCheck::failed(latency_ms, e.to_string())
            }
        }
    }
}

async fn timed<F, T>(call: F) -> (T, u64)
where
    F: std::future::Future<Output = T>,
{
    let started = Instant::now();
    let outcome = call.await;
    (outcome, started.elapsed().as_millis() as u64)
}
