//! Report assembly from resolved entries, health and repair outcomes

use std::collections::BTreeSet;

use chrono::Utc;

use crate::config::EngineSettings;
use crate::detect::DetectedEnvironment;
use crate::schema::{ConfigurationSchemaEntry, AI_PROVIDER_KEYS};
use crate::types::{
    ConfigSource, ConfigurationReport, HealthCheckResult, HealthLevel, RepairAction, ResolvedEntries,
};

/// Fewer resolved keys than this and the configuration is degraded
pub const HEALTHY_FLOOR: usize = 5;

/// Builds a [`ConfigurationReport`]
///
/// ```
/// use sophia_config_core::config::EngineSettings;
/// use sophia_config_core::report::ReportBuilder;
/// use sophia_config_core::schema::SCHEMA;
/// use sophia_config_core::types::{HealthLevel, ResolvedEntries};
///
/// let settings = EngineSettings::default();
/// let report = ReportBuilder::new(SCHEMA, &settings).build(&ResolvedEntries::new());
/// assert_eq!(report.health_level, HealthLevel::Critical);
/// ```
pub struct ReportBuilder<'a> {
    schema: &'a [ConfigurationSchemaEntry],
    settings: &'a EngineSettings,
    detected: Option<&'a DetectedEnvironment>,
    health: Option<&'a HealthCheckResult>,
    repairs: &'a [RepairAction],
}

impl<'a> ReportBuilder<'a> {
    pub fn new(schema: &'a [ConfigurationSchemaEntry], settings: &'a EngineSettings) -> Self {
        Self {
            schema,
            settings,
            detected: None,
            health: None,
            repairs: &[],
        }
    }

    pub fn detected(mut self, detected: Option<&'a DetectedEnvironment>) -> Self {
        self.detected = detected;
        self
    }

    pub fn health(mut self, health: Option<&'a HealthCheckResult>) -> Self {
        self.health = health;
        self
    }

    pub fn repairs(mut self, repairs: &'a [RepairAction]) -> Self {
        self.repairs = repairs;
        self
    }

    pub fn build(&self, entries: &ResolvedEntries) -> ConfigurationReport {
        let missing_required: Vec<String> = self
            .schema
            .iter()
            .filter(|item| item.required)
            .filter(|item| {
                entries
                    .get(item.key)
                    .map_or(true, |entry| entry.value.trim().is_empty())
            })
            .map(|item| item.key.to_string())
            .collect();

        let loaded_count = entries.len();
        let health_level = if !missing_required.is_empty() {
            HealthLevel::Critical
        } else if loaded_count < HEALTHY_FLOOR {
            HealthLevel::Degraded
        } else {
            HealthLevel::Healthy
        };

        let sources_used: BTreeSet<ConfigSource> = entries.values().map(|e| e.source).collect();
        let secret_store_empty = !sources_used.contains(&ConfigSource::SecretStore);

        let mut warnings = Vec::new();
        let mut recommendations = Vec::new();

        if secret_store_empty {
            warnings.push("primary source unavailable: no values came from the secret store".to_string());
            recommendations.push(match self.detected {
                Some(detected) => format!("populate the secret store context {}", detected.context_path()),
                None => "populate the secret store context for this environment".to_string(),
            });
        }
        if !AI_PROVIDER_KEYS.iter().any(|key| entries.contains_key(*key)) {
            warnings.push(format!("no AI provider key resolved ({})", AI_PROVIDER_KEYS.join(", ")));
        }

        let errors = missing_required
            .iter()
            .map(|key| format!("missing required key: {}", key))
            .collect();
        for key in &missing_required {
            recommendations.push(self.missing_key_hint(key));
        }

        if let Some(health) = self.health {
            for (name, check) in health.checks.iter().filter(|(_, c)| !c.ok) {
                warnings.push(match &check.detail {
                    Some(detail) => format!("health check {} failed: {}", name, detail),
                    None => format!("health check {} failed", name),
                });
                if let Some(hint) = self.check_hint(name) {
                    recommendations.push(hint);
                }
            }
        }

        for action in self.repairs.iter().filter(|a| a.is_failure()) {
            warnings.push(format!("repair {} failed: {}", action.name, action.detail));
        }

        ConfigurationReport {
            environment: self.detected.map(|d| d.environment),
            stack: self.detected.map(|d| d.stack.clone()),
            organization: self.detected.map(|d| d.organization.clone()),
            total_schema_keys: self.schema.len(),
            loaded_count,
            missing_required,
            health_level,
            sources_used,
            warnings,
            errors,
            recommendations,
            health: self.health.cloned(),
            repairs: self.repairs.to_vec(),
            generated_at: Utc::now(),
        }
    }

    fn missing_key_hint(&self, key: &str) -> String {
        let alias = self
            .schema
            .iter()
            .find(|item| item.key == key)
            .and_then(|item| item.aliases.first());
        match alias {
            Some(alias) => format!("set {} or add {} to the secret store", alias, key),
            None => format!("add {} to the secret store", key),
        }
    }

    fn check_hint(&self, check: &str) -> Option<String> {
        let context = self.detected.map(|d| d.context_path())?;
        let tools = &self.settings.tools;
        match check {
            HealthCheckResult::AUTH => Some(format!(
                "run `{} login` or set {}",
                tools.infra, self.settings.access_token_var
            )),
            HealthCheckResult::CONTEXT_ACCESSIBLE => {
                Some(format!("create the context with `{} env init {}`", tools.secrets, context))
            }
            HealthCheckResult::SECRETS_LOADABLE => Some(format!("add values to {}", context)),
            _ => None,
        }
    }
}
