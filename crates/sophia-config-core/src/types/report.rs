//! Aggregated configuration report

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entry::ConfigSource;
use super::environment::Environment;
use super::health::{HealthCheckResult, HealthLevel, RepairAction};

/// Snapshot of the configuration state handed to collaborators
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub total_schema_keys: usize,
    pub loaded_count: usize,
    pub missing_required: Vec<String>,
    pub health_level: HealthLevel,
    pub sources_used: BTreeSet<ConfigSource>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthCheckResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repairs: Vec<RepairAction>,
    pub generated_at: DateTime<Utc>,
}

impl ConfigurationReport {
    pub fn is_critical(&self) -> bool {
        self.health_level == HealthLevel::Critical
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
