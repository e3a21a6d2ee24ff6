//! Health check results, health levels and repair actions

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall health level, declared most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Critical,
    Degraded,
    Healthy,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLevel::Critical => "critical",
            HealthLevel::Degraded => "degraded",
            HealthLevel::Healthy => "healthy",
        }
    }
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single named check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub ok: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthCheck {
    pub fn passed(latency_ms: u64) -> Self {
        Self {
            ok: true,
            latency_ms,
            detail: None,
        }
    }

    pub fn failed(latency_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            latency_ms,
            detail: Some(detail.into()),
        }
    }
}

/// Named check outcomes plus the time they were taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub checks: BTreeMap<String, HealthCheck>,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheckResult {
    pub const AUTH: &'static str = "auth";
    pub const CONTEXT_ACCESSIBLE: &'static str = "context_accessible";
    pub const SECRETS_LOADABLE: &'static str = "secrets_loadable";

    pub fn new() -> Self {
        Self {
            checks: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_check(mut self, name: impl Into<String>, check: HealthCheck) -> Self {
        self.checks.insert(name.into(), check);
        self
    }

    /// Whether the named check ran and passed
    pub fn passed(&self, name: &str) -> bool {
        self.checks.get(name).map(|c| c.ok).unwrap_or(false)
    }

    /// Whether the named check ran and failed
    pub fn failed(&self, name: &str) -> bool {
        self.checks.get(name).map(|c| !c.ok).unwrap_or(false)
    }

    /// Names of failing checks
    pub fn failures(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, c)| !c.ok)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_healthy(&self) -> bool {
        self.checks.values().all(|c| c.ok)
    }

    /// Connectivity classification: never `Critical`, that is the report's call
    pub fn level(&self) -> HealthLevel {
        if self.is_healthy() {
            HealthLevel::Healthy
        } else {
            HealthLevel::Degraded
        }
    }
}

impl Default for HealthCheckResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A remediation step taken (or skipped) by the repair engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairAction {
    pub name: String,
    pub attempted: bool,
    pub succeeded: bool,
    pub detail: String,
}

impl RepairAction {
    pub fn succeeded(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempted: true,
            succeeded: true,
            detail: detail.into(),
        }
    }

    pub fn failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempted: true,
            succeeded: false,
            detail: detail.into(),
        }
    }

    pub fn skipped(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempted: false,
            succeeded: false,
            detail: detail.into(),
        }
    }

    /// Attempted and did not succeed
    pub fn is_failure(&self) -> bool {
        self.attempted && !self.succeeded
    }
}
