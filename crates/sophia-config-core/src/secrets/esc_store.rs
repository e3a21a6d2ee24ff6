//! Remote context secret store
//!
//! Opens the environment's remote context once and serves lookups from
//! that snapshot. The store is read-only.

use std::collections::BTreeMap;

use super::traits::{SecretStore, SecretStoreResult};
use crate::{log_debug, log_warn};
use crate::logging::SharedLogger;
use crate::process::InfraCli;

/// Snapshot of a remote secrets context
///
/// Keys are matched as given, then upper-cased, then lower-cased, so both
/// `openai_api_key` and `OPENAI_API_KEY` style payloads resolve.
#[derive(Debug, Clone)]
pub struct EscSecretStore {
    values: BTreeMap<String, String>,
    error: Option<String>,
}

impl EscSecretStore {
    /// Load `context` through the secrets tool
    ///
    /// A failed or empty load yields an unavailable store rather than an error.
    pub async fn load(cli: &InfraCli, context: &str, logger: &SharedLogger) -> Self {
        match cli.load_context(context).await {
            Ok(values) => {
                log_debug!(logger, "loaded {} value(s) from {}", values.len(), context);
                Self { values, error: None }
            }
            Err(e) => {
                log_warn!(logger, "secret store context {} unavailable: {}", context, e);
                Self {
                    values: BTreeMap::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn lookup(&self, key: &str) -> Option<&String> {
        self.values
            .get(key)
            .or_else(|| self.values.get(&key.to_uppercase()))
            .or_else(|| self.values.get(&key.to_lowercase()))
    }
}

impl SecretStore for EscSecretStore {
    fn name(&self) -> &str {
        "esc"
    }

    fn is_available(&self) -> bool {
        self.error.is_none()
    }

    fn try_get(&self, key: &str) -> SecretStoreResult<Option<String>> {
        Ok(self.lookup(key).filter(|v| !v.trim().is_empty()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::EngineSettings;
    use crate::logging::{LogLevel, MemoryLogger};
    use crate::process::{ScriptedResponse, ScriptedRunner};

    fn cli(runner: ScriptedRunner) -> InfraCli {
        InfraCli::new(Arc::new(runner), Arc::new(EngineSettings::default()))
    }

    #[tokio::test]
    async fn test_load_snapshot() {
        let cli = cli(ScriptedRunner::new().on(
            "esc",
            &["env", "open", "sophia-ai/sophia-dev", "--format", "json"],
            ScriptedResponse::ok(r#"{"environmentVariables": {"OPENAI_API_KEY": "sk-esc"}}"#),
        ));
        let logger: SharedLogger = Arc::new(MemoryLogger::new());
        let store = EscSecretStore::load(&cli, "sophia-ai/sophia-dev", &logger).await;

        assert!(store.is_available());
        assert_eq!(store.get("openai_api_key"), Some("sk-esc".to_string()));
    }

    #[tokio::test]
    async fn test_failed_load_is_unavailable() {
        let memory = Arc::new(MemoryLogger::new());
        let logger: SharedLogger = memory.clone();
        let store = EscSecretStore::load(&cli(ScriptedRunner::new()), "acme/sophia-prod", &logger).await;

        assert!(!store.is_available());
        assert_eq!(store.get("openai_api_key"), None);
        assert!(memory.contains(LogLevel::Warn, "acme/sophia-prod"));
    }

    #[tokio::test]
    async fn test_key_case_variants() {
        let cli = cli(ScriptedRunner::new().on(
            "esc",
            &["env", "open"],
            ScriptedResponse::ok("LOG_LEVEL=DEBUG\nsnowflake_user: svc\nPINECONE_API_KEY=\"\"\n"),
        ));
        let memory = Arc::new(MemoryLogger::new());
        let logger: SharedLogger = memory.clone();
        let store = EscSecretStore::load(&cli, "acme/sophia-dev", &logger).await;

        assert_eq!(store.get("log_level"), Some("DEBUG".to_string()));
        assert_eq!(store.get("SNOWFLAKE_USER"), Some("svc".to_string()));
        assert_eq!(store.try_get("pinecone_api_key").unwrap(), None);
        assert!(memory.contains(LogLevel::Debug, "loaded 2 value(s) from acme/sophia-dev"));
    }
}
