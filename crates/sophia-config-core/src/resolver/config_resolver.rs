//! Configuration resolution from multiple ranked sources
//!
//! Source priority, first non-blank value wins:
//! 1. Secret stores (remote context snapshot, then keychain if enabled)
//! 2. Environment variables, each schema alias in declared order
//! 3. `config/environments/{env}.json` under the project root
//! 4. Schema default
//!
//! The identity keys (`environment`, `pulumi_org`) always carry the value
//! detection chose. A source that disagrees with detection is logged and
//! overruled, so what the engine reports and persists names one environment.
//!
//! Provenance is recorded as the value is found, so each source is asked once per key.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::EnvironmentConfigFile;
use crate::detect::DetectedEnvironment;
use crate::logging::SharedLogger;
use crate::schema::ConfigurationSchemaEntry;
use crate::secrets::{ChainSecretStore, EnvSecretStore};
use crate::types::{ConfigSource, ConfigurationEntry, Environment, ResolvedEntries};
use crate::{log_debug, log_info, log_warn};

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

pub struct ConfigResolver {
    secrets: Arc<ChainSecretStore>,
    env: Arc<EnvSecretStore>,
    project_root: PathBuf,
    logger: SharedLogger,
}

impl ConfigResolver {
    pub fn new(
        secrets: Arc<ChainSecretStore>,
        env: Arc<EnvSecretStore>,
        project_root: impl Into<PathBuf>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            secrets,
            env,
            project_root: project_root.into(),
            logger,
        }
    }

    /// Resolve every key in `schema` for the detected environment
    ///
    /// Keys with no value anywhere are left out of the map.
    pub fn resolve(&self, detected: &DetectedEnvironment, schema: &[ConfigurationSchemaEntry]) -> ResolvedEntries {
        let environment = detected.environment;
        let local = self.load_local_file(environment);
        let mut entries = ResolvedEntries::new();

        for item in schema {
            let found = match detected.identity(item.key) {
                Some(identity) => Some(self.resolve_identity(item, &local, detected, identity)),
                None => self.resolve_key(item, &local),
            };
            match found {
                Some(entry) => {
                    log_debug!(self.logger, "{} resolved from {}", item.key, entry.source_detail);
                    entries.insert(item.key.to_string(), entry);
                }
                None => log_debug!(self.logger, "{} has no value", item.key),
            }
        }

        log_info!(
            self.logger,
            "resolved {}/{} keys for {}",
            entries.len(),
            schema.len(),
            environment
        );
        entries
    }

    fn resolve_key(
        &self,
        item: &ConfigurationSchemaEntry,
        local: &EnvironmentConfigFile,
    ) -> Option<ConfigurationEntry> {
        let entry = |value: String, source: ConfigSource, detail: String| ConfigurationEntry {
            key: item.key.to_string(),
            value,
            source,
            source_detail: detail,
            required: item.required,
            sensitive: item.sensitive,
        };

        if let Some((store, value)) = self.from_secret_stores(item.key) {
            return Some(entry(value, ConfigSource::SecretStore, format!("secret store ({})", store)));
        }

        if let Some((variable, value)) = self.env.first_of(item.aliases) {
            return Some(entry(value, ConfigSource::ProcessEnv, format!("${}", variable)));
        }

        if let Some(value) = local.get(item.key).map(str::to_string).and_then(non_blank) {
            return Some(entry(value, ConfigSource::LocalFile, local.path().display().to_string()));
        }

        item.default
            .map(|value| entry(value.to_string(), ConfigSource::Default, "schema default".to_string()))
    }

    /// Ranked lookup for an identity key, settled by detection
    ///
    /// A source that agrees keeps its provenance with the canonical value.
    fn resolve_identity(
        &self,
        item: &ConfigurationSchemaEntry,
        local: &EnvironmentConfigFile,
        detected: &DetectedEnvironment,
        identity: &str,
    ) -> ConfigurationEntry {
        match self.resolve_key(item, local) {
            Some(entry) if entry.source != ConfigSource::Default && detected.agrees(item.key, &entry.value) => {
                ConfigurationEntry {
                    value: identity.to_string(),
                    ..entry
                }
            }
            found => {
                if let Some(entry) = found.filter(|e| e.source != ConfigSource::Default) {
                    log_warn!(
                        self.logger,
                        "{} from {} is {:?} but detection chose {:?}, using the detected value",
                        item.key,
                        entry.source_detail,
                        entry.value,
                        identity
                    );
                }
                ConfigurationEntry {
                    key: item.key.to_string(),
                    value: identity.to_string(),
                    source: ConfigSource::Default,
                    source_detail: format!("detected ({})", detected.strategy),
                    required: item.required,
                    sensitive: item.sensitive,
                }
            }
        }
    }

    /// First store in the chain with a value; store failures are logged and skipped
    fn from_secret_stores(&self, key: &str) -> Option<(String, String)> {
        self.secrets
            .lookup(key, |store, e| log_warn!(self.logger, "{} lookup of {} failed: {}", store, key, e))
            .map(|hit| (hit.store, hit.value))
    }

    fn load_local_file(&self, environment: Environment) -> EnvironmentConfigFile {
        match EnvironmentConfigFile::load(&self.project_root, environment) {
            Ok(file) => file,
            Err(e) => {
                let path = EnvironmentConfigFile::path_for(&self.project_root, environment);
                log_warn!(self.logger, "ignoring {}: {}", path.display(), e);
                EnvironmentConfigFile::empty(path)
            }
        }
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("secrets", &self.secrets)
            .field("project_root", &self.project_root)
            .finish()
    }
}
