//! Engine settings (YAML)
//!
//! Every field has a default, so an absent or partial
//! `~/.config/sophia/engine.yaml` is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::traits::{ConfigError, ConfigResult};
use crate::types::Environment;

/// Remote context (stack) name per environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackMap {
    pub production: String,
    pub staging: String,
    pub development: String,
}

impl Default for StackMap {
    fn default() -> Self {
        Self {
            production: "sophia-prod".to_string(),
            staging: "sophia-staging".to_string(),
            development: "sophia-dev".to_string(),
        }
    }
}

impl StackMap {
    pub fn stack_for(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.production,
            Environment::Staging => &self.staging,
            Environment::Development => &self.development,
        }
    }
}

/// Deadlines for external tool calls, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub branch_secs: u64,
    pub stack_secs: u64,
    pub tool_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            branch_secs: 5,
            stack_secs: 10,
            tool_secs: 30,
        }
    }
}

impl TimeoutSettings {
    pub fn branch(&self) -> Duration {
        Duration::from_secs(self.branch_secs)
    }

    pub fn stack(&self) -> Duration {
        Duration::from_secs(self.stack_secs)
    }

    pub fn tool(&self) -> Duration {
        Duration::from_secs(self.tool_secs)
    }
}

/// External program names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Version control (branch lookup)
    pub vcs: String,
    /// Infrastructure tool (identity, selected stack, login)
    pub infra: String,
    /// Secrets/environments tool (open and create remote contexts)
    pub secrets: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            vcs: "git".to_string(),
            infra: "pulumi".to_string(),
            secrets: "esc".to_string(),
        }
    }
}

/// How the shell-profile writer treats an existing export of the same key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Append when the identical line is absent; older exports stay (last one wins when sourced)
    #[default]
    Append,
    /// Drop earlier `export KEY=` lines before appending the current one
    ReplaceByKey,
}

/// Settings for the whole engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Project root holding `.env` files and `config/environments/`
    pub project_root: PathBuf,
    /// Explicit environment signal variables, checked in order
    pub environment_vars: Vec<String>,
    pub organization_var: String,
    pub organization_default: String,
    pub access_token_var: String,
    pub stacks: StackMap,
    /// Dotenv-style files scanned by the local detection heuristic
    pub detection_files: Vec<String>,
    /// Shell profiles receiving `export` lines; `~/` expands to the home dir
    pub shell_profiles: Vec<String>,
    pub persist_mode: PersistMode,
    pub timeouts: TimeoutSettings,
    pub tools: ToolSettings,
    /// Keychain service name; enables the keychain as a secondary secret store
    pub keychain_service: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            environment_vars: vec!["ENVIRONMENT".to_string(), "SOPHIA_ENVIRONMENT".to_string()],
            organization_var: "PULUMI_ORG".to_string(),
            organization_default: "sophia-ai".to_string(),
            access_token_var: "PULUMI_ACCESS_TOKEN".to_string(),
            stacks: StackMap::default(),
            detection_files: vec![".env".to_string(), ".env.local".to_string()],
            shell_profiles: vec![
                "~/.bashrc".to_string(),
                "~/.zshrc".to_string(),
                "~/.profile".to_string(),
            ],
            persist_mode: PersistMode::Append,
            timeouts: TimeoutSettings::default(),
            tools: ToolSettings::default(),
            keychain_service: None,
        }
    }
}

impl EngineSettings {
    /// `~/.config/sophia/engine.yaml` (platform config dir)
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("sophia").join("engine.yaml")
    }

    /// Load from the default path; defaults when the file does not exist
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load from `path`; defaults when the file does not exist
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Yaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn with_persist_mode(mut self, mode: PersistMode) -> Self {
        self.persist_mode = mode;
        self
    }

    pub fn with_keychain(mut self, service: impl Into<String>) -> Self {
        self.keychain_service = Some(service.into());
        self
    }

    /// Shell profile paths with `~/` expanded; entries needing an unknown home are dropped
    pub fn shell_profile_paths(&self) -> Vec<PathBuf> {
        self.shell_profiles
            .iter()
            .filter_map(|p| expand_home(p))
            .collect()
    }
}

fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.environment_vars[0], "ENVIRONMENT");
        assert_eq!(settings.timeouts.branch(), Duration::from_secs(5));
        assert_eq!(settings.timeouts.stack(), Duration::from_secs(10));
        assert_eq!(settings.persist_mode, PersistMode::Append);
        assert_eq!(settings.timeouts.tool(), Duration::from_secs(30));
        assert_eq!(settings.stacks.stack_for(Environment::Staging), "sophia-staging");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = EngineSettings::load_from(dir.path().join("nope.yaml")).unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        fs::write(
            &path,
            "organization_default: acme\nstacks:\n  production: acme-prod\npersist_mode: replace_by_key\ntimeouts:\n  tool_secs: 12\n",
        )
        .unwrap();

        let settings = EngineSettings::load_from(&path).unwrap();
        assert_eq!(settings.organization_default, "acme");
        assert_eq!(settings.stacks.production, "acme-prod");
        assert_eq!(settings.stacks.staging, "sophia-staging");
        assert_eq!(settings.persist_mode, PersistMode::ReplaceByKey);
        assert_eq!(settings.timeouts.tool(), Duration::from_secs(12));
        assert_eq!(settings.timeouts.branch_secs, 5);
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        fs::write(&path, "stacks: [unclosed").unwrap();
        assert!(matches!(
            EngineSettings::load_from(&path),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn test_absolute_profile_paths_kept() {
        let mut settings = EngineSettings::default();
        settings.shell_profiles = vec!["/tmp/profile-a".to_string()];
        assert_eq!(settings.shell_profile_paths(), vec![PathBuf::from("/tmp/profile-a")]);
    }
}
