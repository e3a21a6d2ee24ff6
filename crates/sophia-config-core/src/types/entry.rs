//! Resolved configuration values and their provenance

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where a resolved configuration value came from
///
/// Variants are declared in resolution priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// External secret store (remote context or keychain)
    SecretStore,
    /// Process environment variable (one of the schema aliases)
    ProcessEnv,
    /// `config/environments/{env}.json`
    LocalFile,
    /// Compiled-in schema default
    Default,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::SecretStore => "secret_store",
            ConfigSource::ProcessEnv => "process_env",
            ConfigSource::LocalFile => "local_file",
            ConfigSource::Default => "default",
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration value resolved for one schema key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationEntry {
    pub key: String,
    /// Raw value; use [`ConfigurationEntry::display_value`] for output
    #[serde(skip_serializing)]
    pub value: String,
    pub source: ConfigSource,
    /// Human-readable detail, e.g. `$OPENAI_API_KEY` or the file path
    pub source_detail: String,
    pub required: bool,
    pub sensitive: bool,
}

impl ConfigurationEntry {
    /// Value with everything but the last four characters hidden
    pub fn masked_value(&self) -> String {
        let chars: Vec<char> = self.value.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len().max(4));
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }

    /// Masked when sensitive, verbatim otherwise
    pub fn display_value(&self) -> String {
        if self.sensitive {
            self.masked_value()
        } else {
            self.value.clone()
        }
    }
}

/// Resolved entries keyed by schema key
pub type ResolvedEntries = BTreeMap<String, ConfigurationEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: &str, sensitive: bool) -> ConfigurationEntry {
        ConfigurationEntry {
            key: "k".to_string(),
            value: value.to_string(),
            source: ConfigSource::ProcessEnv,
            source_detail: "$K".to_string(),
            required: false,
            sensitive,
        }
    }

    #[test]
    fn test_masking() {
        assert_eq!(entry("sk-abcdefghijkl", true).display_value(), "***********ijkl");
        assert_eq!(entry("short", true).display_value(), "*****");
        assert_eq!(entry("ab", true).display_value(), "****");
        assert_eq!(entry("COMPUTE_WH", false).display_value(), "COMPUTE_WH");
    }

    #[test]
    fn test_value_not_serialized() {
        let json = serde_json::to_string(&entry("sk-secret-value", true)).unwrap();
        assert!(!json.contains("sk-secret-value"));
        assert!(json.contains("process_env"));
    }

    #[test]
    fn test_source_priority_order() {
        assert!(ConfigSource::SecretStore < ConfigSource::ProcessEnv);
        assert!(ConfigSource::ProcessEnv < ConfigSource::LocalFile);
        assert!(ConfigSource::LocalFile < ConfigSource::Default);
    }
}
