//! Compiled-in configuration schema

/// One key the engine knows how to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationSchemaEntry {
    pub key: &'static str,
    pub required: bool,
    /// Masked in output and never written to shell profiles
    pub sensitive: bool,
    pub description: &'static str,
    /// Environment variable names, checked in declared order
    pub aliases: &'static [&'static str],
    pub default: Option<&'static str>,
}

/// The schema every resolution pass runs against
pub const SCHEMA: &[ConfigurationSchemaEntry] = &[
    ConfigurationSchemaEntry {
        key: "environment",
        required: true,
        sensitive: false,
        description: "Deployment environment name",
        aliases: &["ENVIRONMENT", "SOPHIA_ENVIRONMENT"],
        default: Some("dev"),
    },
    ConfigurationSchemaEntry {
        key: "pulumi_org",
        required: false,
        sensitive: false,
        description: "Organization owning the remote stacks and contexts",
        aliases: &["PULUMI_ORG"],
        default: Some("sophia-ai"),
    },
    ConfigurationSchemaEntry {
        key: "openai_api_key",
        required: true,
        sensitive: true,
        description: "OpenAI API key",
        aliases: &["OPENAI_API_KEY"],
        default: None,
    },
    ConfigurationSchemaEntry {
        key: "anthropic_api_key",
        required: false,
        sensitive: true,
        description: "Anthropic API key",
        aliases: &["ANTHROPIC_API_KEY"],
        default: None,
    },
    ConfigurationSchemaEntry {
        key: "openrouter_api_key",
        required: false,
        sensitive: true,
        description: "OpenRouter API key",
        aliases: &["OPENROUTER_API_KEY"],
        default: None,
    },
    ConfigurationSchemaEntry {
        key: "pinecone_api_key",
        required: false,
        sensitive: true,
        description: "Pinecone vector database API key",
        aliases: &["PINECONE_API_KEY"],
        default: None,
    },
    ConfigurationSchemaEntry {
        key: "snowflake_account",
        required: false,
        sensitive: false,
        description: "Snowflake account identifier",
        aliases: &["SNOWFLAKE_ACCOUNT"],
        default: None,
    },
    ConfigurationSchemaEntry {
        key: "snowflake_user",
        required: false,
        sensitive: false,
        description: "Snowflake user name",
        aliases: &["SNOWFLAKE_USER"],
        default: None,
    },
    ConfigurationSchemaEntry {
        key: "snowflake_password",
        required: false,
        sensitive: true,
        description: "Snowflake password",
        aliases: &["SNOWFLAKE_PASSWORD"],
        default: None,
    },
    ConfigurationSchemaEntry {
        key: "snowflake_warehouse",
        required: false,
        sensitive: false,
        description: "Snowflake warehouse",
        aliases: &["SNOWFLAKE_WAREHOUSE"],
        default: Some("COMPUTE_WH"),
    },
    ConfigurationSchemaEntry {
        key: "snowflake_database",
        required: false,
        sensitive: false,
        description: "Snowflake database",
        aliases: &["SNOWFLAKE_DATABASE"],
        default: None,
    },
    ConfigurationSchemaEntry {
        key: "log_level",
        required: false,
        sensitive: false,
        description: "Application log level",
        aliases: &["LOG_LEVEL"],
        default: Some("INFO"),
    },
];

/// At least one of these should resolve for the AI features to work
pub const AI_PROVIDER_KEYS: &[&str] = &["openai_api_key", "anthropic_api_key", "openrouter_api_key"];

/// Keys written to shell profiles, with the variable they are exported as
pub const PERSISTED_KEYS: &[(&str, &str)] = &[("environment", "ENVIRONMENT"), ("pulumi_org", "PULUMI_ORG")];

/// Look up a schema entry by key
pub fn find(key: &str) -> Option<&'static ConfigurationSchemaEntry> {
    SCHEMA.iter().find(|e| e.key == key)
}

/// Keys marked required, in schema order
pub fn required_keys() -> impl Iterator<Item = &'static str> {
    SCHEMA.iter().filter(|e| e.required).map(|e| e.key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<_> = SCHEMA.iter().map(|e| e.key).collect();
        assert_eq!(keys.len(), SCHEMA.len());
        assert_eq!(SCHEMA.len(), 12);
    }

    #[test]
    fn test_required_keys() {
        assert_eq!(required_keys().collect::<Vec<_>>(), vec!["environment", "openai_api_key"]);
    }

    #[test]
    fn test_every_entry_has_an_alias() {
        assert!(SCHEMA.iter().all(|e| !e.aliases.is_empty()));
    }

    #[test]
    fn test_persisted_keys_are_not_sensitive() {
        for (key, _) in PERSISTED_KEYS {
            let entry = find(key).unwrap();
            assert!(!entry.sensitive);
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(find("snowflake_warehouse").and_then(|e| e.default), Some("COMPUTE_WH"));
        assert!(find("nope").is_none());
    }
}
