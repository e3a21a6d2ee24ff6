//! Environment variable lookups with an engine-owned overlay

use std::collections::{BTreeMap, HashMap};
use std::env;

use parking_lot::RwLock;

/// View of the environment variables the engine reads
///
/// By default it reads the real process environment. An isolated view (see
/// [`EnvSecretStore::isolated`]) reads its own map instead, so detection and
/// resolution can be exercised without touching process-wide state.
///
/// Variables set by the engine (see [`EnvSecretStore::set_var`]) live in an
/// overlay and are never written to the process environment. They shadow the
/// base values for the engine and are handed to child processes through
/// [`EnvSecretStore::overrides`].
///
/// Empty and whitespace-only values count as unset.
///
/// # Example
///
/// ```
/// use sophia_config_core::secrets::EnvSecretStore;
///
/// let env = EnvSecretStore::isolated([("SOPHIA_ENVIRONMENT", "staging")]);
/// let hit = env.first_of(&["ENVIRONMENT", "SOPHIA_ENVIRONMENT"]);
/// assert_eq!(hit, Some(("SOPHIA_ENVIRONMENT".to_string(), "staging".to_string())));
/// ```
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    isolated: Option<HashMap<String, String>>,
    overlay: RwLock<BTreeMap<String, String>>,
}

impl EnvSecretStore {
    /// View of the process environment
    pub fn new() -> Self {
        Self::default()
    }

    /// View of a private map seeded with `vars`
    pub fn isolated<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            isolated: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
            overlay: RwLock::default(),
        }
    }

    /// Value of `name`, if set and non-blank
    pub fn var(&self, name: &str) -> Option<String> {
        let value = match self.overlay.read().get(name) {
            Some(value) => Some(value.clone()),
            None => match &self.isolated {
                Some(map) => map.get(name).cloned(),
                None => env::var(name).ok(),
            },
        }?;
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// First of `names` that is set, with the name that matched
    pub fn first_of<S: AsRef<str>>(&self, names: &[S]) -> Option<(String, String)> {
        names.iter().find_map(|name| {
            let name = name.as_ref();
            self.var(name).map(|value| (name.to_string(), value))
        })
    }

    /// Set `name` for the engine and the children it spawns
    pub fn set_var(&self, name: &str, value: &str) {
        self.overlay.write().insert(name.to_string(), value.to_string());
    }

    /// Variables set through [`set_var`](Self::set_var), sorted by name
    pub fn overrides(&self) -> Vec<(String, String)> {
        self.overlay
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
