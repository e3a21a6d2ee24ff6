//! Deployment environment and its signal parsing rules

use serde::{Deserialize, Serialize};

/// The deployment environment a process runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Development,
}

/// Outcome of mapping a literal signal value onto an environment
///
/// `recognized` is false when the value was not one of the known literals
/// and the fail-safe default (production) was applied instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalMatch {
    pub environment: Environment,
    pub recognized: bool,
}

impl Environment {
    /// Short canonical name, also used for `config/environments/{name}.json`
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "prod",
            Environment::Staging => "staging",
            Environment::Development => "dev",
        }
    }

    /// Map an explicit signal value (`prod`, `stg`, `development`, ...)
    ///
    /// Returns `None` for an empty value. Unknown non-empty values fall back
    /// to production with `recognized == false`.
    pub fn from_signal(value: &str) -> Option<SignalMatch> {
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if value.is_empty() {
            return None;
        }
        let environment = match value.to_lowercase().as_str() {
            "prod" | "production" => Environment::Production,
            "staging" | "stg" => Environment::Staging,
            "dev" | "development" => Environment::Development,
            _ => {
                return Some(SignalMatch {
                    environment: Environment::Production,
                    recognized: false,
                })
            }
        };
        Some(SignalMatch {
            environment,
            recognized: true,
        })
    }

    /// Map a version-control branch name
    ///
    /// Same fail-safe rule as [`Environment::from_signal`] for unknown branches.
    pub fn from_branch(branch: &str) -> Option<SignalMatch> {
        let branch = branch.trim();
        if branch.is_empty() {
            return None;
        }
        let environment = match branch {
            "main" | "master" => Environment::Production,
            "develop" | "staging" => Environment::Staging,
            b if b.starts_with("feature/") || b.starts_with("fix/") || b.starts_with("dev/") => {
                Environment::Development
            }
            _ => {
                return Some(SignalMatch {
                    environment: Environment::Production,
                    recognized: false,
                })
            }
        };
        Some(SignalMatch {
            environment,
            recognized: true,
        })
    }

    /// Match a remote stack name by substring, case-insensitive
    pub fn from_stack_name(name: &str) -> Option<Environment> {
        let name = name.to_lowercase();
        if name.contains("production") {
            Some(Environment::Production)
        } else if name.contains("staging") {
            Some(Environment::Staging)
        } else if name.contains("dev") {
            Some(Environment::Development)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    /// Strict parse: only recognized literals are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Environment::from_signal(s) {
            Some(SignalMatch {
                environment,
                recognized: true,
            }) => Ok(environment),
            _ => Err(format!("unknown environment: {}", s)),
        }
    }
}
