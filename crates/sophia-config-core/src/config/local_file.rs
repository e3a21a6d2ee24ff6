//! Local per-environment config files and dotenv-style detection files

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::traits::{ConfigError, ConfigResult};
use crate::types::Environment;

/// Values from `config/environments/{env}.json`
///
/// The file must hold a flat JSON object. Strings are used verbatim,
/// numbers and booleans are stringified, anything else is ignored.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentConfigFile {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl EnvironmentConfigFile {
    /// Location of the file for `environment` under `project_root`
    pub fn path_for(project_root: impl AsRef<Path>, environment: Environment) -> PathBuf {
        project_root
            .as_ref()
            .join("config")
            .join("environments")
            .join(format!("{}.json", environment.as_str()))
    }

    /// Read and parse the file
    ///
    /// A missing file yields an empty set of values; unreadable or malformed
    /// files are errors so the caller can log them.
    pub fn load(project_root: impl AsRef<Path>, environment: Environment) -> ConfigResult<Self> {
        let path = Self::path_for(project_root, environment);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    values: HashMap::new(),
                })
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let values = Self::parse(&path, &content)?;
        Ok(Self { path, values })
    }

    /// An empty file handle, used when loading failed
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: HashMap::new(),
        }
    }

    fn parse(path: &Path, content: &str) -> ConfigResult<HashMap<String, String>> {
        let value: Value = serde_json::from_str(content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Object(map) = value else {
            return Err(ConfigError::NotAnObject(path.to_path_buf()));
        };

        Ok(map
            .into_iter()
            .filter_map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((k, v))
            })
            .collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Find the first assignment to any of `names` in a dotenv-style file
///
/// Accepts `KEY=value` and `export KEY=value`, strips surrounding quotes and
/// skips comments. Returns the matched name and its value.
pub fn read_dotenv_var(path: impl AsRef<Path>, names: &[String]) -> Option<(String, String)> {
    let content = fs::read_to_string(path).ok()?;
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.is_empty() {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((k, v)) = line.split_once('=') {
            let k = k.trim();
            if names.iter().any(|n| n == k) {
                let value = v.trim().trim_matches('"').trim_matches('\'');
                if !value.is_empty() {
                    return Some((k.to_string(), value.to_string()));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_env_file(root: &Path, env: Environment, content: &str) {
        let path = EnvironmentConfigFile::path_for(root, env);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = EnvironmentConfigFile::load(dir.path(), Environment::Production).unwrap();
        assert!(file.is_empty());
        assert!(file.path().ends_with("config/environments/prod.json"));
    }

    #[test]
    fn test_flat_object_values() {
        let dir = tempdir().unwrap();
        write_env_file(
            dir.path(),
            Environment::Staging,
            r#"{"snowflake_warehouse": "STAGING_WH", "pool_size": 8, "debug": false, "nested": {"a": 1}, "nothing": null}"#,
        );
        let file = EnvironmentConfigFile::load(dir.path(), Environment::Staging).unwrap();
        assert_eq!(file.get("snowflake_warehouse"), Some("STAGING_WH"));
        assert_eq!(file.get("pool_size"), Some("8"));
        assert_eq!(file.get("debug"), Some("false"));
        assert_eq!(file.get("nested"), None);
        assert_eq!(file.get("nothing"), None);
        assert_eq!(file.len(), 3);
    }

    #[test]
    fn test_malformed_json_is_error() {
        let dir = tempdir().unwrap();
        write_env_file(dir.path(), Environment::Development, "{ not json");
        assert!(matches!(
            EnvironmentConfigFile::load(dir.path(), Environment::Development),
            Err(ConfigError::Json { .. })
        ));

        write_env_file(dir.path(), Environment::Development, r#"["a", "b"]"#);
        assert!(matches!(
            EnvironmentConfigFile::load(dir.path(), Environment::Development),
            Err(ConfigError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_read_dotenv_var() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# comment\nOPENAI_API_KEY=sk-x\nexport SOPHIA_ENVIRONMENT=\"staging\"\nENVIRONMENT=\n",
        )
        .unwrap();

        let names = vec!["ENVIRONMENT".to_string(), "SOPHIA_ENVIRONMENT".to_string()];
        assert_eq!(
            read_dotenv_var(&path, &names),
            Some(("SOPHIA_ENVIRONMENT".to_string(), "staging".to_string()))
        );
        assert_eq!(read_dotenv_var(dir.path().join("missing"), &names), None);
    }
}
