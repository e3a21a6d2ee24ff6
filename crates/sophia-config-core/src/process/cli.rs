//! Typed operations over the external VCS, infrastructure and secrets tools
//!
//! Success is communicated solely by exit code. Payloads are parsed as JSON
//! first and fall back to `KEY=value` / `key: value` marker lines.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::runner::{CommandError, CommandOutput, CommandRunner, CommandSpec};
use crate::config::EngineSettings;
use crate::secrets::EnvSecretStore;

/// Why a tool call produced no usable answer
#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("{command} exited with {code:?}: {message}")]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        message: String,
    },

    #[error("{0} produced no output")]
    EmptyOutput(String),

    #[error("{0} returned an empty payload")]
    EmptyPayload(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Result of asking the secrets tool to create a remote context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Typed wrapper over the external tools
///
/// All calls carry the deadline configured in [`EngineSettings::timeouts`].
/// With [`InfraCli::with_env`], variables the engine has set are passed to
/// every child.
#[derive(Clone)]
pub struct InfraCli {
    runner: Arc<dyn CommandRunner>,
    settings: Arc<EngineSettings>,
    env: Option<Arc<EnvSecretStore>>,
}

impl InfraCli {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: Arc<EngineSettings>) -> Self {
        Self {
            runner,
            settings,
            env: None,
        }
    }

    pub fn with_env(mut self, env: Arc<EnvSecretStore>) -> Self {
        self.env = Some(env);
        self
    }

    fn command(&self, program: &str, timeout: Duration) -> CommandSpec {
        let spec = CommandSpec::new(program, timeout);
        match &self.env {
            Some(env) => env
                .overrides()
                .into_iter()
                .fold(spec, |spec, (key, value)| spec.env(key, value)),
            None => spec,
        }
    }

    fn project_root(&self) -> PathBuf {
        self.settings.project_root.clone()
    }

    async fn run_checked(&self, spec: CommandSpec) -> ToolResult<CommandOutput> {
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(ToolError::NonZeroExit {
                command: spec.display(),
                code: output.code,
                message: first_line(&output.combined()),
            });
        }
        Ok(output)
    }

    /// Current VCS branch name
    pub async fn current_branch(&self) -> ToolResult<String> {
        let spec = self.command(&self.settings.tools.vcs, self.settings.timeouts.branch())
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .current_dir(self.project_root());
        let display = spec.display();
        let output = self.run_checked(spec).await?;
        non_empty_line(&output.stdout).ok_or(ToolError::EmptyOutput(display))
    }

    /// Name of the stack currently selected in the infrastructure tool
    pub async fn selected_stack(&self) -> ToolResult<String> {
        let spec = self.command(&self.settings.tools.infra, self.settings.timeouts.stack())
            .args(["stack", "--show-name"])
            .current_dir(self.project_root());
        let display = spec.display();
        let output = self.run_checked(spec).await?;
        non_empty_line(&output.stdout).ok_or(ToolError::EmptyOutput(display))
    }

    /// Authenticated identity, e.g. the user name
    pub async fn whoami(&self) -> ToolResult<String> {
        let spec = self.command(&self.settings.tools.infra, self.settings.timeouts.tool())
            .arg("whoami");
        let output = self.run_checked(spec).await?;
        Ok(first_line(&output.stdout))
    }

    /// Open a remote context without reading its values
    pub async fn open_context(&self, context: &str) -> ToolResult<()> {
        let spec = self.command(&self.settings.tools.secrets, self.settings.timeouts.tool())
            .args(["env", "open", context]);
        self.run_checked(spec).await.map(|_| ())
    }

    /// Open a remote context requesting machine-readable values
    ///
    /// Fails with [`ToolError::EmptyPayload`] when nothing could be parsed.
    pub async fn load_context(&self, context: &str) -> ToolResult<BTreeMap<String, String>> {
        let spec = self.command(&self.settings.tools.secrets, self.settings.timeouts.tool())
            .args(["env", "open", context, "--format", "json"]);
        let display = spec.display();
        let output = self.run_checked(spec).await?;
        let values = parse_payload(&output.stdout);
        if values.is_empty() {
            return Err(ToolError::EmptyPayload(display));
        }
        Ok(values)
    }

    /// Create a remote context; an existing one counts as success
    pub async fn create_context(&self, context: &str) -> ToolResult<CreateOutcome> {
        let spec = self.command(&self.settings.tools.secrets, self.settings.timeouts.tool())
            .args(["env", "init", context]);
        let display = spec.display();
        let output = self.runner.run(&spec).await?;
        if output.combined().to_lowercase().contains("already exists") {
            return Ok(CreateOutcome::AlreadyExists);
        }
        if output.success() {
            return Ok(CreateOutcome::Created);
        }
        Err(ToolError::NonZeroExit {
            command: display,
            code: output.code,
            message: first_line(&output.combined()),
        })
    }

    /// Non-interactive login, token passed only to the child process
    pub async fn login(&self, token: &str) -> ToolResult<()> {
        let spec = self.command(&self.settings.tools.infra, self.settings.timeouts.tool())
            .args(["login", "--non-interactive"])
            .env(self.settings.access_token_var.clone(), token);
        self.run_checked(spec).await.map(|_| ())
    }
}

impl std::fmt::Debug for InfraCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfraCli")
            .field("tools", &self.settings.tools)
            .finish()
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").trim().to_string()
}

fn non_empty_line(text: &str) -> Option<String> {
    let line = first_line(text);
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

/// Parse a context payload into flat key/value pairs
///
/// A JSON object is flattened one level: scalar members are taken as-is and
/// an `environmentVariables` object is merged in. Non-JSON output falls back
/// to `KEY=value` and `key: value` lines.
pub fn parse_payload(output: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<Value>(output) {
        Ok(Value::Object(map)) => {
            let mut values = BTreeMap::new();
            for (key, value) in map {
                match value {
                    Value::Object(inner) if key == "environmentVariables" => {
                        for (k, v) in inner {
                            if let Some(v) = scalar(v) {
                                values.insert(k, v);
                            }
                        }
                    }
                    other => {
                        if let Some(v) = scalar(other) {
                            values.insert(key, v);
                        }
                    }
                }
            }
            values
        }
        Ok(_) => BTreeMap::new(),
        Err(_) => parse_marker_lines(output),
    }
}

fn scalar(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_marker_lines(output: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Whichever separator comes first splits the line
        let pair = match (line.find('='), line.find(": ")) {
            (Some(eq), Some(colon)) if colon < eq => line.split_once(": "),
            (Some(_), _) => line.split_once('='),
            (None, _) => line.split_once(": "),
        };
        if let Some((k, v)) = pair {
            let k = k.trim().trim_start_matches("export ").trim();
            let v = v.trim().trim_matches('"');
            let is_identifier = !k.is_empty()
                && k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
            if is_identifier && !v.is_empty() {
                values.insert(k.to_string(), v.to_string());
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ScriptedResponse, ScriptedRunner};

    fn cli(runner: ScriptedRunner) -> (InfraCli, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner);
        let cli = InfraCli::new(runner.clone(), Arc::new(EngineSettings::default()));
        (cli, runner)
    }

    #[test]
    fn test_parse_flat_json() {
        let values = parse_payload(r#"{"OPENAI_API_KEY": "sk-1", "PORT": 8080, "nested": {"x": 1}}"#);
        assert_eq!(values.get("OPENAI_API_KEY").map(String::as_str), Some("sk-1"));
        assert_eq!(values.get("PORT").map(String::as_str), Some("8080"));
        assert!(!values.contains_key("nested"));
    }

    #[test]
    fn test_parse_environment_variables_block() {
        let values = parse_payload(
            r#"{"values": {"a": 1}, "environmentVariables": {"SNOWFLAKE_USER": "svc"}}"#,
        );
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("SNOWFLAKE_USER").map(String::as_str), Some("svc"));
    }

    #[test]
    fn test_parse_marker_fallback() {
        let values = parse_payload("Opening environment...\nOPENAI_API_KEY=sk-2\nlog_level: DEBUG\nnot a pair\n");
        assert_eq!(values.get("OPENAI_API_KEY").map(String::as_str), Some("sk-2"));
        assert_eq!(values.get("log_level").map(String::as_str), Some("DEBUG"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_parse_marker_value_may_contain_other_separator() {
        let values = parse_payload("snowflake_account: acme.eu-1?role=ops\nLOG_FORMAT=level: short\n");
        assert_eq!(
            values.get("snowflake_account").map(String::as_str),
            Some("acme.eu-1?role=ops")
        );
        assert_eq!(values.get("LOG_FORMAT").map(String::as_str), Some("level: short"));
    }

    #[test]
    fn test_parse_json_array_is_empty() {
        assert!(parse_payload("[1, 2]").is_empty());
    }

    #[tokio::test]
    async fn test_current_branch() {
        let (cli, runner) = cli(ScriptedRunner::new().on(
            "git",
            &["rev-parse", "--abbrev-ref", "HEAD"],
            ScriptedResponse::ok("feature/x\n"),
        ));
        assert_eq!(cli.current_branch().await.unwrap(), "feature/x");
        let call = &runner.calls()[0];
        assert_eq!(call.timeout, Duration::from_secs(5));
        assert!(call.cwd.is_some());
    }

    #[tokio::test]
    async fn test_selected_stack_deadline() {
        let (cli, runner) = cli(ScriptedRunner::new().on(
            "pulumi",
            &["stack", "--show-name"],
            ScriptedResponse::ok("sophia-staging\n"),
        ));
        assert_eq!(cli.selected_stack().await.unwrap(), "sophia-staging");
        let call = &runner.calls()[0];
        assert_eq!(call.timeout, Duration::from_secs(10));
        assert!(call.cwd.is_some());
    }

    #[tokio::test]
    async fn test_tool_calls_use_tool_deadline() {
        let (cli, runner) = cli(ScriptedRunner::new()
            .on("pulumi", &[], ScriptedResponse::ok("svc-user"))
            .on("esc", &["env", "open"], ScriptedResponse::ok(r#"{"LOG_LEVEL": "INFO"}"#))
            .on("esc", &["env", "init"], ScriptedResponse::ok("created")));

        cli.whoami().await.unwrap();
        cli.open_context("acme/sophia-dev").await.unwrap();
        cli.load_context("acme/sophia-dev").await.unwrap();
        cli.create_context("acme/sophia-dev").await.unwrap();
        cli.login("pul-123").await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 5);
        for call in &calls {
            assert_eq!(call.timeout, Duration::from_secs(30), "{}", call.display());
        }
    }

    #[tokio::test]
    async fn test_engine_overrides_reach_children() {
        let runner = Arc::new(ScriptedRunner::new().on("pulumi", &["login"], ScriptedResponse::ok("Logged in")));
        let env = Arc::new(EnvSecretStore::isolated(Vec::<(String, String)>::new()));
        env.set_var("PULUMI_ORG", "acme");
        let cli = InfraCli::new(runner.clone(), Arc::new(EngineSettings::default())).with_env(env);

        cli.login("pul-123").await.unwrap();
        assert_eq!(
            runner.calls()[0].envs,
            vec![
                ("PULUMI_ORG".to_string(), "acme".to_string()),
                ("PULUMI_ACCESS_TOKEN".to_string(), "pul-123".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_branch_is_error() {
        let (cli, _) = cli(ScriptedRunner::new().on("git", &[], ScriptedResponse::ok("")));
        assert!(matches!(cli.current_branch().await, Err(ToolError::EmptyOutput(_))));
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let (cli, _) = cli(ScriptedRunner::new().on(
            "pulumi",
            &["whoami"],
            ScriptedResponse::fail(255, "error: not logged in\nhint"),
        ));
        match cli.whoami().await {
            Err(ToolError::NonZeroExit { code, message, .. }) => {
                assert_eq!(code, Some(255));
                assert_eq!(message, "error: not logged in");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_context_already_exists() {
        let (cli, _) = cli(ScriptedRunner::new().on(
            "esc",
            &["env", "init"],
            ScriptedResponse::fail(1, "error: environment acme/sophia-dev already exists"),
        ));
        assert_eq!(
            cli.create_context("acme/sophia-dev").await.unwrap(),
            CreateOutcome::AlreadyExists
        );
    }

    #[tokio::test]
    async fn test_load_context_empty_payload() {
        let (cli, _) = cli(ScriptedRunner::new().on("esc", &["env", "open"], ScriptedResponse::ok("{}")));
        assert!(matches!(
            cli.load_context("acme/sophia-dev").await,
            Err(ToolError::EmptyPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_login_passes_token_to_child_only() {
        let (cli, runner) = cli(ScriptedRunner::new().on("pulumi", &["login"], ScriptedResponse::ok("Logged in")));
        cli.login("pul-123").await.unwrap();
        let call = &runner.calls()[0];
        assert_eq!(
            call.envs,
            vec![("PULUMI_ACCESS_TOKEN".to_string(), "pul-123".to_string())]
        );
    }
}
