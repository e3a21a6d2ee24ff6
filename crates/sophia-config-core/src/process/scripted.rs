//! Scripted command runner for tests
//!
//! Provides deterministic responses for external tools without touching the
//! machine. Unscripted programs behave like a missing binary.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::runner::{CommandError, CommandOutput, CommandResult, CommandRunner, CommandSpec};

/// A canned response
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Program exits with `code` and prints `stdout`/`stderr`
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// Program hits its deadline
    Timeout,
    /// Program is not installed
    NotFound,
}

impl ScriptedResponse {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::Exit {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        Self::Exit {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

struct Rule {
    program: String,
    args_prefix: Vec<String>,
    responses: VecDeque<ScriptedResponse>,
}

/// Command runner answering from a script
///
/// Rules match on program name and an argument prefix; the longest matching
/// prefix wins. A rule with several responses hands them out in order and
/// then keeps repeating the last one.
///
/// # Example
///
/// ```
/// use sophia_config_core::process::{ScriptedRunner, ScriptedResponse};
///
/// let runner = ScriptedRunner::new()
///     .on("git", &["rev-parse"], ScriptedResponse::ok("main"))
///     .on("pulumi", &["whoami"], ScriptedResponse::fail(255, "not logged in"));
/// ```
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `program args_prefix...` with `response`
    pub fn on(self, program: &str, args_prefix: &[&str], response: ScriptedResponse) -> Self {
        self.on_sequence(program, args_prefix, vec![response])
    }

    /// Answer successive matching calls with `responses`, repeating the last
    pub fn on_sequence(
        self,
        program: &str,
        args_prefix: &[&str],
        responses: Vec<ScriptedResponse>,
    ) -> Self {
        self.rules.lock().push(Rule {
            program: program.to_string(),
            args_prefix: args_prefix.iter().map(|a| a.to_string()).collect(),
            responses: responses.into(),
        });
        self
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    /// Number of calls matching `program args_prefix...`
    pub fn call_count(&self, program: &str, args_prefix: &[&str]) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program && starts_with(&c.args, args_prefix))
            .count()
    }

    fn next_response(&self, spec: &CommandSpec) -> Option<ScriptedResponse> {
        let mut rules = self.rules.lock();
        let rule = rules
            .iter_mut()
            .filter(|r| {
                let prefix: Vec<&str> = r.args_prefix.iter().map(String::as_str).collect();
                r.program == spec.program && starts_with(&spec.args, &prefix)
            })
            .max_by_key(|r| r.args_prefix.len())?;

        if rule.responses.len() > 1 {
            rule.responses.pop_front()
        } else {
            rule.responses.front().cloned()
        }
    }
}

fn starts_with(args: &[String], prefix: &[&str]) -> bool {
    args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| a == p)
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandResult<CommandOutput> {
        self.calls.lock().push(spec.clone());

        match self.next_response(spec) {
            Some(ScriptedResponse::Exit {
                code,
                stdout,
                stderr,
            }) => Ok(CommandOutput {
                code: Some(code),
                stdout,
                stderr,
            }),
            Some(ScriptedResponse::Timeout) => Err(CommandError::Timeout {
                program: spec.program.clone(),
                timeout: spec.timeout,
            }),
            Some(ScriptedResponse::NotFound) | None => {
                Err(CommandError::NotFound(spec.program.clone()))
            }
        }
    }
}

impl std::fmt::Debug for ScriptedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRunner")
            .field("rules", &self.rules.lock().len())
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spec(program: &str, args: &[&str]) -> CommandSpec {
        CommandSpec::new(program, Duration::from_secs(1)).args(args.iter().copied())
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let runner = ScriptedRunner::new()
            .on("esc", &["env", "open"], ScriptedResponse::ok("plain"))
            .on("esc", &["env", "open", "acme/prod", "--format"], ScriptedResponse::ok("{}"));

        let plain = runner.run(&spec("esc", &["env", "open", "acme/prod"])).await.unwrap();
        assert_eq!(plain.stdout, "plain");

        let json = runner
            .run(&spec("esc", &["env", "open", "acme/prod", "--format", "json"]))
            .await
            .unwrap();
        assert_eq!(json.stdout, "{}");
    }

    #[tokio::test]
    async fn test_unscripted_is_not_found() {
        let runner = ScriptedRunner::new();
        assert!(matches!(
            runner.run(&spec("git", &["status"])).await,
            Err(CommandError::NotFound(_))
        ));
        assert_eq!(runner.call_count("git", &[]), 1);
    }

    #[tokio::test]
    async fn test_sequence_repeats_last() {
        let runner = ScriptedRunner::new().on_sequence(
            "esc",
            &["env", "init"],
            vec![
                ScriptedResponse::ok("created"),
                ScriptedResponse::fail(1, "already exists"),
            ],
        );
        let call = spec("esc", &["env", "init", "acme/dev"]);
        assert!(runner.run(&call).await.unwrap().success());
        assert!(!runner.run(&call).await.unwrap().success());
        assert!(!runner.run(&call).await.unwrap().success());
        assert_eq!(runner.call_count("esc", &["env", "init"]), 3);
    }

    #[tokio::test]
    async fn test_timeout_response() {
        let runner = ScriptedRunner::new().on("pulumi", &[], ScriptedResponse::Timeout);
        assert!(matches!(
            runner.run(&spec("pulumi", &["stack"])).await,
            Err(CommandError::Timeout { .. })
        ));
    }
}
