//! External tool invocation
//!
//! - `CommandRunner`: the seam between the engine and child processes
//! - `ProcessRunner`: tokio-backed implementation with deadlines and cancellation
//! - `ScriptedRunner`: deterministic test double
//! - `InfraCli`: typed VCS / infrastructure / secrets tool operations

mod runner;
mod scripted;
mod cli;

pub use runner::{CommandError, CommandOutput, CommandResult, CommandRunner, CommandSpec, ProcessRunner};
pub use scripted::{ScriptedResponse, ScriptedRunner};
pub use cli::{parse_payload, CreateOutcome, InfraCli, ToolError, ToolResult};
