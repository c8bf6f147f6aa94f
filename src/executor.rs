//! Command execution for external tools.
//!
//! All subprocesses go through a [`CommandExecutor`]. [`SystemExecutor`]
//! runs real processes with process-group isolation; [`RecordingExecutor`]
//! records invocations and returns canned output, for tests and dry runs.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::config::ToolPaths;
use crate::environment::{REDACTED, is_secret_key};
use crate::error::{BootstrapError, Result};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use crate::tool_args::{Tool, ToolArgs};

/// A fully resolved command line.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub capture_output: bool,
}

impl Invocation {
    /// Resolve typed arguments against the configured program names.
    pub fn from_args(args: &dyn ToolArgs, tools: &ToolPaths) -> Self {
        let tool = args.tool();
        Self {
            tool,
            program: tool.program(tools).to_string(),
            args: args.to_cli_args(),
            env: args.get_env_vars(),
            capture_output: args.captures_output(),
        }
    }

    /// Value of a child environment variable.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Environment with secret values masked.
    pub fn redacted_env(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(k, v)| {
                if is_secret_key(k) {
                    format!("{}={}", k, REDACTED)
                } else {
                    format!("{}={}", k, v)
                }
            })
            .collect()
    }
}

/// Shell-like rendering; secret env values are masked.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for var in self.redacted_env() {
            write!(f, "{} ", var)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || "'\"$!".contains(c)) {
                write!(f, " '{}'", arg.replace('\'', "'\\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invocation({})", self)
    }
}

/// Output from a tool execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Captured stdout (empty unless the invocation captured output)
    pub stdout: String,
    /// Captured stderr (empty unless the invocation captured output)
    pub stderr: String,
    /// Exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Recorded but not executed
    pub dry_run: bool,
}

impl ToolOutput {
    /// Successful run with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
            success: true,
            ..Default::default()
        }
    }

    /// Failed run with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            success: false,
            ..Default::default()
        }
    }

    /// Return an error if the tool did not succeed.
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(BootstrapError::command(format!(
                "{} failed (exit code {}): {}",
                context,
                self.exit_code.unwrap_or(-1),
                self.stderr.trim()
            )))
        }
    }
}

/// Capability to run external tools.
pub trait CommandExecutor {
    /// Run one invocation to completion.
    ///
    /// `Err` means the tool could not be started; a non-zero exit is an
    /// `Ok` output with `success == false`.
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput>;

    /// True when invocations are recorded instead of executed.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Runs real processes.
///
/// Tools run in their own process group and are registered with
/// [`ChildRegistry::global`] while running. Unless output is captured, the
/// tool inherits stdout/stderr so its progress shows up in the notebook.
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .in_new_process_group();
        if invocation.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let child = cmd.spawn().map_err(|e| {
            BootstrapError::command(format!("failed to spawn {}: {}", invocation.program, e))
        })?;
        let pid = child.id();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }

        let waited = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }

        let output = waited.map_err(|e| {
            BootstrapError::command(format!("failed waiting for {}: {}", invocation.program, e))
        })?;

        let exit_code = output.status.code();
        debug!("{} exited with {:?}", invocation.program, exit_code);

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
            success: output.status.success(),
            dry_run: false,
        })
    }
}

/// Records invocations instead of running them.
///
/// Responses are queued per tool; a tool with no queued response gets a
/// successful empty output. Tools marked unavailable fail to "spawn".
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    invocations: Vec<Invocation>,
    responses: HashMap<Tool, VecDeque<ToolOutput>>,
    unavailable: Vec<Tool>,
    dry_run: bool,
    echo: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dry-run mode: print each command line to stdout and report `dry_run`.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            echo: true,
            ..Default::default()
        }
    }

    /// Queue a response for the next invocation of `tool`.
    pub fn with_response(mut self, tool: Tool, output: ToolOutput) -> Self {
        self.responses.entry(tool).or_default().push_back(output);
        self
    }

    /// Make every invocation of `tool` fail as if the program were missing.
    pub fn with_unavailable(mut self, tool: Tool) -> Self {
        self.unavailable.push(tool);
        self
    }

    /// Everything run so far, in order.
    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Invocations of one tool.
    pub fn invocations_of(&self, tool: Tool) -> Vec<&Invocation> {
        self.invocations.iter().filter(|i| i.tool == tool).collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput> {
        self.invocations.push(invocation.clone());

        if self.echo {
            println!("[DRY RUN] {}", invocation);
        }

        if self.unavailable.contains(&invocation.tool) {
            return Err(BootstrapError::command(format!(
                "failed to spawn {}: not found",
                invocation.program
            )));
        }

        let mut output = self
            .responses
            .get_mut(&invocation.tool)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| ToolOutput::ok(""));
        output.dry_run = self.dry_run;

        if self.dry_run {
            info!("[DRY RUN] Skipped: {}", invocation);
        }
        Ok(output)
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
