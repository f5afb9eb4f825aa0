//! External process runner
//!
//! Every container engine and registry CLI call goes through [`ProcessRunner`].
//! A child's success or failure is decided only by its exit code.

use crate::error::ProcessError;
use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;

/// How the child's standard streams are wired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoPolicy {
    /// Child shares the caller's stdin/stdout/stderr, output shows up live
    #[default]
    Inherit,
    /// Child streams are discarded
    Null,
}

/// A single command to spawn. Built right before spawning and consumed by the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub command: String,
    pub args: Vec<String>,
    pub io: IoPolicy,
}

impl ProcessInvocation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            io: IoPolicy::Inherit,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn io(mut self, io: IoPolicy) -> Self {
        self.io = io;
        self
    }
}

impl fmt::Display for ProcessInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the invocation to completion. `Ok` iff the exit code is 0.
    async fn run(&self, invocation: ProcessInvocation) -> Result<(), ProcessError>;
}

/// Runs invocations with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, invocation: ProcessInvocation) -> Result<(), ProcessError> {
        let command_line = invocation.to_string();
        tracing::debug!("Running: {}", command_line);

        let mut cmd = Command::new(&invocation.command);
        cmd.args(&invocation.args);
        match invocation.io {
            IoPolicy::Inherit => {
                cmd.stdin(Stdio::inherit());
                cmd.stdout(Stdio::inherit());
                cmd.stderr(Stdio::inherit());
            }
            IoPolicy::Null => {
                cmd.stdin(Stdio::null());
                cmd.stdout(Stdio::null());
                cmd.stderr(Stdio::null());
            }
        }

        let status = cmd.status().await.map_err(|source| ProcessError::Spawn {
            command: invocation.command.clone(),
            source,
        })?;

        if status.success() {
            tracing::debug!("Finished: {}", command_line);
            Ok(())
        } else {
            // killed by a signal: no exit code
            let code = status.code().unwrap_or(-1);
            tracing::warn!(code, "Command failed: {}", command_line);
            Err(ProcessError::Failure {
                command: command_line,
                code,
            })
        }
    }
}

/// Records invocations instead of running them (`--dry-run`)
#[derive(Debug, Default)]
pub struct DryRunRunner {
    invocations: Mutex<Vec<ProcessInvocation>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invocations seen so far, in the order they were issued
    pub fn invocations(&self) -> Vec<ProcessInvocation> {
        self.invocations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProcessRunner for DryRunRunner {
    async fn run(&self, invocation: ProcessInvocation) -> Result<(), ProcessError> {
        tracing::info!("[dry-run] {}", invocation);
        if let Ok(mut guard) = self.invocations.lock() {
            guard.push(invocation);
        }
        Ok(())
    }
}
