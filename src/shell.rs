// src/shell.rs

//! Process-runner capability for dependency bodies.
//!
//! The engine itself is agnostic to what a body does; this module is the
//! convenience most bodies reach for: running external commands with
//! optional environment/workdir overrides, wired to the run's cancellation
//! token. Child processes are killed when the run is cancelled.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context as _, bail};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::context::RunContext;
use crate::errors::Result;

/// Configured command runner. Cheap to clone and derive variants from.
#[derive(Debug, Clone, Default)]
pub struct Shell {
    env: HashMap<String, String>,
    workdir: Option<PathBuf>,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one environment variable on top of the inherited environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Run commands from this directory instead of the current one.
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Run a command, streaming its output to the parent's stdout/stderr.
    pub async fn run(&self, ctx: &RunContext, cmd: &str, args: &[&str]) -> Result<()> {
        info!(cmd = %cmd, args = ?args, "exec");
        let mut child = self
            .command(cmd, args)
            .spawn()
            .with_context(|| format!("spawning process for {cmd:?}"))?;
        let status = self.wait(ctx, &mut child, cmd).await?;

        if status.success() {
            return Ok(());
        }
        bail!(
            "running \"{cmd} {}\" failed with exit code {}",
            args.join(" "),
            status.code().unwrap_or(-1)
        );
    }

    /// Run a command and capture its stdout, trimmed of trailing newlines.
    pub async fn output(&self, ctx: &RunContext, cmd: &str, args: &[&str]) -> Result<String> {
        info!(cmd = %cmd, args = ?args, "exec (capturing stdout)");
        let child = self
            .command(cmd, args)
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning process for {cmd:?}"))?;

        // The child is owned by the wait future; cancellation drops it and
        // kill_on_drop reaps the process.
        let out = tokio::select! {
            out = child.wait_with_output() => {
                out.with_context(|| format!("waiting for process of {cmd:?}"))?
            }
            _ = ctx.cancelled() => bail!("running {cmd:?} cancelled"),
        };

        if !out.status.success() {
            bail!(
                "running \"{cmd} {}\" failed with exit code {}",
                args.join(" "),
                out.status.code().unwrap_or(-1)
            );
        }
        let stdout = String::from_utf8(out.stdout).context("decoding command stdout")?;
        Ok(stdout.trim_end_matches('\n').to_string())
    }

    /// Run a multi-line script through the platform shell.
    ///
    /// Lines are joined with newlines and piped to the shell's stdin;
    /// callers prepend their own `set -euo pipefail` style preamble.
    pub async fn script(&self, ctx: &RunContext, lines: &[&str]) -> Result<()> {
        let script = lines.join("\n");
        debug!(script = %script, "running script");

        let (shell, args): (&str, &[&str]) = if cfg!(windows) {
            ("cmd", &["/Q"])
        } else {
            ("sh", &[])
        };

        let mut child = self
            .command(shell, args)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning {shell:?} for script"))?;

        {
            let mut stdin = child.stdin.take().context("script shell has no stdin")?;
            stdin
                .write_all(script.as_bytes())
                .await
                .context("writing script to shell stdin")?;
        }

        let status = self.wait(ctx, &mut child, shell).await?;
        if status.success() {
            return Ok(());
        }
        bail!(
            "script failed with exit code {}",
            status.code().unwrap_or(-1)
        );
    }

    fn command(&self, cmd: &str, args: &[&str]) -> Command {
        let mut command = Command::new(cmd);
        command.args(args).envs(&self.env).kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }
        command
    }

    async fn wait(
        &self,
        ctx: &RunContext,
        child: &mut tokio::process::Child,
        label: &str,
    ) -> Result<std::process::ExitStatus> {
        tokio::select! {
            status = child.wait() => {
                status.with_context(|| format!("waiting for process of {label:?}"))
            }
            _ = ctx.cancelled() => {
                let _ = child.kill().await;
                bail!("running {label:?} cancelled")
            }
        }
    }
}
