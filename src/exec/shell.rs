// src/exec/shell.rs

//! Production executor: runs sub-step command lines through the platform
//! shell and streams their output line by line.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

use super::{CommandError, CommandExecutor, Interrupt, OutputSink, RunContext};

#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute<'a>(
        &'a self,
        label: &'a str,
        command: &'a str,
        ctx: &'a RunContext,
        output: &'a OutputSink,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, CommandError>> + Send + 'a>> {
        Box::pin(run_command(label, command, ctx, output))
    }
}

async fn run_command(
    label: &str,
    command: &str,
    ctx: &RunContext,
    output: &OutputSink,
) -> Result<Vec<String>, CommandError> {
    if let Some(reason) = ctx.interrupt() {
        return Err(CommandError::Interrupted {
            label: label.to_string(),
            reason,
            output: Vec::new(),
        });
    }

    info!(sub_step = %label, "starting sub-step");
    trace!(sub_step = %label, cmd = %command, "sub-step command line");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for sub-step '{label}'"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("no stdout pipe for sub-step '{label}'"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("no stderr pipe for sub-step '{label}'"))?;

    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut out_open = true;
    let mut err_open = true;
    let mut collected = Vec::new();

    let interrupted = ctx.interrupted();
    tokio::pin!(interrupted);

    // Both pipes are drained until EOF so the child never blocks on a full
    // buffer; each line is streamed as soon as it is read. Waiting on a full
    // sink still yields to the interrupt.
    while out_open || err_open {
        tokio::select! {
            line = out_lines.next_line(), if out_open => match line {
                Ok(Some(line)) => {
                    collected.push(line.clone());
                    if let Err(reason) = output.send(line, ctx).await {
                        return Err(abort(&mut child, label, reason, collected).await);
                    }
                }
                Ok(None) => out_open = false,
                Err(e) => {
                    warn!(sub_step = %label, error = %e, "failed reading stdout");
                    out_open = false;
                }
            },
            line = err_lines.next_line(), if err_open => match line {
                Ok(Some(line)) => {
                    debug!(sub_step = %label, "stderr: {}", line);
                    collected.push(line.clone());
                    if let Err(reason) = output.send(line, ctx).await {
                        return Err(abort(&mut child, label, reason, collected).await);
                    }
                }
                Ok(None) => err_open = false,
                Err(e) => {
                    warn!(sub_step = %label, error = %e, "failed reading stderr");
                    err_open = false;
                }
            },
            reason = &mut interrupted => {
                return Err(abort(&mut child, label, reason, collected).await);
            }
        }
    }

    let status = tokio::select! {
        status = child.wait() => status
            .with_context(|| format!("waiting for process of sub-step '{label}'"))?,
        reason = &mut interrupted => {
            return Err(abort(&mut child, label, reason, collected).await);
        }
    };

    let code = status.code().unwrap_or(-1);
    info!(
        sub_step = %label,
        exit_code = code,
        success = status.success(),
        "sub-step process exited"
    );

    if status.success() {
        Ok(collected)
    } else {
        Err(CommandError::Exit {
            label: label.to_string(),
            code,
            output: collected,
        })
    }
}

async fn abort(
    child: &mut Child,
    label: &str,
    reason: Interrupt,
    output: Vec<String>,
) -> CommandError {
    info!(sub_step = %label, ?reason, "run interrupted; killing sub-step process");
    if let Err(e) = child.kill().await {
        warn!(
            sub_step = %label,
            error = %e,
            "failed to kill child process on interrupt"
        );
    }
    CommandError::Interrupted {
        label: label.to_string(),
        reason,
        output,
    }
}
