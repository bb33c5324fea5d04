// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod operator;
pub mod protocol;
pub mod registry;
pub mod runner;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile, OperatorConfig};
use crate::exec::ShellExecutor;
use crate::protocol::{LogStream, RegisterRunnerRequest, RunStepRequest};
use crate::runner::{Runner, RunnerService};
use crate::types::Step;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the runner and its operators over a shell executor
/// - an stdout printer for the runner's log stream
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let (stream_tx, mut stream_rx) = mpsc::channel::<LogStream>(cfg.runner.output_capacity);
    let runner = Runner::from_config(&cfg, Arc::new(ShellExecutor::new()), stream_tx)?;

    if args.register {
        let request = RegisterRunnerRequest {
            runner_info: runner.register()?,
        };
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let Some(step_name) = args.step.clone() else {
        info!(runner = %runner.name(), steps = ?runner.step_names(), "nothing to run; pass --step NAME");
        return Ok(());
    };

    // Ctrl-C → cancel the running step.
    let shutdown = CancellationToken::new();
    {
        let token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; cancelling step");
            token.cancel();
        });
    }

    let printer = tokio::spawn(async move {
        while let Some(chunk) = stream_rx.recv().await {
            println!("[{}/{}] {}", chunk.runner, chunk.step, chunk.text());
        }
    });

    let service = RunnerService::new(Arc::new(runner))
        .with_shutdown(shutdown)
        .with_step_timeout(args.timeout.or(cfg.step_timeout));

    let mut desired = service.runner().step(&Step::query(&step_name))?;
    desired.envs.extend(args.envs.iter().cloned());

    let result = service.run(RunStepRequest { step: desired }).await;
    let finished = service.runner().step(&Step::query(&step_name))?;

    // The printer ends once the runner, and with it the stream sender, is gone.
    drop(service);
    if let Err(e) = printer.await {
        warn!(error = %e, "output printer aborted");
    }

    info!(step = %finished.name, phase = ?finished.phase, "step finished");
    for message in &finished.messages {
        debug!(step = %finished.name, "{message}");
    }

    result?;
    Ok(())
}

/// Simple dry-run output: print the runner identity and its operators.
fn print_dry_run(cfg: &ConfigFile) {
    println!("publisher dry-run");
    println!("  runner.name = {}", cfg.runner.name);
    println!("  runner.hostname = {}", cfg.runner.resolved_hostname());
    println!("  runner.namespace = {}", cfg.runner.namespace);
    println!("  runner.group_name = {}", cfg.runner.group_name);
    println!("  runner.output_capacity = {}", cfg.runner.output_capacity);
    println!("  runner.stream_stall_timeout = {:?}", cfg.stream_stall_timeout);
    if let Some(timeout) = cfg.step_timeout {
        println!("  runner.step_timeout = {timeout:?}");
    }
    println!();

    println!("operators ({}):", cfg.operator.len());
    for op in &cfg.operator {
        println!("  - {} ({})", op.step_name(), op.kind());
        match op {
            OperatorConfig::Git(git) => {
                println!("      project_dir: {}", git.project_dir);
                println!("      branch: {}", git.branch);
            }
            OperatorConfig::Svn(svn) => {
                println!("      url: svn://{}:{}/{}", svn.host, svn.port, svn.remote_dir);
                println!("      work_dir: {}", svn.work_dir);
                if let Some(command) = &svn.command {
                    println!("      command: {command}");
                }
            }
            OperatorConfig::Ftp(ftp) => {
                println!("      url: ftp://{}:{}/{}", ftp.host, ftp.port, ftp.work_dir);
                println!("      timeout: {}s", ftp.timeout);
                if let Some(mark) = &ftp.mkdir {
                    println!("      mkdir: {mark}");
                }
            }
        }
        println!("      policy: {:?}", op.policy());
    }

    debug!("dry-run complete (no execution)");
}
