// src/operator/svn.rs

//! Subversion working copy management. `PUBLISHER_SVN_COMMAND` picks the
//! sequence: refresh the checkout, or add and commit local changes.

use std::sync::Arc;

use crate::config::SvnOperatorConfig;
use crate::errors::{PublisherError, Result};
use crate::exec::{shell_quote, CommandExecutor, OutputSink, RunContext};
use crate::types::envs::{
    PUBLISHER_SVN_COMMAND, PUBLISHER_SVN_COMMIT_MESSAGE, PUBLISHER_SVN_HOST,
    PUBLISHER_SVN_PASSWORD, PUBLISHER_SVN_PORT, PUBLISHER_SVN_REMOTE_DIR,
    PUBLISHER_SVN_USERNAME, PUBLISHER_SVN_WORK_DIR,
};
use crate::types::Step;

use super::{RunFuture, StepOperator, StepState, SubSteps};

pub const SVN_OPERATOR_NAME: &str = "SVN-Operator";

pub const SVN_COMMAND_WAITING: &str = "pulling and waiting";
pub const SVN_COMMAND_COMMITTING: &str = "adding and committing";

const SVN_ACTION_CD: &str = "cd";
const SVN_ACTION_REVERT_ALL: &str = "revert all";
const SVN_ACTION_REMOVE_ALL: &str = "remove all";
const SVN_ACTION_CHECKOUT: &str = "checkout";
const SVN_ACTION_ADD_ALL: &str = "add all";
const SVN_ACTION_COMMIT: &str = "commit";

#[derive(Debug)]
pub struct SvnOperator {
    state: StepState,
    executor: Arc<dyn CommandExecutor>,
}

/// Everything a run needs, resolved from envs up front.
struct SvnSettings {
    work_dir: String,
    repo_dir: String,
    auth: String,
    url: String,
    username: String,
    commit_message: String,
}

impl SvnOperator {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        remote_dir: &str,
        work_dir: &str,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        let port = port.to_string();
        let step = Step::new(SVN_OPERATOR_NAME).with_envs([
            (PUBLISHER_SVN_HOST, host),
            (PUBLISHER_SVN_PORT, port.as_str()),
            (PUBLISHER_SVN_USERNAME, username),
            (PUBLISHER_SVN_PASSWORD, password),
            (PUBLISHER_SVN_REMOTE_DIR, remote_dir),
            (PUBLISHER_SVN_WORK_DIR, work_dir),
            (PUBLISHER_SVN_COMMIT_MESSAGE, "svn commit"),
            (PUBLISHER_SVN_COMMAND, SVN_COMMAND_WAITING),
        ]);
        Self {
            state: StepState::new(step),
            executor,
        }
    }

    pub fn from_config(cfg: &SvnOperatorConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        let op = Self::new(
            &cfg.host,
            cfg.port,
            &cfg.username,
            &cfg.password,
            &cfg.remote_dir,
            &cfg.work_dir,
            executor,
        );
        op.state.update_with(|step| {
            if let Some(name) = &cfg.name {
                step.name = name.clone();
            }
            step.policy = cfg.policy;
            if let Some(message) = &cfg.commit_message {
                step.envs
                    .insert(PUBLISHER_SVN_COMMIT_MESSAGE.to_string(), message.clone());
            }
            if let Some(command) = &cfg.command {
                step.envs
                    .insert(PUBLISHER_SVN_COMMAND.to_string(), command.clone());
            }
            for (k, v) in &cfg.envs {
                step.envs.entry(k.clone()).or_insert_with(|| v.clone());
            }
        });
        op
    }

    fn settings(&self) -> Result<SvnSettings> {
        let host = self.state.require_env(PUBLISHER_SVN_HOST)?;
        let port = self.state.require_env(PUBLISHER_SVN_PORT)?;
        let port: u16 = port.trim().parse().map_err(|e| {
            PublisherError::Configuration(format!(
                "step '{}': {PUBLISHER_SVN_PORT} = \"{port}\": {e}",
                self.state.name()
            ))
        })?;
        let username = self.state.require_env(PUBLISHER_SVN_USERNAME)?;
        let password = self.state.require_env(PUBLISHER_SVN_PASSWORD)?;
        let remote_dir = self.state.require_env(PUBLISHER_SVN_REMOTE_DIR)?;
        let work_dir = self.state.require_env(PUBLISHER_SVN_WORK_DIR)?;
        let commit_message = self
            .state
            .env(PUBLISHER_SVN_COMMIT_MESSAGE)
            .unwrap_or_else(|| "svn commit".to_string());

        Ok(SvnSettings {
            repo_dir: shell_quote(&format!("{work_dir}/{remote_dir}")),
            work_dir: shell_quote(&work_dir),
            auth: format!(
                "--username {} --password {}",
                shell_quote(&username),
                shell_quote(&password)
            ),
            url: shell_quote(&format!("svn://{username}@{host}:{port}/{remote_dir}")),
            username,
            commit_message,
        })
    }

    async fn sub_steps(&self, ctx: &RunContext, output: &OutputSink) -> Result<Vec<String>> {
        let command = self.state.env(PUBLISHER_SVN_COMMAND).unwrap_or_default();
        let s = self.settings()?;
        let mut steps = SubSteps::new(&self.state, self.executor.as_ref(), ctx, output);

        match command.as_str() {
            SVN_COMMAND_WAITING => {
                steps.message(SVN_COMMAND_WAITING);

                steps.message(SVN_ACTION_CD);
                steps.exec(SVN_ACTION_CD, &format!("cd {}", s.work_dir)).await?;

                steps.message(SVN_ACTION_REVERT_ALL);
                steps
                    .exec(
                        SVN_ACTION_REVERT_ALL,
                        &format!(
                            "cd {} && svn {auth} status | awk '{{print $2}}' | xargs -r svn {auth} revert --depth infinity",
                            s.repo_dir,
                            auth = s.auth
                        ),
                    )
                    .await?;

                steps.message(SVN_ACTION_REMOVE_ALL);
                steps
                    .exec(
                        SVN_ACTION_REMOVE_ALL,
                        &format!(
                            "cd {} && svn {} status | grep '^?' | awk '{{print $2}}' | xargs -r rm -rf",
                            s.repo_dir, s.auth
                        ),
                    )
                    .await?;

                steps.message(SVN_ACTION_CHECKOUT);
                steps
                    .exec(
                        SVN_ACTION_CHECKOUT,
                        &format!("cd {} && svn {} checkout {}", s.work_dir, s.auth, s.url),
                    )
                    .await?;
            }
            SVN_COMMAND_COMMITTING => {
                steps.message(SVN_COMMAND_COMMITTING);

                steps.message(SVN_ACTION_ADD_ALL);
                steps
                    .exec(
                        SVN_ACTION_ADD_ALL,
                        &format!(
                            "cd {} && svn {auth} status | grep '^?' | awk '{{print $2}}' | xargs -r svn {auth} add",
                            s.repo_dir,
                            auth = s.auth
                        ),
                    )
                    .await?;

                steps.message(SVN_ACTION_COMMIT);
                let message = format!(
                    "{} - committed by {}@publisher",
                    s.commit_message, s.username
                );
                steps
                    .exec(
                        SVN_ACTION_COMMIT,
                        &format!(
                            "cd {} && svn {} commit --message {}",
                            s.repo_dir,
                            s.auth,
                            shell_quote(&message)
                        ),
                    )
                    .await?;
            }
            other => {
                return Err(PublisherError::Configuration(format!(
                    "step '{}': unknown {PUBLISHER_SVN_COMMAND} \"{other}\"",
                    steps.step_name()
                )));
            }
        }

        Ok(steps.finish())
    }
}

impl StepOperator for SvnOperator {
    fn step(&self) -> Step {
        self.state.snapshot()
    }

    fn update(&self, desired: &Step) {
        self.state.replace(desired);
    }

    fn prepare(&self) {
        self.state.reset_transient();
    }

    fn run<'a>(&'a self, ctx: &'a RunContext, output: &'a OutputSink) -> RunFuture<'a> {
        Box::pin(self.state.run_with(self.sub_steps(ctx, output)))
    }
}
