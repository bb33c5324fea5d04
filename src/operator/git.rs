// src/operator/git.rs

//! Version-control sync: reset a working copy and move it to the tip of a
//! remote branch.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::config::GitOperatorConfig;
use crate::errors::{PublisherError, Result};
use crate::exec::{shell_quote, CommandExecutor, OutputSink, RunContext};
use crate::types::envs::{PUBLISHER_GIT_BRANCH, PUBLISHER_PROJECT_DIR};
use crate::types::{Step, StepAvailability};

use super::{RunFuture, StepOperator, StepState, SubSteps};

pub const GIT_OPERATOR_NAME: &str = "Git-Operator";

static BRANCH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").expect("branch name pattern is valid")
});

#[derive(Debug)]
pub struct GitOperator {
    state: StepState,
    executor: Arc<dyn CommandExecutor>,
}

impl GitOperator {
    pub fn new(project_dir: &str, branch: &str, executor: Arc<dyn CommandExecutor>) -> Self {
        Self::named(GIT_OPERATOR_NAME, project_dir, branch, executor)
    }

    pub fn named(
        name: &str,
        project_dir: &str,
        branch: &str,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        let mut step = Step::new(name).with_envs([
            (PUBLISHER_PROJECT_DIR, project_dir),
            (PUBLISHER_GIT_BRANCH, branch),
        ]);
        step.available = StepAvailability::Enable;
        Self {
            state: StepState::new(step),
            executor,
        }
    }

    pub fn from_config(cfg: &GitOperatorConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        let name = cfg.name.as_deref().unwrap_or(GIT_OPERATOR_NAME);
        let op = Self::named(name, &cfg.project_dir, &cfg.branch, executor);
        op.state.update_with(|step| {
            step.policy = cfg.policy;
            for (k, v) in &cfg.envs {
                step.envs.entry(k.clone()).or_insert_with(|| v.clone());
            }
        });
        op
    }

    fn branch(&self) -> Result<String> {
        let branch = self.state.require_env(PUBLISHER_GIT_BRANCH)?;
        if !BRANCH_NAME.is_match(&branch) || branch.contains("..") {
            return Err(PublisherError::Configuration(format!(
                "step '{}': invalid git branch name '{branch}'",
                self.state.name()
            )));
        }
        Ok(branch)
    }

    async fn sub_steps(&self, ctx: &RunContext, output: &OutputSink) -> Result<Vec<String>> {
        // Resolve settings before any command runs.
        let dir = shell_quote(&self.state.require_env(PUBLISHER_PROJECT_DIR)?);
        let branch = self.branch()?;

        let mut steps = SubSteps::new(&self.state, self.executor.as_ref(), ctx, output);
        steps.exec("cd", &format!("cd {dir}")).await?;
        steps
            .exec(
                "revert",
                &format!("cd {dir} && git add --all && git checkout -f && git reset --hard"),
            )
            .await?;
        steps
            .exec(
                "checkout",
                &format!("cd {dir} && git checkout -B {branch} --track remotes/origin/{branch}"),
            )
            .await?;
        steps.exec("pull", &format!("cd {dir} && git pull")).await?;
        Ok(steps.finish())
    }
}

impl StepOperator for GitOperator {
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
