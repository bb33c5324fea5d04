use std::sync::Arc;

use publisher::errors::Result;
use publisher::exec::{CommandExecutor, OutputSink, RunContext};
use publisher::operator::{RunFuture, StepOperator, StepState, SubSteps};
use publisher::types::Step;

/// Operator whose sub-steps are plain labels handed to an executor, in
/// order. Each label is also used as the command line.
#[derive(Debug)]
pub struct ScriptedOperator {
    state: StepState,
    sub_steps: Vec<String>,
    executor: Arc<dyn CommandExecutor>,
}

impl ScriptedOperator {
    pub fn new(name: &str, sub_steps: &[&str], executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            state: StepState::new(Step::new(name)),
            sub_steps: sub_steps.iter().map(|s| s.to_string()).collect(),
            executor,
        }
    }

    pub fn with_step(step: Step, sub_steps: &[&str], executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            state: StepState::new(step),
            sub_steps: sub_steps.iter().map(|s| s.to_string()).collect(),
            executor,
        }
    }

    async fn sub_steps(&self, ctx: &RunContext, output: &OutputSink) -> Result<Vec<String>> {
        let mut steps = SubSteps::new(&self.state, self.executor.as_ref(), ctx, output);
        for label in &self.sub_steps {
            steps.message(label);
            steps.exec(label, label).await?;
        }
        Ok(steps.finish())
    }
}

impl StepOperator for ScriptedOperator {
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
