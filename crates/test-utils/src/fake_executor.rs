use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use publisher::exec::{CommandError, CommandExecutor, OutputSink, RunContext};

/// One recorded `execute` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    pub label: String,
    pub command: String,
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<ExecutedCommand>,
    outputs: HashMap<String, Vec<String>>,
    failures: HashMap<String, i32>,
    delays: HashMap<String, Duration>,
    hangs: Vec<String>,
}

/// A fake executor that:
/// - records every command it is asked to run, in order
/// - streams scripted lines for a label to the sink
/// - fails, sleeps or hangs on chosen labels
///
/// Sleeping and hanging labels honour the run context, so cancellation and
/// deadlines behave like the shell executor.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    script: Arc<Mutex<Script>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(self, label: &str, lines: &[&str]) -> Self {
        self.script.lock().unwrap().outputs.insert(
            label.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    /// Exit with `code` after streaming the label's output.
    pub fn fail_on(self, label: &str, code: i32) -> Self {
        self.script
            .lock()
            .unwrap()
            .failures
            .insert(label.to_string(), code);
        self
    }

    pub fn delay_on(self, label: &str, delay: Duration) -> Self {
        self.script
            .lock()
            .unwrap()
            .delays
            .insert(label.to_string(), delay);
        self
    }

    /// Block until the run context is cancelled or its deadline passes.
    pub fn hang_on(self, label: &str) -> Self {
        self.script.lock().unwrap().hangs.push(label.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ExecutedCommand> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.label).collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute<'a>(
        &'a self,
        label: &'a str,
        command: &'a str,
        ctx: &'a RunContext,
        output: &'a OutputSink,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, CommandError>> + Send + 'a>> {
        let (lines, failure, delay, hang) = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(ExecutedCommand {
                label: label.to_string(),
                command: command.to_string(),
            });
            (
                script.outputs.get(label).cloned().unwrap_or_default(),
                script.failures.get(label).copied(),
                script.delays.get(label).copied(),
                script.hangs.iter().any(|h| h == label),
            )
        };

        Box::pin(async move {
            if let Some(reason) = ctx.interrupt() {
                return Err(CommandError::Interrupted {
                    label: label.to_string(),
                    reason,
                    output: Vec::new(),
                });
            }

            for (sent, line) in lines.iter().enumerate() {
                if let Err(reason) = output.send(line.clone(), ctx).await {
                    return Err(CommandError::Interrupted {
                        label: label.to_string(),
                        reason,
                        output: lines[..=sent].to_vec(),
                    });
                }
            }

            if hang {
                let reason = ctx.interrupted().await;
                return Err(CommandError::Interrupted {
                    label: label.to_string(),
                    reason,
                    output: lines,
                });
            }

            if let Some(delay) = delay {
                tokio::select! {
                    reason = ctx.interrupted() => {
                        return Err(CommandError::Interrupted {
                            label: label.to_string(),
                            reason,
                            output: lines,
                        });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match failure {
                Some(code) => Err(CommandError::Exit {
                    label: label.to_string(),
                    code,
                    output: lines,
                }),
                None => Ok(lines),
            }
        })
    }
}
