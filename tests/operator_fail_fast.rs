mod common;
use crate::common::{drain_stream, init_tracing, texts, RunnerBuilder, ScriptedExecutor, ScriptedOperator};

use std::sync::Arc;

use publisher::exec::{OutputSink, RunContext};
use publisher::operator::StepOperator;
use publisher::types::{Step, StepPhase};

#[tokio::test]
async fn second_sub_step_failure_skips_the_third() {
    init_tracing();
    let exec = ScriptedExecutor::new()
        .with_output("cd", &["entered /srv/site"])
        .with_output("sync", &["partial sync"])
        .fail_on("sync", 1)
        .with_output("checkout", &["never printed"]);
    let (runner, mut rx) = RunnerBuilder::new("runner-a")
        .operator(ScriptedOperator::new(
            "Sync-Operator",
            &["cd", "sync", "checkout"],
            Arc::new(exec.clone()),
        ))
        .build();

    let err = runner
        .run(&Step::new("Sync-Operator"), &RunContext::new())
        .await
        .unwrap_err();

    assert!(err.is_execution_failure());
    assert_eq!(exec.labels(), vec!["cd".to_string(), "sync".to_string()]);

    let step = runner.step(&Step::query("Sync-Operator")).unwrap();
    assert_eq!(step.phase, StepPhase::Failed);
    assert_eq!(
        step.output,
        vec!["entered /srv/site".to_string(), "partial sync".to_string()]
    );

    let streamed = texts(&drain_stream(&mut rx));
    assert_eq!(
        streamed,
        vec!["entered /srv/site".to_string(), "partial sync".to_string()]
    );
}

#[tokio::test]
async fn success_returns_every_line_in_order() {
    let exec = ScriptedExecutor::new()
        .with_output("one", &["1a", "1b"])
        .with_output("two", &["2a"]);
    let op = ScriptedOperator::new("Seq", &["one", "two"], Arc::new(exec));

    let (sink, mut rx) = OutputSink::channel(16);
    let lines = op.run(&RunContext::new(), &sink).await.unwrap();
    drop(sink);

    assert_eq!(lines, vec!["1a", "1b", "2a"]);
    let mut streamed = Vec::new();
    while let Some(line) = rx.recv().await {
        streamed.push(line);
    }
    assert_eq!(streamed, lines);
    assert_eq!(op.step().phase, StepPhase::Succeeded);
}

#[tokio::test]
async fn operator_update_replaces_the_whole_step() {
    let op = ScriptedOperator::new("Seq", &["one"], Arc::new(ScriptedExecutor::new()));
    let mut desired = Step::new("Seq").with_envs([("A", "1")]);
    desired.output = vec!["stale".to_string()];
    desired.phase = StepPhase::Unknown;

    op.update(&desired);
    assert_eq!(op.step(), desired);

    op.prepare();
    op.prepare();
    let prepared = op.step();
    assert!(prepared.output.is_empty());
    assert!(prepared.messages.is_empty());
    assert_eq!(prepared.phase, StepPhase::Unknown);
    assert_eq!(prepared.env("A"), Some("1"));
}

#[tokio::test]
async fn small_output_buffer_applies_backpressure_without_loss() {
    let lines: Vec<String> = (0..200).map(|i| format!("line {i}")).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let exec = ScriptedExecutor::new().with_output("dump", &refs);

    let (runner, mut rx) = RunnerBuilder::new("runner-a")
        .options(publisher::runner::RunnerOptions {
            output_capacity: 4,
            ..Default::default()
        })
        .stream_capacity(4)
        .operator(ScriptedOperator::new("Dump", &["dump"], Arc::new(exec)))
        .build();

    let consumer = tokio::spawn(async move {
        let mut got = Vec::new();
        while let Some(chunk) = rx.recv().await {
            got.push(chunk.text().into_owned());
        }
        got
    });

    runner.run(&Step::new("Dump"), &RunContext::new()).await.unwrap();
    drop(runner);

    assert_eq!(consumer.await.unwrap(), lines);
}
