#![allow(dead_code)]

pub use publisher_test_utils::{
    drain_stream, init_tracing, with_timeout, RunnerBuilder, ScriptedExecutor, ScriptedOperator,
    StepBuilder,
};

use publisher::protocol::LogStream;
use publisher::runner::Runner;
use publisher::types::{Step, StepPhase};

/// Phase of every step on `runner`, in operator order.
pub fn phases(runner: &Runner) -> Vec<(String, StepPhase)> {
    runner
        .step_names()
        .into_iter()
        .map(|name| {
            let phase = runner.step(&Step::query(&name)).unwrap().phase;
            (name, phase)
        })
        .collect()
}

/// Text of each streamed chunk, in arrival order.
pub fn texts(chunks: &[LogStream]) -> Vec<String> {
    chunks.iter().map(|c| c.text().into_owned()).collect()
}
