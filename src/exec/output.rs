// src/exec/output.rs

//! Bounded output streaming for a single step run.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Interrupt, RunContext};
use crate::protocol::LogStream;

/// Default number of lines buffered between a running step and its
/// forwarder.
pub const DEFAULT_OUTPUT_CAPACITY: usize = 4096;

/// Largest accepted output buffer.
pub const MAX_OUTPUT_CAPACITY: usize = 1 << 20;

/// Producer side of a step's output channel.
///
/// Sending waits for capacity instead of dropping lines, so a slow consumer
/// applies backpressure to the running command. The wait always yields to
/// the run's cancellation and deadline.
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: Option<mpsc::Sender<String>>,
}

impl OutputSink {
    /// Capacity is clamped to `1..=MAX_OUTPUT_CAPACITY`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_OUTPUT_CAPACITY));
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that swallows everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue one line, or give up with the interrupt that stopped the run
    /// while it was waiting for capacity.
    pub async fn send(&self, line: impl Into<String>, ctx: &RunContext) -> Result<(), Interrupt> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };

        tokio::select! {
            biased;
            sent = tx.send(line.into()) => {
                if sent.is_err() {
                    debug!("output receiver dropped; discarding line");
                }
                Ok(())
            }
            reason = ctx.interrupted() => Err(reason),
        }
    }
}

/// What a forwarder did with the lines it received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardReport {
    pub forwarded: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Open,
    /// The consumer missed a stall deadline or the run was interrupted;
    /// chunks are only delivered if there is room right away.
    Stalled,
    Closed,
}

/// Spawn the forwarder that drains `rx` into `stream` as [`LogStream`]
/// chunks tagged with `(runner, step)`.
///
/// The forwarder always keeps draining `rx`, so it never holds the running
/// step back for longer than one `stall_timeout`:
/// - while the stream is open each chunk may wait up to `stall_timeout`;
/// - after the first missed deadline, or once `ctx` is interrupted, the
///   stream counts as stalled for the rest of the run and chunks that do not
///   fit immediately are dropped;
/// - after the stream closes every remaining line is dropped.
///
/// The task finishes once every sink clone is dropped.
pub fn spawn_forwarder(
    runner: String,
    step: String,
    mut rx: mpsc::Receiver<String>,
    stream: mpsc::Sender<LogStream>,
    stall_timeout: Duration,
    ctx: RunContext,
) -> JoinHandle<ForwardReport> {
    tokio::spawn(async move {
        let mut report = ForwardReport::default();
        let mut state = StreamState::Open;

        while let Some(line) = rx.recv().await {
            let chunk = LogStream::new(&runner, &step, line);
            let next = match state {
                StreamState::Closed => Err(StreamState::Closed),
                StreamState::Stalled => match stream.try_send(chunk) {
                    Ok(()) => Ok(()),
                    Err(TrySendError::Full(_)) => Err(StreamState::Stalled),
                    Err(TrySendError::Closed(_)) => Err(StreamState::Closed),
                },
                StreamState::Open => tokio::select! {
                    biased;
                    sent = stream.send_timeout(chunk, stall_timeout) => match sent {
                        Ok(()) => Ok(()),
                        Err(SendTimeoutError::Timeout(_)) => Err(StreamState::Stalled),
                        Err(SendTimeoutError::Closed(_)) => Err(StreamState::Closed),
                    },
                    _ = ctx.interrupted() => Err(StreamState::Stalled),
                },
            };

            match next {
                Ok(()) => report.forwarded += 1,
                Err(next) => {
                    report.dropped += 1;
                    if next != state {
                        match next {
                            StreamState::Closed => warn!(
                                runner = %runner,
                                step = %step,
                                "log stream closed; discarding remaining output"
                            ),
                            _ => warn!(
                                runner = %runner,
                                step = %step,
                                "log stream consumer stalled; dropping output it cannot take"
                            ),
                        }
                        state = next;
                    }
                }
            }
        }

        debug!(
            runner = %runner,
            step = %step,
            forwarded = report.forwarded,
            dropped = report.dropped,
            "output forwarder finished"
        );
        report
    })
}
