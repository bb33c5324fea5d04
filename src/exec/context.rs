// src/exec/context.rs

use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::errors::PublisherError;

/// Why a running step was stopped from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    DeadlineElapsed,
}

impl Interrupt {
    pub fn into_step_error(self, step: &str) -> PublisherError {
        match self {
            Interrupt::Cancelled => PublisherError::Cancelled(step.to_string()),
            Interrupt::DeadlineElapsed => PublisherError::TimedOut(step.to_string()),
        }
    }
}

/// Bounds a single step run: an explicit cancellation token plus an
/// optional deadline. Clones share the same token.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The interrupt that already applies, if any.
    pub fn interrupt(&self) -> Option<Interrupt> {
        if self.cancel.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupt::DeadlineElapsed),
            _ => None,
        }
    }

    /// Resolves once the run must stop. Never resolves for a context with no
    /// deadline that is never cancelled.
    pub async fn interrupted(&self) -> Interrupt {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancel.cancelled() => Interrupt::Cancelled,
                _ = sleep_until(deadline) => Interrupt::DeadlineElapsed,
            },
            None => {
                self.cancel.cancelled().await;
                Interrupt::Cancelled
            }
        }
    }
}
