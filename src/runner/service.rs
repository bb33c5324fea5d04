// src/runner/service.rs

//! Envelope front end for a [`Runner`]: decodes a [`Request`] by type,
//! calls the matching runner operation and encodes the reply.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::Result;
use crate::exec::RunContext;
use crate::protocol::request_type::{REGISTER, RUN, STEP, UPDATE};
use crate::protocol::{
    RegisterRequest, RegisterResponse, Request, Response, RunStepRequest, RunStepResponse,
    StepRequest, StepResponse, UpdateStepRequest, UpdateStepResponse,
};

use super::Runner;

#[derive(Debug, Clone)]
pub struct RunnerService {
    runner: Arc<Runner>,
    shutdown: CancellationToken,
    step_timeout: Option<Duration>,
}

impl RunnerService {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self {
            runner,
            shutdown: CancellationToken::new(),
            step_timeout: None,
        }
    }

    /// Runs started through this service are cancelled with `token`.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Deadline applied to every run started through this service.
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn runner(&self) -> &Arc<Runner> {
        &self.runner
    }

    /// Fresh context for one run: a child of the shutdown token plus the
    /// configured deadline.
    pub fn run_context(&self) -> RunContext {
        let ctx = RunContext::new().with_cancellation(self.shutdown.child_token());
        match self.step_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    pub fn register(&self, _req: RegisterRequest) -> Result<RegisterResponse> {
        Ok(RegisterResponse {
            runner_info: self.runner.register()?,
        })
    }

    pub async fn run(&self, req: RunStepRequest) -> Result<RunStepResponse> {
        let ctx = self.run_context();
        self.runner.run(&req.step, &ctx).await?;
        Ok(RunStepResponse {})
    }

    pub async fn update(&self, req: UpdateStepRequest) -> Result<UpdateStepResponse> {
        self.runner.update(&req.step).await?;
        Ok(UpdateStepResponse {})
    }

    pub fn step(&self, req: StepRequest) -> Result<StepResponse> {
        Ok(StepResponse {
            step: self.runner.step(&req.step)?,
        })
    }

    /// Dispatch a generic envelope. The reply carries the same type.
    pub async fn handle(&self, request: &Request) -> Result<Response> {
        debug!(runner = %self.runner.name(), kind = %request.kind, "handling request");
        match request.kind.as_str() {
            REGISTER => Response::encode(REGISTER, &self.register(request.decode()?)?),
            RUN => Response::encode(RUN, &self.run(request.decode()?).await?),
            UPDATE => Response::encode(UPDATE, &self.update(request.decode()?).await?),
            STEP => Response::encode(STEP, &self.step(request.decode()?)?),
            _ => Err(request.unknown()),
        }
    }
}
