// src/registry/control.rs

//! Control-plane request handling on top of a shared [`Registry`].

use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::protocol::request_type::{LIST_GROUP_NAME, LIST_NAMESPACE, LIST_TASK, REGISTER_RUNNER};
use crate::protocol::{
    ListGroupNameRequest, ListGroupNameResponse, ListNamespaceRequest, ListNamespaceResponse,
    ListTaskRequest, ListTaskResponse, RegisterRunnerRequest, RegisterRunnerResponse, Request,
    Response,
};

use super::Registry;

#[derive(Debug, Clone, Default)]
pub struct ControlPlane {
    registry: Arc<Registry>,
}

impl ControlPlane {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn register_runner(&self, req: RegisterRunnerRequest) -> Result<RegisterRunnerResponse> {
        self.registry.register_runner(req.runner_info)?;
        Ok(RegisterRunnerResponse {})
    }

    pub fn list_namespace(&self, _req: ListNamespaceRequest) -> Result<ListNamespaceResponse> {
        Ok(ListNamespaceResponse {
            items: self.registry.list_namespace()?,
        })
    }

    pub fn list_group_name(&self, req: ListGroupNameRequest) -> Result<ListGroupNameResponse> {
        Ok(ListGroupNameResponse {
            items: self.registry.list_group_name(&req.namespace)?,
        })
    }

    pub fn list_task(&self, req: ListTaskRequest) -> Result<ListTaskResponse> {
        Ok(ListTaskResponse {
            tasks: self.registry.list_task(&req.namespace, &req.group_name)?,
        })
    }

    /// Dispatch a generic envelope. The reply carries the same type.
    pub fn handle(&self, request: &Request) -> Result<Response> {
        debug!(kind = %request.kind, "control plane request");
        match request.kind.as_str() {
            REGISTER_RUNNER => {
                Response::encode(REGISTER_RUNNER, &self.register_runner(request.decode()?)?)
            }
            LIST_NAMESPACE => {
                Response::encode(LIST_NAMESPACE, &self.list_namespace(request.decode()?)?)
            }
            LIST_GROUP_NAME => {
                Response::encode(LIST_GROUP_NAME, &self.list_group_name(request.decode()?)?)
            }
            LIST_TASK => Response::encode(LIST_TASK, &self.list_task(request.decode()?)?),
            _ => Err(request.unknown()),
        }
    }
}
