mod common;
use crate::common::{drain_stream, texts, RunnerBuilder, ScriptedExecutor, ScriptedOperator, StepBuilder};

use std::sync::Arc;
use std::time::Duration;

use publisher::errors::PublisherError;
use publisher::protocol::request_type::{
    LIST_GROUP_NAME, LIST_NAMESPACE, LIST_TASK, REGISTER, REGISTER_RUNNER, RUN, STEP, UPDATE,
};
use publisher::protocol::{
    ListGroupNameRequest, ListGroupNameResponse, ListNamespaceRequest, ListNamespaceResponse,
    ListTaskRequest, ListTaskResponse, RegisterRequest, RegisterResponse, RegisterRunnerRequest,
    Request, RunStepRequest, StepRequest, StepResponse, UpdateStepRequest,
};
use publisher::registry::{ControlPlane, Registry};
use publisher::runner::RunnerService;
use publisher::types::{Step, StepPhase};

fn service(exec: ScriptedExecutor) -> (RunnerService, tokio::sync::mpsc::Receiver<publisher::protocol::LogStream>) {
    let (runner, rx) = RunnerBuilder::new("runner-a")
        .namespace("prod")
        .group("web")
        .operator(ScriptedOperator::new("Deploy", &["fetch", "unpack"], Arc::new(exec)))
        .build();
    (RunnerService::new(Arc::new(runner)), rx)
}

#[tokio::test]
async fn runner_envelope_round_trip_register_update_run_step() {
    let exec = ScriptedExecutor::new().with_output("unpack", &["unpacked 3 files"]);
    let (svc, mut rx) = service(exec);

    let reply = svc
        .handle(&Request::encode(REGISTER, &RegisterRequest {}).unwrap())
        .await
        .unwrap();
    assert_eq!(reply.kind, REGISTER);
    let registered: RegisterResponse = reply.decode().unwrap();
    assert_eq!(registered.runner_info.name, "runner-a");
    assert_eq!(registered.runner_info.steps.len(), 1);

    let desired = StepBuilder::new("Deploy").env("TARGET", "blue").build();
    svc.handle(&Request::encode(UPDATE, &UpdateStepRequest { step: desired.clone() }).unwrap())
        .await
        .unwrap();

    svc.handle(&Request::encode(RUN, &RunStepRequest { step: desired }).unwrap())
        .await
        .unwrap();

    let reply = svc
        .handle(&Request::encode(STEP, &StepRequest { step: Step::query("Deploy") }).unwrap())
        .await
        .unwrap();
    let StepResponse { step } = reply.decode().unwrap();
    assert_eq!(step.phase, StepPhase::Succeeded);
    assert_eq!(step.env("TARGET"), Some("blue"));
    assert_eq!(texts(&drain_stream(&mut rx)), vec!["unpacked 3 files".to_string()]);
}

#[tokio::test]
async fn runner_envelope_errors_propagate() {
    let (svc, _rx) = service(ScriptedExecutor::new().fail_on("fetch", 7));

    let err = svc
        .handle(&Request::encode(RUN, &RunStepRequest { step: Step::new("Deploy") }).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_execution_failure());

    let err = svc
        .handle(&Request::encode(STEP, &StepRequest { step: Step::query("Missing") }).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, PublisherError::StepOperatorNotFound(_)));

    let err = svc
        .handle(&Request { kind: "reboot".into(), data: Vec::new() })
        .await
        .unwrap_err();
    assert!(matches!(err, PublisherError::UnknownRequestType(ref t) if t == "reboot"));

    let err = svc
        .handle(&Request { kind: RUN.into(), data: b"not json".to_vec() })
        .await
        .unwrap_err();
    assert!(matches!(err, PublisherError::JsonError(_)));
}

#[tokio::test]
async fn service_timeout_applies_to_runs() {
    let (svc, _rx) = service(ScriptedExecutor::new().hang_on("fetch"));
    let svc = svc.with_step_timeout(Some(Duration::from_millis(50)));

    let err = svc
        .run(RunStepRequest { step: Step::new("Deploy") })
        .await
        .unwrap_err();
    assert!(matches!(err, PublisherError::TimedOut(_)));
}

#[tokio::test]
async fn control_plane_envelope_registers_and_lists() {
    let control = ControlPlane::new(Arc::new(Registry::new()));
    let (svc, _rx) = service(ScriptedExecutor::new());
    let info = svc.runner().register().unwrap();

    let reply = control
        .handle(&Request::encode(REGISTER_RUNNER, &RegisterRunnerRequest { runner_info: info.clone() }).unwrap())
        .unwrap();
    assert_eq!(reply.kind, REGISTER_RUNNER);

    let namespaces: ListNamespaceResponse = control
        .handle(&Request::encode(LIST_NAMESPACE, &ListNamespaceRequest {}).unwrap())
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(namespaces.items, vec!["prod"]);

    let groups: ListGroupNameResponse = control
        .handle(
            &Request::encode(LIST_GROUP_NAME, &ListGroupNameRequest { namespace: "prod".into() })
                .unwrap(),
        )
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(groups.items, vec!["web"]);

    let tasks: ListTaskResponse = control
        .handle(
            &Request::encode(
                LIST_TASK,
                &ListTaskRequest {
                    namespace: "prod".into(),
                    group_name: "web".into(),
                },
            )
            .unwrap(),
        )
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(tasks.tasks.len(), 1);
    assert_eq!(tasks.tasks[0].runner("runner-a"), Some(&info));

    let err = control
        .handle(&Request { kind: RUN.into(), data: Vec::new() })
        .unwrap_err();
    assert!(matches!(err, PublisherError::UnknownRequestType(_)));
}

#[test]
fn step_json_uses_wire_field_names() {
    let step = StepBuilder::new("Git-Operator")
        .env("PUBLISHER_GIT_BRANCH", "master")
        .upload("dist/a.zip", "a.zip")
        .build();

    let value = serde_json::to_value(&step).unwrap();
    assert_eq!(value["name"], "Git-Operator");
    assert_eq!(value["status"], "Pending");
    assert_eq!(value["policy"], "auto");
    assert_eq!(value["envs"]["PUBLISHER_GIT_BRANCH"], "master");
    assert_eq!(value["uploadFiles"][0]["sourceFile"], "dist/a.zip");

    let partial: Step = serde_json::from_str(r#"{"name":"x","envs":{"K":"V"}}"#).unwrap();
    assert_eq!(partial.phase, StepPhase::Pending);
    assert_eq!(partial.env("K"), Some("V"));
}
