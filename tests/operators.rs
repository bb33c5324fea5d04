mod common;
use crate::common::{init_tracing, ScriptedExecutor};

use std::sync::Arc;

use publisher::errors::PublisherError;
use publisher::exec::{OutputSink, RunContext};
use publisher::operator::{
    FtpOperator, GitOperator, StepOperator, SvnOperator, FTP_OPERATOR_NAME, GIT_OPERATOR_NAME,
    SVN_OPERATOR_NAME,
};
use publisher::operator::svn::SVN_COMMAND_COMMITTING;
use publisher::types::envs::{
    PUBLISHER_FTP_MKDIR, PUBLISHER_FTP_PORT, PUBLISHER_FTP_TIMEOUT, PUBLISHER_FTP_WORK_DIR,
    PUBLISHER_GIT_BRANCH,
    PUBLISHER_SVN_COMMAND, PUBLISHER_SVN_COMMIT_MESSAGE, PUBLISHER_SVN_PORT,
};
use publisher::types::{StepPhase, UploadFile};

async fn run(op: &dyn StepOperator) -> publisher::errors::Result<Vec<String>> {
    op.run(&RunContext::new(), &OutputSink::disabled()).await
}

fn with_env(op: &dyn StepOperator, key: &str, value: &str) {
    let mut step = op.step();
    step.envs.insert(key.to_string(), value.to_string());
    op.update(&step);
}

// ---------- git ----------

#[tokio::test]
async fn git_runs_cd_revert_checkout_pull() {
    init_tracing();
    let exec = ScriptedExecutor::new();
    let op = GitOperator::new("/srv/site", "release/1.2", Arc::new(exec.clone()));
    assert_eq!(op.step().name, GIT_OPERATOR_NAME);
    assert_eq!(op.step().phase, StepPhase::Pending);

    run(&op).await.unwrap();

    assert_eq!(exec.labels(), vec!["cd", "revert", "checkout", "pull"]);
    let commands = exec.commands();
    assert_eq!(commands[0], "cd /srv/site");
    assert!(commands[1].ends_with("git add --all && git checkout -f && git reset --hard"));
    assert!(commands[2].ends_with("git checkout -B release/1.2 --track remotes/origin/release/1.2"));
    assert_eq!(op.step().phase, StepPhase::Succeeded);
}

#[tokio::test]
async fn git_rejects_a_malformed_branch_before_running_anything() {
    let exec = ScriptedExecutor::new();
    let op = GitOperator::new("/srv/site", "master", Arc::new(exec.clone()));
    with_env(&op, PUBLISHER_GIT_BRANCH, "master; rm -rf /");

    let err = run(&op).await.unwrap_err();

    assert!(matches!(err, PublisherError::Configuration(_)));
    assert!(exec.calls().is_empty());
    assert_eq!(op.step().phase, StepPhase::Failed);
}

#[tokio::test]
async fn git_quotes_project_dirs_with_spaces() {
    let exec = ScriptedExecutor::new();
    let op = GitOperator::new("/srv/my site", "main", Arc::new(exec.clone()));

    run(&op).await.unwrap();

    assert_eq!(exec.commands()[0], "cd '/srv/my site'");
}

// ---------- svn ----------

fn svn(exec: &ScriptedExecutor) -> SvnOperator {
    SvnOperator::new("svn.local", 3690, "deploy", "s3cret", "trunk", "/srv/wc", Arc::new(exec.clone()))
}

#[tokio::test]
async fn svn_waiting_refreshes_the_working_copy() {
    let exec = ScriptedExecutor::new();
    let op = svn(&exec);
    assert_eq!(op.step().name, SVN_OPERATOR_NAME);

    run(&op).await.unwrap();

    assert_eq!(exec.labels(), vec!["cd", "revert all", "remove all", "checkout"]);
    assert!(exec.commands()[3].contains("checkout svn://deploy@svn.local:3690/trunk"));

    let messages = op.step().messages;
    assert_eq!(messages.len(), 5);
    assert!(messages[0].ends_with("[SVN-Operator] pulling and waiting"));
    assert!(messages[4].ends_with("[SVN-Operator] checkout"));
}

#[tokio::test]
async fn svn_committing_adds_and_commits_with_the_message() {
    let exec = ScriptedExecutor::new();
    let op = svn(&exec);
    with_env(&op, PUBLISHER_SVN_COMMAND, SVN_COMMAND_COMMITTING);
    with_env(&op, PUBLISHER_SVN_COMMIT_MESSAGE, "nightly build");

    run(&op).await.unwrap();

    assert_eq!(exec.labels(), vec!["add all", "commit"]);
    assert!(exec.commands()[1].ends_with("commit --message 'nightly build - committed by deploy@publisher'"));
}

#[tokio::test]
async fn svn_unknown_command_or_bad_port_is_a_configuration_error() {
    let exec = ScriptedExecutor::new();
    let op = svn(&exec);
    with_env(&op, PUBLISHER_SVN_COMMAND, "dance");
    assert!(matches!(run(&op).await, Err(PublisherError::Configuration(_))));

    let op = svn(&exec);
    with_env(&op, PUBLISHER_SVN_PORT, "thirty-six ninety");
    assert!(matches!(run(&op).await, Err(PublisherError::Configuration(_))));

    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn svn_failure_stops_the_sequence() {
    let exec = ScriptedExecutor::new().fail_on("revert all", 1);
    let op = svn(&exec);

    let err = run(&op).await.unwrap_err();

    assert!(matches!(err, PublisherError::Execution { .. }));
    assert_eq!(exec.labels(), vec!["cd", "revert all"]);
    assert_eq!(op.step().phase, StepPhase::Failed);
}

// ---------- ftp ----------

fn ftp(exec: &ScriptedExecutor, files: &[(&str, &str)]) -> FtpOperator {
    let op = FtpOperator::new("ftp.local", 21, "ops", "pw", "/pub/releases/", 10, Arc::new(exec.clone()));
    let mut step = op.step();
    step.upload_files = files
        .iter()
        .map(|(src, dst)| UploadFile {
            source_file: src.to_string(),
            target_path: String::new(),
            target_file: dst.to_string(),
        })
        .collect();
    op.update(&step);
    op
}

#[tokio::test]
async fn ftp_uploads_every_file_in_order() {
    let exec = ScriptedExecutor::new();
    let op = ftp(&exec, &[("dist/app.zip", "app.zip"), ("dist/notes.txt", "docs/notes.txt")]);
    assert_eq!(op.step().name, FTP_OPERATOR_NAME);

    run(&op).await.unwrap();

    assert_eq!(exec.labels(), vec!["upload", "upload"]);
    let commands = exec.commands();
    assert!(commands[0].contains("--upload-file dist/app.zip ftp://ftp.local:21/pub/releases/app.zip"));
    assert!(commands[1].ends_with("ftp://ftp.local:21/pub/releases/docs/notes.txt"));
    assert!(commands[0].contains("--connect-timeout 10"));
}

#[tokio::test]
async fn ftp_mark_creates_the_next_dated_directory() {
    let today = chrono::Local::now().format("%Y%m%d").to_string();
    let listing = [today.clone(), format!("{today}_1"), "20000101_4".to_string(), "misc".to_string()];
    let listing: Vec<&str> = listing.iter().map(String::as_str).collect();
    let exec = ScriptedExecutor::new().with_output("list", &listing);
    let op = ftp(&exec, &[("dist/app.zip", "app.zip")]);
    with_env(&op, PUBLISHER_FTP_MKDIR, "mark");

    run(&op).await.unwrap();

    let dir = format!("{today}_3");
    assert_eq!(exec.labels(), vec!["list", "mkdir", "upload"]);
    let commands = exec.commands();
    assert!(commands[0].contains("--list-only ftp://ftp.local:21/pub/releases/"));
    assert!(commands[1].contains(&format!("--quote 'MKD pub/releases/{dir}'")));
    assert!(commands[2].ends_with(&format!("ftp://ftp.local:21/pub/releases/{dir}/app.zip")));
    assert_eq!(op.step().env(PUBLISHER_FTP_MKDIR), Some(dir.as_str()));
}

#[tokio::test]
async fn ftp_mark_without_work_dir_lists_the_login_directory() {
    let today = chrono::Local::now().format("%Y%m%d").to_string();
    let exec = ScriptedExecutor::new();
    let op = ftp(&exec, &[("dist/app.zip", "app.zip")]);
    with_env(&op, PUBLISHER_FTP_WORK_DIR, "");
    with_env(&op, PUBLISHER_FTP_MKDIR, "mark");

    run(&op).await.unwrap();

    let commands = exec.commands();
    assert!(commands[0].ends_with("--list-only ftp://ftp.local:21/"));
    assert!(!commands[0].contains("21//"));
    assert!(commands[1].contains(&format!("--quote 'MKD {today}_1'")));
    assert!(commands[2].ends_with(&format!("ftp://ftp.local:21/{today}_1/app.zip")));
}

#[tokio::test]
async fn ftp_bad_port_or_timeout_fails_before_any_side_effect() {
    let exec = ScriptedExecutor::new();

    let op = ftp(&exec, &[("a", "a")]);
    with_env(&op, PUBLISHER_FTP_PORT, "21x");
    assert!(matches!(run(&op).await, Err(PublisherError::Configuration(_))));

    let op = ftp(&exec, &[("a", "a")]);
    with_env(&op, PUBLISHER_FTP_TIMEOUT, "soon");
    assert!(matches!(run(&op).await, Err(PublisherError::Configuration(_))));
    assert_eq!(op.step().phase, StepPhase::Failed);

    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn ftp_upload_failure_fails_the_step() {
    let exec = ScriptedExecutor::new().fail_on("upload", 25);
    let op = ftp(&exec, &[("a.zip", "a.zip"), ("b.zip", "b.zip")]);

    let err = run(&op).await.unwrap_err();

    assert!(err.is_execution_failure());
    assert_eq!(exec.labels(), vec!["upload"]);
    assert_eq!(op.step().phase, StepPhase::Failed);
}
