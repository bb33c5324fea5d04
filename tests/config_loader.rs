mod common;
use crate::common::{init_tracing, ScriptedExecutor};

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;

use publisher::config::{load_and_validate, parse_str, ConfigFile, OperatorConfig};
use publisher::errors::PublisherError;
use publisher::runner::Runner;
use publisher::types::envs::{PUBLISHER_FTP_MKDIR, PUBLISHER_SVN_COMMAND};
use publisher::types::{Step, StepPolicy};

const FULL: &str = r#"
[runner]
name = "runner-a"
hostname = "build-01"
namespace = "prod"
group_name = "web"
output_capacity = 128
stream_stall_timeout = "5s"
step_timeout = "10m"

[[operator]]
kind = "git"
project_dir = "/srv/site"
branch = "master"

[[operator]]
kind = "svn"
name = "Assets-SVN"
policy = "manual"
host = "svn.local"
port = 3690
username = "deploy"
password = "pw"
remote_dir = "assets"
work_dir = "/srv/wc"
command = "adding and committing"

[[operator]]
kind = "ftp"
host = "ftp.local"
port = 21
username = "ops"
password = "pw"
work_dir = "/pub"
mkdir = "mark"

[operator.envs]
EXTRA = "kept"
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

fn validate(contents: &str) -> Result<ConfigFile, PublisherError> {
    ConfigFile::try_from(parse_str(contents)?)
}

#[test]
fn loads_a_full_config_from_disk() {
    init_tracing();
    let file = write_config(FULL);

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.runner.name, "runner-a");
    assert_eq!(cfg.runner.resolved_hostname(), "build-01");
    assert_eq!(cfg.runner.output_capacity, 128);
    assert_eq!(cfg.stream_stall_timeout, Duration::from_secs(5));
    assert_eq!(cfg.step_timeout, Some(Duration::from_secs(600)));

    let names: Vec<_> = cfg.operator.iter().map(|o| o.step_name()).collect();
    assert_eq!(names, vec!["Git-Operator", "Assets-SVN", "Ftp-Operator"]);
    assert_eq!(cfg.operator[1].policy(), StepPolicy::Manual);
    match &cfg.operator[2] {
        OperatorConfig::Ftp(ftp) => {
            assert_eq!(ftp.timeout, 30);
            assert_eq!(ftp.envs.get("EXTRA").map(String::as_str), Some("kept"));
        }
        other => panic!("expected ftp operator, got {other:?}"),
    }
}

#[tokio::test]
async fn runner_from_config_wires_operators_in_order() {
    let cfg = validate(FULL).unwrap();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);

    let runner = Runner::from_config(&cfg, Arc::new(ScriptedExecutor::new()), tx).unwrap();

    assert_eq!(runner.step_names(), vec!["Git-Operator", "Assets-SVN", "Ftp-Operator"]);
    assert_eq!(runner.options().output_capacity, 128);
    assert_eq!(runner.identity().namespace.as_str(), "prod");

    let svn = runner.step(&Step::query("Assets-SVN")).unwrap();
    assert_eq!(svn.policy, StepPolicy::Manual);
    assert_eq!(svn.env(PUBLISHER_SVN_COMMAND), Some("adding and committing"));

    let ftp = runner.step(&Step::query("Ftp-Operator")).unwrap();
    assert_eq!(ftp.env(PUBLISHER_FTP_MKDIR), Some("mark"));
    assert_eq!(ftp.env("EXTRA"), Some("kept"));
}

#[test]
fn defaults_apply_when_optional_fields_are_missing() {
    let cfg = validate(
        r#"
[runner]
name = "r"
group_name = "g"

[[operator]]
kind = "git"
project_dir = "/srv"
branch = "main"
"#,
    )
    .unwrap();

    assert_eq!(cfg.runner.namespace, "default");
    assert_eq!(cfg.runner.output_capacity, 4096);
    assert_eq!(cfg.stream_stall_timeout, Duration::from_secs(30));
    assert_eq!(cfg.step_timeout, None);
}

#[test]
fn rejects_config_without_operators() {
    let err = validate(
        r#"
[runner]
name = "r"
group_name = "g"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, PublisherError::Configuration(_)));
}

#[test]
fn rejects_duplicate_step_names() {
    let err = validate(
        r#"
[runner]
name = "r"
group_name = "g"

[[operator]]
kind = "git"
project_dir = "/a"
branch = "main"

[[operator]]
kind = "git"
project_dir = "/b"
branch = "main"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, PublisherError::DuplicateStep(ref n) if n == "Git-Operator"));
}

#[test]
fn rejects_bad_durations_and_settings() {
    let bad_duration = r#"
[runner]
name = "r"
group_name = "g"
stream_stall_timeout = "soon"

[[operator]]
kind = "git"
project_dir = "/a"
branch = "main"
"#;
    assert!(matches!(validate(bad_duration), Err(PublisherError::Configuration(_))));

    let bad_svn = r#"
[runner]
name = "r"
group_name = "g"

[[operator]]
kind = "svn"
host = "h"
port = 1
username = "u"
password = "p"
remote_dir = "r"
work_dir = "/w"
command = "dance"
"#;
    assert!(matches!(validate(bad_svn), Err(PublisherError::Configuration(_))));

    let empty_name = r#"
[runner]
name = " "
group_name = "g"

[[operator]]
kind = "git"
project_dir = "/a"
branch = "main"
"#;
    assert!(matches!(validate(empty_name), Err(PublisherError::Configuration(_))));
}

#[test]
fn rejects_unusable_streaming_limits() {
    let with_runner_fields = |fields: &str| {
        format!(
            r#"
[runner]
name = "r"
group_name = "g"
{fields}

[[operator]]
kind = "git"
project_dir = "/a"
branch = "main"
"#
        )
    };

    for fields in [
        "output_capacity = 0",
        "output_capacity = 1152921504606846975",
        "stream_stall_timeout = \"0s\"",
        "stream_stall_timeout = \"0ms\"",
    ] {
        let err = validate(&with_runner_fields(fields)).unwrap_err();
        assert!(matches!(err, PublisherError::Configuration(_)), "{fields}: {err:?}");
    }

    let cfg = validate(&with_runner_fields("output_capacity = 1\nstream_stall_timeout = \"1ms\"")).unwrap();
    assert_eq!(cfg.runner.output_capacity, 1);
    assert_eq!(cfg.stream_stall_timeout, Duration::from_millis(1));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("[runner\nname = ");
    assert!(matches!(load_and_validate(file.path()), Err(PublisherError::TomlError(_))));

    let missing = load_and_validate("/definitely/not/here/Runner.toml");
    assert!(matches!(missing, Err(PublisherError::IoError(_))));
}

#[test]
fn durations_accept_the_usual_units() {
    use publisher::config::parse_duration;

    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration(" 30s "), Ok(Duration::from_secs(30)));
    assert_eq!(parse_duration("10m"), Ok(Duration::from_secs(600)));
    assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("30").is_err());
    assert!(parse_duration("s").is_err());
    assert!(parse_duration("5d").is_err());
}
