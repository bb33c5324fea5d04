// src/config/validate.rs

use std::collections::HashSet;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, OperatorConfig, RawConfigFile};
use crate::errors::{PublisherError, Result};
use crate::exec::MAX_OUTPUT_CAPACITY;
use crate::operator::svn::{SVN_COMMAND_COMMITTING, SVN_COMMAND_WAITING};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PublisherError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let stream_stall_timeout = duration_field(
            "stream_stall_timeout",
            &raw.runner.stream_stall_timeout,
        )?;
        if stream_stall_timeout.is_zero() {
            return Err(PublisherError::Configuration(
                "[runner].stream_stall_timeout must be greater than zero".to_string(),
            ));
        }
        let step_timeout = raw
            .runner
            .step_timeout
            .as_deref()
            .map(|s| duration_field("step_timeout", s))
            .transpose()?;

        Ok(ConfigFile::new_unchecked(
            raw.runner,
            raw.operator,
            stream_stall_timeout,
            step_timeout,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_runner_section(cfg)?;
    ensure_has_operators(cfg)?;
    validate_unique_step_names(cfg)?;
    for op in &cfg.operator {
        validate_operator(op)?;
    }
    Ok(())
}

fn validate_runner_section(cfg: &RawConfigFile) -> Result<()> {
    let runner = &cfg.runner;
    for (field, value) in [
        ("name", &runner.name),
        ("namespace", &runner.namespace),
        ("group_name", &runner.group_name),
    ] {
        if value.trim().is_empty() {
            return Err(PublisherError::Configuration(format!(
                "[runner].{field} must not be empty"
            )));
        }
    }

    if !(1..=MAX_OUTPUT_CAPACITY).contains(&runner.output_capacity) {
        return Err(PublisherError::Configuration(format!(
            "[runner].output_capacity must be between 1 and {MAX_OUTPUT_CAPACITY} (got {})",
            runner.output_capacity
        )));
    }

    Ok(())
}

fn ensure_has_operators(cfg: &RawConfigFile) -> Result<()> {
    if cfg.operator.is_empty() {
        return Err(PublisherError::Configuration(
            "config must contain at least one [[operator]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_unique_step_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for op in &cfg.operator {
        let name = op.step_name();
        if name.trim().is_empty() {
            return Err(PublisherError::Configuration(format!(
                "{} operator has an empty name",
                op.kind()
            )));
        }
        if !seen.insert(name) {
            return Err(PublisherError::DuplicateStep(name.to_string()));
        }
    }
    Ok(())
}

fn validate_operator(op: &OperatorConfig) -> Result<()> {
    match op {
        OperatorConfig::Git(c) => {
            if c.project_dir.trim().is_empty() {
                return Err(PublisherError::Configuration(format!(
                    "operator '{}': project_dir must not be empty",
                    op.step_name()
                )));
            }
        }
        OperatorConfig::Svn(c) => {
            if let Some(command) = c.command.as_deref() {
                if command != SVN_COMMAND_WAITING && command != SVN_COMMAND_COMMITTING {
                    return Err(PublisherError::Configuration(format!(
                        "operator '{}': invalid svn command '{command}' (expected \"{SVN_COMMAND_WAITING}\" or \"{SVN_COMMAND_COMMITTING}\")",
                        op.step_name()
                    )));
                }
            }
        }
        OperatorConfig::Ftp(c) => {
            if c.port == 0 {
                return Err(PublisherError::Configuration(format!(
                    "operator '{}': port must be >= 1",
                    op.step_name()
                )));
            }
        }
    }
    Ok(())
}

fn duration_field(field: &str, value: &str) -> Result<std::time::Duration> {
    parse_duration(value).map_err(|e| {
        PublisherError::Configuration(format!("[runner].{field} = \"{value}\": {e}"))
    })
}
