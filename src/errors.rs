// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("no StepOperator owns step {0:?}")]
    StepOperatorNotFound(String),

    #[error("duplicate StepOperator for step {0:?} on the same runner")]
    DuplicateStep(String),

    #[error("step '{step}' failed: {message}")]
    Execution { step: String, message: String },

    #[error("step '{0}' was cancelled")]
    Cancelled(String),

    #[error("step '{0}' exceeded its deadline")]
    TimedOut(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("unknown request type: {0}")]
    UnknownRequestType(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PublisherError {
    /// Build an [`PublisherError::Execution`] for the given step.
    pub fn execution(step: impl Into<String>, message: impl Into<String>) -> Self {
        PublisherError::Execution {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Whether this error came out of running a step (as opposed to
    /// addressing or configuring it).
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            PublisherError::Execution { .. }
                | PublisherError::Cancelled(_)
                | PublisherError::TimedOut(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PublisherError>;
