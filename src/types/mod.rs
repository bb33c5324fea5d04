// src/types/mod.rs

//! Shared data model: addressing identifiers, the `Step` record and the
//! registration snapshots exchanged with the control plane.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod envs;
pub mod runner_info;
pub mod step;

pub use runner_info::{Group, RunnerInfo, RunnerType, Task};
pub use step::{Step, StepAvailability, StepPhase, StepPolicy, UploadFile, WriteFile};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Top level of the addressing hierarchy.
    Namespace
);

string_id!(
    /// Second level of the addressing hierarchy, scoped to a [`Namespace`].
    GroupName
);
