// src/types/envs.rs

//! Well-known `Step.envs` keys read by the bundled operators.

pub const PUBLISHER_PROJECT_DIR: &str = "PUBLISHER_PROJECT_DIR";
pub const PUBLISHER_GIT_BRANCH: &str = "PUBLISHER_GIT_BRANCH";

pub const PUBLISHER_SVN_HOST: &str = "PUBLISHER_SVN_HOST";
pub const PUBLISHER_SVN_PORT: &str = "PUBLISHER_SVN_PORT";
pub const PUBLISHER_SVN_USERNAME: &str = "PUBLISHER_SVN_USERNAME";
pub const PUBLISHER_SVN_PASSWORD: &str = "PUBLISHER_SVN_PASSWORD";
pub const PUBLISHER_SVN_REMOTE_DIR: &str = "PUBLISHER_SVN_REMOTE_DIR";
pub const PUBLISHER_SVN_WORK_DIR: &str = "PUBLISHER_SVN_WORK_DIR";
pub const PUBLISHER_SVN_COMMIT_MESSAGE: &str = "PUBLISHER_SVN_COMMIT_MESSAGE";
pub const PUBLISHER_SVN_COMMAND: &str = "PUBLISHER_SVN_COMMAND";

pub const PUBLISHER_FTP_HOST: &str = "PUBLISHER_FTP_HOST";
pub const PUBLISHER_FTP_PORT: &str = "PUBLISHER_FTP_PORT";
pub const PUBLISHER_FTP_USERNAME: &str = "PUBLISHER_FTP_USERNAME";
pub const PUBLISHER_FTP_PASSWORD: &str = "PUBLISHER_FTP_PASSWORD";
pub const PUBLISHER_FTP_WORK_DIR: &str = "PUBLISHER_FTP_WORK_DIR";
pub const PUBLISHER_FTP_TIMEOUT: &str = "PUBLISHER_FTP_TIMEOUT";
pub const PUBLISHER_FTP_MKDIR: &str = "PUBLISHER_FTP_MKDIR";
