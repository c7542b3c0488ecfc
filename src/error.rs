use std::collections::BTreeMap;

use reqwest::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;

/// Field name to the list of problems found with it.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

/// A stored setting that could not be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config key `{key}` holds `{value}`, expected an integer")]
    Malformed { key: &'static str, value: String },

    #[error("config key `{key}` holds {value}, the maximum is {max}")]
    OutOfRange { key: &'static str, value: i64, max: i64 },
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("chat api request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat api answered with status {0}")]
    Status(StatusCode),
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("notification rejected: {0:?}")]
    Invalid(FieldErrors),

    #[error("could not store notification: {0}")]
    Db(#[from] DbErr),
}

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("a team is required to solve challenges in teams mode")]
    MissingTeam,

    #[error("could not record solve: {0}")]
    Db(#[from] DbErr),
}

/// Failure inside a post-solve observer. Logged by the registry, never returned to the solver.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("observer query failed: {0}")]
    Db(#[from] DbErr),
}
