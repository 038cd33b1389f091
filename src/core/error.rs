//! Application-wide error types.
//!
//! [`AppError`] covers startup and serving failures; anything it carries is
//! fatal and ends the process. [`RelayError`] is the per-request error kind
//! that handlers translate into an HTTP status.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("server error: {0}")]
    Server(String),
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("upstream did not finish within {}s", .0.as_secs_f32())]
    UpstreamTimeout(Duration),
}

impl RelayError {
    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::NotFound(_) => "not_found",
            RelayError::Validation(_) => "validation",
            RelayError::Upstream(_) => "upstream",
            RelayError::UpstreamTimeout(_) => "timeout",
        }
    }
}
