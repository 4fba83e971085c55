//! # Kernel Errors
//!
//! Defines the crate-wide [`Error`] type.
//!
//! Each subsystem keeps its own typed error ([`StagerError`], [`BindingError`],
//! [`ConfigError`]); this enum wraps them with `#[from]` so callers can use
//! one `Result` alias and `?` across subsystems.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::binding::error::BindingError;
use crate::config::error::ConfigError;
use crate::stager::error::StagerError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Typed stager error
    #[error("Stager error: {0}")]
    Stager(#[from] StagerError),

    /// Typed binding error
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// Typed configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A pass completed but some stageables reported errors.
    #[error("Stage '{stage}' finished with {failed} of {attempted} stageables failing")]
    StageFailed { stage: String, attempted: usize, failed: usize },

    #[error("Stage '{0}' is not configured")]
    UnknownStage(String),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
