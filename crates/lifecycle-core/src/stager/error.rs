//! # Stager Errors
//!
//! Defines error types specific to the staging engine.
//!
//! [`StagerError`] covers misuse of a stager (registering after a pass has
//! begun). [`StageError`] covers failures a stageable produces on its own
//! while running an action; these never escape a pass and only reach the
//! caller through a [`StageHandler`](crate::stager::StageHandler).
use std::error::Error as StdError;

use thiserror::Error;

use crate::stager::StagerState;

#[derive(Debug, Error)]
pub enum StagerError {
    #[error("Stage '{stage}' no longer accepts registrations (state: {state})")]
    RegistrationClosed { stage: String, state: StagerState },
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Action on '{target}' panicked: {message}")]
    Panicked { target: &'static str, message: String },
    #[error("'{target}' finished without reporting an outcome")]
    NoOutcome { target: String },
    #[error("'{target}' panicked before reporting an outcome: {message}")]
    Unwound { target: String, message: String },
}

/// Walks the `source()` chain and returns the innermost error.
pub fn root_cause<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut cause = err;
    while let Some(next) = cause.source() {
        cause = next;
    }
    cause
}
