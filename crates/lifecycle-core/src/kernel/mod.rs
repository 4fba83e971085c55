//! # Lifecycle Kernel
//!
//! Application-level glue around the staging engine.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Bootstrapping**: [`Lifecycle`](bootstrap::Lifecycle) builds one stager per
//!   configured stage and stages them on request.
//! - **Core Constants**: default stage names and file names, in `constants`.
//! - **Error Handling**: the crate-wide [`Error`](error::Error) and its
//!   `Result` alias, in `error`.
pub mod bootstrap;
pub mod constants;
pub mod error;

pub use bootstrap::Lifecycle;
pub use error::{Error, Result};

// Test module declaration
#[cfg(test)]
mod tests;
