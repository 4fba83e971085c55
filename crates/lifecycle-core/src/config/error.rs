//! # Configuration Errors
//!
//! Defines error types for loading and validating lifecycle configuration:
//! file I/O, unknown formats, (de)serialization, and structural problems such
//! as duplicate stage names.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported configuration format for path: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Serialization to '{format}' failed: {source}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    Deserialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Configuration defines no stages")]
    NoStages,

    #[error("Stage at position {index} has an empty name")]
    EmptyStageName { index: usize },

    #[error("Stage '{name}' is defined more than once")]
    DuplicateStage { name: String },
}

impl ConfigError {
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
