//! # Stager
//!
//! The staging engine. A [`Stager`] accumulates [`Stageable`]s for one stage
//! identity (startup, shutdown, ...) from any number of threads and, when
//! triggered, runs every one of them exactly once in a fixed [`Order`],
//! reporting each outcome to a [`StageHandler`]. A failing stageable never
//! stops the pass.
//!
//! A stager moves through [`StagerState::Registering`],
//! [`StagerState::Staging`] and [`StagerState::Staged`]; only the first accepts
//! registrations and only one pass ever executes.
pub mod default;
pub mod disposing;
pub mod error;
pub mod handler;
pub mod stageable;
pub mod type_mapper;

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stager::error::StagerError;

/// How a stage finds the hooks that belong to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Hooks declare which stage they belong to by carrying the stage's name.
    Marker,
    /// Every matching type runs one named method; bindings must name it.
    Type,
}

/// Identifies which lifecycle phase a stager represents.
pub trait StageIdentity: fmt::Debug + Send + Sync + 'static {
    /// The stage's name, used in logs, events and hook markers
    fn name(&self) -> &str;

    fn kind(&self) -> StageKind {
        StageKind::Marker
    }
}

/// A stage identity known only by name, e.g. one read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedStage {
    name: Cow<'static, str>,
    kind: StageKind,
}

impl NamedStage {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Marker,
        }
    }

    pub fn with_kind(mut self, kind: StageKind) -> Self {
        self.kind = kind;
        self
    }
}

impl StageIdentity for NamedStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        self.kind
    }
}

/// Traversal direction of a pass relative to registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// Oldest registration first. Suits startup-like stages.
    #[serde(alias = "fifo")]
    FirstInFirstOut,
    /// Newest registration first, so the last acquired resource is released first.
    #[serde(alias = "lifo", alias = "filo")]
    FirstInLastOut,
}

impl Order {
    /// Arrange entries given in insertion order into traversal order.
    pub fn arrange<T>(self, mut entries: Vec<T>) -> Vec<T> {
        if self == Order::FirstInLastOut {
            entries.reverse();
        }
        entries
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::FirstInFirstOut => write!(f, "FIFO"),
            Order::FirstInLastOut => write!(f, "LIFO"),
        }
    }
}

/// Lifecycle of a single stager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagerState {
    Registering,
    Staging,
    Staged,
}

impl fmt::Display for StagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagerState::Registering => write!(f, "Registering"),
            StagerState::Staging => write!(f, "Staging"),
            StagerState::Staged => write!(f, "Staged"),
        }
    }
}

/// Sequence number handed out at registration; insertion order is this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(pub u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a call to [`Stager::stage_with`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageSummary {
    /// Stageables invoked during this call
    pub attempted: usize,
    /// Stageables that reported an error
    pub failed: usize,
    /// True when the pass had already run and this call invoked nothing
    pub already_staged: bool,
}

impl StageSummary {
    pub fn already_staged() -> Self {
        Self {
            already_staged: true,
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> usize {
        self.attempted.saturating_sub(self.failed)
    }

    /// True when every attempted stageable succeeded
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Core contract of a staging engine for stage identity `A`.
pub trait Stager<A: StageIdentity>: Send + Sync {
    /// Register a stageable to be run by the pass.
    ///
    /// Fails with [`StagerError::RegistrationClosed`] once a pass has begun.
    fn register(&self, stageable: Box<dyn Stageable>) -> Result<RegistrationId, StagerError>;

    /// Run the pass, discarding every outcome.
    fn stage(&self) -> StageSummary {
        self.stage_with(&NoOpStageHandler)
    }

    /// Run the pass, reporting each outcome to `handler`.
    ///
    /// Only the first call invokes anything; later calls return
    /// [`StageSummary::already_staged`].
    fn stage_with(&self, handler: &dyn StageHandler) -> StageSummary;

    /// The stage identity this stager represents
    fn identity(&self) -> &A;
}

// Re-export important types
pub use default::DefaultStager;
pub use disposing::{Dispose, DisposingStager};
pub use handler::{CollectingStageHandler, LoggingStageHandler, NoOpStageHandler, StageHandler, StageOutcome, StageTarget};
pub use stageable::{Stageable, StageableAction, wrap};
pub use type_mapper::{DefaultStageableTypeMapper, NoOpStageableTypeMapper, StageableTypeMapper, TypeDescriptor};

// Test module declaration
#[cfg(test)]
mod tests;
