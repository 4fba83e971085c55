//! Staged resource lifecycle registry.
//!
//! Objects created over the life of a process register startup or teardown
//! actions with a [`Stager`]; when the owning scope ends, the stager runs each
//! action exactly once, in FIFO or LIFO order, and reports every outcome to a
//! [`StageHandler`]. One failing action never stops the others.
pub mod binding;
pub mod config;
pub mod event;
pub mod kernel;
pub mod stager;

// Re-export key public types/traits for easier use by the binary and plugins
pub use binding::{Hook, HookError, HookTarget, LifecycleModule, Provisioner, StageBinding, TypeMatcher};
pub use config::{ConfigFormat, LifecycleConfig, StageConfig};
pub use event::{LogObserver, StagerEvent, StagerObserver};
pub use kernel::{Error, Lifecycle, Result};
pub use stager::{
    DefaultStager, DisposingStager, Dispose, NamedStage, Order, StageHandler, StageIdentity, StageKind, StageSummary,
    Stageable, Stager, StagerState, wrap,
};
