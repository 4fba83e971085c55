//! # Binding
//!
//! Adapter between the code that creates objects and the stagers that tear
//! them down (or start them up). Objects expose their lifecycle hooks through
//! [`HookTarget`]; a [`LifecycleModule`] holds validated [`StageBinding`]s and,
//! once configured, yields a [`Provisioner`] that turns every provisioned
//! target into registered stageables.
//!
//! Marker stages collect every hook that carries the stage's name. Type stages
//! invoke one named method on every matching type and fail provisioning when
//! the type lacks it.
pub mod error;
pub mod matcher;
pub mod module;
pub mod target;

pub use error::{BindingError, HookError};
pub use matcher::TypeMatcher;
pub use module::{AfterInvocation, LifecycleModule, Provisioner, StageBinding};
pub use target::{Hook, HookTarget, StageableHook};

#[cfg(test)]
mod tests;
