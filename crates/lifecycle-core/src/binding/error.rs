//! # Binding Errors
//!
//! Defines error types for the binding layer.
//!
//! [`BindingError`] reports structural defects found while configuring a
//! module or provisioning a target: a type stage bound without a method, a
//! target missing the bound hook, a module configured twice. [`HookError`] is
//! what a [`HookTarget`](crate::binding::HookTarget) returns when one of its
//! hooks cannot run or fails; during a pass it only reaches handlers.
use std::error::Error as StdError;

use thiserror::Error;

use crate::stager::error::StagerError;

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("Stage '{stage}' is type-based and its binding names no method")]
    MissingMethod { stage: String },

    #[error("Type '{type_name}' has no hook '{method}' required by stage '{stage}'")]
    MethodNotFound {
        stage: String,
        type_name: &'static str,
        method: String,
    },

    #[error("Module '{module}' has already been configured")]
    AlreadyConfigured { module: String },

    #[error("Hook '{method}' failed while provisioning '{type_name}': {source}")]
    ProvisionFailed {
        method: String,
        type_name: &'static str,
        #[source]
        source: HookError,
    },

    #[error("Post-invocation handler after '{method}' failed on '{type_name}': {source}")]
    AfterInvocationFailed {
        method: String,
        type_name: &'static str,
        #[source]
        source: HookError,
    },

    #[error("Registration failed: {0}")]
    Registration(#[from] StagerError),
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Hook '{hook}' on '{target}' is not invocable: {reason}")]
    NotInvocable {
        hook: String,
        target: &'static str,
        reason: String,
    },

    #[error("Hook '{hook}' failed: {source}")]
    Failed {
        hook: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl HookError {
    /// Wrap an error returned by the hook body
    pub fn failed(hook: impl Into<String>, source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        HookError::Failed {
            hook: hook.into(),
            source: source.into(),
        }
    }

    pub fn not_invocable(hook: impl Into<String>, target: &'static str, reason: impl Into<String>) -> Self {
        HookError::NotInvocable {
            hook: hook.into(),
            target,
            reason: reason.into(),
        }
    }
}
