use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::binding::error::HookError;
use crate::stager::error::{StageError, root_cause};
use crate::stager::handler::{StageHandler, StageTarget};
use crate::stager::stageable::{Stageable, panic_message};
use crate::stager::type_mapper::TypeDescriptor;

/// A named zero-argument hook and the stages it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hook {
    pub name: &'static str,
    /// Names of the marker stages this hook carries
    pub stages: &'static [&'static str],
}

impl Hook {
    /// A hook that belongs to no marker stage; reachable only by name.
    pub const fn named(name: &'static str) -> Self {
        Self { name, stages: &[] }
    }

    pub const fn in_stages(name: &'static str, stages: &'static [&'static str]) -> Self {
        Self { name, stages }
    }

    pub fn carries(&self, stage: &str) -> bool {
        self.stages.iter().any(|s| *s == stage)
    }
}

/// An object whose lifecycle hooks can be looked up and invoked by name.
///
/// ```
/// use std::any::Any;
/// use lifecycle_core::binding::{Hook, HookError, HookTarget};
///
/// #[derive(Debug)]
/// struct Cache;
///
/// impl HookTarget for Cache {
///     fn hooks(&self) -> &'static [Hook] {
///         const HOOKS: &[Hook] = &[Hook::in_stages("flush", &["shutdown"])];
///         HOOKS
///     }
///
///     fn invoke_hook(&self, name: &str) -> Result<(), HookError> {
///         match name {
///             "flush" => Ok(()),
///             other => Err(HookError::not_invocable(other, "Cache", "unknown hook")),
///         }
///     }
///
///     fn as_any(&self) -> &(dyn Any + Send + Sync) {
///         self
///     }
/// }
/// ```
pub trait HookTarget: Any + Send + Sync + fmt::Debug {
    fn hooks(&self) -> &'static [Hook];

    fn invoke_hook(&self, name: &str) -> Result<(), HookError>;

    fn as_any(&self) -> &(dyn Any + Send + Sync);

    fn find_hook(&self, name: &str) -> Option<&'static Hook> {
        self.hooks().iter().find(|h| h.name == name)
    }
}

/// Stageable that invokes one hook on one target.
pub struct StageableHook {
    target: Arc<dyn HookTarget>,
    hook: &'static str,
    declaring: TypeDescriptor,
}

impl StageableHook {
    pub fn new(target: Arc<dyn HookTarget>, hook: &'static str, declaring: TypeDescriptor) -> Self {
        Self { target, hook, declaring }
    }

    pub fn hook(&self) -> &'static str {
        self.hook
    }

    pub fn declaring_type(&self) -> TypeDescriptor {
        self.declaring
    }
}

impl fmt::Debug for StageableHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageableHook")
            .field("target", &self.target)
            .field("hook", &self.hook)
            .finish()
    }
}

impl Stageable for StageableHook {
    fn stage(&self, handler: &dyn StageHandler) {
        let target = StageTarget::from_parts(self.target.as_any(), &self.target, self.declaring.name());
        match panic::catch_unwind(AssertUnwindSafe(|| self.target.invoke_hook(self.hook))) {
            Ok(Ok(())) => handler.on_success(target),
            Ok(Err(err)) => {
                let err: &(dyn StdError + 'static) = &err;
                handler.on_error(target, root_cause(err));
            }
            Err(payload) => {
                let err = StageError::Panicked {
                    target: self.declaring.name(),
                    message: panic_message(payload.as_ref()),
                };
                handler.on_error(target, &err);
            }
        }
    }

    fn describe(&self) -> String {
        format!("{:?}::{}", self.target, self.hook)
    }
}
