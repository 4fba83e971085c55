use std::any::{Any, type_name};
use std::error::Error as StdError;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::stager::error::{StageError, root_cause};
use crate::stager::handler::{StageHandler, StageTarget};

/// One target plus one action, run by a stager during its pass.
///
/// `stage` never returns an error or unwinds: every outcome goes to the
/// handler, and a failure is reported with its root cause.
pub trait Stageable: Send + Sync {
    fn stage(&self, handler: &dyn StageHandler);

    /// Short human-readable description of the target, for logs and events
    fn describe(&self) -> String;
}

impl fmt::Debug for dyn Stageable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stageable").field(&self.describe()).finish()
    }
}

/// A [`Stageable`] built from a shared target and a closure.
pub struct StageableAction<T, F, E> {
    target: Arc<T>,
    action: F,
    _error: PhantomData<fn() -> E>,
}

/// Pair `target` with `action` into a stageable.
///
/// ```
/// use std::sync::Arc;
/// use lifecycle_core::stager::{wrap, Stageable, CollectingStageHandler};
///
/// #[derive(Debug)]
/// struct Pool;
///
/// let stageable = wrap(Arc::new(Pool), |_pool: &Pool| Ok::<_, std::io::Error>(()));
/// let handler = CollectingStageHandler::new();
/// stageable.stage(&handler);
/// assert_eq!(handler.success_count(), 1);
/// ```
pub fn wrap<T, F, E>(target: Arc<T>, action: F) -> StageableAction<T, F, E>
where
    T: Any + Send + Sync + fmt::Debug,
    F: Fn(&T) -> Result<(), E> + Send + Sync,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    StageableAction {
        target,
        action,
        _error: PhantomData,
    }
}

impl<T, F, E> StageableAction<T, F, E> {
    pub fn target(&self) -> &Arc<T> {
        &self.target
    }
}

impl<T, F, E> fmt::Debug for StageableAction<T, F, E>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageableAction").field("target", &self.target).finish_non_exhaustive()
    }
}

impl<T, F, E> Stageable for StageableAction<T, F, E>
where
    T: Any + Send + Sync + fmt::Debug,
    F: Fn(&T) -> Result<(), E> + Send + Sync,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    fn stage(&self, handler: &dyn StageHandler) {
        let target = StageTarget::new(&*self.target);
        match panic::catch_unwind(AssertUnwindSafe(|| (self.action)(&*self.target))) {
            Ok(Ok(())) => handler.on_success(target),
            Ok(Err(err)) => {
                let err: Box<dyn StdError + Send + Sync> = err.into();
                handler.on_error(target, root_cause(&*err));
            }
            Err(payload) => {
                let err = StageError::Panicked {
                    target: type_name::<T>(),
                    message: panic_message(payload.as_ref()),
                };
                handler.on_error(target, &err);
            }
        }
    }

    fn describe(&self) -> String {
        format!("{:?}", self.target)
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
