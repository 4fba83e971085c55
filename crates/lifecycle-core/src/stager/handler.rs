use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

use parking_lot::Mutex;

/// Borrowed view of the object a stageable acted on.
#[derive(Clone, Copy)]
pub struct StageTarget<'a> {
    object: &'a (dyn Any + Send + Sync),
    debug: &'a dyn fmt::Debug,
    type_name: &'static str,
}

impl<'a> StageTarget<'a> {
    pub fn new<T: Any + Send + Sync + fmt::Debug>(object: &'a T) -> Self {
        Self {
            object,
            debug: object,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Build a view from already-erased parts, e.g. a trait object target.
    pub fn from_parts(object: &'a (dyn Any + Send + Sync), debug: &'a dyn fmt::Debug, type_name: &'static str) -> Self {
        Self { object, debug, type_name }
    }

    /// Name of the target's concrete type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        self.object.downcast_ref::<T>()
    }

    pub fn as_any(&self) -> &'a (dyn Any + Send + Sync) {
        self.object
    }
}

impl fmt::Debug for StageTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug.fmt(f)
    }
}

impl fmt::Display for StageTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug.fmt(f)
    }
}

/// Observer of per-stageable outcomes during a pass.
///
/// Exactly one of the two methods is called for every staged entry, once.
/// `cause` is always the innermost error of whatever the action returned.
pub trait StageHandler {
    fn on_success(&self, target: StageTarget<'_>);

    fn on_error(&self, target: StageTarget<'_>, cause: &(dyn StdError + 'static));
}

/// Discards every outcome. Used by [`Stager::stage`](crate::stager::Stager::stage).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpStageHandler;

impl StageHandler for NoOpStageHandler {
    fn on_success(&self, _target: StageTarget<'_>) {}

    fn on_error(&self, _target: StageTarget<'_>, _cause: &(dyn StdError + 'static)) {}
}

/// Forwards outcomes to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingStageHandler;

impl StageHandler for LoggingStageHandler {
    fn on_success(&self, target: StageTarget<'_>) {
        log::info!("Staged {:?} ({})", target, target.type_name());
    }

    fn on_error(&self, target: StageTarget<'_>, cause: &(dyn StdError + 'static)) {
        log::error!("Failed to stage {:?} ({}): {}", target, target.type_name(), cause);
    }
}

/// A recorded outcome, detached from the target it describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Success { target: String },
    Failure { target: String, cause: String },
}

impl StageOutcome {
    pub fn target(&self) -> &str {
        match self {
            StageOutcome::Success { target } | StageOutcome::Failure { target, .. } => target,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success { .. })
    }
}

/// Records every outcome in the order it was reported.
#[derive(Debug, Default)]
pub struct CollectingStageHandler {
    outcomes: Mutex<Vec<StageOutcome>>,
}

impl CollectingStageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<StageOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn into_outcomes(self) -> Vec<StageOutcome> {
        self.outcomes.into_inner()
    }

    /// Targets in the order they were staged
    pub fn targets(&self) -> Vec<String> {
        self.outcomes.lock().iter().map(|o| o.target().to_string()).collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.lock().iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.lock().iter().filter(|o| !o.is_success()).count()
    }
}

impl StageHandler for CollectingStageHandler {
    fn on_success(&self, target: StageTarget<'_>) {
        self.outcomes.lock().push(StageOutcome::Success {
            target: format!("{:?}", target),
        });
    }

    fn on_error(&self, target: StageTarget<'_>, cause: &(dyn StdError + 'static)) {
        self.outcomes.lock().push(StageOutcome::Failure {
            target: format!("{:?}", target),
            cause: cause.to_string(),
        });
    }
}
