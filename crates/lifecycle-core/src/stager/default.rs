use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::event::{LogObserver, StagerEvent, StagerObserver};
use crate::stager::error::{StageError, StagerError};
use crate::stager::handler::{StageHandler, StageTarget};
use crate::stager::stageable::{Stageable, panic_message};
use crate::stager::{Order, RegistrationId, StageIdentity, StageSummary, Stager, StagerState};

/// One accepted stageable and its place in insertion order
struct Registration {
    id: RegistrationId,
    stageable: Box<dyn Stageable>,
}

/// Everything guarded by the store lock
struct Store {
    state: StagerState,
    entries: Vec<Registration>,
    next_id: u64,
}

/// Default [`Stager`]: a locked, append-only store drained by a single pass.
///
/// Concurrent `stage_with` callers queue on the pass lock; whoever arrives
/// after the pass finds the stager `Staged` and returns
/// [`StageSummary::already_staged`]. The pass lock is reentrant, so a
/// stageable that triggers its own stager gets the same empty summary
/// instead of deadlocking.
pub struct DefaultStager<A: StageIdentity> {
    stage: A,
    order: Order,
    store: Mutex<Store>,
    pass: ReentrantMutex<()>,
    observer: Arc<dyn StagerObserver>,
}

impl<A: StageIdentity> DefaultStager<A> {
    /// Create a stager that runs its entries oldest first
    pub fn new(stage: A) -> Self {
        Self::with_order(stage, Order::FirstInFirstOut)
    }

    pub fn with_order(stage: A, order: Order) -> Self {
        Self {
            stage,
            order,
            store: Mutex::new(Store {
                state: StagerState::Registering,
                entries: Vec::new(),
                next_id: 0,
            }),
            pass: ReentrantMutex::new(()),
            observer: Arc::new(LogObserver),
        }
    }

    /// Replace the default [`LogObserver`]
    pub fn with_observer(mut self, observer: Arc<dyn StagerObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn state(&self) -> StagerState {
        self.store.lock().state
    }

    /// Number of registrations waiting for the pass
    pub fn len(&self) -> usize {
        self.store.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn emit(&self, event: StagerEvent) {
        self.observer.on_event(&event);
    }

    /// Invoke one entry, isolating whatever it does from the rest of the pass.
    ///
    /// The handler hears about the entry exactly once. When the stageable
    /// reported nothing, the failure is reported on its behalf.
    fn invoke(&self, entry: &Registration, handler: &dyn StageHandler) -> Option<String> {
        let forward = PassHandler {
            inner: handler,
            reports: Cell::new(0),
            cause: RefCell::new(None),
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| entry.stageable.stage(&forward)));

        let reports = forward.reports.get();
        let cause = forward.cause.into_inner();
        let described = Described(entry.stageable.describe());
        let unreported = match (result, reports) {
            (Ok(()), 1) => return cause,
            (Ok(()), 0) => {
                log::warn!("Stage '{}': {} reported no outcome", self.stage.name(), entry.id);
                StageError::NoOutcome {
                    target: described.0.clone(),
                }
            }
            (Ok(()), n) => {
                log::warn!("Stage '{}': {} reported {} outcomes, kept the first", self.stage.name(), entry.id, n);
                return cause;
            }
            (Err(payload), 0) => {
                let message = panic_message(payload.as_ref());
                log::error!("Stage '{}': {} panicked before reporting: {}", self.stage.name(), entry.id, message);
                StageError::Unwound {
                    target: described.0.clone(),
                    message,
                }
            }
            (Err(payload), _) => {
                log::error!(
                    "Stage '{}': {} panicked after reporting: {}",
                    self.stage.name(),
                    entry.id,
                    panic_message(payload.as_ref())
                );
                return cause;
            }
        };

        let target = StageTarget::from_parts(&entry.id, &described, type_name::<RegistrationId>());
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.on_error(target, &unreported))) {
            log::error!(
                "Stage '{}': handler panicked on {}: {}",
                self.stage.name(),
                entry.id,
                panic_message(payload.as_ref())
            );
        }
        Some(unreported.to_string())
    }
}

impl<A: StageIdentity> Stager<A> for DefaultStager<A> {
    fn register(&self, stageable: Box<dyn Stageable>) -> Result<RegistrationId, StagerError> {
        let target = stageable.describe();
        let mut store = self.store.lock();

        if store.state != StagerState::Registering {
            let state = store.state;
            drop(store);
            self.emit(StagerEvent::RegistrationRejected {
                stage: self.stage.name().to_string(),
                state,
                target,
            });
            return Err(StagerError::RegistrationClosed {
                stage: self.stage.name().to_string(),
                state,
            });
        }

        let id = RegistrationId(store.next_id);
        store.next_id += 1;
        store.entries.push(Registration { id, stageable });
        drop(store);

        self.emit(StagerEvent::Registered {
            stage: self.stage.name().to_string(),
            id,
            target,
        });
        Ok(id)
    }

    fn stage_with(&self, handler: &dyn StageHandler) -> StageSummary {
        let _pass = self.pass.lock();

        let entries = {
            let mut store = self.store.lock();
            if store.state != StagerState::Registering {
                let state = store.state;
                drop(store);
                self.emit(StagerEvent::PassSkipped {
                    stage: self.stage.name().to_string(),
                    state,
                });
                return StageSummary::already_staged();
            }
            store.state = StagerState::Staging;
            std::mem::take(&mut store.entries)
        };

        let entries = self.order.arrange(entries);
        self.emit(StagerEvent::PassStarted {
            stage: self.stage.name().to_string(),
            order: self.order,
            entries: entries.len(),
        });

        let mut summary = StageSummary::default();
        for entry in &entries {
            let cause = self.invoke(entry, handler);
            summary.attempted += 1;
            if cause.is_some() {
                summary.failed += 1;
            }
            self.emit(StagerEvent::Invoked {
                stage: self.stage.name().to_string(),
                id: entry.id,
                target: entry.stageable.describe(),
                cause,
            });
        }

        self.store.lock().state = StagerState::Staged;
        self.emit(StagerEvent::PassCompleted {
            stage: self.stage.name().to_string(),
            attempted: summary.attempted,
            failed: summary.failed,
        });
        summary
    }

    fn identity(&self) -> &A {
        &self.stage
    }
}

impl<A: StageIdentity> fmt::Debug for DefaultStager<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store.lock();
        f.debug_struct("DefaultStager")
            .field("stage", &self.stage)
            .field("order", &self.order)
            .field("state", &store.state)
            .field("entries", &store.entries.len())
            .finish()
    }
}

impl<A: StageIdentity> Drop for DefaultStager<A> {
    fn drop(&mut self) {
        let store = self.store.get_mut();
        if store.state == StagerState::Registering && !store.entries.is_empty() {
            log::warn!(
                "Stage '{}' dropped with {} registrations never staged",
                self.stage.name(),
                store.entries.len()
            );
        }
    }
}

/// Description of an entry that never produced its own target
struct Described(String);

impl fmt::Debug for Described {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sits between a stageable and the caller's handler for one entry.
///
/// Forwards only the first report so the caller sees exactly one outcome,
/// and remembers the cause for the pass summary.
struct PassHandler<'h> {
    inner: &'h dyn StageHandler,
    reports: Cell<usize>,
    cause: RefCell<Option<String>>,
}

impl StageHandler for PassHandler<'_> {
    fn on_success(&self, target: StageTarget<'_>) {
        let n = self.reports.get();
        self.reports.set(n + 1);
        if n == 0 {
            self.inner.on_success(target);
        }
    }

    fn on_error(&self, target: StageTarget<'_>, cause: &(dyn StdError + 'static)) {
        let n = self.reports.get();
        self.reports.set(n + 1);
        if n == 0 {
            *self.cause.borrow_mut() = Some(cause.to_string());
            self.inner.on_error(target, cause);
        }
    }
}
