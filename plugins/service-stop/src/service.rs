use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Where a service is in its own lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    New,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::New => "new",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
            ServiceState::Terminated => "terminated",
            ServiceState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service '{service}' cannot {action} while {state}")]
    InvalidTransition {
        service: String,
        action: &'static str,
        state: ServiceState,
    },

    #[error("Service '{service}' refused to stop")]
    Refused { service: String },

    #[error("Service '{service}' needs a tokio runtime to start")]
    NoRuntime { service: String },

    #[error("Service '{service}' task ended abnormally: {source}")]
    Join {
        service: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// A long-running component that starts and stops without blocking.
///
/// `stop_async` only requests the stop; a service that was never started
/// goes straight to [`ServiceState::Terminated`].
pub trait Service: Send + Sync + fmt::Debug + 'static {
    fn name(&self) -> &str;

    fn start_async(&self) -> Result<(), ServiceError>;

    fn stop_async(&self) -> Result<(), ServiceError>;

    fn state(&self) -> ServiceState;
}

/// A service backed by a tokio task that ticks on a fixed period until stopped.
pub struct TaskService {
    name: String,
    period: Duration,
    refuse_stop: bool,
    ticks: Arc<AtomicU64>,
    state: Arc<Mutex<ServiceState>>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TaskService {
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            name: name.into(),
            period,
            refuse_stop: false,
            ticks: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(ServiceState::New)),
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Make every stop request fail, leaving the task running
    pub fn refusing_stop(mut self) -> Self {
        self.refuse_stop = true;
        self
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Wait for the backing task to exit. Returns at once if it never started.
    pub async fn await_terminated(&self) -> Result<(), ServiceError> {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await.map_err(|source| ServiceError::Join {
                service: self.name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Abort the backing task without going through `stop_async`
    pub fn abort(&self) {
        if let Some(task) = self.task.lock().as_ref() {
            task.abort();
        }
    }
}

impl Service for TaskService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_async(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        if *state != ServiceState::New {
            return Err(ServiceError::InvalidTransition {
                service: self.name.clone(),
                action: "start",
                state: *state,
            });
        }
        let handle = Handle::try_current().map_err(|_| ServiceError::NoRuntime {
            service: self.name.clone(),
        })?;

        let mut shutdown = self.shutdown.subscribe();
        let ticks = Arc::clone(&self.ticks);
        let task_state = Arc::clone(&self.state);
        let name = self.name.clone();
        let period = self.period;
        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        ticks.fetch_add(1, Ordering::Relaxed);
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            *task_state.lock() = ServiceState::Terminated;
            log::info!("Service '{}' terminated", name);
        });

        *self.task.lock() = Some(task);
        *state = ServiceState::Running;
        log::info!("Service '{}' started", self.name);
        Ok(())
    }

    fn stop_async(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        match *state {
            ServiceState::New => {
                log::debug!("Service '{}' stopped before it started", self.name);
                *state = ServiceState::Terminated;
                Ok(())
            }
            ServiceState::Running if self.refuse_stop => {
                *state = ServiceState::Failed;
                Err(ServiceError::Refused {
                    service: self.name.clone(),
                })
            }
            ServiceState::Running => {
                *state = ServiceState::Stopping;
                self.shutdown.send_replace(true);
                log::info!("Service '{}' stopping", self.name);
                Ok(())
            }
            ServiceState::Stopping | ServiceState::Terminated => Ok(()),
            ServiceState::Failed => Err(ServiceError::InvalidTransition {
                service: self.name.clone(),
                action: "stop",
                state: ServiceState::Failed,
            }),
        }
    }

    fn state(&self) -> ServiceState {
        *self.state.lock()
    }
}

impl fmt::Debug for TaskService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskService")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
