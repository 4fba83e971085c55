//! # Stager Events
//!
//! Structured events a stager reports about registrations and passes.
//! Each stager holds an injected [`StagerObserver`]; nothing here is
//! process-global. [`LogObserver`] is the default and turns events into
//! `log` records.
pub mod types;

use std::fmt;

use parking_lot::Mutex;

pub use types::StagerEvent;

/// Receives every event a stager emits, synchronously and in order.
pub trait StagerObserver: Send + Sync {
    fn on_event(&self, event: &StagerEvent);
}

impl fmt::Debug for dyn StagerObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagerObserver").finish_non_exhaustive()
    }
}

/// Writes events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StagerObserver for LogObserver {
    fn on_event(&self, event: &StagerEvent) {
        match event {
            StagerEvent::Registered { .. } | StagerEvent::Invoked { cause: None, .. } => {
                log::debug!("{}", event)
            }
            StagerEvent::PassStarted { .. } | StagerEvent::PassSkipped { .. } => log::info!("{}", event),
            StagerEvent::PassCompleted { failed, .. } if *failed == 0 => log::info!("{}", event),
            _ => log::warn!("{}", event),
        }
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl StagerObserver for SilentObserver {
    fn on_event(&self, _event: &StagerEvent) {}
}

/// Keeps every event in memory, for diagnostics and tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<StagerEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StagerEvent> {
        self.events.lock().clone()
    }

    /// Names of the recorded events, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(StagerEvent::name).collect()
    }
}

impl StagerObserver for RecordingObserver {
    fn on_event(&self, event: &StagerEvent) {
        self.events.lock().push(event.clone());
    }
}
