//! Stops background services when the application winds down.
//!
//! [`ServiceStopModule`] owns a LIFO stager for the [`ServiceStop`] stage and
//! calls `stop_async` on every registered [`Service`], newest first.
//! [`TaskService`] is a tokio-backed service usable out of the box.
mod module;
mod service;

pub use module::{START_METHOD, STOP_METHOD, ServiceRegistry, ServiceStop, ServiceStopModule, ServiceTarget};
pub use service::{Service, ServiceError, ServiceState, TaskService};
