use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use tokio::task::{AbortHandle, JoinHandle};

use crate::stager::error::StagerError;
use crate::stager::stageable::wrap;
use crate::stager::{DefaultStager, StageIdentity, Stager};

/// A resource that knows how to release itself.
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self) -> Result<(), Box<dyn StdError + Send + Sync>>;
}

/// A stager that accepts resources directly and disposes them during its pass.
pub trait DisposingStager<A: StageIdentity>: Stager<A> {
    /// Register `resource` for disposal and hand it back, so it can be
    /// registered at the point of construction.
    fn register_disposable<T>(&self, resource: Arc<T>) -> Result<Arc<T>, StagerError>
    where
        T: Dispose + fmt::Debug;
}

impl<A: StageIdentity> DisposingStager<A> for DefaultStager<A> {
    fn register_disposable<T>(&self, resource: Arc<T>) -> Result<Arc<T>, StagerError>
    where
        T: Dispose + fmt::Debug,
    {
        self.register(Box::new(wrap(Arc::clone(&resource), |r: &T| r.dispose())))?;
        Ok(resource)
    }
}

// Disposing a task aborts it; the executor-shutdown case.
impl<T: Send + 'static> Dispose for JoinHandle<T> {
    fn dispose(&self) -> Result<(), Box<dyn StdError + Send + Sync>> {
        self.abort();
        Ok(())
    }
}

impl Dispose for AbortHandle {
    fn dispose(&self) -> Result<(), Box<dyn StdError + Send + Sync>> {
        self.abort();
        Ok(())
    }
}
