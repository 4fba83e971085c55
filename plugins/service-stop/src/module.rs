use std::any::Any;
use std::fmt;
use std::sync::Arc;

use lifecycle_core::binding::{BindingError, Hook, HookError, HookTarget, LifecycleModule, Provisioner, StageBinding};
use lifecycle_core::event::StagerObserver;
use lifecycle_core::stager::{DefaultStageableTypeMapper, DefaultStager, Order, StageIdentity, StageKind};
use lifecycle_core::TypeMatcher;

use crate::service::Service;

/// Hook invoked on every service when the stop stage runs
pub const STOP_METHOD: &str = "stop_async";

/// Hook invoked on every service as it is registered, when enabled
pub const START_METHOD: &str = "start_async";

/// Stage identity of the service stop stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStop;

impl StageIdentity for ServiceStop {
    fn name(&self) -> &str {
        "ServiceStop"
    }

    fn kind(&self) -> StageKind {
        StageKind::Type
    }
}

/// Exposes a [`Service`]'s start and stop methods as hooks.
pub struct ServiceTarget<S: Service> {
    service: Arc<S>,
}

impl<S: Service> ServiceTarget<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }
}

impl<S: Service> fmt::Debug for ServiceTarget<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service.name())
    }
}

impl<S: Service> HookTarget for ServiceTarget<S> {
    fn hooks(&self) -> &'static [Hook] {
        const HOOKS: &[Hook] = &[Hook::named(START_METHOD), Hook::named(STOP_METHOD)];
        HOOKS
    }

    fn invoke_hook(&self, name: &str) -> Result<(), HookError> {
        let result = match name {
            START_METHOD => self.service.start_async(),
            STOP_METHOD => self.service.stop_async(),
            other => {
                return Err(HookError::not_invocable(other, std::any::type_name::<S>(), "not a service method"));
            }
        };
        result.map_err(|e| HookError::failed(name, e))
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

/// Module owning the LIFO stager that stops services.
///
/// Services registered through the [`ServiceRegistry`] are stopped in reverse
/// registration order when [`ServiceStopModule::stager`] is staged.
pub struct ServiceStopModule {
    stager: Arc<DefaultStager<ServiceStop>>,
    type_mapper: Arc<DefaultStageableTypeMapper>,
    module: LifecycleModule,
}

impl ServiceStopModule {
    pub fn new() -> Result<Self, BindingError> {
        Self::build(DefaultStager::with_order(ServiceStop, Order::FirstInLastOut))
    }

    /// Like [`ServiceStopModule::new`], reporting stager events to `observer`
    pub fn with_observer(observer: Arc<dyn StagerObserver>) -> Result<Self, BindingError> {
        Self::build(DefaultStager::with_order(ServiceStop, Order::FirstInLastOut).with_observer(observer))
    }

    fn build(stager: DefaultStager<ServiceStop>) -> Result<Self, BindingError> {
        let stager = Arc::new(stager);
        let type_mapper = Arc::new(DefaultStageableTypeMapper::new());
        let mut module = LifecycleModule::new("service-stop");
        module.bind_stager(StageBinding {
            method: Some(STOP_METHOD.to_string()),
            type_mapper: type_mapper.clone(),
            ..StageBinding::new(Arc::clone(&stager))
        })?;
        Ok(Self {
            stager,
            type_mapper,
            module,
        })
    }

    /// Also start each service as soon as it is registered
    pub fn start_on_register(mut self) -> Result<Self, BindingError> {
        self.module.bind_lifecycle(TypeMatcher::Any, START_METHOD)?;
        Ok(self)
    }

    pub fn stager(&self) -> Arc<DefaultStager<ServiceStop>> {
        Arc::clone(&self.stager)
    }

    /// Which service types have been registered with the stop stage
    pub fn type_mapper(&self) -> &DefaultStageableTypeMapper {
        &self.type_mapper
    }

    /// Freeze the module. Can only be called once.
    pub fn configure(&self) -> Result<ServiceRegistry, BindingError> {
        Ok(ServiceRegistry {
            provisioner: self.module.configure()?,
        })
    }
}

impl fmt::Debug for ServiceStopModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceStopModule")
            .field("stager", &self.stager)
            .field("module", &self.module)
            .finish()
    }
}

/// Where code that creates services hands them over.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    provisioner: Provisioner,
}

impl ServiceRegistry {
    /// Register `service` for stopping and hand it back
    pub fn register<S: Service>(&self, service: Arc<S>) -> Result<Arc<S>, BindingError> {
        let target = Arc::new(ServiceTarget::new(Arc::clone(&service)));
        self.provisioner.provision(target)?;
        log::debug!("Registered service '{}'", service.name());
        Ok(service)
    }
}
