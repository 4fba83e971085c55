use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::binding::error::{BindingError, HookError};
use crate::binding::matcher::TypeMatcher;
use crate::binding::target::{HookTarget, StageableHook};
use crate::stager::type_mapper::{NoOpStageableTypeMapper, StageableTypeMapper, TypeDescriptor};
use crate::stager::{StageIdentity, StageKind, Stager};

/// Ties a stager to the targets it should collect hooks from.
///
/// Build one with [`StageBinding::new`] and struct update syntax:
///
/// ```
/// use std::sync::Arc;
/// use lifecycle_core::binding::{StageBinding, TypeMatcher};
/// use lifecycle_core::stager::{DefaultStager, NamedStage, Order, StageKind};
///
/// let stager = Arc::new(DefaultStager::with_order(
///     NamedStage::new("stop").with_kind(StageKind::Type),
///     Order::FirstInLastOut,
/// ));
/// let binding = StageBinding {
///     method: Some("stop".to_string()),
///     matcher: TypeMatcher::Any,
///     ..StageBinding::new(stager)
/// };
/// assert!(binding.validate().is_ok());
/// ```
pub struct StageBinding<A: StageIdentity> {
    pub stager: Arc<dyn Stager<A>>,
    pub matcher: TypeMatcher,
    pub type_mapper: Arc<dyn StageableTypeMapper>,
    /// Hook to invoke on every matching type. Required for [`StageKind::Type`]
    /// stages, ignored for marker stages.
    pub method: Option<String>,
}

impl<A: StageIdentity> StageBinding<A> {
    pub fn new<S: Stager<A> + 'static>(stager: Arc<S>) -> Self {
        Self {
            stager,
            matcher: TypeMatcher::Any,
            type_mapper: Arc::new(NoOpStageableTypeMapper),
            method: None,
        }
    }

    pub fn validate(&self) -> Result<(), BindingError> {
        let stage = self.stager.identity();
        if stage.kind() == StageKind::Type && self.method.as_deref().is_none_or(str::is_empty) {
            return Err(BindingError::MissingMethod {
                stage: stage.name().to_string(),
            });
        }
        Ok(())
    }
}

impl<A: StageIdentity> fmt::Debug for StageBinding<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageBinding")
            .field("stage", self.stager.identity())
            .field("matcher", &self.matcher)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// A binding with its stage identity erased, so one module can hold many.
trait ErasedBinding: Send + Sync {
    fn provision(&self, target: &Arc<dyn HookTarget>, ty: TypeDescriptor) -> Result<usize, BindingError>;
}

impl<A: StageIdentity> ErasedBinding for StageBinding<A> {
    fn provision(&self, target: &Arc<dyn HookTarget>, ty: TypeDescriptor) -> Result<usize, BindingError> {
        if !self.matcher.matches(&ty) {
            return Ok(0);
        }

        let stage = self.stager.identity();
        let hooks: Vec<&'static str> = match stage.kind() {
            StageKind::Marker => target
                .hooks()
                .iter()
                .filter(|h| h.carries(stage.name()))
                .map(|h| h.name)
                .collect(),
            StageKind::Type => {
                let method = self.method.as_deref().ok_or_else(|| BindingError::MissingMethod {
                    stage: stage.name().to_string(),
                })?;
                let hook = target.find_hook(method).ok_or_else(|| BindingError::MethodNotFound {
                    stage: stage.name().to_string(),
                    type_name: ty.name(),
                    method: method.to_string(),
                })?;
                vec![hook.name]
            }
        };

        for hook in &hooks {
            let id = self.stager.register(Box::new(StageableHook::new(Arc::clone(target), *hook, ty)))?;
            self.type_mapper.register_type(stage.name(), id, ty);
        }
        Ok(hooks.len())
    }
}

/// Callback run on a target right after one of its provision-time hooks
/// succeeded. An error fails the provisioning.
pub type AfterInvocation = Arc<dyn Fn(&dyn HookTarget) -> Result<(), HookError> + Send + Sync>;

/// Which hooks a provision-time binding runs
#[derive(Debug, Clone)]
enum HookSelector {
    Method(String),
    /// Every hook carrying one of these names, marker by marker
    Markers(Vec<String>),
}

/// Hooks run as soon as a matching target is provisioned, not at staging time
#[derive(Clone)]
struct ProvisionHook {
    matcher: TypeMatcher,
    selector: HookSelector,
    after: Option<AfterInvocation>,
}

impl ProvisionHook {
    fn run(&self, target: &Arc<dyn HookTarget>, ty: TypeDescriptor) -> Result<(), BindingError> {
        if !self.matcher.matches(&ty) {
            return Ok(());
        }
        let hooks: Vec<&'static str> = match &self.selector {
            HookSelector::Method(method) => {
                let hook = target.find_hook(method).ok_or_else(|| BindingError::MethodNotFound {
                    stage: "<provision>".to_string(),
                    type_name: ty.name(),
                    method: method.clone(),
                })?;
                vec![hook.name]
            }
            HookSelector::Markers(markers) => markers
                .iter()
                .flat_map(|marker| target.hooks().iter().filter(move |h| h.carries(marker)))
                .map(|h| h.name)
                .collect(),
        };

        for hook in hooks {
            log::info!("Lifecycle - before invoke {} for {:?}", hook, target);
            target.invoke_hook(hook).map_err(|source| BindingError::ProvisionFailed {
                method: hook.to_string(),
                type_name: ty.name(),
                source,
            })?;
            log::info!("Lifecycle - after invoke {} for {:?}", hook, target);

            if let Some(after) = &self.after {
                after(&**target).map_err(|source| BindingError::AfterInvocationFailed {
                    method: hook.to_string(),
                    type_name: ty.name(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ProvisionHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionHook")
            .field("matcher", &self.matcher)
            .field("selector", &self.selector)
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// Collects stage bindings and turns them into a [`Provisioner`] once.
///
/// Every binding is validated when it is added, so a missing method surfaces
/// at configuration time rather than at the first provisioned target.
/// Configuring a module twice is an error.
pub struct LifecycleModule {
    name: String,
    bindings: Vec<Arc<dyn ErasedBinding>>,
    provision_hooks: Vec<ProvisionHook>,
    configured: AtomicBool,
}

impl LifecycleModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
            provision_hooks: Vec::new(),
            configured: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a stage binding
    pub fn bind_stager<A: StageIdentity>(&mut self, binding: StageBinding<A>) -> Result<&mut Self, BindingError> {
        self.ensure_open()?;
        binding.validate()?;
        log::info!("Lifecycle - bind stage '{}' with matcher {:?}", binding.stager.identity().name(), binding.matcher);
        self.bindings.push(Arc::new(binding));
        Ok(self)
    }

    /// Run `method` on every matching target the moment it is provisioned.
    /// A failure is returned from [`Provisioner::provision`].
    pub fn bind_lifecycle(&mut self, matcher: TypeMatcher, method: impl Into<String>) -> Result<&mut Self, BindingError> {
        self.push_provision_hook(matcher, HookSelector::Method(method.into()), None)
    }

    /// Like [`bind_lifecycle`](Self::bind_lifecycle), then run `after` on the target.
    pub fn bind_lifecycle_with(
        &mut self,
        matcher: TypeMatcher,
        method: impl Into<String>,
        after: AfterInvocation,
    ) -> Result<&mut Self, BindingError> {
        self.push_provision_hook(matcher, HookSelector::Method(method.into()), Some(after))
    }

    /// Run every hook carrying one of `markers`, in the order the markers are
    /// listed, on every matching target the moment it is provisioned.
    pub fn bind_lifecycle_markers(&mut self, markers: &[&str], matcher: TypeMatcher) -> Result<&mut Self, BindingError> {
        self.push_provision_hook(matcher, HookSelector::Markers(markers.iter().map(|m| m.to_string()).collect()), None)
    }

    pub fn bind_lifecycle_markers_with(
        &mut self,
        markers: &[&str],
        matcher: TypeMatcher,
        after: AfterInvocation,
    ) -> Result<&mut Self, BindingError> {
        self.push_provision_hook(
            matcher,
            HookSelector::Markers(markers.iter().map(|m| m.to_string()).collect()),
            Some(after),
        )
    }

    fn push_provision_hook(
        &mut self,
        matcher: TypeMatcher,
        selector: HookSelector,
        after: Option<AfterInvocation>,
    ) -> Result<&mut Self, BindingError> {
        self.ensure_open()?;
        log::info!("Lifecycle - bind to {:?} with {:?}", matcher, selector);
        self.provision_hooks.push(ProvisionHook { matcher, selector, after });
        Ok(self)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Freeze the module. Only the first call succeeds.
    pub fn configure(&self) -> Result<Provisioner, BindingError> {
        if self.configured.swap(true, Ordering::SeqCst) {
            return Err(BindingError::AlreadyConfigured {
                module: self.name.clone(),
            });
        }
        Ok(Provisioner {
            module: self.name.clone(),
            bindings: self.bindings.clone(),
            provision_hooks: self.provision_hooks.clone(),
        })
    }

    fn ensure_open(&mut self) -> Result<(), BindingError> {
        if *self.configured.get_mut() {
            return Err(BindingError::AlreadyConfigured {
                module: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for LifecycleModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleModule")
            .field("name", &self.name)
            .field("bindings", &self.bindings.len())
            .field("provision_hooks", &self.provision_hooks)
            .field("configured", &self.configured.load(Ordering::SeqCst))
            .finish()
    }
}

/// Entry point for the code that creates targets.
///
/// Cheap to clone and safe to share across threads; provisioning from many
/// threads at once registers into the bound stagers concurrently.
#[derive(Clone)]
pub struct Provisioner {
    module: String,
    bindings: Vec<Arc<dyn ErasedBinding>>,
    provision_hooks: Vec<ProvisionHook>,
}

impl Provisioner {
    /// Hand a freshly created target to every binding.
    ///
    /// Provision hooks run first, then each matching binding registers one
    /// stageable per hook. Returns how many stageables were registered. On
    /// error, registrations made by earlier bindings stay in place.
    pub fn provision<T: HookTarget>(&self, target: Arc<T>) -> Result<usize, BindingError> {
        let ty = TypeDescriptor::of::<T>();
        let target: Arc<dyn HookTarget> = target;

        for hook in &self.provision_hooks {
            hook.run(&target, ty)?;
        }

        let mut registered = 0;
        for binding in &self.bindings {
            registered += binding.provision(&target, ty)?;
        }
        log::debug!("Module '{}' provisioned {} with {} stageables", self.module, ty, registered);
        Ok(registered)
    }
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("module", &self.module)
            .field("bindings", &self.bindings.len())
            .finish_non_exhaustive()
    }
}
