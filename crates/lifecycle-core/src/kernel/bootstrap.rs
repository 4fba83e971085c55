use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::LifecycleConfig;
use crate::event::{LogObserver, StagerObserver};
use crate::kernel::constants;
use crate::kernel::error::{Error, Result};
use crate::stager::{DefaultStager, NamedStage, StageHandler, StageIdentity, StageSummary, Stager};

/// The configured stages of one application.
///
/// Owns one [`DefaultStager`] per configured stage. Deciding *when* to stage
/// is left to the caller; [`Lifecycle::stage_all`] stages every stage in
/// configuration order.
pub struct Lifecycle {
    config: LifecycleConfig,
    stagers: Vec<Arc<DefaultStager<NamedStage>>>,
}

impl Lifecycle {
    /// Build stagers for every stage in a validated configuration
    pub fn new(config: LifecycleConfig) -> Result<Self> {
        Self::with_observer(config, Arc::new(LogObserver))
    }

    /// Like [`Lifecycle::new`], with every stager reporting to `observer`
    pub fn with_observer(config: LifecycleConfig, observer: Arc<dyn StagerObserver>) -> Result<Self> {
        config.validate()?;
        log::info!("Initializing {} v{} with {} stages", constants::APP_NAME, constants::APP_VERSION, config.stages.len());

        let stagers = config
            .stages
            .iter()
            .map(|stage| {
                log::debug!("Stage '{}' runs {}", stage.name, stage.order);
                Arc::new(
                    DefaultStager::with_order(NamedStage::new(stage.name.clone()), stage.order)
                        .with_observer(Arc::clone(&observer)),
                )
            })
            .collect();

        Ok(Self { config, stagers })
    }

    /// Load configuration from `path` and build its stagers
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::new(LifecycleConfig::load(path)?)
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Names of the configured stages, in configuration order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stagers.iter().map(|s| s.identity().name()).collect()
    }

    pub fn stager(&self, name: &str) -> Result<Arc<DefaultStager<NamedStage>>> {
        self.stagers
            .iter()
            .find(|s| s.identity().name() == name)
            .cloned()
            .ok_or_else(|| Error::UnknownStage(name.to_string()))
    }

    /// Stage one stage, reporting outcomes to `handler`
    pub fn stage(&self, name: &str, handler: &dyn StageHandler) -> Result<StageSummary> {
        Ok(self.stager(name)?.stage_with(handler))
    }

    /// Stage one stage and turn any failed stageable into an error.
    ///
    /// Every stageable is still attempted; the error only summarizes the pass.
    pub fn stage_strict(&self, name: &str, handler: &dyn StageHandler) -> Result<StageSummary> {
        let summary = self.stage(name, handler)?;
        if !summary.is_clean() {
            return Err(Error::StageFailed {
                stage: name.to_string(),
                attempted: summary.attempted,
                failed: summary.failed,
            });
        }
        Ok(summary)
    }

    /// Stage every configured stage in configuration order.
    pub fn stage_all(&self, handler: &dyn StageHandler) -> Vec<(String, StageSummary)> {
        self.stagers
            .iter()
            .map(|stager| {
                log::info!("Staging '{}'", stager.identity().name());
                (stager.identity().name().to_string(), stager.stage_with(handler))
            })
            .collect()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("stages", &self.stage_names())
            .finish()
    }
}
