use std::fs;
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::tempdir;

use crate::config::{LifecycleConfig, StageConfig};
use crate::event::RecordingObserver;
use crate::kernel::{Error, Lifecycle};
use crate::stager::{CollectingStageHandler, NoOpStageHandler, Order, Stager, StagerState, wrap};

fn record(log: &Arc<Mutex<Vec<String>>>, entry: &'static str) -> Box<dyn crate::stager::Stageable> {
    let log = Arc::clone(log);
    Box::new(wrap(Arc::new(entry), move |e: &&'static str| {
        log.lock().push(e.to_string());
        Ok::<_, std::io::Error>(())
    }))
}

#[test]
fn test_default_lifecycle_stages() {
    let lifecycle = Lifecycle::new(LifecycleConfig::default()).unwrap();

    assert_eq!(lifecycle.stage_names(), vec!["startup", "shutdown"]);
    assert_eq!(lifecycle.stager("shutdown").unwrap().order(), Order::FirstInLastOut);
    assert_eq!(lifecycle.stager("startup").unwrap().order(), Order::FirstInFirstOut);
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = Lifecycle::new(LifecycleConfig { stages: vec![] });
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_unknown_stage() {
    let lifecycle = Lifecycle::new(LifecycleConfig::default()).unwrap();

    assert!(matches!(lifecycle.stager("reload"), Err(Error::UnknownStage(ref name)) if name == "reload"));
    assert!(lifecycle.stage("reload", &NoOpStageHandler).is_err());
}

#[test]
fn test_stage_all_runs_in_configuration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let lifecycle = Lifecycle::new(LifecycleConfig::default()).unwrap();
    let startup = lifecycle.stager("startup").unwrap();
    let shutdown = lifecycle.stager("shutdown").unwrap();
    startup.register(record(&log, "open-a")).unwrap();
    startup.register(record(&log, "open-b")).unwrap();
    shutdown.register(record(&log, "close-a")).unwrap();
    shutdown.register(record(&log, "close-b")).unwrap();

    let handler = CollectingStageHandler::new();
    let results = lifecycle.stage_all(&handler);

    assert_eq!(*log.lock(), vec!["open-a", "open-b", "close-b", "close-a"]);
    assert_eq!(results.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(), vec!["startup", "shutdown"]);
    assert!(results.iter().all(|(_, s)| s.attempted == 2 && s.is_clean()));
    assert_eq!(startup.state(), StagerState::Staged);
}

#[test]
fn test_stage_strict_reports_failures_after_full_pass() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let lifecycle = Lifecycle::new(LifecycleConfig::default()).unwrap();
    let shutdown = lifecycle.stager("shutdown").unwrap();
    shutdown.register(record(&log, "first")).unwrap();
    shutdown
        .register(Box::new(wrap(Arc::new("broken"), |_: &&'static str| {
            Err(std::io::Error::other("still busy"))
        })))
        .unwrap();

    let err = lifecycle.stage_strict("shutdown", &NoOpStageHandler).unwrap_err();

    match err {
        Error::StageFailed { stage, attempted, failed } => {
            assert_eq!(stage, "shutdown");
            assert_eq!((attempted, failed), (2, 1));
        }
        other => panic!("Expected StageFailed, got {:?}", other),
    }
    assert_eq!(*log.lock(), vec!["first"], "Later failure does not stop earlier registration");
}

#[test]
fn test_stage_strict_on_staged_stage_is_ok() {
    let lifecycle = Lifecycle::new(LifecycleConfig::default()).unwrap();
    lifecycle.stage("startup", &NoOpStageHandler).unwrap();

    let summary = lifecycle.stage_strict("startup", &NoOpStageHandler).unwrap();

    assert!(summary.already_staged);
}

#[test]
fn test_from_path_and_shared_observer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lifecycle.toml");
    fs::write(&path, "[[stages]]\nname = \"drain\"\norder = \"lifo\"\n").unwrap();

    let lifecycle = Lifecycle::from_path(&path).unwrap();
    assert_eq!(lifecycle.config().stages, vec![StageConfig::new("drain", Order::FirstInLastOut)]);

    let observer = Arc::new(RecordingObserver::new());
    let observed = Lifecycle::with_observer(lifecycle.config().clone(), observer.clone()).unwrap();
    observed.stage_all(&NoOpStageHandler);

    assert_eq!(observer.names(), vec!["stager.pass_started", "stager.pass_completed"]);
    assert_eq!(format!("{:?}", observed), "Lifecycle { stages: [\"drain\"] }");
}

#[test]
fn test_error_conversions() {
    let err: Error = "plain message".into();
    assert_eq!(err.to_string(), "Error: plain message");

    let err: Error = crate::config::ConfigError::NoStages.into();
    assert_eq!(err.to_string(), "Configuration error: Configuration defines no stages");
}
