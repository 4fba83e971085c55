use std::sync::Arc;

use super::fixtures::{Broken, Database, Worker, Wedged, calls, database, worker};
use crate::binding::{BindingError, HookError, HookTarget, LifecycleModule, StageBinding, TypeMatcher};
use crate::stager::{
    CollectingStageHandler, DefaultStageableTypeMapper, DefaultStager, NamedStage, Order, StageKind, StageOutcome,
    StageTarget, Stager, TypeDescriptor,
};

fn marker_stager(name: &'static str, order: Order) -> Arc<DefaultStager<NamedStage>> {
    Arc::new(DefaultStager::with_order(NamedStage::new(name), order))
}

fn type_stager(name: &'static str) -> Arc<DefaultStager<NamedStage>> {
    Arc::new(DefaultStager::with_order(
        NamedStage::new(name).with_kind(StageKind::Type),
        Order::FirstInLastOut,
    ))
}

#[test]
fn test_type_binding_without_method_is_rejected() {
    let mut module = LifecycleModule::new("services");

    let result = module.bind_stager(StageBinding::new(type_stager("stop")));

    assert!(matches!(result, Err(BindingError::MissingMethod { ref stage }) if stage == "stop"));

    let empty = StageBinding {
        method: Some(String::new()),
        ..StageBinding::new(type_stager("stop"))
    };
    assert!(matches!(empty.validate(), Err(BindingError::MissingMethod { .. })));
    assert_eq!(module.binding_count(), 0);
}

#[test]
fn test_marker_stage_ignores_method() {
    let binding = StageBinding {
        method: Some("whatever".to_string()),
        ..StageBinding::new(marker_stager("shutdown", Order::FirstInLastOut))
    };
    assert!(binding.validate().is_ok());
}

#[test]
fn test_marker_stage_collects_carrying_hooks() {
    let calls = calls();
    let startup = marker_stager("startup", Order::FirstInFirstOut);
    let shutdown = marker_stager("shutdown", Order::FirstInLastOut);
    let mut module = LifecycleModule::new("storage");
    module
        .bind_stager(StageBinding::new(Arc::clone(&startup)))
        .unwrap()
        .bind_stager(StageBinding::new(Arc::clone(&shutdown)))
        .unwrap();
    let provisioner = module.configure().unwrap();

    assert_eq!(provisioner.provision(database("main", &calls)).unwrap(), 3);
    assert_eq!(provisioner.provision(database("audit", &calls)).unwrap(), 3);
    assert!(calls.lock().is_empty(), "Provisioning must not run stage hooks");

    startup.stage();
    assert_eq!(*calls.lock(), vec!["main.connect", "audit.connect"]);

    calls.lock().clear();
    shutdown.stage();
    assert_eq!(
        *calls.lock(),
        vec!["audit.close", "audit.flush", "main.close", "main.flush"],
        "Shutdown unwinds newest registration first"
    );
}

#[test]
fn test_type_stage_runs_bound_method() {
    let calls = calls();
    let stop = type_stager("stop");
    let mut module = LifecycleModule::new("workers");
    module
        .bind_stager(StageBinding {
            method: Some("stop".to_string()),
            matcher: TypeMatcher::exactly::<Worker>(),
            ..StageBinding::new(Arc::clone(&stop))
        })
        .unwrap();
    let provisioner = module.configure().unwrap();

    assert_eq!(provisioner.provision(worker("w1", &calls, false)).unwrap(), 1);
    assert_eq!(provisioner.provision(worker("w2", &calls, false)).unwrap(), 1);
    assert_eq!(provisioner.provision(database("db", &calls)).unwrap(), 0, "Matcher excludes Database");

    let summary = stop.stage();

    assert!(summary.is_clean());
    assert_eq!(*calls.lock(), vec!["w2.stop", "w1.stop"]);
}

#[test]
fn test_type_stage_fails_when_method_is_missing() {
    let calls = calls();
    let stop = type_stager("stop");
    let mut module = LifecycleModule::new("workers");
    module
        .bind_stager(StageBinding {
            method: Some("stop".to_string()),
            ..StageBinding::new(Arc::clone(&stop))
        })
        .unwrap();
    let provisioner = module.configure().unwrap();

    let err = provisioner.provision(database("db", &calls)).unwrap_err();

    match err {
        BindingError::MethodNotFound { stage, type_name, method } => {
            assert_eq!(stage, "stop");
            assert!(type_name.ends_with("Database"));
            assert_eq!(method, "stop");
        }
        other => panic!("Expected MethodNotFound, got {:?}", other),
    }
    assert!(stop.is_empty());
}

#[test]
fn test_configure_twice_fails() {
    let mut module = LifecycleModule::new("storage");
    module.bind_stager(StageBinding::new(marker_stager("shutdown", Order::FirstInLastOut))).unwrap();

    assert!(module.configure().is_ok());
    assert!(matches!(module.configure(), Err(BindingError::AlreadyConfigured { module: ref name }) if name == "storage"));
    assert!(matches!(
        module.bind_stager(StageBinding::new(marker_stager("late", Order::FirstInFirstOut))),
        Err(BindingError::AlreadyConfigured { .. })
    ));
}

#[test]
fn test_type_mapper_records_declaring_types() {
    let calls = calls();
    let mapper = Arc::new(DefaultStageableTypeMapper::new());
    let shutdown = marker_stager("shutdown", Order::FirstInLastOut);
    let stop = type_stager("stop");
    let mut module = LifecycleModule::new("mixed");
    module
        .bind_stager(StageBinding {
            type_mapper: mapper.clone(),
            ..StageBinding::new(Arc::clone(&shutdown))
        })
        .unwrap()
        .bind_stager(StageBinding {
            method: Some("stop".to_string()),
            matcher: TypeMatcher::exactly::<Worker>(),
            type_mapper: mapper.clone(),
            ..StageBinding::new(Arc::clone(&stop))
        })
        .unwrap();
    let provisioner = module.configure().unwrap();

    provisioner.provision(database("db", &calls)).unwrap();
    provisioner.provision(worker("w", &calls, false)).unwrap();

    assert_eq!(mapper.declaring_types("shutdown"), vec![TypeDescriptor::of::<Database>()]);
    assert_eq!(mapper.declaring_types("stop"), vec![TypeDescriptor::of::<Worker>()]);
    assert_eq!(mapper.len(), 3);
}

#[test]
fn test_hook_failure_reaches_handler_with_root_cause() {
    let calls = calls();
    let stop = type_stager("stop");
    let mut module = LifecycleModule::new("workers");
    module
        .bind_stager(StageBinding {
            method: Some("stop".to_string()),
            ..StageBinding::new(Arc::clone(&stop))
        })
        .unwrap();
    let provisioner = module.configure().unwrap();
    provisioner.provision(worker("ok", &calls, false)).unwrap();
    provisioner.provision(worker("stuck", &calls, true)).unwrap();

    let handler = CollectingStageHandler::new();
    let summary = stop.stage_with(&handler);

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.failed, 1);
    let failure = handler.outcomes().into_iter().find(|o| !o.is_success()).unwrap();
    assert!(failure.target().contains("stuck"), "Unexpected target {}", failure.target());
    match failure {
        StageOutcome::Failure { cause, .. } => assert_eq!(cause, "worker stuck is wedged"),
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[test]
fn test_not_invocable_hook_is_reported_not_raised() {
    let shutdown = marker_stager("shutdown", Order::FirstInLastOut);
    let mut module = LifecycleModule::new("broken");
    module.bind_stager(StageBinding::new(Arc::clone(&shutdown))).unwrap();
    let provisioner = module.configure().unwrap();

    assert_eq!(provisioner.provision(Arc::new(Broken)).unwrap(), 1);

    let handler = CollectingStageHandler::new();
    let summary = shutdown.stage_with(&handler);

    assert_eq!(summary.failed, 1);
    assert_eq!(
        handler.outcomes(),
        vec![StageOutcome::Failure {
            target: "Broken".to_string(),
            cause: "Hook 'close' on 'Broken' is not invocable: takes arguments".to_string(),
        }]
    );
}

#[test]
fn test_handler_can_downcast_hook_target() {
    use std::error::Error as StdError;

    use parking_lot::Mutex;

    use crate::stager::StageHandler;

    #[derive(Default)]
    struct Stopped(Mutex<Vec<&'static str>>);

    impl StageHandler for Stopped {
        fn on_success(&self, target: StageTarget<'_>) {
            let worker = target.downcast_ref::<Worker>().expect("target should be a Worker");
            self.0.lock().push(worker.name);
        }

        fn on_error(&self, _target: StageTarget<'_>, cause: &(dyn StdError + 'static)) {
            assert!(cause.is::<Wedged>(), "Hook failures unwrap to the body's error");
        }
    }

    let calls = calls();
    let stop = type_stager("stop");
    let mut module = LifecycleModule::new("workers");
    module
        .bind_stager(StageBinding {
            method: Some("stop".to_string()),
            ..StageBinding::new(Arc::clone(&stop))
        })
        .unwrap();
    let provisioner = module.configure().unwrap();
    provisioner.provision(worker("a", &calls, false)).unwrap();
    provisioner.provision(worker("b", &calls, true)).unwrap();

    let handler = Stopped::default();
    stop.stage_with(&handler);

    assert_eq!(*handler.0.lock(), vec!["a"]);
}

#[test]
fn test_bind_lifecycle_runs_at_provision_time() {
    let calls = calls();
    let mut module = LifecycleModule::new("workers");
    module.bind_lifecycle(TypeMatcher::exactly::<Worker>(), "warm_up").unwrap();
    let provisioner = module.configure().unwrap();

    provisioner.provision(worker("w", &calls, false)).unwrap();
    provisioner.provision(database("db", &calls)).unwrap();

    assert_eq!(*calls.lock(), vec!["w.warm_up"]);
}

#[test]
fn test_bind_lifecycle_failure_is_returned() {
    let mut module = LifecycleModule::new("broken");
    module.bind_lifecycle(TypeMatcher::Any, "stop").unwrap();
    let provisioner = module.configure().unwrap();

    let err = provisioner.provision(Arc::new(Broken)).unwrap_err();

    match err {
        BindingError::ProvisionFailed { method, source, .. } => {
            assert_eq!(method, "stop");
            assert!(matches!(source, HookError::NotInvocable { .. }));
        }
        other => panic!("Expected ProvisionFailed, got {:?}", other),
    }
}

#[test]
fn test_after_invocation_runs_after_the_hook() {
    let calls = calls();
    let seen = Arc::clone(&calls);
    let mut module = LifecycleModule::new("workers");
    module
        .bind_lifecycle_with(
            TypeMatcher::exactly::<Worker>(),
            "warm_up",
            Arc::new(move |target: &dyn HookTarget| -> Result<(), HookError> {
                let worker = target.as_any().downcast_ref::<Worker>().map_or("?", |w| w.name);
                seen.lock().push(format!("{}.after", worker));
                Ok(())
            }),
        )
        .unwrap();
    let provisioner = module.configure().unwrap();

    provisioner.provision(worker("w", &calls, false)).unwrap();
    provisioner.provision(database("db", &calls)).unwrap();

    assert_eq!(*calls.lock(), vec!["w.warm_up", "w.after"]);
}

#[test]
fn test_after_invocation_failure_fails_provisioning() {
    let calls = calls();
    let stop = type_stager("stop");
    let mut module = LifecycleModule::new("workers");
    module
        .bind_lifecycle_with(
            TypeMatcher::Any,
            "warm_up",
            Arc::new(|_: &dyn HookTarget| Err(HookError::failed("warm_up", Wedged("w")))),
        )
        .unwrap()
        .bind_stager(StageBinding {
            method: Some("stop".to_string()),
            ..StageBinding::new(Arc::clone(&stop))
        })
        .unwrap();
    let provisioner = module.configure().unwrap();

    let err = provisioner.provision(worker("w", &calls, false)).unwrap_err();

    match err {
        BindingError::AfterInvocationFailed { method, source, .. } => {
            assert_eq!(method, "warm_up");
            assert!(matches!(source, HookError::Failed { .. }));
        }
        other => panic!("Expected AfterInvocationFailed, got {:?}", other),
    }
    assert_eq!(*calls.lock(), vec!["w.warm_up"]);
    assert!(stop.is_empty(), "A failed provision must not reach the stage bindings");
}

#[test]
fn test_marker_lifecycle_runs_hooks_in_marker_order() {
    let calls = calls();
    let after_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&after_calls);
    let mut module = LifecycleModule::new("storage");
    module
        .bind_lifecycle_markers_with(
            &["shutdown", "startup"],
            TypeMatcher::exactly::<Database>(),
            Arc::new(move |_: &dyn HookTarget| -> Result<(), HookError> {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();
    let provisioner = module.configure().unwrap();

    provisioner.provision(database("db", &calls)).unwrap();
    provisioner.provision(worker("w", &calls, false)).unwrap();

    assert_eq!(*calls.lock(), vec!["db.flush", "db.close", "db.connect"]);
    assert_eq!(after_calls.load(std::sync::atomic::Ordering::SeqCst), 3, "Once per invoked hook");
}

#[test]
fn test_marker_lifecycle_failure_is_returned() {
    let mut module = LifecycleModule::new("broken");
    module.bind_lifecycle_markers(&["shutdown"], TypeMatcher::Any).unwrap();
    let provisioner = module.configure().unwrap();

    let err = provisioner.provision(Arc::new(Broken)).unwrap_err();

    assert!(matches!(err, BindingError::ProvisionFailed { ref method, .. } if method == "close"));
}

#[test]
fn test_marker_lifecycle_without_matching_hooks_is_a_noop() {
    let calls = calls();
    let mut module = LifecycleModule::new("workers");
    module.bind_lifecycle_markers(&["startup"], TypeMatcher::Any).unwrap();
    let provisioner = module.configure().unwrap();

    assert_eq!(provisioner.provision(worker("w", &calls, false)).unwrap(), 0);
    assert!(calls.lock().is_empty());
}

#[test]
fn test_provision_after_pass_surfaces_registration_error() {
    let calls = calls();
    let shutdown = marker_stager("shutdown", Order::FirstInLastOut);
    let mut module = LifecycleModule::new("storage");
    module.bind_stager(StageBinding::new(Arc::clone(&shutdown))).unwrap();
    let provisioner = module.configure().unwrap();
    shutdown.stage();

    let err = provisioner.provision(database("late", &calls)).unwrap_err();

    assert!(matches!(err, BindingError::Registration(_)));
}

#[test]
fn test_provisioner_is_shared_across_threads() {
    let calls = calls();
    let shutdown = marker_stager("shutdown", Order::FirstInLastOut);
    let mut module = LifecycleModule::new("storage");
    module.bind_stager(StageBinding::new(Arc::clone(&shutdown))).unwrap();
    let provisioner = module.configure().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let provisioner = provisioner.clone();
            let calls = Arc::clone(&calls);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    provisioner.provision(database("db", &calls)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(shutdown.len(), 200, "Two shutdown hooks per database");
    assert_eq!(shutdown.stage().attempted, 200);
}
