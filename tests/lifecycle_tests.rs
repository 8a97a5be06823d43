//! Container lifecycle tests
//!
//! Phase ordering, idempotence, failure policy, bucket partitioning, and
//! registration edge cases.

mod support;

use std::sync::Arc;

use lattice::{
    BucketSpec, Container, DeclaredDependency, LatticeError, LifecycleState, Phase, Registration,
};
use support::{component_with_deps, FailingCallback, Recorder, RecordingCallback};

fn recording_container(recorder: &Recorder) -> Container {
    Container::builder("test")
        .with_fallback_callback(Arc::new(RecordingCallback::new(recorder.clone())))
        .build()
}

#[test]
fn test_initialize_order_is_dependencies_first() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    // a depends on b, b depends on c
    container.register("a", component_with_deps(&["b"])).unwrap();
    container.register("b", component_with_deps(&["c"])).unwrap();
    container.register("c", component_with_deps(&[])).unwrap();

    container.initialize().unwrap();
    assert_eq!(recorder.names_for(Phase::Initialize), vec!["c", "b", "a"]);
}

#[test]
fn test_dispose_order_is_dependents_first() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container.register("a", component_with_deps(&["b"])).unwrap();
    container.register("b", component_with_deps(&["c"])).unwrap();
    container.register("c", component_with_deps(&[])).unwrap();

    container.initialize().unwrap();
    container.dispose().unwrap();
    assert_eq!(recorder.names_for(Phase::Dispose), vec!["a", "b", "c"]);
}

#[test]
fn test_phase_application_is_idempotent() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container.register("a", component_with_deps(&[])).unwrap();
    container.initialize().unwrap();
    container.initialize().unwrap();

    assert_eq!(recorder.count_for("a", Phase::Initialize), 1);
    assert_eq!(container.state("a"), Some(LifecycleState::Initialized));
}

#[test]
fn test_direct_cycle_drops_one_edge_and_still_orders() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container.register("a", component_with_deps(&["b"])).unwrap();
    container.register("b", component_with_deps(&["a"])).unwrap();

    // The cycle-closing edge is dropped, not fatal
    container.initialize().unwrap();
    let initialized = recorder.names_for(Phase::Initialize);
    assert_eq!(initialized.len(), 2);
    // The surviving edge a -> b still forces b first
    assert_eq!(initialized, vec!["b", "a"]);
}

#[test]
fn test_build_phase_failure_aborts_without_rollback() {
    let recorder = Recorder::new();
    let container = Container::builder("test")
        .with_fallback_callback(Arc::new(FailingCallback::new(
            recorder.clone(),
            "x",
            Phase::Start,
        )))
        .build();

    container.register("y", component_with_deps(&[])).unwrap();
    container.register("x", component_with_deps(&["y"])).unwrap();
    container.register("z", component_with_deps(&[])).unwrap();

    container.initialize().unwrap();
    let err = container.start().unwrap_err();
    match err {
        LatticeError::PhaseApplication {
            component, phase, ..
        } => {
            assert_eq!(component, "x");
            assert_eq!(phase, Phase::Start);
        }
        other => panic!("unexpected error: {other}"),
    }

    // y started before the failure and is not rolled back
    assert_eq!(container.state("y"), Some(LifecycleState::Started));
    // the remaining sequence was aborted
    assert_eq!(container.state("z"), Some(LifecycleState::Initialized));
    assert_eq!(recorder.count_for("z", Phase::Start), 0);
}

#[test]
fn test_teardown_failure_is_contained() {
    let recorder = Recorder::new();
    let container = Container::builder("test")
        .with_fallback_callback(Arc::new(FailingCallback::new(
            recorder.clone(),
            "x",
            Phase::Stop,
        )))
        .build();

    container.register("y", component_with_deps(&[])).unwrap();
    container.register("x", component_with_deps(&["y"])).unwrap();
    container.register("z", component_with_deps(&[])).unwrap();

    container.initialize().unwrap();
    container.start().unwrap();
    // One failing stop callback must not block the rest
    container.stop().unwrap();

    assert_eq!(recorder.count_for("y", Phase::Stop), 1);
    assert_eq!(recorder.count_for("z", Phase::Stop), 1);
    assert_eq!(container.state("x"), Some(LifecycleState::Stopped));
    assert_eq!(container.state("y"), Some(LifecycleState::Stopped));
}

#[test]
fn test_dispose_reachable_from_started() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container.register("a", component_with_deps(&[])).unwrap();
    container.initialize().unwrap();
    container.start().unwrap();
    // Emergency teardown skips the stop phase entirely
    container.dispose().unwrap();

    assert_eq!(recorder.count_for("a", Phase::Stop), 0);
    assert_eq!(container.state("a"), Some(LifecycleState::Disposed));
}

#[test]
fn test_ambiguous_type_declaration_fails_resolution() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container
        .register(
            "b1",
            Registration::new(Arc::new(())).with_kind("store"),
        )
        .unwrap();
    container
        .register(
            "b2",
            Registration::new(Arc::new(())).with_kind("store"),
        )
        .unwrap();
    container
        .register(
            "a",
            Registration::new(Arc::new(())).with_declared(DeclaredDependency::one_of_type("store")),
        )
        .unwrap();

    let err = container.initialize().unwrap_err();
    match err {
        LatticeError::AmbiguousDependency {
            component,
            tag,
            count,
        } => {
            assert_eq!(component, "a");
            assert_eq!(tag, "store");
            assert_eq!(count, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_mandatory_declaration_fails_resolution() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container
        .register(
            "a",
            Registration::new(Arc::new(()))
                .with_declared(DeclaredDependency::named("not-registered")),
        )
        .unwrap();

    assert!(matches!(
        container.initialize(),
        Err(LatticeError::MissingDependency { .. })
    ));
}

#[test]
fn test_collection_declaration_orders_all_candidates_first() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container
        .register("s1", Registration::new(Arc::new(())).with_kind("store"))
        .unwrap();
    container
        .register("s2", Registration::new(Arc::new(())).with_kind("store"))
        .unwrap();
    container
        .register(
            "consumer",
            Registration::new(Arc::new(()))
                .with_declared(DeclaredDependency::all_of_type("store")),
        )
        .unwrap();

    container.initialize().unwrap();
    let initialized = recorder.names_for(Phase::Initialize);
    let consumer_pos = initialized.iter().position(|n| n == "consumer").unwrap();
    for store in ["s1", "s2"] {
        let store_pos = initialized.iter().position(|n| n == store).unwrap();
        assert!(store_pos < consumer_pos, "{store} must initialize before consumer");
    }
}

#[test]
fn test_buckets_partition_phase_application() {
    let recorder = Recorder::new();
    let container = Container::builder("test")
        .with_fallback_callback(Arc::new(RecordingCallback::new(recorder.clone())))
        .with_bucket_spec(BucketSpec::new([vec!["store"], vec!["connector"]]))
        .build();

    // Registered connector-first; bucket priority still puts stores first
    container
        .register("conn", Registration::new(Arc::new(())).with_kind("connector"))
        .unwrap();
    container
        .register("store", Registration::new(Arc::new(())).with_kind("store"))
        .unwrap();

    container.initialize().unwrap();
    assert_eq!(recorder.names_for(Phase::Initialize), vec!["store", "conn"]);

    container.dispose().unwrap();
    assert_eq!(recorder.names_for(Phase::Dispose), vec!["conn", "store"]);
}

#[test]
fn test_lookup_order_breaks_independent_ties() {
    let recorder = Recorder::new();
    let container = Container::builder("test")
        .with_fallback_callback(Arc::new(RecordingCallback::new(recorder.clone())))
        .with_lookup_order(["gamma", "alpha"])
        .build();

    container.register("alpha", component_with_deps(&[])).unwrap();
    container.register("beta", component_with_deps(&[])).unwrap();
    container.register("gamma", component_with_deps(&[])).unwrap();

    container.initialize().unwrap();
    assert_eq!(
        recorder.names_for(Phase::Initialize),
        vec!["gamma", "alpha", "beta"]
    );
}

#[test]
fn test_late_registration_catches_up_completed_phases() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container.register("early", component_with_deps(&[])).unwrap();
    container.initialize().unwrap();
    container.start().unwrap();

    container.register("late", component_with_deps(&[])).unwrap();
    assert_eq!(recorder.count_for("late", Phase::Initialize), 1);
    assert_eq!(recorder.count_for("late", Phase::Start), 1);
    assert_eq!(container.state("late"), Some(LifecycleState::Started));

    // Explicit catch-up is an idempotent no-op once the component is current
    container.apply_completed_phases("late").unwrap();
    assert_eq!(recorder.count_for("late", Phase::Start), 1);
    assert!(matches!(
        container.apply_completed_phases("ghost"),
        Err(LatticeError::ComponentNotFound(_))
    ));
}

#[test]
fn test_registration_rejected_after_stop() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container.register("a", component_with_deps(&[])).unwrap();
    container.initialize().unwrap();
    container.start().unwrap();
    container.stop().unwrap();

    assert!(matches!(
        container.register("too-late", component_with_deps(&[])),
        Err(LatticeError::ContainerStopped(_))
    ));
}

#[test]
fn test_unregister_tears_down_and_removes() {
    let recorder = Recorder::new();
    let container = recording_container(&recorder);

    container.register("a", component_with_deps(&[])).unwrap();
    container.initialize().unwrap();
    container.start().unwrap();

    container.unregister("a").unwrap();
    assert_eq!(recorder.count_for("a", Phase::Stop), 1);
    assert_eq!(recorder.count_for("a", Phase::Dispose), 1);
    assert!(!container.contains("a"));

    // A fresh registration under the same name is a new existence
    container.register("a", component_with_deps(&[])).unwrap();
    assert_eq!(container.state("a"), Some(LifecycleState::Started));
    assert_eq!(recorder.count_for("a", Phase::Initialize), 2);
}
