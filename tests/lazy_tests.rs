//! Lazy materialization tests
//!
//! Minimal set computation, stale teardown ordering, session baselines,
//! orphan registration, and request short-circuiting.

mod support;

use std::sync::Arc;

use lattice::{
    ComponentDescriptor, Container, DependencyManifest, LatticeError, LifecycleState,
    MaterializeOptions, Phase, Selector,
};
use support::{DescriptorFactory, FailingFactory, Recorder, RecordingCallback};

fn descriptors() -> Vec<ComponentDescriptor> {
    vec![
        ComponentDescriptor::new("app/store")
            .named("store")
            .always_enabled(0),
        ComponentDescriptor::new("app/flow-x")
            .named("x")
            .with_manifest(DependencyManifest::of(["y"])),
        ComponentDescriptor::new("app/flow-y").named("y"),
        ComponentDescriptor::new("app/flow-z").named("z"),
    ]
}

fn lazy_container(recorder: &Recorder) -> Container {
    let container = Container::builder("lazy")
        .with_descriptors(descriptors())
        .with_factory(Arc::new(DescriptorFactory))
        .with_fallback_callback(Arc::new(RecordingCallback::new(recorder.clone())))
        .build();
    container.initialize().unwrap();
    container.start().unwrap();
    container
}

#[test]
fn test_materialize_builds_minimal_set_in_dependency_order() {
    let recorder = Recorder::new();
    let container = lazy_container(&recorder);

    let components = container
        .materialize(&Selector::target("app/flow-x"))
        .unwrap();
    let names: Vec<&str> = components.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["store", "y", "x"]);

    // z was not pulled in
    assert!(!container.contains("z"));
    assert_eq!(recorder.names_for(Phase::Initialize), vec!["store", "y", "x"]);
    assert_eq!(recorder.names_for(Phase::Start), vec!["store", "y", "x"]);
    assert_eq!(container.materialized_names(), vec!["store", "x", "y"]);
}

#[test]
fn test_rematerialize_tears_down_stale_in_reverse_creation_order() {
    let recorder = Recorder::new();
    let container = lazy_container(&recorder);

    container
        .materialize(&Selector::target("app/flow-x"))
        .unwrap();
    recorder.clear();

    container
        .materialize(&Selector::target("app/flow-z"))
        .unwrap();

    // x and y are unique to the first set; torn down newest-first
    assert_eq!(recorder.names_for(Phase::Stop), vec!["y", "x"]);
    assert_eq!(recorder.names_for(Phase::Dispose), vec!["y", "x"]);
    assert!(!container.contains("x"));
    assert!(!container.contains("y"));

    // The always-enabled store survives both sets untouched
    assert!(container.contains("store"));
    assert_eq!(recorder.count_for("store", Phase::Dispose), 0);
    assert_eq!(container.state("z"), Some(LifecycleState::Started));
    assert_eq!(container.materialized_names(), vec!["store", "z"]);
}

#[test]
fn test_single_target_miss_fails() {
    let recorder = Recorder::new();
    let container = lazy_container(&recorder);

    let err = container
        .materialize(&Selector::target("app/flow-missing"))
        .unwrap_err();
    assert!(matches!(err, LatticeError::TargetNotFound(_)));
}

#[test]
fn test_predicate_selector_materializes_every_match() {
    let recorder = Recorder::new();
    let container = lazy_container(&recorder);

    container
        .materialize(&Selector::matching(|descriptor| {
            descriptor.location.starts_with("app/flow-")
        }))
        .unwrap();

    for name in ["x", "y", "z", "store"] {
        assert!(container.contains(name), "{name} should be materialized");
    }
}

#[test]
fn test_compatible_request_short_circuits() {
    let recorder = Recorder::new();
    let container = lazy_container(&recorder);

    container
        .materialize(&Selector::target("app/flow-x"))
        .unwrap();
    recorder.clear();

    // Same target again: no teardown, no rebuild, no callbacks
    let components = container
        .materialize(&Selector::target("app/flow-x"))
        .unwrap();
    assert_eq!(components.len(), 3);
    assert!(recorder.events().is_empty());

    // A strict subset of the covered set is also satisfied
    let components = container
        .materialize(&Selector::target("app/flow-y"))
        .unwrap();
    assert_eq!(components.len(), 3);
    assert!(recorder.events().is_empty());
}

#[test]
fn test_materialize_additional_keeps_previous_set() {
    let recorder = Recorder::new();
    let container = lazy_container(&recorder);

    container
        .materialize(&Selector::target("app/flow-x"))
        .unwrap();
    recorder.clear();

    container.materialize_additional("app/flow-z").unwrap();

    // Nothing was torn down; z joined the session baseline
    assert!(recorder.names_for(Phase::Dispose).is_empty());
    for name in ["store", "x", "y", "z"] {
        assert!(container.contains(name), "{name} should be registered");
    }
    assert_eq!(
        container.materialized_names(),
        vec!["store", "x", "y", "z"]
    );
    assert_eq!(container.state("z"), Some(LifecycleState::Started));
}

#[test]
fn test_materialize_additional_requires_a_session() {
    let recorder = Recorder::new();
    let container = lazy_container(&recorder);

    assert!(matches!(
        container.materialize_additional("app/flow-z"),
        Err(LatticeError::NoActiveSession)
    ));
}

#[test]
fn test_apply_start_false_only_initializes() {
    let recorder = Recorder::new();
    let container = lazy_container(&recorder);

    container
        .materialize_with(
            &Selector::target("app/flow-x"),
            MaterializeOptions { apply_start: false },
        )
        .unwrap();

    assert_eq!(recorder.names_for(Phase::Initialize), vec!["store", "y", "x"]);
    assert!(recorder.names_for(Phase::Start).is_empty());
    assert_eq!(container.state("x"), Some(LifecycleState::Initialized));
}

#[test]
fn test_materialize_before_container_phases_registers_only() {
    let recorder = Recorder::new();
    let container = Container::builder("cold")
        .with_descriptors(descriptors())
        .with_factory(Arc::new(DescriptorFactory))
        .with_fallback_callback(Arc::new(RecordingCallback::new(recorder.clone())))
        .build();

    container
        .materialize(&Selector::target("app/flow-x"))
        .unwrap();

    // The container has fired no phases yet, so neither do the components
    assert!(recorder.events().is_empty());
    assert_eq!(container.state("x"), Some(LifecycleState::NotStarted));
}

#[test]
fn test_orphans_are_registered_directly() {
    let recorder = Recorder::new();
    let container = Container::builder("orphans")
        .with_descriptors(vec![
            ComponentDescriptor::new("app/group"),
            ComponentDescriptor::new("app/group/worker").child_of("app/group"),
            ComponentDescriptor::new("app/owner").named("owner"),
        ])
        .with_factory(Arc::new(DescriptorFactory))
        .with_fallback_callback(Arc::new(RecordingCallback::new(recorder.clone())))
        .build();
    container.initialize().unwrap();

    container
        .materialize(&Selector::target("app/group/worker"))
        .unwrap();

    // Unowned descriptors register under their locations and get lifecycle
    assert!(container.contains("app/group"));
    assert!(container.contains("app/group/worker"));
    assert!(!container.contains("owner"));
    assert_eq!(
        recorder.count_for("app/group/worker", Phase::Initialize),
        1
    );
}

#[test]
fn test_factory_failure_rolls_back_the_pass() {
    let recorder = Recorder::new();
    let container = Container::builder("failing")
        .with_descriptors(descriptors())
        .with_factory(Arc::new(FailingFactory::new("app/flow-y")))
        .with_fallback_callback(Arc::new(RecordingCallback::new(recorder.clone())))
        .build();
    container.initialize().unwrap();

    let err = container
        .materialize(&Selector::target("app/flow-x"))
        .unwrap_err();
    assert!(matches!(err, LatticeError::Factory { .. }));

    // Components registered earlier in the failed pass were rolled back
    assert!(!container.contains("store"));
    assert!(!container.contains("x"));
    assert!(container.materialized_names().is_empty());
}

#[test]
fn test_materialize_without_factory_fails() {
    let container = Container::builder("no-factory")
        .with_descriptors(descriptors())
        .build();

    assert!(matches!(
        container.materialize(&Selector::target("app/flow-x")),
        Err(LatticeError::NoFactory)
    ));
}
