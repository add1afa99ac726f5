//! Config- and license-driven capability lifecycle.

mod common;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use capability_lifecycle::capability::{Capability, CapabilityKind, CapabilityResult, CapabilitySlots};
use capability_lifecycle::config::AppConfig;
use capability_lifecycle::events::ListenerError;
use capability_lifecycle::lifecycle::LifecycleState;
use capability_lifecycle::App;
use common::{license, Event, RecordingCapability};

fn config(enabled: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.search.enable_indexing = enabled;
    config
}

fn app_with(cap: &Arc<RecordingCapability>, initial: AppConfig) -> Arc<App> {
    App::builder()
        .config(initial)
        .slots(CapabilitySlots::new().with(cap.clone()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_initial_start_is_dispatched_once() {
    let cap = RecordingCapability::new(CapabilityKind::Elasticsearch);
    let app = app_with(&cap, config(true));

    let controller = app.start_search_lifecycle().unwrap();
    app.start_search_lifecycle().unwrap();
    controller.flush().await;

    assert_eq!(cap.events(), vec![Event::StartBegin, Event::StartEnd]);
    assert_eq!(controller.state(), LifecycleState::Running);
    app.shutdown().await;
}

#[tokio::test]
async fn test_enabling_indexing_starts_capability() {
    let cap = RecordingCapability::new(CapabilityKind::Elasticsearch);
    let app = app_with(&cap, config(false));
    let controller = app.start_search_lifecycle().unwrap();
    controller.flush().await;
    let baseline = cap.count(Event::StartEnd);

    app.update_config(config(true)).unwrap();
    controller.flush().await;

    assert_eq!(cap.count(Event::StartEnd), baseline + 1);
    assert!(cap.is_running());
    app.shutdown().await;
}

#[tokio::test]
async fn test_disabling_indexing_stops_capability() {
    let cap = RecordingCapability::new(CapabilityKind::Elasticsearch);
    let app = app_with(&cap, config(true));
    let controller = app.start_search_lifecycle().unwrap();

    app.update_config(config(false)).unwrap();
    controller.flush().await;

    assert_eq!(
        cap.events(),
        vec![Event::StartBegin, Event::StartEnd, Event::StopBegin, Event::StopEnd]
    );
    assert_eq!(controller.state(), LifecycleState::Stopped);
    app.shutdown().await;
}

#[tokio::test]
async fn test_unrelated_change_does_nothing() {
    let cap = RecordingCapability::new(CapabilityKind::Elasticsearch);
    let app = app_with(&cap, config(true));
    let controller = app.start_search_lifecycle().unwrap();

    let mut next = config(true);
    next.jobs.run_jobs = false;
    next.search.request_timeout_secs = 5;
    app.update_config(next).unwrap();
    controller.flush().await;

    assert_eq!(cap.events(), vec![Event::StartBegin, Event::StartEnd]);
    app.shutdown().await;
}

#[tokio::test]
async fn test_password_change_restarts_without_blocking_caller() {
    let delay = Duration::from_millis(50);
    let cap = RecordingCapability::with_delay(CapabilityKind::Elasticsearch, delay);
    let app = app_with(&cap, config(true));
    let controller = app.start_search_lifecycle().unwrap();

    let mut next = config(true);
    next.search.password = "rotated".into();

    let begin = Instant::now();
    app.update_config(next).unwrap();
    assert!(begin.elapsed() < delay, "config apply waited on capability I/O");

    controller.flush().await;
    assert_eq!(
        cap.events(),
        vec![
            Event::StartBegin,
            Event::StartEnd,
            Event::StopBegin,
            Event::StopEnd,
            Event::StartBegin,
            Event::StartEnd,
        ]
    );
    assert!(cap.is_running());
    app.shutdown().await;
}

#[tokio::test]
async fn test_license_changes_start_and_stop() {
    let cap = RecordingCapability::new(CapabilityKind::Elasticsearch);
    let app = app_with(&cap, config(true));
    let controller = app.start_search_lifecycle().unwrap();
    controller.flush().await;

    app.set_license(None).unwrap();
    controller.flush().await;
    assert!(!cap.is_running());
    assert_eq!(controller.state(), LifecycleState::Stopped);

    app.set_license(Some(license(&["elasticsearch"]))).unwrap();
    controller.flush().await;
    assert!(cap.is_running());
    assert_eq!(controller.state(), LifecycleState::Running);

    app.shutdown().await;
}

#[tokio::test]
async fn test_config_and_license_actions_never_overlap() {
    let cap = RecordingCapability::with_delay(CapabilityKind::Elasticsearch, Duration::from_millis(10));
    let app = app_with(&cap, config(false));
    let controller = app.start_search_lifecycle().unwrap();

    app.update_config(config(true)).unwrap();
    app.set_license(None).unwrap();
    app.set_license(Some(license(&["elasticsearch"]))).unwrap();
    app.update_config(config(false)).unwrap();
    controller.flush().await;

    let events = cap.events();
    for pair in events.chunks(2) {
        match pair {
            [Event::StartBegin, Event::StartEnd] | [Event::StopBegin, Event::StopEnd] => {}
            other => panic!("interleaved lifecycle actions: {:?}", other),
        }
    }
    assert_eq!(events.last(), Some(&Event::StopEnd));
    assert!(!cap.is_running());
    app.shutdown().await;
}

#[tokio::test]
async fn test_listeners_fire_in_registration_order() {
    let app = App::builder().build().unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["A", "B", "C"] {
        let order = order.clone();
        app.add_config_listener(move |_, _| {
            order.lock().unwrap().push(name);
            Ok(())
        });
    }

    app.update_config(config(true)).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_failing_listener_stops_later_listeners() {
    let cap = RecordingCapability::new(CapabilityKind::Elasticsearch);
    let app = app_with(&cap, config(false));
    app.add_config_listener(|_, _| Err(ListenerError::new("gate", "not now")));
    let controller = app.start_search_lifecycle().unwrap();
    controller.flush().await;
    let baseline = cap.events().len();

    let err = app.update_config(config(true)).unwrap_err();
    assert_eq!(err.listener, "gate");
    controller.flush().await;

    assert_eq!(cap.events().len(), baseline);
    app.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_running_capability() {
    let cap = RecordingCapability::new(CapabilityKind::Elasticsearch);
    let app = app_with(&cap, config(true));
    app.start_search_lifecycle().unwrap();

    app.shutdown().await;

    assert!(!cap.is_running());
    assert_eq!(cap.events().last(), Some(&Event::StopEnd));
    assert!(app.tasks().is_empty());
}

struct StuckOnStop;

#[async_trait]
impl Capability for StuckOnStop {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Elasticsearch
    }

    async fn stop(&self) -> CapabilityResult<()> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_shutdown_is_bounded_when_stop_hangs() {
    let mut initial = config(true);
    initial.lifecycle.shutdown_timeout_secs = 1;
    let app = App::builder()
        .config(initial)
        .slots(CapabilitySlots::new().with(Arc::new(StuckOnStop)))
        .build()
        .unwrap();
    let controller = app.start_search_lifecycle().unwrap();
    controller.flush().await;

    let finished = tokio::time::timeout(Duration::from_secs(5), app.shutdown()).await;
    assert!(finished.is_ok(), "teardown outlived its grace period");
    assert!(app.tasks().is_empty());
}
