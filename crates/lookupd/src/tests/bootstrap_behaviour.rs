//! Behavioural tests for the daemon bootstrap sequence.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{self, DaemonWorld, FailingConfigLoader, HealthEvent};

#[fixture]
fn world() -> RefCell<DaemonWorld> {
    support::world()
}

fn event_name(event: &HealthEvent) -> &'static str {
    match event {
        HealthEvent::BootstrapStarting => "bootstrap_starting",
        HealthEvent::BootstrapSucceeded => "bootstrap_succeeded",
        HealthEvent::BootstrapFailed(_) => "bootstrap_failed",
        HealthEvent::ListenerReady(_) => "listener_ready",
        HealthEvent::ShutdownRequested => "shutdown_requested",
        HealthEvent::ShutdownCompleted(_) => "shutdown_completed",
    }
}

#[given("a configuration loader without a pointer file")]
fn given_failing_loader(world: &RefCell<DaemonWorld>) {
    world
        .borrow_mut()
        .use_loader(Box::new(FailingConfigLoader::new()));
}

#[given("test mode is enabled")]
fn given_test_mode(world: &RefCell<DaemonWorld>) {
    world.borrow_mut().config.test_mode = true;
}

#[given("TLS is enabled without certificate material")]
fn given_tls_without_material(world: &RefCell<DaemonWorld>) {
    world.borrow_mut().enable_tls_without_material();
}

#[when("the daemon starts")]
fn when_daemon_starts(world: &RefCell<DaemonWorld>) {
    world.borrow_mut().start();
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<DaemonWorld>) {
    let state = world.borrow();
    assert!(
        state.bootstrap_error.is_none(),
        "bootstrap error: {:?}",
        state.bootstrap_error
    );
    assert!(state.telemetry.is_some(), "telemetry was not initialised");
}

#[then(r#"bootstrap fails mentioning "{text}""#)]
fn then_bootstrap_fails(world: &RefCell<DaemonWorld>, text: String) {
    let state = world.borrow();
    let Some(error) = state.bootstrap_error.as_ref() else {
        panic!("bootstrap succeeded unexpectedly");
    };
    let message = error.to_string();
    assert!(message.contains(&text), "unexpected error: {message}");
}

#[then(r#"the health events are "{events}""#)]
fn then_health_events(world: &RefCell<DaemonWorld>, events: String) {
    let recorded = world.borrow().reporter.events();
    let names: Vec<&str> = recorded.iter().map(event_name).collect();
    let expected: Vec<&str> = events.split(", ").collect();
    assert_eq!(names, expected);
}

#[scenario(path = "tests/features/daemon_bootstrap.feature")]
fn daemon_bootstrap(#[from(world)] world: RefCell<DaemonWorld>) {
    drop(world);
}
