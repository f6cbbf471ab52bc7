//! Integration tests for refresh cancellation and the polling timer
//!
//! A newer refresh must cancel the cycle in flight, and only the newer
//! cycle's results may ever be published.

mod common;

use std::time::Duration;

use common::{connections, Harness};

fn system_status_calls(h: &Harness) -> usize {
    h.gateway
        .calls()
        .iter()
        .filter(|c| *c == "system_status")
        .count()
}

/// Test: cycle B started while A is in flight publishes B only
#[tokio::test]
async fn test_newer_refresh_cancels_in_flight_cycle() {
    let h = Harness::new();
    h.gateway
        .with(|s| s.connections = Ok(connections(&[("AAA", true, 1_000, 100)])));
    let (entered, release) = h.gateway.hold_next_connections();

    let cycle_a = h.poller.refresh();
    entered.notified().await;

    h.gateway.with(|s| {
        s.connections = Ok(connections(&[("AAA", true, 9_000, 900)]));
        s.version = Ok("v2.0.0".to_string());
    });
    h.clock.advance_secs(5);
    let cycle_b = h.poller.refresh();
    cycle_b.await.expect("cycle B should finish");

    release.notify_one();
    let outcome = cycle_a.await;
    assert!(
        outcome.as_ref().is_err_and(|e| e.is_cancelled()),
        "cycle A should have been aborted"
    );

    let snapshot = h.poller.snapshot();
    assert_eq!(snapshot.observed.connections["AAA"].in_bytes_total, 9_000);
    assert_eq!(snapshot.version.as_deref(), Some("v2.0.0"));
    // A never committed, so B was the first rate observation
    assert_eq!(snapshot.observed.total_history.len(), 1);
    assert_eq!(snapshot.observed.total_rate.download, 0.0);
    assert!(snapshot.last_error.is_none(), "cancellation is not an error");
}

/// Test: a cancelled cycle leaves the previously published snapshot intact
#[tokio::test]
async fn test_cancelled_cycle_leaves_previous_snapshot() {
    let h = Harness::new();
    h.cycle().await;
    let before = h.poller.snapshot();

    h.gateway
        .with(|s| s.connections = Ok(connections(&[("AAA", false, 0, 0)])));
    let (entered, _release) = h.gateway.hold_next_connections();
    let cycle = h.poller.refresh();
    entered.notified().await;
    h.poller.stop();

    assert!(cycle.await.is_err_and(|e| e.is_cancelled()));
    let after = h.poller.snapshot();
    assert_eq!(after.last_refresh, before.last_refresh);
    assert!(after.observed.connections["AAA"].connected);
    assert!(after.connection_history["AAA"].is_currently_connected);
}

/// Test: consecutive cycles compute rates from the committed baseline
#[tokio::test]
async fn test_rates_follow_committed_cycles() {
    let h = Harness::new();
    h.cycle().await;

    h.gateway
        .with(|s| s.connections = Ok(connections(&[("AAA", true, 50_000, 5_000)])));
    h.cycle_after(10).await;

    let snapshot = h.poller.snapshot();
    assert_eq!(snapshot.observed.rates["AAA"].download, 5_000.0);
    assert_eq!(snapshot.observed.rates["AAA"].upload, 500.0);
    assert_eq!(snapshot.observed.total_history.len(), 2);
    assert_eq!(snapshot.observed.device_history["AAA"].max_download(), 5_000.0);
}

/// Test: the timer refreshes immediately and then on every interval
#[tokio::test(start_paused = true)]
async fn test_timer_drives_cycles_and_restarts_on_interval_change() {
    let h = Harness::new();
    h.poller.start(Duration::from_secs(5));
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(system_status_calls(&h), 3);

    h.poller.set_interval(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(system_status_calls(&h), 6);

    h.poller.stop();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(system_status_calls(&h), 6, "stopped timer must not fire");
}

/// Test: subscribers see the committed snapshot
#[tokio::test]
async fn test_subscriber_is_notified_of_commit() {
    let h = Harness::new();
    let mut updates = h.poller.subscribe();
    assert!(updates.borrow().last_refresh.is_none());

    h.cycle().await;
    assert!(updates.has_changed().unwrap());
    let snapshot = updates.borrow_and_update().clone();
    assert!(snapshot.is_connected());
    assert_eq!(snapshot.observed.folders.len(), 1);
}
