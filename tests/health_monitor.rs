// tests/health_monitor.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use proptest::prelude::*;
use taskwarden::clock::mock::ManualClock;
use taskwarden::health::{
    CheckResult, FailureCounter, HealthCheck, HealthMonitor, HealthMonitorSettings, HealthVerdict,
};
use taskwarden_test_utils::{init_tracing, with_timeout};

fn always_failing(calls: Arc<AtomicUsize>) -> Arc<dyn HealthCheck> {
    Arc::new(move || -> anyhow::Result<CheckResult> {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CheckResult::unhealthy(format!("attempt {n}")))
    })
}

/// Advance one interval and wait until the loop has run the check and gone
/// back to sleep.
async fn tick(clock: &ManualClock, calls: &AtomicUsize, by: Duration) {
    let before = calls.load(Ordering::SeqCst);
    clock.advance(by);
    while calls.load(Ordering::SeqCst) == before {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    clock.wait_for_sleepers(1).await;
}

#[tokio::test]
async fn verdict_flips_only_after_budget_is_exceeded() {
    init_tracing();
    let clock = ManualClock::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = HealthMonitorSettings {
        interval: Duration::from_secs(10),
        initial_interval: None,
        max_consecutive_failures: 2,
    };

    let mut monitor = HealthMonitor::new(
        always_failing(calls.clone()),
        settings,
        Arc::new(clock.clone()),
    );
    monitor.start();
    with_timeout(clock.wait_for_sleepers(1)).await;

    // Initial interval defaults to twice the interval.
    clock.advance(Duration::from_secs(10));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    with_timeout(tick(&clock, &calls, Duration::from_secs(10))).await;
    assert!(monitor.healthy());
    with_timeout(tick(&clock, &calls, Duration::from_secs(10))).await;
    assert!(monitor.healthy());
    with_timeout(tick(&clock, &calls, Duration::from_secs(10))).await;

    assert!(!monitor.healthy());
    assert_eq!(
        monitor.failure_reason().as_deref(),
        Some("Failed health check! attempt 3")
    );

    with_timeout(monitor.join()).await;
}

#[tokio::test]
async fn zero_initial_interval_checks_synchronously() {
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = HealthMonitorSettings {
        interval: Duration::from_secs(10),
        initial_interval: Some(Duration::ZERO),
        max_consecutive_failures: 5,
    };

    // The first result is adopted as-is, regardless of the failure budget.
    let monitor = HealthMonitor::new(
        always_failing(calls.clone()),
        settings,
        Arc::new(ManualClock::new()),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!monitor.healthy());
    assert_eq!(
        monitor.failure_reason().as_deref(),
        Some("Failed health check! attempt 1")
    );
}

#[tokio::test]
async fn subscribers_see_the_latched_verdict() {
    let clock = ManualClock::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = HealthMonitorSettings {
        interval: Duration::from_secs(1),
        initial_interval: Some(Duration::from_secs(1)),
        max_consecutive_failures: 0,
    };

    let mut monitor = HealthMonitor::new(
        always_failing(calls.clone()),
        settings,
        Arc::new(clock.clone()),
    );
    let mut verdicts = monitor.subscribe();
    monitor.start();

    with_timeout(clock.wait_for_sleepers(1)).await;
    clock.advance(Duration::from_secs(1));

    let verdict = with_timeout(verdicts.wait_for(|v| !v.healthy))
        .await
        .unwrap()
        .clone();
    assert_eq!(verdict.reason.as_deref(), Some("attempt 1"));
    monitor.stop();
}

fn result() -> impl Strategy<Value = bool> {
    any::<bool>()
}

proptest! {
    /// The verdict is unhealthy exactly when some run of consecutive
    /// failures exceeded the budget, and it never recovers.
    #[test]
    fn failure_counter_latches_on_long_failure_runs(
        max in 0u32..4,
        results in proptest::collection::vec(result(), 0..40),
    ) {
        let mut counter = FailureCounter::new(max, HealthVerdict::healthy());
        let mut run = 0u32;
        let mut exceeded = false;

        for healthy in results {
            let outcome = if healthy {
                run = 0;
                CheckResult::healthy()
            } else {
                run += 1;
                CheckResult::unhealthy("down")
            };
            if run > max {
                exceeded = true;
            }
            let verdict = counter.record(outcome);
            prop_assert_eq!(verdict.healthy, !exceeded);
        }
    }
}
