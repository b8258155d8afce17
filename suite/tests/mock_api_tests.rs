//! End-to-end runs of the suite against the in-process mock API.

use harness_common::{HttpConfig, RetryConfig};
use restaurant_api_suite::{run_resource, run_suite, scenarios};
use restaurant_contract::{SuiteReport, Verdict};
use restaurant_fixtures::{FixtureCatalog, FixtureContext, MockOptions, MockRestaurantApi, Resource};
use std::time::Duration;

fn describe_failures(report: &SuiteReport) -> String {
    report
        .failures()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn setup_detail(report: &SuiteReport, scope: &str, name: &str) -> String {
    match &report.get(scope, name).unwrap().verdict {
        Verdict::SetupFailed { detail } => detail.clone(),
        other => panic!("{scope}/{name} expected a setup failure, got {other:?}"),
    }
}

fn report_passed(report: &SuiteReport, scenario: &str) -> bool {
    report
        .get(scenarios::SCOPE, scenario)
        .is_some_and(|o| o.verdict == Verdict::Passed)
}

#[tokio::test]
async fn test_full_suite_passes_against_mock() {
    let api = MockRestaurantApi::start().await;
    let config = api.config().unwrap();

    let report = run_suite(&config).await.unwrap();

    assert!(report.ok(), "unexpected failures:\n{}", describe_failures(&report));
    assert_eq!(report.exit_code(), 0);
    assert!(report.passed > 50);
    assert!(report_passed(&report, "book_then_cancel_twice"));
    assert!(report_passed(&report, "waiter_booking_then_cancel"));
    assert_eq!(
        api.state().password_of(&config.credentials.email).as_deref(),
        Some(config.credentials.password())
    );
}

#[tokio::test]
async fn test_repeated_runs_leave_no_reservations_behind() {
    let api = MockRestaurantApi::start().await;
    let config = api.config().unwrap();
    let seeded = api.state().reservation_count();

    for run in 1..=2 {
        let report = run_suite(&config).await.unwrap();
        assert!(report.ok(), "run {run} failed:\n{}", describe_failures(&report));
        assert!(report_passed(&report, "book_then_cancel_twice"));
        assert!(report_passed(&report, "waiter_booking_then_cancel"));
        assert_eq!(api.state().reservation_count(), seeded, "run {run} left reservations");
    }
}

#[tokio::test]
async fn test_parallel_suite_passes_against_mock() {
    let api = MockRestaurantApi::start().await;
    let mut config = api.config().unwrap();
    config.parallel = true;

    let report = run_suite(&config).await.unwrap();

    assert!(report.ok(), "unexpected failures:\n{}", describe_failures(&report));
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_single_resource_scope() {
    let api = MockRestaurantApi::start().await;
    let config = api.config().unwrap();
    let context = FixtureContext::new(config.credentials.clone()).unwrap();
    let catalog = FixtureCatalog::standard(&context).unwrap();

    let outcomes = run_resource(&config, &catalog, Resource::Health).await.unwrap();

    assert_eq!(outcomes.len(), catalog.independent(Resource::Health).count());
    assert!(outcomes.iter().all(|o| o.scope == Resource::Health.as_str()));
    assert!(outcomes.iter().all(|o| o.verdict == Verdict::Passed));
}

#[tokio::test]
async fn test_unseeded_backend_is_a_setup_failure() {
    let api = MockRestaurantApi::start_with(MockOptions::default().unseeded()).await;
    let config = api.config().unwrap();

    let report = run_suite(&config).await.unwrap();

    let detail = setup_detail(&report, Resource::Dishes.as_str(), "dishes.detail.valid");
    assert!(detail.contains("no seed data"), "{detail}");
    assert!(
        report
            .get(Resource::Health.as_str(), "health.check.valid")
            .is_some_and(|o| o.verdict == Verdict::Passed)
    );
    assert_eq!(report.exit_code(), 2);
}

#[tokio::test]
async fn test_broken_signin_is_a_setup_failure() {
    let api = MockRestaurantApi::start_with(MockOptions::default().with_broken_signin()).await;
    let config = api.config().unwrap();

    let report = run_suite(&config).await.unwrap();

    assert!(report.setup_failures > 0);
    assert!(report.outcomes.iter().any(|o| matches!(
        &o.verdict,
        Verdict::SetupFailed { detail } if detail.contains("signin failed")
    )));
    assert!(
        report
            .get(Resource::Health.as_str(), "health.check.valid")
            .is_some_and(|o| o.verdict == Verdict::Passed)
    );
    assert_eq!(report.exit_code(), 2);
}

#[tokio::test]
async fn test_unreachable_server_aborts_each_scope() {
    let config = harness_common::HarnessConfig::for_base_url("http://127.0.0.1:1")
        .unwrap()
        .with_http(HttpConfig::default().with_connect_timeout(Duration::from_millis(500)))
        .with_retry(
            RetryConfig::default()
                .with_initial_delay(Duration::from_millis(10))
                .without_jitter(),
        );

    let report = run_suite(&config).await.unwrap();

    let health = Resource::Health.as_str();
    let detail = setup_detail(&report, health, "health.check.valid");
    assert!(detail.contains("unreachable"), "{detail}");
    assert!(matches!(
        report.get(health, "health.root.valid").unwrap().verdict,
        Verdict::Aborted { .. }
    ));
    assert_eq!(report.passed, 0);
    assert_eq!(report.exit_code(), 2);
}
