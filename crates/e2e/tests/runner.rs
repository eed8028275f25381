//! Runner behaviour: skipping, exit semantics, scenario files and results

mod support;

use std::fs;

use reelcheck_e2e::{catalog, Outcome, Scenario, TestRunner, TestSuiteResult};
use support::{closed_base_url, config_for, Fixture};

#[tokio::test]
async fn test_unavailable_target_skips_every_scenario() {
    support::init_tracing();
    let runner = TestRunner::new(config_for(&closed_base_url())).unwrap();
    let scenarios = catalog::round_trip_scenarios();

    let suite = runner.run_scenarios(&scenarios).await;
    assert_eq!(suite.skipped, scenarios.len());
    assert!(suite.results.iter().all(|r| r.steps.is_empty()));
    match &suite.results[0].outcome {
        Outcome::Skipped { reason } => assert!(reason.contains("not responding")),
        other => panic!("expected skip, got {:?}", other),
    }
    // Skipped scenarios do not fail the run.
    assert!(suite.success());
}

#[tokio::test]
async fn test_results_file_is_written() {
    let fixture = Fixture::start().await;
    let out = tempfile::tempdir().unwrap();
    let mut config = fixture.config();
    config.runner.output_dir = out.path().join("results");

    let runner = TestRunner::new(config).unwrap();
    let suite = runner.run_scenarios(&[catalog::find("LP-01").unwrap()]).await;
    let path = runner.write_results(&suite).unwrap();

    assert_eq!(path, out.path().join("results").join("test-results.json"));
    let written: TestSuiteResult = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.run_id, suite.run_id);
    assert_eq!(written.passed, 1);
    assert_eq!(written.results[0].name, "LP-01");
    assert!(!written.results[0].steps.is_empty());
}

#[tokio::test]
async fn test_yaml_scenarios_from_directory() {
    let fixture = Fixture::start().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("01-tv.yaml"),
        r#"
name: tv-detail
tags: [navigation]
steps:
  - action: search
    term: thrones
  - action: click
    locator: { css: 'a[href^="/tv/"]', nth: 0 }
  - action: wait_for_url
    pattern: '/tv/\d+'
  - action: expect
    that: { check: on_route, kinds: [tv_detail] }
  - action: expect
    that: { check: trailer_contract }
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("02-broken.yaml"),
        r#"
name: expects-a-missing-page
steps:
  - action: navigate
    path: /movie/1
  - action: expect
    that: { check: no_not_found_responses }
"#,
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "not a scenario").unwrap();

    let scenarios = Scenario::load_all(dir.path()).unwrap();
    assert_eq!(scenarios.len(), 2);

    let runner = TestRunner::new(fixture.config()).unwrap();
    let suite = runner.run_scenarios(&scenarios).await;

    assert_eq!(suite.results[0].outcome, Outcome::Passed, "{:?}", suite.results[0]);
    assert!(matches!(suite.results[1].outcome, Outcome::Failed { step: 1, .. }));
    assert!(!suite.success());
}

#[tokio::test]
async fn test_single_scenario_records_each_step() {
    let fixture = Fixture::start().await;
    let runner = TestRunner::new(fixture.config()).unwrap();
    let scenario = catalog::find("NAV-P02").unwrap();

    let result = runner.run_scenario(&scenario).await;
    assert_eq!(result.outcome, Outcome::Passed);
    assert_eq!(result.steps.len(), scenario.steps.len());
    assert!(result.steps.iter().all(|s| s.success));
}
