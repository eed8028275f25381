//! The built-in catalog against a conforming site

mod support;

use reelcheck_e2e::catalog;
use reelcheck_e2e::{Outcome, TestRunner};
use support::Fixture;

#[tokio::test]
async fn test_builtin_catalog_passes_against_conforming_site() {
    support::init_tracing();
    let fixture = Fixture::start().await;
    let mut config = fixture.config();
    config.runner.workers = 4;

    let runner = TestRunner::new(config).unwrap();
    let scenarios = catalog::builtin();
    let suite = runner.run_scenarios(&scenarios).await;

    for result in &suite.results {
        assert_eq!(result.outcome, Outcome::Passed, "{} did not pass: {:?}", result.name, result.outcome);
    }
    assert_eq!(suite.total, 20);
    assert_eq!(suite.passed, 20);
    assert!(suite.success());
}

#[tokio::test]
async fn test_results_keep_catalog_order() {
    let fixture = Fixture::start().await;
    let mut config = fixture.config();
    config.runner.workers = 3;

    let runner = TestRunner::new(config).unwrap();
    let scenarios = catalog::search_scenarios();
    let suite = runner.run_scenarios(&scenarios).await;

    let names: Vec<_> = suite.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["CE-01", "CE-02", "CE-03", "CE-04", "CE-05", "CE-06"]);
}

#[tokio::test]
async fn test_tagged_smoke_subset() {
    let fixture = Fixture::start().await;
    let runner = TestRunner::new(fixture.config()).unwrap();

    let smoke: Vec<_> = catalog::builtin().into_iter().filter(|s| s.has_tag("smoke")).collect();
    assert!(!smoke.is_empty());

    let suite = runner.run_scenarios(&smoke).await;
    assert_eq!(suite.passed, smoke.len());
}
