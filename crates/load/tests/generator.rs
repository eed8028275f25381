//! Load runs against a local site

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use reelcheck_common::{LoadConfig, StageConfig, Target};
use reelcheck_load::LoadGenerator;

struct Site {
    target: Target,
    handle: JoinHandle<()>,
}

impl Drop for Site {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve() -> Site {
    let app = Router::new()
        .route("/", get(|| async { "<html><body><h1>Popular movies</h1></body></html>" }))
        .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                "late"
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Site {
        target: Target::parse(&format!("http://{}", addr)).unwrap(),
        handle,
    }
}

fn config(endpoint: &str, stages: &[&str]) -> LoadConfig {
    LoadConfig {
        endpoint: endpoint.to_string(),
        stages: stages.iter().map(|s| s.parse::<StageConfig>().unwrap()).collect(),
        think_time: Duration::from_millis(50),
        request_timeout: Duration::from_secs(2),
        graceful_stop: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn test_ramp_against_healthy_endpoint() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let site = serve().await;
    let generator = LoadGenerator::new(&config("/", &["1s:2"]), &site.target).unwrap();

    let summary = generator.run().await;
    assert!(summary.requests > 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.failure_rate, 0.0);
    assert_eq!(summary.max_vus, 2);
    assert_eq!(summary.iterations, summary.requests);
    assert!(summary.latency.min <= summary.latency.median);
    assert!(summary.latency.p95 <= summary.latency.max);
    assert!(summary.duration_ms >= 1000);
}

#[tokio::test]
async fn test_server_errors_count_as_failures() {
    let site = serve().await;
    let generator = LoadGenerator::new(&config("/broken", &["500ms:1"]), &site.target).unwrap();

    let summary = generator.run().await;
    assert!(summary.requests > 0);
    assert_eq!(summary.failed, summary.requests);
    assert_eq!(summary.failure_rate, 1.0);
}

#[tokio::test]
async fn test_transport_errors_count_as_failures() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let target = Target::parse(&format!("http://127.0.0.1:{}", port)).unwrap();
    let generator = LoadGenerator::new(&config("/", &["500ms:1"]), &target).unwrap();

    let summary = generator.run().await;
    assert!(summary.requests > 0);
    assert_eq!(summary.failure_rate, 1.0);
}

#[tokio::test]
async fn test_stuck_vus_are_aborted_after_grace_period() {
    let site = serve().await;
    let mut load = config("/slow", &["300ms:1"]);
    load.request_timeout = Duration::from_secs(30);
    load.graceful_stop = Duration::from_millis(200);
    let generator = LoadGenerator::new(&load, &site.target).unwrap();

    let start = Instant::now();
    let summary = generator.run().await;
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(summary.requests, 0);
    assert_eq!(summary.max_vus, 1);
}

#[test]
fn test_empty_profile_is_rejected() {
    let target = Target::parse("http://localhost:3000").unwrap();
    assert!(LoadGenerator::new(&config("/", &[]), &target).is_err());
}
