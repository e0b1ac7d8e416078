use std::collections::HashMap;
use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::routing::get;
use axum::{Json, Router};
use milestone_progress::test_support::{apply_progress_test_env, remove_dir_if_exists, temp_path};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::time::sleep;

struct RunningServer {
    child: Child,
    bind_addr: String,
    log_dir: PathBuf,
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        remove_dir_if_exists(&self.log_dir);
    }
}

#[tokio::test]
async fn progress_endpoint_renders_svg_for_known_milestone() {
    let Some(server) = start_server().await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    let response = reqwest::get(format!(
        "http://{}/progress?user=octo&repo=demo&milestone=v1.0&theme=solarized-dark",
        server.bind_addr
    ))
    .await
    .expect("HTTP request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("image/svg+xml")
    );
    let body = response.text().await.expect("body should be text");
    assert!(body.starts_with("<svg"));
    assert!(body.contains(">67% Complete (2/3 Issues)</text>"));
    assert!(body.contains("fill=\"#002b36\""));
    assert!(body.contains(">bug</text>"));
    assert!(body.contains(">docs</text>"));
}

#[tokio::test]
async fn progress_endpoint_reports_bad_params_and_unknown_milestones() {
    let Some(server) = start_server().await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    let missing = reqwest::get(format!(
        "http://{}/progress?user=octo&repo=demo",
        server.bind_addr
    ))
    .await
    .expect("HTTP request should complete");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(missing).await, "Invalid URL parameters.");

    let unknown = reqwest::get(format!(
        "http://{}/progress?user=octo&repo=demo&milestone=v9.9",
        server.bind_addr
    ))
    .await
    .expect("HTTP request should complete");
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(unknown).await, "Milestone not found.");
}

#[tokio::test]
async fn progress_endpoint_shows_notice_for_empty_milestone_and_falls_back_on_theme() {
    let Some(server) = start_server().await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    let response = reqwest::get(format!(
        "http://{}/progress?user=octo&repo=demo&milestone=empty&theme=plaid-dark",
        server.bind_addr
    ))
    .await
    .expect("HTTP request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("body should be text");
    assert!(body.contains(">No issues in this milestone yet.</text>"));
    assert!(body.contains("fill=\"#ffffff\""));
}

#[tokio::test]
async fn progress_endpoint_finds_later_milestones_and_prefers_their_counters() {
    let Some(server) = start_server().await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    let response = reqwest::get(format!(
        "http://{}/progress?user=octo&repo=demo&milestone=big",
        server.bind_addr
    ))
    .await
    .expect("HTTP request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("body should be text");
    assert!(body.contains(">75% Complete (6/8 Issues)</text>"));
    assert!(body.contains(">perf</text>"));
    assert!(body.contains(">ui</text>"));
}

async fn error_message(response: reqwest::Response) -> String {
    let body: Value = response
        .json()
        .await
        .expect("HTTP error body should be valid JSON");
    body.get("error")
        .and_then(|value| value.as_str())
        .expect("error field should be a string")
        .to_owned()
}

const GITHUB_DEFAULT_PER_PAGE: usize = 30;

/// Pages like GitHub does, so milestones past the first 30 need `per_page`.
async fn list_milestones(
    Path((_owner, _repo)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let per_page = params
        .get("per_page")
        .and_then(|value| value.parse().ok())
        .unwrap_or(GITHUB_DEFAULT_PER_PAGE);
    let mut milestones = vec![
        json!({"number": 1, "title": "v1.0", "open_issues": 1, "closed_issues": 2}),
        json!({"number": 2, "title": "empty", "open_issues": 0, "closed_issues": 0}),
    ];
    milestones.extend((3..40).map(|number| {
        json!({
            "number": number,
            "title": format!("archive-{number}"),
            "open_issues": 0,
            "closed_issues": 1
        })
    }));
    milestones.push(json!({"number": 40, "title": "big", "open_issues": 2, "closed_issues": 6}));
    milestones.truncate(per_page);
    Json(Value::Array(milestones))
}

async fn list_issues(
    Path((_owner, _repo)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    match params.get("milestone").map(String::as_str) {
        Some("1") => Json(json!([
            {"number": 11, "state": "closed", "labels": [{"name": "bug"}]},
            {"number": 12, "state": "open", "labels": [{"name": "bug"}, {"name": "docs"}]},
            {"number": 13, "state": "closed", "labels": [{"name": "docs"}]}
        ])),
        Some("40") => Json(json!([
            {"number": 401, "state": "closed", "labels": [{"name": "perf"}]},
            {"number": 402, "state": "closed", "labels": [{"name": "perf"}]},
            {"number": 403, "state": "open", "labels": [{"name": "ui"}]}
        ])),
        _ => Json(json!([])),
    }
}

/// Serves just enough of the GitHub REST API for the progress endpoint.
async fn start_fake_github() -> Option<String> {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => return None,
        Err(error) => panic!("fake GitHub listener should bind: {error}"),
    };
    let addr = listener
        .local_addr()
        .expect("fake GitHub listener should have local address");
    let app = Router::new()
        .route("/repos/:owner/:repo/milestones", get(list_milestones))
        .route("/repos/:owner/:repo/issues", get(list_issues));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Some(format!("http://{addr}"))
}

async fn start_server() -> Option<RunningServer> {
    let github_url = start_fake_github().await?;
    let port = find_available_port()?;
    let bind_addr = format!("127.0.0.1:{port}");
    let log_dir = temp_path("integration-logs");
    fs::create_dir_all(&log_dir).expect("log dir should be creatable");

    let mut command = Command::new(bin_path());
    command
        .args(["serve", "--bind", &bind_addr])
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    apply_progress_test_env(&mut command, &github_url, &log_dir);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => return None,
        Err(error) => panic!("server should start: {error}"),
    };

    let health_url = format!("http://{bind_addr}/health");
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Some(status) = child.try_wait().expect("failed to poll server process") {
            panic!("server exited before becoming healthy: {status}");
        }

        if let Ok(response) = client.get(&health_url).send().await
            && response.status().is_success()
        {
            return Some(RunningServer {
                child,
                bind_addr,
                log_dir,
            });
        }

        sleep(Duration::from_millis(50)).await;
    }

    let _ = child.kill();
    let _ = child.wait();
    panic!("server did not become healthy at {health_url}");
}

fn find_available_port() -> Option<u16> {
    let listener = match TcpListener::bind("127.0.0.1:0") {
        Ok(listener) => listener,
        Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => return None,
        Err(error) => panic!("ephemeral port should be available for bind: {error}"),
    };
    let port = listener
        .local_addr()
        .expect("ephemeral listener should have local address")
        .port();
    drop(listener);
    Some(port)
}

fn bin_path() -> &'static str {
    env!("CARGO_BIN_EXE_milestone_progress")
}
