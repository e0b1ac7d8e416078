use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ProgressSettings;
use crate::error::ProgressError;
use crate::github::{FetchError, GitHubClient};
use crate::layout::LayoutOptions;
use crate::pipeline::{EMPTY_MILESTONE_MESSAGE, ProgressRequest, build_progress_view};
use crate::theme::ThemeResolver;

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

#[derive(Clone)]
struct AppState {
    settings: Arc<ProgressSettings>,
    client: GitHubClient,
    resolver: Arc<ThemeResolver>,
}

/// Query parameters accepted by `/progress`; all optional so missing ones get a
/// readable message instead of axum's rejection text.
#[derive(Debug, Default, Deserialize)]
struct ProgressQuery {
    user: Option<String>,
    repo: Option<String>,
    milestone: Option<String>,
    theme: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidatedQuery {
    user: String,
    repo: String,
    milestone: String,
    theme: Option<String>,
}

impl ProgressQuery {
    fn validate(self) -> Option<ValidatedQuery> {
        let required = |value: Option<String>| {
            value
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        Some(ValidatedQuery {
            user: required(self.user)?,
            repo: required(self.repo)?,
            milestone: required(self.milestone)?,
            theme: required(self.theme),
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

pub fn router(settings: ProgressSettings) -> Result<Router> {
    let client = GitHubClient::new(&settings).context("failed to build GitHub client")?;
    let state = AppState {
        settings: Arc::new(settings),
        client,
        resolver: Arc::new(ThemeResolver::builtin()),
    };
    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/progress", get(handle_progress))
        .with_state(state))
}

pub async fn run_http_server(settings: &ProgressSettings, bind: &str) -> Result<()> {
    let app = router(settings.clone())?;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind HTTP server to `{bind}`"))?;
    let local_addr = listener.local_addr().ok();

    info!(
        github_api = %settings.github_api_base_url,
        default_theme = %settings.default_theme,
        requested_bind = %bind,
        bound_addr = local_addr.map(|addr| addr.to_string()),
        "starting HTTP server"
    );

    axum::serve(listener, app)
        .await
        .context("HTTP server exited with an error")
}

async fn handle_health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn handle_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Response {
    let Some(query) = query.validate() else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid URL parameters.");
    };

    let fetched = match state
        .client
        .fetch_milestone_issues(&query.user, &query.repo, &query.milestone)
        .await
    {
        Ok(fetched) => fetched,
        Err(error) => {
            let (status, message) = fetch_failure(&error);
            warn!(
                user = %query.user,
                repo = %query.repo,
                milestone = %query.milestone,
                status = status.as_u16(),
                error = %error,
                "failed to fetch milestone"
            );
            return error_response(status, message);
        }
    };

    let theme_id = query
        .theme
        .as_deref()
        .unwrap_or(state.settings.default_theme.as_str());
    let request = ProgressRequest {
        milestone: &fetched.milestone.title,
        issues: &fetched.issues,
        theme_id,
        fallback_theme_id: &state.settings.default_theme,
        reported_overall: fetched.reported_overall(),
        geometry: state.settings.geometry,
        options: LayoutOptions {
            empty_message: Some(EMPTY_MILESTONE_MESSAGE.to_owned()),
            require_tags: false,
        },
    };

    match build_progress_view(&state.resolver, &request) {
        Ok(view) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, SVG_CONTENT_TYPE)],
            view.to_svg(),
        )
            .into_response(),
        Err(error) => {
            let status = progress_failure_status(&error);
            warn!(status = status.as_u16(), error = %error, "failed to lay out progress");
            error_response(status, &error.to_string())
        }
    }
}

fn fetch_failure(error: &FetchError) -> (StatusCode, &'static str) {
    match error {
        FetchError::MilestoneNotFound { .. } => (StatusCode::NOT_FOUND, "Milestone not found."),
        FetchError::HttpStatus { status, .. } if *status == StatusCode::NOT_FOUND => {
            (StatusCode::NOT_FOUND, "Repository not found.")
        }
        FetchError::Timeout { .. }
        | FetchError::Transport(_)
        | FetchError::HttpStatus { .. }
        | FetchError::Configuration(_) => (StatusCode::BAD_GATEWAY, "Error loading progress."),
    }
}

fn progress_failure_status(error: &ProgressError) -> StatusCode {
    match error {
        ProgressError::EmptyDataset | ProgressError::NoTaggedIssues => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ProgressError::UnknownTheme { .. } | ProgressError::InvalidTheme { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        error: message.to_owned(),
    };
    (status, Json(body)).into_response()
}
