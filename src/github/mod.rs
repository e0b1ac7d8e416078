use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::aggregate::OverallStat;
use crate::config::ProgressSettings;
use crate::issues::{Issue, IssueState, Label};

const USER_AGENT: &str = concat!("milestone_progress/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: &str = "100";
const RETRY_BASE_DELAY_MS: u64 = 250;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GitHub request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GitHub returned HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("milestone `{title}` not found in {owner}/{repo}")]
    MilestoneNotFound {
        owner: String,
        repo: String,
        title: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(error) => {
                error.is_timeout() || error.is_connect() || error.is_request()
            }
            Self::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::MilestoneNotFound { .. } | Self::Configuration(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Milestone {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub open_issues: u64,
    #[serde(default)]
    pub closed_issues: u64,
}

impl Milestone {
    /// Counters GitHub keeps on the milestone itself, independent of any issue page.
    pub fn reported_overall(&self) -> OverallStat {
        OverallStat {
            total_issues: self.open_issues.saturating_add(self.closed_issues),
            closed_issues: self.closed_issues,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneIssues {
    pub milestone: Milestone,
    pub issues: Vec<Issue>,
}

impl MilestoneIssues {
    /// The milestone's own counters when they cover more issues than were listed.
    pub fn reported_overall(&self) -> Option<OverallStat> {
        let reported = self.milestone.reported_overall();
        (reported.total_issues > self.issues.len() as u64).then_some(reported)
    }
}

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    number: u64,
    state: String,
    #[serde(default)]
    labels: Vec<GitHubLabel>,
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

impl From<GitHubIssue> for Issue {
    fn from(issue: GitHubIssue) -> Self {
        let state = if issue.state.eq_ignore_ascii_case("closed") {
            IssueState::Closed
        } else {
            IssueState::Open
        };
        Self {
            id: issue.number,
            state,
            labels: issue
                .labels
                .into_iter()
                .map(|label| Label::new(label.name))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http_client: reqwest::Client,
    base_url: Url,
    timeout_ms: u64,
    max_retries: u32,
}

impl GitHubClient {
    pub fn new(settings: &ProgressSettings) -> Result<Self, FetchError> {
        let raw_base_url = settings.github_api_base_url.trim();
        if raw_base_url.is_empty() {
            return Err(FetchError::Configuration(
                "GITHUB_API_BASE_URL is required".to_owned(),
            ));
        }
        let base_url = Url::parse(raw_base_url).map_err(|error| {
            FetchError::Configuration(format!(
                "invalid GITHUB_API_BASE_URL `{raw_base_url}`: {error}"
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::Configuration(format!(
                "GITHUB_API_BASE_URL `{raw_base_url}` cannot carry a path"
            )));
        }

        let http_client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http_client,
            base_url,
            timeout_ms: settings.fetch_timeout_ms,
            max_retries: settings.fetch_max_retries,
        })
    }

    /// Looks up a milestone by exact title, then lists the issues filed under it.
    pub async fn fetch_milestone_issues(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
    ) -> Result<MilestoneIssues, FetchError> {
        let milestone = self.find_milestone(owner, repo, title).await?;
        let issues = self
            .list_milestone_issues(owner, repo, milestone.number)
            .await?;
        let fetched = MilestoneIssues { milestone, issues };

        if let Some(reported) = fetched.reported_overall() {
            warn!(
                owner,
                repo,
                milestone = %fetched.milestone.title,
                listed = fetched.issues.len(),
                reported = reported.total_issues,
                "milestone counters exceed listed issues; using counters for overall progress"
            );
        }
        debug!(
            owner,
            repo,
            milestone = %fetched.milestone.title,
            number = fetched.milestone.number,
            issues = fetched.issues.len(),
            "fetched milestone issues"
        );
        Ok(fetched)
    }

    pub async fn find_milestone(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
    ) -> Result<Milestone, FetchError> {
        let url = self.milestones_url(owner, repo)?;
        let milestones: Vec<Milestone> = self.get_json(&url).await?;
        milestones
            .into_iter()
            .find(|milestone| milestone.title == title)
            .ok_or_else(|| FetchError::MilestoneNotFound {
                owner: owner.to_owned(),
                repo: repo.to_owned(),
                title: title.to_owned(),
            })
    }

    pub async fn list_milestone_issues(
        &self,
        owner: &str,
        repo: &str,
        milestone_number: u64,
    ) -> Result<Vec<Issue>, FetchError> {
        let url = self.milestone_issues_url(owner, repo, milestone_number)?;
        let issues: Vec<GitHubIssue> = self.get_json(&url).await?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    fn milestones_url(&self, owner: &str, repo: &str) -> Result<Url, FetchError> {
        self.endpoint(
            &["repos", owner, repo, "milestones"],
            &[("state", "all"), ("per_page", PER_PAGE)],
        )
    }

    fn milestone_issues_url(
        &self,
        owner: &str,
        repo: &str,
        milestone_number: u64,
    ) -> Result<Url, FetchError> {
        let milestone = milestone_number.to_string();
        self.endpoint(
            &["repos", owner, repo, "issues"],
            &[
                ("milestone", milestone.as_str()),
                ("state", "all"),
                ("per_page", PER_PAGE),
            ],
        )
    }

    /// Appends each segment percent-encoded, so caller input cannot add path or query parts.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                FetchError::Configuration("GITHUB_API_BASE_URL cannot carry a path".to_owned())
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let total_attempts = self.max_retries.saturating_add(1);
        let mut attempt: u32 = 1;

        loop {
            match self.get_json_once(url).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let should_retry = attempt < total_attempts && error.is_retryable();
                    if !should_retry {
                        return Err(error);
                    }

                    let delay_ms = retry_delay_ms(attempt);
                    warn!(
                        attempt,
                        total_attempts,
                        delay_ms,
                        url = %url,
                        error = %error,
                        "GitHub request failed; retrying"
                    );

                    sleep(Duration::from_millis(delay_ms)).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let timeout_duration = Duration::from_millis(self.timeout_ms);
        match timeout(timeout_duration, self.send_get(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                timeout_ms: self.timeout_ms,
            }),
        }
    }

    async fn send_get<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        debug!(url = %url, "sending GitHub request");
        let response = self
            .http_client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

fn retry_delay_ms(attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1).min(5);
    RETRY_BASE_DELAY_MS.saturating_mul(1_u64 << exponent)
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error response body>".to_owned());
    Err(FetchError::HttpStatus { status, body })
}
