use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::issues::{Issue, IssueState, Label};

pub fn issue(id: u64, state: IssueState, labels: &[&str]) -> Issue {
    Issue {
        id,
        state,
        labels: labels.iter().copied().map(Label::new).collect(),
    }
}

pub fn temp_path(prefix: &str) -> PathBuf {
    let now_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "milestone_progress_{prefix}_{}_{}",
        std::process::id(),
        now_ns
    ))
}

pub fn remove_dir_if_exists(path: &Path) {
    let _ = std::fs::remove_dir_all(path);
}

pub fn apply_progress_test_env(command: &mut Command, github_api_base_url: &str, log_dir: &Path) {
    command.env("GITHUB_API_BASE_URL", github_api_base_url);
    command.env("PROGRESS_DEFAULT_THEME", "github-light");
    command.env("FETCH_TIMEOUT_MS", "2000");
    command.env("FETCH_MAX_RETRIES", "0");
    command.env("PROGRESS_BAR_WIDTH", "300");
    command.env("PROGRESS_BAR_HEIGHT", "20");
    command.env("PROGRESS_ROW_SPACING", "10");
    command.env("RUST_LOG", "error");
    command.env("PROGRESS_FILE_LOG", "error");
    command.env("PROGRESS_LOG_DIR", log_dir.as_os_str());
}
