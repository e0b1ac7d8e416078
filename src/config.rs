use std::env;

use anyhow::{Context, Result, ensure};

use crate::layout::{BarGeometry, DEFAULT_BAR_HEIGHT, DEFAULT_BAR_WIDTH, DEFAULT_ROW_SPACING};
use crate::theme::{DEFAULT_THEME_ID, ThemeResolver};

pub const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_FETCH_MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSettings {
    pub github_api_base_url: String,
    pub default_theme: String,
    pub fetch_timeout_ms: u64,
    pub fetch_max_retries: u32,
    pub geometry: BarGeometry,
}

impl ProgressSettings {
    pub fn from_env() -> Result<Self> {
        // Load .env if present, but do not fail if file does not exist.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name).and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_owned())
                }
            })
        };

        let github_api_base_url = read("GITHUB_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        ensure!(
            !github_api_base_url.is_empty(),
            "GITHUB_API_BASE_URL cannot be empty"
        );

        let default_theme =
            read("PROGRESS_DEFAULT_THEME").unwrap_or_else(|| DEFAULT_THEME_ID.to_owned());
        ThemeResolver::builtin()
            .resolve(&default_theme)
            .context("PROGRESS_DEFAULT_THEME must name a built-in theme")?;

        let fetch_timeout_ms = parse_or(
            read("FETCH_TIMEOUT_MS"),
            "FETCH_TIMEOUT_MS",
            DEFAULT_FETCH_TIMEOUT_MS,
        )?;
        ensure!(
            fetch_timeout_ms > 0,
            "FETCH_TIMEOUT_MS must be greater than 0"
        );

        let fetch_max_retries = parse_or(
            read("FETCH_MAX_RETRIES"),
            "FETCH_MAX_RETRIES",
            DEFAULT_FETCH_MAX_RETRIES,
        )?;

        let width = parse_or(
            read("PROGRESS_BAR_WIDTH"),
            "PROGRESS_BAR_WIDTH",
            DEFAULT_BAR_WIDTH,
        )?;
        ensure!(
            width.is_finite() && width > 0.0,
            "PROGRESS_BAR_WIDTH must be greater than 0"
        );
        let bar_height = parse_or(
            read("PROGRESS_BAR_HEIGHT"),
            "PROGRESS_BAR_HEIGHT",
            DEFAULT_BAR_HEIGHT,
        )?;
        ensure!(
            bar_height.is_finite() && bar_height > 0.0,
            "PROGRESS_BAR_HEIGHT must be greater than 0"
        );
        let row_spacing = parse_or(
            read("PROGRESS_ROW_SPACING"),
            "PROGRESS_ROW_SPACING",
            DEFAULT_ROW_SPACING,
        )?;
        ensure!(
            row_spacing.is_finite() && row_spacing >= 0.0,
            "PROGRESS_ROW_SPACING cannot be negative"
        );

        Ok(Self {
            github_api_base_url,
            default_theme,
            fetch_timeout_ms,
            fetch_max_retries,
            geometry: BarGeometry {
                width,
                bar_height,
                row_spacing,
                ..BarGeometry::default()
            },
        })
    }
}

fn parse_or<T>(raw: Option<String>, name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("failed to parse {name} value `{raw}`")),
        None => Ok(default),
    }
}
