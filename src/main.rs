use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use milestone_progress::aggregate::OverallStat;
use milestone_progress::config::ProgressSettings;
use milestone_progress::github::GitHubClient;
use milestone_progress::issues::{Issue, load_issue_snapshot};
use milestone_progress::layout::LayoutOptions;
use milestone_progress::pipeline::{
    EMPTY_MILESTONE_MESSAGE, ProgressRequest, ProgressView, build_progress_view,
};
use milestone_progress::server::run_http_server;
use milestone_progress::studio::run_studio;
use milestone_progress::theme::ThemeResolver;

const LOG_FILE_NAME: &str = "milestone_progress.log";

#[derive(Debug, Parser)]
#[command(
    name = "milestone_progress",
    about = "Segmented milestone progress bars from GitHub issues"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a milestone's progress to stdout.
    Render {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Svg)]
        format: OutputFormat,
    },
    /// Serve `/progress?user=&repo=&milestone=&theme=` as SVG over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
    /// Open a native window with the progress bars.
    Studio {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Repository owner on GitHub.
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    repo: Option<String>,
    /// Milestone title; overrides the title stored in an issues file.
    #[arg(long)]
    milestone: Option<String>,
    /// YAML or JSON issue snapshot to read instead of GitHub.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["user", "repo"])]
    issues_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ViewArgs {
    /// Theme id such as `github-dark` or `nord-light`.
    #[arg(long)]
    theme: Option<String>,
    /// Fail instead of drawing a single aggregate bar when no issue has labels.
    #[arg(long)]
    require_tags: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Svg,
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_tracing()?;

    let cli = Cli::parse();
    let settings = ProgressSettings::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Render {
            source,
            view,
            format,
        } => {
            let view = load_view(&settings, &source, &view).await?;
            let output = match format {
                OutputFormat::Svg => view.to_svg(),
                OutputFormat::Json => {
                    let mut json = serde_json::to_string_pretty(&view)
                        .context("failed to serialize progress view")?;
                    json.push('\n');
                    json
                }
                OutputFormat::Text => view.summary(),
            };
            std::io::stdout()
                .lock()
                .write_all(output.as_bytes())
                .context("failed to write output")?;
        }
        Commands::Serve { bind } => run_http_server(&settings, &bind).await?,
        Commands::Studio { source, view } => {
            let view = load_view(&settings, &source, &view).await?;
            run_studio(view)?;
        }
    }

    Ok(())
}

async fn load_view(
    settings: &ProgressSettings,
    source: &SourceArgs,
    view: &ViewArgs,
) -> Result<ProgressView> {
    let LoadedMilestone {
        milestone,
        issues,
        reported_overall,
    } = load_issues(settings, source).await?;
    let theme_id = view
        .theme
        .as_deref()
        .unwrap_or(settings.default_theme.as_str());
    let request = ProgressRequest {
        milestone: &milestone,
        issues: &issues,
        theme_id,
        fallback_theme_id: &settings.default_theme,
        reported_overall,
        geometry: settings.geometry,
        options: LayoutOptions {
            empty_message: Some(EMPTY_MILESTONE_MESSAGE.to_owned()),
            require_tags: view.require_tags,
        },
    };

    build_progress_view(&ThemeResolver::builtin(), &request)
        .with_context(|| format!("failed to build progress view for milestone `{milestone}`"))
}

struct LoadedMilestone {
    milestone: String,
    issues: Vec<Issue>,
    reported_overall: Option<OverallStat>,
}

async fn load_issues(settings: &ProgressSettings, source: &SourceArgs) -> Result<LoadedMilestone> {
    if let Some(path) = &source.issues_file {
        let snapshot = load_issue_snapshot(path)?;
        let milestone = source.milestone.clone().unwrap_or(snapshot.milestone);
        info!(
            path = %path.display(),
            milestone = %milestone,
            issues = snapshot.issues.len(),
            "loaded issue snapshot"
        );
        return Ok(LoadedMilestone {
            milestone,
            issues: snapshot.issues,
            reported_overall: None,
        });
    }

    let (Some(user), Some(repo), Some(milestone)) = (
        source.user.as_deref(),
        source.repo.as_deref(),
        source.milestone.as_deref(),
    ) else {
        bail!("--user, --repo and --milestone are required unless --issues-file is given");
    };

    let client = GitHubClient::new(settings).context("failed to build GitHub client")?;
    let fetched = client
        .fetch_milestone_issues(user, repo, milestone)
        .await
        .with_context(|| format!("failed to load milestone `{milestone}` from {user}/{repo}"))?;
    let reported_overall = fetched.reported_overall();
    Ok(LoadedMilestone {
        milestone: fetched.milestone.title,
        issues: fetched.issues,
        reported_overall,
    })
}

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,milestone_progress=debug"));
    // stdout carries rendered output, so console logs go to stderr.
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(env_filter);

    let (file_layer, guard) = match std::env::var_os("PROGRESS_LOG_DIR") {
        Some(log_dir) => {
            let file_level =
                std::env::var("PROGRESS_FILE_LOG").unwrap_or_else(|_| "info".to_owned());
            let appender = tracing_appender::rolling::daily(PathBuf::from(log_dir), LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(file_level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(guard)
}
