use std::fmt::Write as _;

use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::{OverallStat, TagStat, aggregate};
use crate::error::ProgressError;
use crate::issues::Issue;
use crate::layout::{
    BarGeometry, LayoutInput, LayoutOptions, ProgressLayout, ProgressLayoutEngine, percentage_text,
};
use crate::palette::{ColorAssignment, assign_colors};
use crate::render::{DrawSurface, SvgSurface, render_layout};
use crate::theme::{Theme, ThemeResolver};

pub const EMPTY_MILESTONE_MESSAGE: &str = "No issues in this milestone yet.";

/// Everything a render collaborator needs for one milestone snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub milestone: String,
    pub theme: Theme,
    pub overall: OverallStat,
    pub tags: Vec<TagStat>,
    pub colors: ColorAssignment,
    pub layout: ProgressLayout,
}

impl ProgressView {
    pub fn render<S: DrawSurface + ?Sized>(&self, surface: &mut S) {
        render_layout(&self.layout, self.theme.background, surface);
    }

    pub fn to_svg(&self) -> String {
        let mut surface = SvgSurface::new();
        self.render(&mut surface);
        surface.finish()
    }

    /// Plain-text rendition for terminals and logs.
    pub fn summary(&self) -> String {
        let mut output = format!("{}: {}\n", self.milestone, percentage_text(&self.overall));
        let name_width = self
            .tags
            .iter()
            .map(|tag| tag.name.chars().count())
            .max()
            .unwrap_or(0);
        for tag in &self.tags {
            let percent = (tag.closed_ratio() * 100.0).round() as u8;
            let _ = writeln!(
                output,
                "  {:<name_width$}  {:>3}%  {}/{}",
                tag.name, percent, tag.closed, tag.total
            );
        }
        output
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRequest<'a> {
    pub milestone: &'a str,
    pub issues: &'a [Issue],
    pub theme_id: &'a str,
    /// Used when `theme_id` does not resolve.
    pub fallback_theme_id: &'a str,
    /// Milestone counters from the tracker, preferred when they cover more issues than `issues`.
    pub reported_overall: Option<OverallStat>,
    pub geometry: BarGeometry,
    pub options: LayoutOptions,
}

/// Resolves `theme_id`, falling back to `fallback_id` when it is unknown.
pub fn resolve_theme_or_default(
    resolver: &ThemeResolver,
    theme_id: &str,
    fallback_id: &str,
) -> Result<Theme, ProgressError> {
    match resolver.resolve(theme_id) {
        Ok(theme) => Ok(theme),
        Err(error @ ProgressError::UnknownTheme { .. }) => {
            warn!(
                requested = %theme_id,
                fallback = %fallback_id,
                error = %error,
                "unknown theme; using fallback"
            );
            resolver.resolve(fallback_id)
        }
        Err(error) => Err(error),
    }
}

/// Runs aggregation, theming, color assignment and layout for one issue snapshot.
pub fn build_progress_view(
    resolver: &ThemeResolver,
    request: &ProgressRequest<'_>,
) -> Result<ProgressView, ProgressError> {
    let aggregation = aggregate(request.issues);
    let theme = resolve_theme_or_default(resolver, request.theme_id, request.fallback_theme_id)?;
    let colors = assign_colors(&aggregation.tag_names(), &theme)?;
    let overall = request
        .reported_overall
        .filter(|reported| reported.total_issues > aggregation.overall.total_issues)
        .unwrap_or(aggregation.overall);

    debug!(
        milestone = %request.milestone,
        total_issues = overall.total_issues,
        closed_issues = overall.closed_issues,
        tags = aggregation.tags.len(),
        theme = %theme.name,
        "building progress view"
    );

    let layout = ProgressLayoutEngine::layout(LayoutInput {
        title: request.milestone,
        overall,
        tags: &aggregation.tags,
        colors: &colors,
        theme: &theme,
        geometry: request.geometry,
        options: &request.options,
    })?;

    Ok(ProgressView {
        milestone: request.milestone.to_owned(),
        theme,
        overall,
        tags: aggregation.tags,
        colors,
        layout,
    })
}
