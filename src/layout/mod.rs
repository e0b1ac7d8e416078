use serde::Serialize;

use crate::aggregate::{OverallStat, TagStat};
use crate::error::ProgressError;
use crate::palette::ColorAssignment;
use crate::theme::{Color, Theme};

pub const DEFAULT_BAR_WIDTH: f64 = 600.0;
pub const DEFAULT_BAR_HEIGHT: f64 = 20.0;
pub const DEFAULT_ROW_SPACING: f64 = 14.0;
const DEFAULT_MARGIN: f64 = 16.0;
const TEXT_GAP: f64 = 6.0;

pub const TITLE_FONT: Font = Font {
    size: 18.0,
    bold: true,
};
pub const LABEL_FONT: Font = Font {
    size: 13.0,
    bold: false,
};

/// Placement of the overall bar; per-tag rows stack below it with the same width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub bar_height: f64,
    pub row_spacing: f64,
}

impl Default for BarGeometry {
    fn default() -> Self {
        Self {
            x: DEFAULT_MARGIN,
            y: DEFAULT_MARGIN,
            width: DEFAULT_BAR_WIDTH,
            bar_height: DEFAULT_BAR_HEIGHT,
            row_spacing: DEFAULT_ROW_SPACING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Font {
    pub size: f64,
    pub bold: bool,
}

impl Font {
    pub fn css(&self) -> String {
        let weight = if self.bold { "bold " } else { "" };
        format!("{weight}{}px sans-serif", self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRole {
    /// Closed share of a tag's slice inside the overall bar.
    OverallClosed,
    /// Open share of a tag's slice, painted with the background.
    OverallOpen,
    /// Whatever the tag slices leave of the overall bar.
    OverallRemainder,
    /// Single fill used when no tags are present.
    AggregateClosed,
    TagTrack,
    TagClosed,
}

impl SegmentRole {
    pub fn is_overall_bar(self) -> bool {
        matches!(
            self,
            Self::OverallClosed | Self::OverallOpen | Self::OverallRemainder | Self::AggregateClosed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: Color,
    pub role: SegmentRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    Title,
    Percentage,
    TagLabel,
    TagCounter,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextAnnotation {
    pub text: String,
    /// Anchor x; interpretation depends on `align`.
    pub x: f64,
    /// Baseline y.
    pub y: f64,
    pub align: TextAlign,
    pub font: Font,
    pub color: Color,
    pub role: TextRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressLayout {
    pub width: f64,
    pub height: f64,
    pub segments: Vec<Segment>,
    pub texts: Vec<TextAnnotation>,
}

impl ProgressLayout {
    pub fn overall_bar_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|segment| segment.role.is_overall_bar())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutOptions {
    /// Text shown instead of failing when the milestone has no issues.
    pub empty_message: Option<String>,
    /// Fail with `NoTaggedIssues` rather than drawing an aggregate-only bar.
    pub require_tags: bool,
}

pub struct LayoutInput<'a> {
    pub title: &'a str,
    pub overall: OverallStat,
    pub tags: &'a [TagStat],
    pub colors: &'a ColorAssignment,
    pub theme: &'a Theme,
    pub geometry: BarGeometry,
    pub options: &'a LayoutOptions,
}

pub struct ProgressLayoutEngine;

impl ProgressLayoutEngine {
    pub fn layout(input: LayoutInput<'_>) -> Result<ProgressLayout, ProgressError> {
        let geometry = input.geometry;
        let theme = input.theme;
        let canvas_width = non_negative(geometry.x * 2.0 + geometry.width);

        if input.overall.total_issues == 0 {
            let message = input
                .options
                .empty_message
                .as_deref()
                .ok_or(ProgressError::EmptyDataset)?;
            return Ok(ProgressLayout {
                width: canvas_width,
                height: geometry.y * 2.0 + TITLE_FONT.size,
                segments: Vec::new(),
                texts: vec![TextAnnotation {
                    text: message.to_owned(),
                    x: geometry.x,
                    y: geometry.y + TITLE_FONT.size,
                    align: TextAlign::Left,
                    font: TITLE_FONT,
                    color: theme.foreground,
                    role: TextRole::Notice,
                }],
            });
        }
        if input.tags.is_empty() && input.options.require_tags {
            return Err(ProgressError::NoTaggedIssues);
        }

        let left = geometry.x;
        let right = geometry.x + non_negative(geometry.width);
        let bar_width = right - left;
        let mut segments = Vec::new();
        let mut texts = Vec::new();
        let mut cursor_y = geometry.y;

        texts.push(TextAnnotation {
            text: input.title.to_owned(),
            x: left,
            y: cursor_y + TITLE_FONT.size,
            align: TextAlign::Left,
            font: TITLE_FONT,
            color: theme.foreground,
            role: TextRole::Title,
        });
        texts.push(TextAnnotation {
            text: percentage_text(&input.overall),
            x: right,
            y: cursor_y + TITLE_FONT.size,
            align: TextAlign::Right,
            font: TITLE_FONT,
            color: theme.foreground,
            role: TextRole::Percentage,
        });
        cursor_y += TITLE_FONT.size + TEXT_GAP;

        let bar = BarRow {
            y: cursor_y,
            height: geometry.bar_height,
        };
        if input.tags.is_empty() {
            push_aggregate_bar(&mut segments, &input.overall, theme, left, bar_width, bar);
        } else {
            push_tagged_overall_bar(&mut segments, &input, left, right, bar);
        }
        cursor_y += geometry.bar_height + geometry.row_spacing;

        for tag in input.tags {
            let color = tag_color(input.colors, theme, &tag.name);
            texts.push(TextAnnotation {
                text: tag.name.clone(),
                x: left,
                y: cursor_y + LABEL_FONT.size,
                align: TextAlign::Left,
                font: LABEL_FONT,
                color: theme.foreground,
                role: TextRole::TagLabel,
            });
            texts.push(TextAnnotation {
                text: format!("{}/{}", tag.closed, tag.total),
                x: right,
                y: cursor_y + LABEL_FONT.size,
                align: TextAlign::Right,
                font: LABEL_FONT,
                color: theme.foreground,
                role: TextRole::TagCounter,
            });
            cursor_y += LABEL_FONT.size + TEXT_GAP;

            segments.push(Segment {
                x: left,
                y: cursor_y,
                width: bar_width,
                height: geometry.bar_height,
                color: theme.muted,
                role: SegmentRole::TagTrack,
                tooltip: None,
            });
            // Each row is normalized to the tag's own total.
            let filled = non_negative(tag.closed_ratio() * bar_width);
            if filled > 0.0 {
                segments.push(Segment {
                    x: left,
                    y: cursor_y,
                    width: filled,
                    height: geometry.bar_height,
                    color,
                    role: SegmentRole::TagClosed,
                    tooltip: Some(closed_tooltip(tag)),
                });
            }
            cursor_y += geometry.bar_height + geometry.row_spacing;
        }

        Ok(ProgressLayout {
            width: canvas_width,
            height: non_negative(cursor_y - geometry.row_spacing + geometry.y),
            segments,
            texts,
        })
    }
}

#[derive(Clone, Copy)]
struct BarRow {
    y: f64,
    height: f64,
}

fn push_aggregate_bar(
    segments: &mut Vec<Segment>,
    overall: &OverallStat,
    theme: &Theme,
    left: f64,
    bar_width: f64,
    bar: BarRow,
) {
    let ratio = overall.closed_issues as f64 / overall.total_issues as f64;
    let filled = non_negative(ratio * bar_width).min(bar_width);
    if filled > 0.0 {
        segments.push(Segment {
            x: left,
            y: bar.y,
            width: filled,
            height: bar.height,
            color: theme.palette.first().copied().unwrap_or(theme.foreground),
            role: SegmentRole::AggregateClosed,
            tooltip: Some(format!(
                "{}/{} issues closed",
                overall.closed_issues, overall.total_issues
            )),
        });
    }
    let remainder = non_negative(bar_width - filled);
    if remainder > 0.0 {
        segments.push(Segment {
            x: left + filled,
            y: bar.y,
            width: remainder,
            height: bar.height,
            color: theme.muted,
            role: SegmentRole::OverallRemainder,
            tooltip: None,
        });
    }
}

fn push_tagged_overall_bar(
    segments: &mut Vec<Segment>,
    input: &LayoutInput<'_>,
    left: f64,
    right: f64,
    bar: BarRow,
) {
    let theme = input.theme;
    let bar_width = right - left;
    // Issues carrying several labels make the tag totals add up to more than the
    // issue count; scale by the larger of the two so slices stay inside the bar.
    let tag_total_sum = input.tags.iter().map(|tag| tag.total).sum::<u64>();
    let scale = input.overall.total_issues.max(tag_total_sum) as f64;

    let mut offset = left;
    for tag in input.tags {
        let slice = non_negative(tag.total as f64 / scale * bar_width);
        let closed = non_negative(tag.closed_ratio() * slice);
        let open = non_negative(slice - closed);

        if closed > 0.0 {
            segments.push(Segment {
                x: offset,
                y: bar.y,
                width: closed,
                height: bar.height,
                color: tag_color(input.colors, theme, &tag.name),
                role: SegmentRole::OverallClosed,
                tooltip: Some(closed_tooltip(tag)),
            });
        }
        if open > 0.0 {
            segments.push(Segment {
                x: offset + closed,
                y: bar.y,
                width: open,
                height: bar.height,
                color: theme.background,
                role: SegmentRole::OverallOpen,
                tooltip: Some(format!("{}: {} open", tag.name, tag.open())),
            });
        }
        offset += slice;
    }

    let remainder = non_negative(right - offset);
    if remainder > 0.0 {
        segments.push(Segment {
            x: offset,
            y: bar.y,
            width: remainder,
            height: bar.height,
            color: theme.muted,
            role: SegmentRole::OverallRemainder,
            tooltip: None,
        });
    }
}

fn tag_color(colors: &ColorAssignment, theme: &Theme, name: &str) -> Color {
    colors.get(name).unwrap_or(theme.foreground)
}

fn closed_tooltip(tag: &TagStat) -> String {
    format!("{}: {}/{} closed", tag.name, tag.closed, tag.total)
}

pub fn percentage_text(overall: &OverallStat) -> String {
    match overall.percent_complete() {
        Some(percent) => format!(
            "{percent}% Complete ({}/{} Issues)",
            overall.closed_issues, overall.total_issues
        ),
        None => "No issues".to_owned(),
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
