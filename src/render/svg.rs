use std::fmt::Write as _;

use crate::layout::{Font, TextAlign};
use crate::theme::Color;

use super::DrawSurface;

/// Collects draw calls into a standalone SVG document.
#[derive(Debug, Clone, Default)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    body: String,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" \
             viewBox=\"0 0 {w} {h}\">\n{body}</svg>\n",
            w = number(self.width),
            h = number(self.height),
            body = self.body,
        )
    }

    fn push_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
        tooltip: Option<&str>,
    ) {
        let _ = write!(
            self.body,
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{color}\"",
            number(x),
            number(y),
            number(width),
            number(height),
        );
        match tooltip {
            Some(tooltip) => {
                let _ = writeln!(
                    self.body,
                    "><title>{}</title></rect>",
                    escape_xml(tooltip)
                );
            }
            None => self.body.push_str("/>\n"),
        }
    }
}

impl DrawSurface for SvgSurface {
    fn clear(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.body.clear();
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        self.push_rect(x, y, width, height, color, None);
    }

    fn fill_rect_with_tooltip(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
        tooltip: &str,
    ) {
        self.push_rect(x, y, width, height, color, Some(tooltip));
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        align: TextAlign,
        font: &Font,
        color: Color,
    ) {
        let anchor = match align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let weight = if font.bold {
            " font-weight=\"bold\""
        } else {
            ""
        };
        let _ = writeln!(
            self.body,
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"{anchor}\" font-family=\"sans-serif\" \
             font-size=\"{}\"{weight} fill=\"{color}\">{}</text>",
            number(x),
            number(y),
            number(font.size),
            escape_xml(text),
        );
    }
}

/// Two decimals at most, trailing zeros dropped.
fn number(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use crate::layout::TITLE_FONT;

    use super::*;

    #[test]
    fn finish_wraps_body_with_canvas_size() {
        let mut surface = SvgSurface::new();
        surface.clear(320.0, 120.5);
        surface.fill_rect(0.0, 0.0, 320.0, 120.5, Color::from_hex(0xffffff));

        let svg = surface.finish();

        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"320\""));
        assert!(svg.contains("viewBox=\"0 0 320 120.5\">\n"));
        assert!(svg.contains("width=\"320\" height=\"120.5\" fill=\"#ffffff\"/>"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn tooltips_become_title_elements() {
        let mut surface = SvgSurface::new();
        let color = Color::from_hex(0x2da44e);
        surface.fill_rect_with_tooltip(1.0, 2.0, 3.333, 4.0, color, "a<b>: 1/2 closed");

        let svg = surface.finish();

        assert!(svg.contains("<rect x=\"1\" y=\"2\" width=\"3.33\" height=\"4\""));
        assert!(svg.contains("fill=\"#2da44e\"><title>"));
        assert!(svg.contains("<title>a&lt;b&gt;: 1/2 closed</title></rect>"));
    }

    #[test]
    fn text_is_escaped_and_anchored() {
        let mut surface = SvgSurface::new();
        surface.draw_text(
            "R&D \"v2\"",
            10.0,
            24.0,
            TextAlign::Right,
            &TITLE_FONT,
            Color::from_hex(0x1f2328),
        );

        let svg = surface.finish();

        assert!(svg.contains("text-anchor=\"end\""));
        assert!(svg.contains("font-weight=\"bold\""));
        assert!(svg.contains(">R&amp;D &quot;v2&quot;</text>"));
    }

    #[test]
    fn clear_discards_previous_drawing() {
        let mut surface = SvgSurface::new();
        surface.fill_rect(0.0, 0.0, 1.0, 1.0, Color::from_hex(0x000000));
        surface.clear(5.0, 5.0);

        assert!(!surface.finish().contains("<rect"));
    }

    #[test]
    fn numbers_are_compact() {
        assert_eq!(number(100.0), "100");
        assert_eq!(number(33.333_333), "33.33");
        assert_eq!(number(0.5), "0.5");
        assert_eq!(number(-0.001), "0");
    }
}
