use crate::layout::{Font, ProgressLayout, TextAlign};
use crate::theme::Color;

pub mod svg;

pub use self::svg::SvgSurface;

/// Minimal drawing capability a backend must provide to show a progress layout.
pub trait DrawSurface {
    fn clear(&mut self, width: f64, height: f64);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color);

    fn draw_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        align: TextAlign,
        font: &Font,
        color: Color,
    );

    /// Backends that can attach hover text override this; the rest just fill.
    fn fill_rect_with_tooltip(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
        _tooltip: &str,
    ) {
        self.fill_rect(x, y, width, height, color);
    }
}

/// Replays a layout onto `surface`: clear, paint background, segments, then text.
pub fn render_layout<S: DrawSurface + ?Sized>(
    layout: &ProgressLayout,
    background: Color,
    surface: &mut S,
) {
    surface.clear(layout.width, layout.height);
    surface.fill_rect(0.0, 0.0, layout.width, layout.height, background);

    for segment in &layout.segments {
        match segment.tooltip.as_deref() {
            Some(tooltip) => surface.fill_rect_with_tooltip(
                segment.x,
                segment.y,
                segment.width,
                segment.height,
                segment.color,
                tooltip,
            ),
            None => surface.fill_rect(
                segment.x,
                segment.y,
                segment.width,
                segment.height,
                segment.color,
            ),
        }
    }

    for text in &layout.texts {
        surface.draw_text(
            &text.text,
            text.x,
            text.y,
            text.align,
            &text.font,
            text.color,
        );
    }
}
