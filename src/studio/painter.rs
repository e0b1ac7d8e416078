use eframe::egui::{self, Align2, Color32, FontId, Painter, Pos2, Rect};

use crate::layout::{Font, TextAlign};
use crate::render::DrawSurface;
use crate::theme::Color;

/// Paints layout records onto an egui painter, offset by `origin`.
pub struct PainterSurface<'a> {
    painter: &'a Painter,
    origin: Pos2,
}

impl<'a> PainterSurface<'a> {
    pub fn new(painter: &'a Painter, origin: Pos2) -> Self {
        Self { painter, origin }
    }

    fn point(&self, x: f64, y: f64) -> Pos2 {
        Pos2::new(self.origin.x + x as f32, self.origin.y + y as f32)
    }
}

impl DrawSurface for PainterSurface<'_> {
    fn clear(&mut self, _width: f64, _height: f64) {
        // egui repaints every frame; the allocated area starts empty.
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        let rect = Rect::from_min_size(self.point(x, y), egui::vec2(width as f32, height as f32));
        self.painter.rect_filled(rect, 0.0, to_color32(color));
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
        self.painter.text(
            self.point(x, y),
            anchor_for(align),
            text,
            FontId::proportional(font.size as f32),
            to_color32(color),
        );
    }
}

/// Layout text positions are baselines, so anchor on the bottom edge.
fn anchor_for(align: TextAlign) -> Align2 {
    match align {
        TextAlign::Left => Align2::LEFT_BOTTOM,
        TextAlign::Center => Align2::CENTER_BOTTOM,
        TextAlign::Right => Align2::RIGHT_BOTTOM,
    }
}

fn to_color32(color: Color) -> Color32 {
    Color32::from_rgb(color.r, color.g, color.b)
}
