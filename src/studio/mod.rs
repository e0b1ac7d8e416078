use anyhow::Result;
use eframe::egui;
use tracing::info;

use crate::layout::{ProgressLayout, Segment};
use crate::pipeline::ProgressView;

pub mod painter;

use self::painter::PainterSurface;

const APP_TITLE: &str = "milestone progress";
const SUMMARY_PANEL_HEIGHT: f32 = 160.0;

/// Opens a native window showing an already-built progress view.
pub fn run_studio(view: ProgressView) -> Result<()> {
    info!(
        milestone = %view.milestone,
        theme = %view.theme.name,
        tags = view.tags.len(),
        "opening progress window"
    );

    let inner_size = egui::vec2(
        view.layout.width as f32,
        view.layout.height as f32 + SUMMARY_PANEL_HEIGHT,
    );
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(inner_size),
        ..Default::default()
    };

    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(ProgressApp::new(view)))),
    )
    .map_err(|error| anyhow::anyhow!("progress window exited with error: {error}"))
}

struct ProgressApp {
    view: ProgressView,
    show_summary: bool,
}

impl ProgressApp {
    fn new(view: ProgressView) -> Self {
        Self {
            view,
            show_summary: true,
        }
    }

    fn render_canvas(&self, ui: &mut egui::Ui) {
        let layout = &self.view.layout;
        let (response, painter) = ui.allocate_painter(
            egui::vec2(layout.width as f32, layout.height as f32),
            egui::Sense::hover(),
        );
        let origin = response.rect.min;
        let mut surface = PainterSurface::new(&painter, origin);
        self.view.render(&mut surface);

        let hovered = response.hover_pos().and_then(|pos| {
            segment_at(
                layout,
                f64::from(pos.x - origin.x),
                f64::from(pos.y - origin.y),
            )
        });
        if let Some(tooltip) = hovered.and_then(|segment| segment.tooltip.as_deref()) {
            response.on_hover_text(tooltip);
        }
    }
}

impl eframe::App for ProgressApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let background = self.view.theme.background;
        let fill = egui::Color32::from_rgb(background.r, background.g, background.b);

        egui::TopBottomPanel::bottom("progress_summary")
            .resizable(true)
            .default_height(SUMMARY_PANEL_HEIGHT)
            .show(ctx, |ui| {
                ui.checkbox(&mut self.show_summary, "Show summary");
                if self.show_summary {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        ui.label(egui::RichText::new(self.view.summary()).monospace());
                    });
                }
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(fill))
            .show(ctx, |ui| {
                egui::ScrollArea::both().show(ui, |ui| self.render_canvas(ui));
            });
    }
}

/// Topmost segment under a canvas-relative point; later segments paint over earlier ones.
fn segment_at(layout: &ProgressLayout, x: f64, y: f64) -> Option<&Segment> {
    layout.segments.iter().rev().find(|segment| {
        x >= segment.x
            && x < segment.x + segment.width
            && y >= segment.y
            && y < segment.y + segment.height
    })
}
