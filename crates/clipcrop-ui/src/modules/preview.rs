// crates/clipcrop-ui/src/modules/preview.rs
//
// Crop preview: the current frame, zoomable and pannable behind a fixed crop
// frame. Everything outside the frame is shaded. Geometry comes from the
// session's CropAreaModel in viewport points; this module only maps those to
// screen space and turns pointer input into commands.
use super::{EditorModule, TextureCache};
use crate::helpers::format::fit_label;
use crate::theme::{ACCENT, DARK_BG_0, DARK_BG_2, DARK_BORDER, DARK_TEXT_DIM, MASK};
use clipcrop_core::commands::EditorCommand;
use clipcrop_core::helpers::geometry::{aspect_ratio_label, Rect as ViewRect};
use clipcrop_core::helpers::time::format_clock;
use clipcrop_core::state::AspectRatio;
use clipcrop_media::EditSession;
use egui::{Color32, Pos2, Rect, RichText, Sense, Stroke, Ui};

/// Height reserved under the canvas for the transport row.
const CONTROLS_H: f32 = 40.0;
/// Wheel points per e-fold of zoom.
const WHEEL_ZOOM_SCALE: f32 = 240.0;

#[derive(Default)]
pub struct PreviewModule;

impl EditorModule for PreviewModule {
    fn name(&self) -> &str { "Preview" }

    fn ui(&mut self, ui: &mut Ui, session: &EditSession, textures: &TextureCache, cmd: &mut Vec<EditorCommand>) {
        ui.vertical(|ui| {
            // ── Header ───────────────────────────────────────────────────────
            egui::Frame::new()
                .fill(DARK_BG_2)
                .inner_margin(egui::Margin { left: 8, right: 8, top: 5, bottom: 5 })
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let name = session.info().name();
                        ui.label(RichText::new(fit_label(&name, ui.available_width() * 0.5)).size(12.0).strong())
                            .on_hover_text(session.info().path.display().to_string());
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            aspect_picker(ui, session, cmd);
                        });
                    });
                });

            ui.add_space(4.0);

            // ── Canvas ───────────────────────────────────────────────────────
            let size = egui::vec2(
                ui.available_width(),
                (ui.available_height() - CONTROLS_H).max(120.0),
            );
            let (canvas, response) = ui.allocate_exact_size(size, Sense::drag());
            cmd.push(EditorCommand::LayoutPreview {
                width:  canvas.width()  as f64,
                height: canvas.height() as f64,
            });

            self.paint_canvas(ui, canvas, session, textures);
            self.handle_input(ui, canvas, &response, session, cmd);

            ui.add_space(4.0);

            // ── Transport ────────────────────────────────────────────────────
            ui.horizontal(|ui| {
                let (play_lbl, action) = if session.is_playing() {
                    ("⏸", EditorCommand::Pause)
                } else {
                    ("▶", EditorCommand::Play)
                };
                if ui.button(RichText::new(play_lbl).size(16.0).color(ACCENT)).clicked() {
                    cmd.push(action);
                }
                ui.label(
                    RichText::new(format_clock(session.current_time()))
                        .monospace().size(12.0).color(ACCENT));
                let (start, end) = session.loop_range();
                ui.label(
                    RichText::new(format!("{}  →  {}", format_clock(start), format_clock(end)))
                        .monospace().size(11.0).color(DARK_TEXT_DIM));
            });
        });
    }
}

impl PreviewModule {
    fn paint_canvas(&self, ui: &Ui, canvas: Rect, session: &EditSession, textures: &TextureCache) {
        let crop    = session.crop();
        let painter = ui.painter_at(canvas);
        painter.rect_filled(canvas, 0.0, DARK_BG_0);

        let content = to_screen(canvas.min, crop.content_rect());
        match &textures.preview {
            Some(tex) => {
                painter.image(tex.id(), content,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)), Color32::WHITE);
            }
            None => {
                painter.text(canvas.center(), egui::Align2::CENTER_CENTER,
                    "Loading…", egui::FontId::proportional(14.0), DARK_TEXT_DIM);
            }
        }

        // Shade around the crop frame.
        let frame = to_screen(canvas.min, crop.crop_frame());
        for r in [
            Rect::from_min_max(canvas.min, Pos2::new(canvas.max.x, frame.min.y)),
            Rect::from_min_max(Pos2::new(canvas.min.x, frame.max.y), canvas.max),
            Rect::from_min_max(Pos2::new(canvas.min.x, frame.min.y), Pos2::new(frame.min.x, frame.max.y)),
            Rect::from_min_max(Pos2::new(frame.max.x, frame.min.y), Pos2::new(canvas.max.x, frame.max.y)),
        ] {
            if r.is_positive() {
                painter.rect_filled(r, 0.0, MASK);
            }
        }

        // Thirds guide, then the frame itself.
        let guide = Stroke::new(0.5, Color32::from_white_alpha(60));
        for k in 1..3 {
            let f = k as f32 / 3.0;
            let x = frame.min.x + frame.width()  * f;
            let y = frame.min.y + frame.height() * f;
            painter.line_segment([Pos2::new(x, frame.min.y), Pos2::new(x, frame.max.y)], guide);
            painter.line_segment([Pos2::new(frame.min.x, y), Pos2::new(frame.max.x, y)], guide);
        }
        painter.rect_stroke(frame, 0.0, Stroke::new(2.0, ACCENT), egui::StrokeKind::Outside);
        painter.rect_stroke(canvas, 0.0, Stroke::new(1.0, DARK_BORDER), egui::StrokeKind::Inside);
    }

    fn handle_input(
        &self,
        ui:       &Ui,
        canvas:   Rect,
        response: &egui::Response,
        session:  &EditSession,
        cmd:      &mut Vec<EditorCommand>,
    ) {
        if response.dragged() {
            let d = response.drag_delta();
            if d != egui::Vec2::ZERO {
                cmd.push(EditorCommand::PanPreview { dx: d.x as f64, dy: d.y as f64 });
            }
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if response.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
        }

        if !response.hovered() {
            return;
        }
        let (pinch, wheel, pointer) = ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta.y, i.pointer.hover_pos()));
        let factor = pinch * (wheel / WHEEL_ZOOM_SCALE).exp();
        if (factor - 1.0).abs() < 1e-4 {
            return;
        }
        let anchor = pointer.unwrap_or(canvas.center()) - canvas.min;
        cmd.push(EditorCommand::ZoomPreview {
            scale:    session.crop().zoom() * factor as f64,
            anchor_x: anchor.x as f64,
            anchor_y: anchor.y as f64,
        });
    }
}

fn aspect_picker(ui: &mut Ui, session: &EditSession, cmd: &mut Vec<EditorCommand>) {
    let (w, h) = session.info().natural_size;
    let original = AspectRatio::Custom { width: w, height: h };

    let current = session.crop().aspect();
    let mut picked = current;
    egui::ComboBox::from_id_salt("crop_aspect")
        .selected_text(aspect_ratio_label(current))
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut picked, original, aspect_ratio_label(original));
            for ar in AspectRatio::PRESETS {
                ui.selectable_value(&mut picked, ar, aspect_ratio_label(ar));
            }
        });
    if picked != current {
        cmd.push(EditorCommand::SetCropAspect(picked));
    }
}

fn to_screen(origin: Pos2, r: ViewRect) -> Rect {
    Rect::from_min_size(
        origin + egui::vec2(r.x as f32, r.y as f32),
        egui::vec2(r.width as f32, r.height as f32),
    )
}
