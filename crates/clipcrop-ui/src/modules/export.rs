// crates/clipcrop-ui/src/modules/export.rs
//
// Bottom bar: the Crop button, then a progress bar with Cancel while the
// export runs, then a dismissable banner when it fails or is cancelled.
// A successful export closes the screen, so Done is shown by the app.
use super::{EditorModule, TextureCache};
use crate::helpers::format::export_banner;
use crate::theme::{ACCENT, DARK_BG_2, DARK_BORDER, DARK_TEXT_DIM, ERROR_TEXT};
use clipcrop_core::commands::EditorCommand;
use clipcrop_core::state::ExportStatus;
use clipcrop_media::EditSession;
use egui::{Color32, RichText, Stroke, Ui};

#[derive(Default)]
pub struct ExportModule;

impl EditorModule for ExportModule {
    fn name(&self) -> &str { "Export" }

    fn ui(&mut self, ui: &mut Ui, session: &EditSession, _textures: &TextureCache, cmd: &mut Vec<EditorCommand>) {
        let status = session.export_status();

        if let ExportStatus::Running { progress, .. } = status {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Exporting…").size(12.0).strong());
                ui.label(RichText::new(format!("{}%", (progress * 100.0) as u32)).monospace().color(ACCENT));
            });
            ui.add(egui::ProgressBar::new(*progress)
                .desired_width(ui.available_width())
                .fill(ACCENT));
            let cancel_btn = egui::Button::new(RichText::new("Cancel").size(11.0).color(DARK_TEXT_DIM))
                .stroke(Stroke::new(1.0, DARK_BORDER))
                .fill(DARK_BG_2)
                .min_size(egui::vec2(ui.available_width(), 28.0));
            if ui.add(cancel_btn).clicked() {
                cmd.push(EditorCommand::CancelExport);
            }
            return;
        }

        if let Some(banner) = export_banner(status) {
            let color = match status {
                ExportStatus::Failed(_) => ERROR_TEXT,
                _                       => DARK_TEXT_DIM,
            };
            ui.horizontal(|ui| {
                ui.label(RichText::new(banner).size(11.0).color(color));
                if ui.small_button("✕").on_hover_text("Dismiss").clicked() {
                    cmd.push(EditorCommand::ClearExportStatus);
                }
            });
        }

        let (w, h) = {
            let r = session.crop().crop_rect_pixels();
            (r.width.round() as u32, r.height.round() as u32)
        };
        ui.label(RichText::new(format!("Output {w}×{h}  ·  H.264 MP4")).size(11.0).color(DARK_TEXT_DIM));

        let crop_btn = egui::Button::new(
            RichText::new("✂ Crop").size(13.0).strong().color(Color32::BLACK),
        )
        .fill(ACCENT)
        .stroke(Stroke::NONE)
        .min_size(egui::vec2(ui.available_width(), 34.0));
        let response = ui.add(crop_btn);
        if response.clicked() {
            cmd.push(EditorCommand::Confirm);
        }
        if !session.info().has_video_track {
            response.on_hover_text(format!(
                "No video track found; assuming {}×{}",
                session.info().natural_size.0, session.info().natural_size.1,
            ));
        }
    }
}
