#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod helpers;
mod modules;
mod theme;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> eframe::Result {
    helpers::log::init_logging();

    if let Err(e) = ffmpeg_the_third::init() {
        log::error!("[app] FFmpeg init failed: {e}");
        return Err(eframe::Error::AppCreation(Box::new(e)));
    }

    let native_options = eframe::NativeOptions {
        centered: true,
        viewport: egui::ViewportBuilder::default()
            .with_title("ClipCrop")
            .with_inner_size([960.0, 820.0])
            .with_min_inner_size([520.0, 560.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "ClipCrop",
        native_options,
        Box::new(|cc| Ok(Box::new(app::ClipCropApp::new(cc)))),
    )
}
