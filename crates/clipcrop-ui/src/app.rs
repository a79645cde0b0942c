// crates/clipcrop-ui/src/app.rs
//
// ClipCropApp: the file picker, plus one EditSession while a file is open.
//
// Per frame:
//   1. drain MediaWorker results (probe answers, preview frames)
//   2. session.poll(dt): playback, thumbnails, export progress
//   3. draw the panels; they push EditorCommands
//   4. session.process() each command after the UI pass
//
// A finished export closes the session ("CropDone") and returns to the
// picker showing where the file was written.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clipcrop_core::commands::EditorCommand;
use clipcrop_core::config::EditorConfig;
use clipcrop_core::helpers::time::millis_key;
use clipcrop_core::state::{AspectRatio, MediaKind, SourceInfo};
use clipcrop_media::{
    EditSession, Exporter, FfmpegExporter, MediaResult, MediaSource, MediaWorker,
    SessionEvent, SessionLayout, ThumbnailStore,
};
use eframe::egui;
use log::{info, warn};
use rfd::FileDialog;
use uuid::Uuid;

use crate::modules::{
    export::ExportModule, preview::PreviewModule, timeline::TimelineModule, EditorModule, TextureCache,
};
use crate::theme::{configure_style, ACCENT, DARK_TEXT_DIM, ERROR_TEXT};

const OPEN_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "mkv", "webm", "avi", "gif"];
/// Playback never advances more than this per repaint, so a stalled frame
/// does not skip the loop boundary several times over.
const MAX_FRAME_DT: f64 = 0.1;

/// Message on the picker screen.
enum Notice {
    Info(String),
    Error(String),
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct ClipCropApp {
    config:   EditorConfig,
    worker:   MediaWorker,
    exporter: Arc<dyn Exporter>,

    session:  Option<EditSession>,
    /// Thumbnail store while no session holds it.
    store:    Option<ThumbnailStore>,
    /// Probe in flight: (request id, path).
    opening:  Option<(Uuid, PathBuf)>,
    /// Id stamped on preview-frame requests for the open file.
    source_id: Uuid,
    /// Last preview timestamp requested from the worker, in ms.
    last_frame_key: Option<i64>,

    textures: TextureCache,
    preview:  PreviewModule,
    timeline: TimelineModule,
    export:   ExportModule,
    /// Commands emitted by modules each frame, processed after the UI pass
    pending_cmds: Vec<EditorCommand>,
    notice:   Option<Notice>,
}

impl ClipCropApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        configure_style(&cc.egui_ctx);
        cc.egui_ctx.options_mut(|o| {
            o.theme_preference = egui::ThemePreference::Dark;
        });

        let config = EditorConfig::default();
        let store  = ThumbnailStore::new(config.thumbnail_cache_bytes);
        Self {
            config,
            worker:         MediaWorker::new(),
            exporter:       Arc::new(FfmpegExporter),
            session:        None,
            store:          Some(store),
            opening:        None,
            source_id:      Uuid::nil(),
            last_frame_key: None,
            textures:       TextureCache::default(),
            preview:        PreviewModule,
            timeline:       TimelineModule::default(),
            export:         ExportModule,
            pending_cmds:   Vec::new(),
            notice:         None,
        }
    }

    // ── Opening / closing ─────────────────────────────────────────────────────

    fn request_open(&mut self, path: PathBuf) {
        self.close_session();
        let id = Uuid::new_v4();
        info!("[app] probing {}", path.display());
        self.worker.probe(id, path.clone());
        self.opening = Some((id, path));
        self.notice  = None;
    }

    fn open_session(&mut self, ctx: &egui::Context, info: SourceInfo) {
        let media = match MediaSource::open(&info) {
            Ok(m) => m,
            Err(e) => {
                warn!("[app] open {}: {e:#}", info.path.display());
                self.forget_thumbnails(&info.path);
                self.notice = Some(Notice::Error(format!("Could not open {}: {e:#}", info.name())));
                return;
            }
        };
        let layout = SessionLayout {
            strip_width:      (ctx.screen_rect().width() - 24.0).max(1.0) as f64,
            pixels_per_point: ctx.pixels_per_point() as f64,
            aspect:           AspectRatio::Custom { width: info.natural_size.0, height: info.natural_size.1 },
        };
        let store = self.store.take()
            .unwrap_or_else(|| ThumbnailStore::new(self.config.thumbnail_cache_bytes));

        self.textures.clear();
        self.source_id      = Uuid::new_v4();
        self.last_frame_key = None;
        self.timeline       = TimelineModule::default();
        self.session = Some(EditSession::open(
            self.config.clone(), info, media, Arc::clone(&self.exporter), store, layout,
        ));
    }

    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            self.store = Some(session.teardown());
        }
        self.textures.clear();
        self.pending_cmds.clear();
        self.source_id = Uuid::nil();
    }

    /// Drop cached thumbnails of a file that failed to open.
    fn forget_thumbnails(&mut self, path: &Path) {
        if let Some(store) = self.store.as_mut() {
            store.evict(path);
        }
    }

    fn pick_file(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("Video or GIF", OPEN_EXTENSIONS)
            .pick_file()
        {
            self.request_open(path);
        }
    }

    fn handle_drag_and_drop(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.iter().find_map(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.request_open(path);
        }
    }

    // ── Per-frame polling ─────────────────────────────────────────────────────

    fn poll_media(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.worker.rx.try_recv() {
            match result {
                MediaResult::Probed { id, info } if self.opening.as_ref().is_some_and(|(o, _)| *o == id) => {
                    self.opening = None;
                    info!("[app] probed {} {}x{} {:.2}s", info.name(), info.natural_size.0, info.natural_size.1, info.duration);
                    self.open_session(ctx, info);
                }
                MediaResult::Error { id, msg } if self.opening.as_ref().is_some_and(|(o, _)| *o == id) => {
                    let Some((_, path)) = self.opening.take() else { continue };
                    self.forget_thumbnails(&path);
                    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                    warn!("[app] probe {name}: {msg}");
                    self.notice = Some(Notice::Error(format!("Could not read {name}: {msg}")));
                }
                _ => {}
            }
        }

        // Latest frame only; older ones are already stale.
        let mut latest = None;
        while let Ok(result) = self.worker.scrub_rx.try_recv() {
            if let MediaResult::ScrubFrame { id, width, height, data, .. } = result {
                if id == self.source_id {
                    latest = Some((width, height, data));
                }
            }
        }
        if let Some((w, h, data)) = latest {
            self.textures.set_preview_rgba(ctx, w, h, &data);
        }
    }

    fn poll_session(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else { return };
        let dt = (ctx.input(|i| i.stable_dt) as f64).min(MAX_FRAME_DT);

        let mut finished = None;
        for event in session.poll(dt) {
            match event {
                SessionEvent::ThumbnailsReady => {
                    self.textures.load_thumbnails(ctx, session.thumbnails());
                }
                SessionEvent::ExportFinished(path) => finished = Some(path),
                SessionEvent::PlaybackTime(_)
                | SessionEvent::ExportFailed(_)
                | SessionEvent::ExportCancelled => {}
            }
        }

        self.sync_preview(ctx);

        if let Some(path) = finished {
            info!("[app] crop done → {}", path.display());
            self.close_session();
            self.notice = Some(Notice::Info(format!("Saved {}", path.display())));
        }
    }

    /// Keep the preview texture on the playhead: GIFs from memory, video via
    /// the worker's latest-wins frame thread.
    fn sync_preview(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_ref() else { return };
        match session.info().kind {
            MediaKind::AnimatedImage => {
                if let Some(frame) = session.preview_image() {
                    self.textures.set_preview_image(ctx, frame);
                }
            }
            MediaKind::Video => {
                let t   = session.current_time();
                let key = millis_key(t);
                if self.last_frame_key != Some(key) {
                    self.last_frame_key = Some(key);
                    self.worker.request_frame(self.source_id, session.info().path.clone(), t);
                }
            }
        }
    }

    // ── Screens ───────────────────────────────────────────────────────────────

    fn picker_ui(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.35);
            if let Some((_, path)) = &self.opening {
                ui.spinner();
                ui.label(egui::RichText::new(format!("Reading {}", path.display())).color(DARK_TEXT_DIM));
                return;
            }
            match &self.notice {
                Some(Notice::Info(msg))  => { ui.label(egui::RichText::new(msg).color(ACCENT)); }
                Some(Notice::Error(msg)) => { ui.label(egui::RichText::new(msg).color(ERROR_TEXT)); }
                None => {}
            }
            ui.add_space(8.0);
            if ui.button(egui::RichText::new("Open video or GIF…").size(14.0)).clicked() {
                self.pick_file();
            }
            ui.label(egui::RichText::new("or drop a file here").size(11.0).color(DARK_TEXT_DIM));
        });
    }
}

// ── eframe::App ───────────────────────────────────────────────────────────────

impl eframe::App for ClipCropApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.close_session();
        self.worker.shutdown();
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_drag_and_drop(ctx);
        self.poll_media(ctx);
        self.poll_session(ctx);

        let mut close = false;
        egui::TopBottomPanel::top("top_panel")
            .exact_height(36.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(egui::RichText::new("ClipCrop").strong().size(15.0).color(ACCENT));
                    if self.session.is_some() {
                        ui.separator();
                        let running = self.session.as_ref().is_some_and(|s| s.export_status().is_running());
                        if ui.add_enabled(!running, egui::Button::new("Open…")).clicked() {
                            self.pick_file();
                        }
                        if ui.button("Close").clicked() {
                            close = true;
                        }
                    }
                });
            });

        let Some(session) = self.session.as_ref() else {
            egui::CentralPanel::default().show(ctx, |ui| self.picker_ui(ui));
            if self.opening.is_some() {
                ctx.request_repaint();
            }
            return;
        };

        egui::TopBottomPanel::bottom(self.export.name())
            .show(ctx, |ui| {
                ui.add_space(6.0);
                self.export.ui(ui, session, &self.textures, &mut self.pending_cmds);
                ui.add_space(6.0);
            });

        egui::TopBottomPanel::bottom(self.timeline.name())
            .show(ctx, |ui| {
                ui.add_space(4.0);
                self.timeline.ui(ui, session, &self.textures, &mut self.pending_cmds);
                ui.add_space(4.0);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.preview.ui(ui, session, &self.textures, &mut self.pending_cmds);
        });

        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.pending_cmds.push(EditorCommand::TogglePlayback);
        }

        // ── Apply commands ────────────────────────────────────────────────────
        let wants_repaint = self.session.as_mut().is_some_and(|session| {
            for cmd in self.pending_cmds.drain(..) {
                session.process(cmd);
            }
            session.is_playing() || session.thumbnails_pending() || session.export_status().is_running()
        });

        if close {
            self.close_session();
            self.notice = None;
        } else if wants_repaint {
            ctx.request_repaint();
        }
    }
}
