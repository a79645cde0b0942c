// crates/clipcrop-media/src/session.rs
//
// EditSession: one open trim + crop screen.
//
// Owns every stateful piece for the screen's lifetime:
//   ScrubTimeline + TimeRangeModel   selection and strip geometry
//   CropAreaModel                    crop frame over the zoomable preview
//   PreviewPlaybackController        looped preview playback
//   PreviewFrameCache + store        strip thumbnails
//   ExportMonitor                    the running export, if any
//
// All mutation happens on the UI thread:
//   process(cmd)  after the UI pass, once per queued EditorCommand
//   poll(dt)      once per frame; advances playback, collects thumbnails and
//                 export progress
//
// Timeline events are drained after every command:
//   Changed                          pause, preview-seek to the moved edge
//   ChangeEnded / StoppedScrolling   rebind the loop and restart from start

use std::sync::Arc;

use image::RgbaImage;
use log::{debug, info, warn};
use uuid::Uuid;

use clipcrop_core::commands::EditorCommand;
use clipcrop_core::config::EditorConfig;
use clipcrop_core::crop_area::CropAreaModel;
use clipcrop_core::error::EditError;
use clipcrop_core::events::{ChangeOrigin, Edge, TimelineEvent};
use clipcrop_core::helpers::geometry::{Point, Size};
use clipcrop_core::scrub::{calc_fps, ScrubTimeline};
use clipcrop_core::state::{AspectRatio, ExportStatus, SourceInfo};

use crate::export::{temp_output_path, ExportMonitor, ExportPoll, ExportRequest, Exporter};
use crate::frame_cache::{PendingFrames, PreviewFrame, PreviewFrameCache};
use crate::player::{MediaPlayer, PreviewPlaybackController};
use crate::source::MediaSource;
use crate::thumbnail_store::ThumbnailStore;

/// What `poll` observed this frame.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The strip's thumbnails were delivered.
    ThumbnailsReady,
    /// Playback position report (rate-limited).
    PlaybackTime(f64),
    /// Export finished; the screen is done with this file.
    ExportFinished(std::path::PathBuf),
    ExportFailed(String),
    ExportCancelled,
}

/// How the screen is laid out when it opens.
#[derive(Clone, Copy, Debug)]
pub struct SessionLayout {
    /// Width of the scrub strip viewport, in points.
    pub strip_width: f64,
    /// Physical pixels per point, for thumbnail resolution.
    pub pixels_per_point: f64,
    pub aspect: AspectRatio,
}

pub struct EditSession {
    config:     EditorConfig,
    info:       SourceInfo,
    media:      MediaSource,
    timeline:   ScrubTimeline,
    crop:       CropAreaModel,
    playback:   PreviewPlaybackController<Box<dyn MediaPlayer>>,
    frames:     PreviewFrameCache,
    store:      ThumbnailStore,
    pending:    Option<PendingFrames>,
    thumbnails: Vec<PreviewFrame>,
    exporter:   Arc<dyn Exporter>,
    export:     Option<ExportMonitor>,
    status:     ExportStatus,
    events:     Vec<TimelineEvent>,
}

impl EditSession {
    /// Build the screen for `info` and start generating thumbnails. `store`
    /// carries thumbnails over from earlier sessions; get it back from
    /// `teardown`.
    pub fn open(
        config:   EditorConfig,
        info:     SourceInfo,
        media:    MediaSource,
        exporter: Arc<dyn Exporter>,
        store:    ThumbnailStore,
        layout:   SessionLayout,
    ) -> Self {
        let thumb = config.preview_thumb_size;
        let fps = calc_fps(
            layout.strip_width,
            config.horizon_inset,
            config.max_duration.min(info.duration),
            thumb.width,
        );
        let mut timeline = ScrubTimeline::new(info.duration, fps, &config);
        timeline.layout(layout.strip_width);

        let crop = CropAreaModel::new(info.size(), layout.aspect, &config);

        let mut playback = PreviewPlaybackController::new(media.player(), &config);
        let range = timeline.snapshot();
        playback.bind_range(range.start, range.end);

        let ppp = layout.pixels_per_point.max(1.0);
        let thumb_px = ((thumb.width * ppp).round() as u32, (thumb.height * ppp).round() as u32);
        let frames = PreviewFrameCache::new(media.frames(), info.path.clone(), fps, thumb_px);

        info!(
            "[session] open {} ({:.2}s) fps={fps:.3} range=[{:.3}, {:.3}]",
            info.name(), info.duration, range.start, range.end
        );

        let mut session = Self {
            config,
            info,
            media,
            timeline,
            crop,
            playback,
            frames,
            store,
            pending:    None,
            thumbnails: Vec::new(),
            exporter,
            export:     None,
            status:     ExportStatus::Idle,
            events:     Vec::new(),
        };
        session.request_thumbnails();
        session
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn config(&self)        -> &EditorConfig   { &self.config }
    pub fn info(&self)          -> &SourceInfo     { &self.info }
    pub fn media(&self)         -> &MediaSource    { &self.media }
    pub fn timeline(&self)      -> &ScrubTimeline  { &self.timeline }
    pub fn crop(&self)          -> &CropAreaModel  { &self.crop }
    pub fn thumbnails(&self)    -> &[PreviewFrame] { &self.thumbnails }
    pub fn export_status(&self) -> &ExportStatus   { &self.status }
    pub fn is_playing(&self)    -> bool            { self.playback.is_playing() }
    pub fn current_time(&self)  -> f64             { self.playback.current_time() }
    pub fn loop_range(&self)    -> (f64, f64)      { self.playback.range() }

    pub fn thumbnails_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// In-memory frame for the preview, for sources that have one (GIFs).
    /// Video previews come from the MediaWorker's scrub thread instead.
    pub fn preview_image(&self) -> Option<Arc<RgbaImage>> {
        self.media.animated().map(|a| a.frame_at(self.playback.current_time()))
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    pub fn process(&mut self, cmd: EditorCommand) {
        match cmd {
            // ── Playback ─────────────────────────────────────────────────────
            EditorCommand::Play           => self.playback.play(),
            EditorCommand::Pause          => self.playback.pause(),
            EditorCommand::TogglePlayback => self.playback.toggle(),
            EditorCommand::Seek(t) => {
                self.playback.seek(t);
            }

            // ── Scrub strip ──────────────────────────────────────────────────
            EditorCommand::LayoutTimeline { width } => {
                if (width - self.timeline.viewport_width()).abs() > 0.5 {
                    self.timeline.layout(width);
                }
            }
            EditorCommand::BeginHandleDrag(edge) => {
                self.timeline.begin_drag(edge);
            }
            EditorCommand::DragHandle { edge, translation } => {
                if self.timeline.dragging_edge() == Some(edge) {
                    self.timeline.drag_to(translation, &mut self.events);
                }
            }
            EditorCommand::EndHandleDrag { edge, translation } => {
                if self.timeline.dragging_edge() == Some(edge) {
                    self.timeline.end_drag(translation, &mut self.events);
                }
            }
            EditorCommand::ScrollTimeline(offset) => {
                self.timeline.scroll_to(offset, &mut self.events);
            }
            EditorCommand::EndTimelineScroll { decelerate } => {
                self.timeline.end_scroll(decelerate, &mut self.events);
            }
            EditorCommand::EndTimelineDeceleration => {
                self.timeline.end_deceleration(&mut self.events);
            }

            // ── Crop preview ─────────────────────────────────────────────────
            EditorCommand::LayoutPreview { width, height } => {
                let viewport = Size::new(width, height);
                if viewport != self.crop.viewport() {
                    self.crop.layout(viewport);
                }
            }
            EditorCommand::ZoomPreview { scale, anchor_x, anchor_y } => {
                self.crop.zoom_to(scale, Point::new(anchor_x, anchor_y));
            }
            EditorCommand::PanPreview { dx, dy } => {
                self.crop.pan_by(dx, dy);
            }
            EditorCommand::SetCropAspect(aspect) => {
                self.crop.set_aspect(aspect);
            }

            // ── Export ───────────────────────────────────────────────────────
            EditorCommand::Confirm => self.confirm(),
            EditorCommand::CancelExport => {
                if let Some(m) = &self.export {
                    info!("[export] cancel requested for job {}", m.job_id());
                    m.cancel();
                }
            }
            EditorCommand::ClearExportStatus => {
                if !self.status.is_running() {
                    self.status = ExportStatus::Idle;
                }
            }
        }
        self.route_timeline_events();
    }

    fn route_timeline_events(&mut self) {
        for event in std::mem::take(&mut self.events) {
            match event {
                TimelineEvent::Changed { origin, range } => {
                    self.playback.pause();
                    let t = match origin {
                        ChangeOrigin::Handle(Edge::End) => range.end,
                        ChangeOrigin::Handle(Edge::Start) | ChangeOrigin::Scroll => range.start,
                    };
                    self.playback.seek(t);
                }
                TimelineEvent::ChangeEnded { range, .. } | TimelineEvent::StoppedScrolling { range } => {
                    debug!("[session] settled on [{:.3}, {:.3}]", range.start, range.end);
                    self.playback.bind_range(range.start, range.end);
                    self.playback.seek(range.start);
                    self.playback.play();
                }
            }
        }
    }

    // ── Per-frame ─────────────────────────────────────────────────────────────

    /// Advance playback by `dt` seconds and collect background results.
    pub fn poll(&mut self, dt: f64) -> Vec<SessionEvent> {
        let mut out = Vec::new();

        if let Some(t) = self.playback.tick(dt) {
            out.push(SessionEvent::PlaybackTime(t));
        }

        if let Some(pending) = self.pending.as_mut() {
            if let Some(frames) = pending.poll(&mut self.store) {
                self.thumbnails = frames;
                self.pending    = None;
                out.push(SessionEvent::ThumbnailsReady);
            }
        }

        if let Some(monitor) = self.export.as_mut() {
            let job_id = monitor.job_id();
            match monitor.poll() {
                ExportPoll::Running(progress) => {
                    self.status = ExportStatus::Running { job_id, progress };
                }
                ExportPoll::Done(path) => {
                    info!("[session] export done → {}", path.display());
                    self.status = ExportStatus::Done(path.clone());
                    self.export = None;
                    out.push(SessionEvent::ExportFinished(path));
                }
                ExportPoll::Failed(msg) => {
                    let err = EditError::ExportFailure(msg);
                    warn!("[session] {err}");
                    self.status = ExportStatus::Failed(err.to_string());
                    self.export = None;
                    out.push(SessionEvent::ExportFailed(err.to_string()));
                }
                ExportPoll::Cancelled => {
                    self.status = ExportStatus::Cancelled;
                    self.export = None;
                    out.push(SessionEvent::ExportCancelled);
                }
            }
        }
        out
    }

    /// Hand the selection and crop to the exporter. Ignored while an export
    /// is already running; the editing state is left untouched either way.
    pub fn confirm(&mut self) {
        if self.export.is_some() {
            debug!("[session] confirm ignored: export already running");
            return;
        }
        self.playback.pause();

        let output = match temp_output_path() {
            Ok(p) => p,
            Err(e) => {
                let err = EditError::ExportFailure(format!("no temp file for output: {e}"));
                warn!("[session] {err}");
                self.status = ExportStatus::Failed(err.to_string());
                return;
            }
        };

        let range = self.timeline.snapshot();
        let request = ExportRequest {
            job_id: Uuid::new_v4(),
            source: self.info.clone(),
            start:  range.start,
            end:    range.end,
            crop:   self.crop.export_rect(self.exporter.origin()),
            output,
        };
        let job_id  = request.job_id;
        let monitor = self.exporter.start(request);
        self.status = ExportStatus::Running { job_id, progress: 0.1 };
        self.export = Some(monitor);
    }

    /// Close the screen: cancel the export and any thumbnail work, detach the
    /// playback observer. Returns the thumbnail store for the next session.
    pub fn teardown(self) -> ThumbnailStore {
        let EditSession { store, export, pending, mut playback, info, .. } = self;
        if let Some(monitor) = export {
            info!("[session] closing with export {} running; cancelling", monitor.job_id());
            monitor.cancel();
        }
        if let Some(pending) = pending {
            pending.cancel();
        }
        playback.teardown();
        info!("[session] closed {}", info.name());
        store
    }

    fn request_thumbnails(&mut self) {
        if let Some(old) = self.pending.take() {
            old.cancel();
        }
        let pending = self.frames.request(&mut self.store).spawn();
        self.pending = Some(pending);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::thread;
    use std::time::{Duration, Instant};

    use image::Rgba;
    use parking_lot::Mutex;

    use clipcrop_core::helpers::geometry::{CoordinateOrigin, Rect};
    use clipcrop_core::state::MediaKind;

    use super::*;
    use crate::export::ExportReporter;
    use crate::gif::AnimatedImage;

    /// Records requests; finishes, fails or parks each job as told.
    struct FakeExporter {
        mode:     Mode,
        requests: Mutex<Vec<ExportRequest>>,
        parked:   Mutex<Option<ExportReporter>>,
    }

    #[derive(Clone, Copy)]
    enum Mode { Finish, Fail, Park }

    impl FakeExporter {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self { mode, requests: Mutex::new(Vec::new()), parked: Mutex::new(None) })
        }
    }

    impl Exporter for FakeExporter {
        fn origin(&self) -> CoordinateOrigin { CoordinateOrigin::BottomLeft }

        fn start(&self, request: ExportRequest) -> ExportMonitor {
            let _ = std::fs::remove_file(&request.output);
            let (monitor, reporter) = ExportMonitor::new(request.job_id);
            let output = request.output.clone();
            self.requests.lock().push(request);
            match self.mode {
                Mode::Finish => {
                    reporter.progress(0.5);
                    reporter.done(output);
                }
                Mode::Fail => reporter.fail("encoder exploded"),
                Mode::Park => *self.parked.lock() = Some(reporter),
            }
            monitor
        }
    }

    /// 16 frames × 0.125 s of 8×4 pixels: exactly 2 s.
    fn gif_source() -> (SourceInfo, MediaSource) {
        let frames = (0..16u8).map(|i| RgbaImage::from_pixel(8, 4, Rgba([i, 0, 0, 255]))).collect();
        let anim = AnimatedImage::from_frames(frames, &[0.125; 16]).unwrap();
        let info = SourceInfo {
            path:            PathBuf::from("loop.gif"),
            kind:            MediaKind::AnimatedImage,
            duration:        anim.duration(),
            natural_size:    anim.size(),
            frame_rate:      anim.frame_rate(),
            rotation:        0,
            has_video_track: true,
        };
        (info, MediaSource::Animated(Arc::new(anim)))
    }

    fn layout() -> SessionLayout {
        SessionLayout { strip_width: 375.0, pixels_per_point: 1.0, aspect: AspectRatio::OneOne }
    }

    fn open_with(exporter: Arc<dyn Exporter>) -> EditSession {
        let (info, media) = gif_source();
        EditSession::open(EditorConfig::default(), info, media, exporter, ThumbnailStore::new(1 << 20), layout())
    }

    fn poll_until(s: &mut EditSession, want: impl Fn(&SessionEvent) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if s.poll(0.0).iter().any(&want) {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn thumbnails_arrive_in_order() {
        let mut s = open_with(FakeExporter::new(Mode::Finish));
        assert!(s.thumbnails_pending());
        assert!(poll_until(&mut s, |e| *e == SessionEvent::ThumbnailsReady));
        assert!(!s.thumbnails_pending());

        let thumbs = s.thumbnails();
        assert_eq!(thumbs.len(), s.frames.sample_times().len());
        assert!(thumbs.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(thumbs.iter().all(|f| !f.placeholder && f.image.dimensions() == (30, 40)));
    }

    #[test]
    fn reopening_serves_thumbnails_from_store() {
        let mut s = open_with(FakeExporter::new(Mode::Finish));
        assert!(poll_until(&mut s, |e| *e == SessionEvent::ThumbnailsReady));
        let store = s.teardown();
        assert!(!store.is_empty());

        let (info, media) = gif_source();
        let mut again = EditSession::open(
            EditorConfig::default(), info, media, FakeExporter::new(Mode::Finish), store, layout(),
        );
        assert!(again.poll(0.0).contains(&SessionEvent::ThumbnailsReady));
    }

    #[test]
    fn transport_commands_drive_playback() {
        let mut s = open_with(FakeExporter::new(Mode::Finish));
        s.process(EditorCommand::Play);
        assert!(s.is_playing());
        s.process(EditorCommand::Pause);
        assert!(!s.is_playing());

        s.process(EditorCommand::Seek(0.5));
        assert!((s.current_time() - 0.5).abs() < 1e-9);
        assert!(!s.is_playing());

        // Past the end of the asset: ignored.
        s.process(EditorCommand::Seek(5.0));
        assert!((s.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn dragging_end_pauses_then_settling_loops_the_new_range() {
        let mut s = open_with(FakeExporter::new(Mode::Finish));
        s.process(EditorCommand::Play);
        assert!(s.is_playing());

        let pps = s.timeline().range().pixels_per_second();
        s.process(EditorCommand::BeginHandleDrag(Edge::End));
        s.process(EditorCommand::DragHandle { edge: Edge::End, translation: -pps });
        assert!(!s.is_playing());
        assert!((s.timeline().snapshot().end - 1.0).abs() < 1e-9);

        // A drag for the other edge is ignored.
        s.process(EditorCommand::DragHandle { edge: Edge::Start, translation: 50.0 });
        assert_eq!(s.timeline().snapshot().start, 0.0);

        s.process(EditorCommand::EndHandleDrag { edge: Edge::End, translation: -pps });
        assert!(s.is_playing());
        let (start, end) = s.loop_range();
        assert_eq!(start, 0.0);
        assert!((end - 1.0).abs() < 1e-9);
    }

    #[test]
    fn confirm_hands_selection_to_exporter() {
        let exporter = FakeExporter::new(Mode::Finish);
        let mut s = open_with(Arc::clone(&exporter) as Arc<dyn Exporter>);
        s.process(EditorCommand::LayoutPreview { width: 300.0, height: 300.0 });
        s.process(EditorCommand::Confirm);
        assert!(s.export_status().is_running());

        let events = s.poll(0.0);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::ExportFinished(_))));
        assert!(matches!(s.export_status(), ExportStatus::Done(_)));

        let requests = exporter.requests.lock();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!((req.start, req.end), (0.0, 2.0));
        let full = Rect::new(0.0, 0.0, 8.0, 4.0);
        assert!(full.contains_rect(&req.crop, 1e-6));
        assert!((req.crop.width - req.crop.height).abs() < 1e-6, "square crop");
    }

    #[test]
    fn failed_export_keeps_editing_state() {
        let mut s = open_with(FakeExporter::new(Mode::Fail));
        let before = s.timeline().snapshot();
        s.process(EditorCommand::Confirm);
        let events = s.poll(0.0);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::ExportFailed(m) if m.contains("encoder exploded"))));
        assert!(matches!(s.export_status(), ExportStatus::Failed(_)));
        assert_eq!(s.timeline().snapshot(), before);

        s.process(EditorCommand::ClearExportStatus);
        assert_eq!(*s.export_status(), ExportStatus::Idle);
        s.process(EditorCommand::Confirm);
        assert!(s.export_status().is_running(), "retry is allowed");
    }

    #[test]
    fn teardown_cancels_running_export() {
        let exporter = FakeExporter::new(Mode::Park);
        let mut s = open_with(Arc::clone(&exporter) as Arc<dyn Exporter>);
        s.process(EditorCommand::Confirm);
        s.process(EditorCommand::Confirm);
        assert_eq!(exporter.requests.lock().len(), 1, "second confirm ignored");

        let _ = s.teardown();
        let parked = exporter.parked.lock();
        assert!(parked.as_ref().is_some_and(|r| r.is_cancelled()));
    }

    #[test]
    fn cancel_command_reports_cancelled() {
        let exporter = FakeExporter::new(Mode::Park);
        let mut s = open_with(Arc::clone(&exporter) as Arc<dyn Exporter>);
        s.process(EditorCommand::Confirm);
        s.process(EditorCommand::CancelExport);
        let reporter = exporter.parked.lock().take().unwrap();
        assert!(reporter.is_cancelled());
        reporter.fail(clipcrop_core::media_types::CANCELLED);
        assert!(s.poll(0.0).contains(&SessionEvent::ExportCancelled));
        assert_eq!(*s.export_status(), ExportStatus::Cancelled);
    }

    #[test]
    fn playback_reports_time_while_playing() {
        let mut s = open_with(FakeExporter::new(Mode::Finish));
        assert!(s.poll(0.05).iter().all(|e| !matches!(e, SessionEvent::PlaybackTime(_))));
        s.process(EditorCommand::Play);
        assert!(s.poll(0.05).iter().any(|e| matches!(e, SessionEvent::PlaybackTime(_))));
        assert!(s.preview_image().is_some());
    }
}
