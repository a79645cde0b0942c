// crates/clipcrop-media/src/export.rs
//
// The export seam. An Exporter takes (source, time range, crop rect, output)
// and runs the job somewhere else; the UI thread polls the returned
// ExportMonitor once per frame.
//
//   ExportMonitor   UI side: poll() / cancel(); dropping it cancels the job
//   ExportReporter  worker side: progress() / done() / fail(); checks cancel
//   FfmpegExporter  trim + crop + H.264 MP4 via encode::encode_clip
//
// Terminal states are sticky: after Done / Failed / Cancelled is observed,
// later polls return the same state without touching the channel.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use log::{info, warn};
use uuid::Uuid;

use clipcrop_core::helpers::geometry::{CoordinateOrigin, Rect};
use clipcrop_core::media_types::{MediaResult, CANCELLED};
use clipcrop_core::state::SourceInfo;

use crate::encode::encode_clip;

/// Everything one export needs.
#[derive(Clone, Debug)]
pub struct ExportRequest {
    pub job_id: Uuid,
    pub source: SourceInfo,
    pub start:  f64,
    pub end:    f64,
    /// Crop in source pixels, in the exporter's coordinate origin.
    pub crop:   Rect,
    /// Destination file, including extension.
    pub output: PathBuf,
}

pub trait Exporter: Send + Sync {
    /// Origin of the `crop` rect this exporter expects.
    fn origin(&self) -> CoordinateOrigin;

    /// Start the job. Must not block.
    fn start(&self, request: ExportRequest) -> ExportMonitor;
}

/// Unique `.mp4` path in the OS temp dir. The file exists (empty) on return
/// so the name cannot be taken by another process.
pub fn temp_output_path() -> Result<PathBuf> {
    let path = tempfile::Builder::new()
        .prefix("clipcrop-")
        .suffix(".mp4")
        .tempfile()?
        .into_temp_path()
        .keep()?;
    Ok(path)
}

// ── Monitor / reporter pair ───────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum ExportPoll {
    /// Fraction done, clamped to `[0.1, 1.0]` for display.
    Running(f32),
    Done(PathBuf),
    Failed(String),
    Cancelled,
}

impl ExportPoll {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExportPoll::Running(_))
    }
}

pub struct ExportMonitor {
    job_id: Uuid,
    rx:     Receiver<MediaResult>,
    cancel: Arc<AtomicBool>,
    state:  ExportPoll,
}

pub struct ExportReporter {
    job_id: Uuid,
    tx:     Sender<MediaResult>,
    cancel: Arc<AtomicBool>,
}

impl ExportMonitor {
    pub fn new(job_id: Uuid) -> (Self, ExportReporter) {
        let (tx, rx) = unbounded();
        let cancel   = Arc::new(AtomicBool::new(false));
        let monitor  = Self { job_id, rx, cancel: Arc::clone(&cancel), state: ExportPoll::Running(0.1) };
        (monitor, ExportReporter { job_id, tx, cancel })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Drain pending reports and return the current state.
    pub fn poll(&mut self) -> ExportPoll {
        while !self.state.is_terminal() {
            match self.rx.try_recv() {
                Ok(MediaResult::ExportProgress { job_id, progress }) if job_id == self.job_id => {
                    self.state = ExportPoll::Running(progress.clamp(0.1, 1.0));
                }
                Ok(MediaResult::ExportDone { job_id, path }) if job_id == self.job_id => {
                    self.state = ExportPoll::Done(path);
                }
                Ok(MediaResult::ExportError { job_id, msg }) if job_id == self.job_id => {
                    self.state = if msg == CANCELLED { ExportPoll::Cancelled } else { ExportPoll::Failed(msg) };
                }
                Ok(_) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.state = if self.cancel.load(Ordering::Relaxed) {
                        ExportPoll::Cancelled
                    } else {
                        ExportPoll::Failed("export worker exited without a result".into())
                    };
                }
            }
        }
        self.state.clone()
    }

    /// Ask the worker to stop. The monitor reports `Cancelled` once the
    /// worker acknowledges.
    pub fn cancel(&self) {
        if !self.state.is_terminal() {
            self.cancel.store(true, Ordering::Relaxed);
        }
    }
}

impl Drop for ExportMonitor {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.cancel.store(true, Ordering::Relaxed);
            info!("[export] job {} dropped while running; cancelling", self.job_id);
        }
    }
}

impl ExportReporter {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn progress(&self, fraction: f32) {
        let _ = self.tx.send(MediaResult::ExportProgress { job_id: self.job_id, progress: fraction });
    }

    pub fn done(self, path: PathBuf) {
        let _ = self.tx.send(MediaResult::ExportDone { job_id: self.job_id, path });
    }

    pub fn fail(self, msg: impl Into<String>) {
        let _ = self.tx.send(MediaResult::ExportError { job_id: self.job_id, msg: msg.into() });
    }
}

// ── ffmpeg exporter ───────────────────────────────────────────────────────────

/// Trims and crops to an H.264 MP4 on a dedicated thread. Crop rects are
/// top-left origin, matching decoded frame rows.
#[derive(Default)]
pub struct FfmpegExporter;

impl Exporter for FfmpegExporter {
    fn origin(&self) -> CoordinateOrigin {
        CoordinateOrigin::TopLeft
    }

    fn start(&self, request: ExportRequest) -> ExportMonitor {
        let (monitor, reporter) = ExportMonitor::new(request.job_id);
        info!(
            "[export] job {} start {:.3}s → {:.3}s crop {:?} → {}",
            request.job_id, request.start, request.end, request.crop, request.output.display()
        );

        let spawned = thread::Builder::new()
            .name("clipcrop-export".into())
            .spawn(move || {
                match encode_clip(&request, &reporter) {
                    Ok(()) => {
                        info!("[export] job {} done → {}", request.job_id, request.output.display());
                        reporter.done(request.output);
                    }
                    Err(msg) if msg == CANCELLED => {
                        info!("[export] job {} cancelled", request.job_id);
                        let _ = std::fs::remove_file(&request.output);
                        reporter.fail(msg);
                    }
                    Err(msg) => {
                        warn!("[export] job {} failed: {msg}", request.job_id);
                        reporter.fail(msg);
                    }
                }
            });
        if let Err(e) = spawned {
            warn!("[export] could not start export thread: {e}");
        }
        monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped_and_done_is_sticky() {
        let (mut m, r) = ExportMonitor::new(Uuid::new_v4());
        assert_eq!(m.poll(), ExportPoll::Running(0.1));
        r.progress(0.02);
        assert_eq!(m.poll(), ExportPoll::Running(0.1));
        r.progress(0.5);
        assert_eq!(m.poll(), ExportPoll::Running(0.5));
        r.done(PathBuf::from("/tmp/out.mp4"));
        assert_eq!(m.poll(), ExportPoll::Done(PathBuf::from("/tmp/out.mp4")));
        assert_eq!(m.poll(), ExportPoll::Done(PathBuf::from("/tmp/out.mp4")));
    }

    #[test]
    fn cancelled_sentinel_maps_to_cancelled() {
        let (mut m, r) = ExportMonitor::new(Uuid::new_v4());
        m.cancel();
        assert!(r.is_cancelled());
        r.fail(CANCELLED);
        assert_eq!(m.poll(), ExportPoll::Cancelled);
    }

    #[test]
    fn vanished_worker_is_a_failure() {
        let (mut m, r) = ExportMonitor::new(Uuid::new_v4());
        drop(r);
        assert!(matches!(m.poll(), ExportPoll::Failed(_)));
    }

    #[test]
    fn dropping_monitor_cancels_job() {
        let (m, r) = ExportMonitor::new(Uuid::new_v4());
        drop(m);
        assert!(r.is_cancelled());
    }

    #[test]
    fn reports_for_other_jobs_are_ignored() {
        let (mut m, r) = ExportMonitor::new(Uuid::new_v4());
        let (_, other) = ExportMonitor::new(Uuid::new_v4());
        let _ = r.tx.send(MediaResult::ExportDone { job_id: other.job_id(), path: PathBuf::from("x") });
        assert_eq!(m.poll(), ExportPoll::Running(0.1));
    }

    #[test]
    fn temp_output_is_unique_mp4() {
        let a = temp_output_path().unwrap();
        let b = temp_output_path().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("mp4"));
        let _ = std::fs::remove_file(a);
        let _ = std::fs::remove_file(b);
    }
}
