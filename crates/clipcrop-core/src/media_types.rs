// crates/clipcrop-core/src/media_types.rs
//
// Types that flow across channels between clipcrop-media worker threads and
// whoever drains them. No egui, no ffmpeg, just plain data.

use std::path::PathBuf;
use uuid::Uuid;

use crate::state::SourceInfo;

/// Results sent from the MediaWorker background threads to the UI.
#[derive(Debug)]
pub enum MediaResult {
    /// Probe finished; the screen can be built from `info`.
    Probed      { id: Uuid, info: SourceInfo },
    /// Large preview frame for the crop area (RGBA, tightly packed).
    ScrubFrame  { id: Uuid, timestamp: f64, width: u32, height: u32, data: Vec<u8> },
    /// Fraction of the export completed, in [0, 1].
    ExportProgress { job_id: Uuid, progress: f32 },
    ExportDone  { job_id: Uuid, path: PathBuf },
    /// `msg == "cancelled"` when the job was stopped by its monitor.
    ExportError { job_id: Uuid, msg: String },
    Error       { id: Uuid, msg: String },
}

/// Sentinel carried by `ExportError` when a job was cancelled on request.
pub const CANCELLED: &str = "cancelled";
