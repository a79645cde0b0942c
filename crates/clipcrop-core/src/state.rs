// crates/clipcrop-core/src/state.rs
// Pure session data: no egui, no ffmpeg, no runtime handles.
// SourceInfo is what probing produces; ExportStatus is what the UI renders.
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::helpers::geometry::Size;

/// Crop presets offered by the picker. `Custom` carries the aspect the screen
/// was opened with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    SixteenNine,   // 16:9  landscape
    NineSixteen,   // 9:16  stories / shorts
    FourThree,     // 4:3
    ThreeFour,     // 3:4
    OneOne,        // 1:1   square
    FourFive,      // 4:5   portrait post
    Custom { width: u32, height: u32 },
}

impl AspectRatio {
    pub const PRESETS: [AspectRatio; 6] = [
        AspectRatio::SixteenNine,
        AspectRatio::NineSixteen,
        AspectRatio::FourThree,
        AspectRatio::ThreeFour,
        AspectRatio::OneOne,
        AspectRatio::FourFive,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// Anything ffmpeg can demux with a video stream.
    Video,
    /// Animated GIF, decoded fully into memory.
    AnimatedImage,
}

/// Everything the editor needs to know about the opened file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub path:            PathBuf,
    pub kind:            MediaKind,
    /// Seconds. Always > 0 for a source the editor accepts.
    pub duration:        f64,
    /// Display dimensions in pixels, orientation already applied.
    pub natural_size:    (u32, u32),
    /// Frames per second of the video stream (or frames / duration for GIFs).
    pub frame_rate:      f64,
    /// Clockwise rotation the decoder must apply to reach `natural_size`.
    #[serde(default)]
    pub rotation:        u32,
    /// False when probing found no video track and `natural_size` is the fallback.
    #[serde(default = "default_true")]
    pub has_video_track: bool,
}

fn default_true() -> bool { true }

impl SourceInfo {
    /// Square size used when a file has no video track.
    pub const FALLBACK_SIZE: (u32, u32) = (512, 512);

    pub fn size(&self) -> Size {
        Size::new(self.natural_size.0 as f64, self.natural_size.1 as f64)
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lifecycle of the single export a screen can run.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ExportStatus {
    #[default]
    Idle,
    /// `progress` is clamped to [0.1, 1.0] so the bar is never empty.
    Running { job_id: Uuid, progress: f32 },
    Done(PathBuf),
    Failed(String),
    Cancelled,
}

impl ExportStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ExportStatus::Running { .. })
    }
}
