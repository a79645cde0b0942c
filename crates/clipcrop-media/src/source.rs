// crates/clipcrop-media/src/source.rs
//
// The decode seam between the editing session and concrete media:
//   FrameSource  batched still-frame generation (thumbnails)
//   MediaSource  what an opened file is: an ffmpeg video or an in-memory GIF
//
// Tests substitute their own FrameSource; nothing above this file knows
// whether frames come from ffmpeg or the image crate.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use image::RgbaImage;

use clipcrop_core::state::{MediaKind, SourceInfo};

use crate::decode::VideoFrameSource;
use crate::gif::AnimatedImage;
use crate::player::{ClockPlayer, FramePlayer, MediaPlayer};

/// How one requested timestamp resolved.
#[derive(Debug)]
pub enum FrameOutcome {
    Decoded(RgbaImage),
    Failed(String),
    Cancelled,
}

/// Still-frame generator for one media file.
pub trait FrameSource: Send + Sync {
    fn duration(&self) -> f64;

    /// Resolve every timestamp in `times`, calling `on_frame(index, outcome)`
    /// exactly once per index, in any order and from any thread. Returns once
    /// all indices have been reported. When `cancel` is set, remaining indices
    /// report `Cancelled`.
    fn generate(
        &self,
        times:    &[f64],
        cancel:   &AtomicBool,
        on_frame: &(dyn Fn(usize, FrameOutcome) + Sync),
    );
}

/// An opened source file.
#[derive(Clone)]
pub enum MediaSource {
    Video(Arc<VideoFrameSource>),
    Animated(Arc<AnimatedImage>),
}

impl MediaSource {
    pub fn open(info: &SourceInfo) -> Result<Self> {
        Ok(match info.kind {
            MediaKind::Video         => MediaSource::Video(Arc::new(VideoFrameSource::new(info))),
            MediaKind::AnimatedImage => MediaSource::Animated(Arc::new(AnimatedImage::open(&info.path)?)),
        })
    }

    pub fn frames(&self) -> Arc<dyn FrameSource> {
        match self {
            MediaSource::Video(v)    => Arc::clone(v) as Arc<dyn FrameSource>,
            MediaSource::Animated(a) => Arc::clone(a) as Arc<dyn FrameSource>,
        }
    }

    /// Preview player matching the source: wall-clock for video, frame
    /// stepping for GIFs.
    pub fn player(&self) -> Box<dyn MediaPlayer> {
        match self {
            MediaSource::Video(v)    => Box::new(ClockPlayer::new(v.duration())),
            MediaSource::Animated(a) => Box::new(FramePlayer::new(a.frame_count(), a.duration())),
        }
    }

    pub fn animated(&self) -> Option<&Arc<AnimatedImage>> {
        match self {
            MediaSource::Animated(a) => Some(a),
            MediaSource::Video(_)    => None,
        }
    }
}
