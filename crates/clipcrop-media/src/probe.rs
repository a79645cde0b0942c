// crates/clipcrop-media/src/probe.rs
//
// Probing: turn a path into a SourceInfo (duration, display size, frame rate).
// GIFs go through the image crate; everything else through ffmpeg.

use std::path::Path;

use anyhow::{anyhow, bail, Result};
use log::{info, warn};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::media::Type;

use clipcrop_core::error::EditError;
use clipcrop_core::state::{MediaKind, SourceInfo};

use crate::gif::AnimatedImage;

/// Frame rate assumed when the container reports none.
const FALLBACK_FPS: f64 = 30.0;

pub fn is_animated_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"))
}

/// Probe `path`. Fails only when the file cannot be read or has no usable
/// duration; a missing video track degrades to the fallback size.
pub fn probe_source(path: &Path) -> Result<SourceInfo> {
    let info = if is_animated_image(path) {
        let anim = AnimatedImage::open(path)?;
        SourceInfo {
            path:            path.to_path_buf(),
            kind:            MediaKind::AnimatedImage,
            duration:        anim.duration(),
            natural_size:    anim.size(),
            frame_rate:      anim.frame_rate(),
            rotation:        0,
            has_video_track: true,
        }
    } else {
        probe_video(path)?
    };
    info!(
        "[probe] {:.2}s {}x{} @ {:.2}fps ← {}",
        info.duration, info.natural_size.0, info.natural_size.1, info.frame_rate, path.display()
    );
    Ok(info)
}

fn probe_video(path: &Path) -> Result<SourceInfo> {
    let ctx = input(path).map_err(|e| anyhow!("open {}: {e}", path.display()))?;

    let mut duration = ctx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;

    if duration <= 0.0 {
        // Fall back to stream duration
        if let Some(stream) = ctx.streams().best(Type::Video)
            .or_else(|| ctx.streams().best(Type::Audio))
        {
            duration = stream.duration() as f64 * f64::from(stream.time_base());
        }
    }
    if !(duration.is_finite() && duration > 0.0) {
        bail!("duration unknown for {}", path.display());
    }

    let Some(stream) = ctx.streams().best(Type::Video) else {
        warn!("[probe] {}: {}; assuming {:?}", path.display(), EditError::AssetTrackMissing, SourceInfo::FALLBACK_SIZE);
        return Ok(SourceInfo {
            path:            path.to_path_buf(),
            kind:            MediaKind::Video,
            duration,
            natural_size:    SourceInfo::FALLBACK_SIZE,
            frame_rate:      FALLBACK_FPS,
            rotation:        0,
            has_video_track: false,
        });
    };

    let (raw_w, raw_h) = unsafe {
        let p = stream.parameters().as_ptr();
        ((*p).width as u32, (*p).height as u32)
    };
    let rotation = stream_rotation(&stream);
    let natural_size = match (raw_w, raw_h) {
        (0, _) | (_, 0)                 => SourceInfo::FALLBACK_SIZE,
        (w, h) if rotation % 180 == 90 => (h, w),
        (w, h)                          => (w, h),
    };

    let rate = f64::from(stream.avg_frame_rate());
    let frame_rate = if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        let r = f64::from(stream.rate());
        if r.is_finite() && r > 0.0 { r } else { FALLBACK_FPS }
    };

    Ok(SourceInfo {
        path: path.to_path_buf(),
        kind: MediaKind::Video,
        duration,
        natural_size,
        frame_rate,
        rotation,
        has_video_track: true,
    })
}

/// Clockwise display rotation from the stream's `rotate` tag, normalised to
/// 0 / 90 / 180 / 270.
pub fn stream_rotation(stream: &ffmpeg::format::stream::Stream) -> u32 {
    stream
        .metadata()
        .get("rotate")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(normalize_rotation)
        .unwrap_or(0)
}

fn normalize_rotation(deg: i64) -> u32 {
    let d = deg.rem_euclid(360);
    (((d + 45) / 90 * 90) % 360) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn gif_detection_ignores_case() {
        assert!(is_animated_image(&PathBuf::from("a/b/Loop.GIF")));
        assert!(!is_animated_image(&PathBuf::from("clip.mp4")));
        assert!(!is_animated_image(&PathBuf::from("noext")));
    }

    #[test]
    fn rotation_normalises() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(90), 90);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(179), 180);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.gif");
        assert!(probe_source(&path).is_err());
    }
}
