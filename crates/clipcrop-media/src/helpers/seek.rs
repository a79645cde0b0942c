// crates/clipcrop-media/src/helpers/seek.rs
//
// Every demuxer seek in clipcrop-media goes through here so soft-fail
// handling and logging stay identical across thumbnails, scrub frames and
// export.
//
// `plan_reposition` decides whether a decoder has to seek at all; it knows
// nothing about ffmpeg so the rules are testable on their own.

use ffmpeg_the_third as ffmpeg;
use log::warn;

/// A request at most this far past the frame on screen is reached by
/// decoding forward instead of seeking. Covers playback at any sane frame
/// rate and small scrub steps.
pub const FORWARD_DECODE_WINDOW: f64 = 1.0;

/// Slack when comparing a request against decoded presentation times.
pub const PTS_EPSILON: f64 = 1e-6;

/// How a decoder reaches a requested time from where it currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reposition {
    /// Keep decoding forward from the current position.
    Continue,
    /// Seek the demuxer and flush the decoder first.
    Seek,
}

/// Decide how to reach `target_secs`.
///
/// `touched` is false only while a freshly opened context has not decoded or
/// sought anything: it already sits at 0, and some platforms reject a seek to
/// `max_ts = 0` there with EPERM. Once touched, a request for 0 seeks like
/// any other. `shown_secs` is the presentation time of the frame currently on
/// screen, if any.
pub fn plan_reposition(touched: bool, shown_secs: Option<f64>, target_secs: f64) -> Reposition {
    if !touched {
        return if target_secs <= 0.0 { Reposition::Continue } else { Reposition::Seek };
    }
    match shown_secs {
        Some(shown)
            if target_secs >= shown - PTS_EPSILON
                && target_secs - shown <= FORWARD_DECODE_WINDOW => Reposition::Continue,
        _ => Reposition::Seek,
    }
}

/// Seek `ictx` to the keyframe at or before `target_secs` (clamped to 0).
///
/// Returns `false` when the demuxer refused the seek; the caller decides how
/// to recover. The seek is always backward (`..=ts`): a forward seek lands on
/// the next keyframe and silently skips every frame between it and the target.
pub fn seek_to_secs(
    ictx:        &mut ffmpeg::format::context::Input,
    target_secs: f64,
    label:       &str,
) -> bool {
    let ts = (target_secs.max(0.0) * ffmpeg::ffi::AV_TIME_BASE as f64) as i64;
    match ictx.seek(ts, ..=ts) {
        Ok(()) => true,
        Err(e) => {
            warn!("[seek] soft-fail in {label} at {target_secs:.3}s: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_skips_only_the_zero_seek() {
        assert_eq!(plan_reposition(false, None, 0.0), Reposition::Continue);
        assert_eq!(plan_reposition(false, None, 2.5), Reposition::Seek);
    }

    #[test]
    fn used_context_rewinds_to_zero() {
        // Demuxer parked around 3s: t = 0 must seek, not decode onward.
        assert_eq!(plan_reposition(true, Some(3.0), 0.0), Reposition::Seek);
        assert_eq!(plan_reposition(true, None, 0.0), Reposition::Seek);
    }

    #[test]
    fn small_forward_steps_decode_sequentially() {
        assert_eq!(plan_reposition(true, Some(3.0), 3.0), Reposition::Continue);
        assert_eq!(plan_reposition(true, Some(3.0), 3.033), Reposition::Continue);
        assert_eq!(plan_reposition(true, Some(3.0), 3.0 + FORWARD_DECODE_WINDOW), Reposition::Continue);
    }

    #[test]
    fn backward_or_distant_requests_seek() {
        assert_eq!(plan_reposition(true, Some(3.0), 2.9), Reposition::Seek);
        assert_eq!(plan_reposition(true, Some(3.0), 3.0 + FORWARD_DECODE_WINDOW + 0.01), Reposition::Seek);
    }
}
