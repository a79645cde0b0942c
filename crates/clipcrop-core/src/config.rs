// crates/clipcrop-core/src/config.rs
//
// Editor tunables. Every constant the trim/crop screen depends on lives here so
// the UI, the media layer and the tests all read the same numbers.

use serde::{Deserialize, Serialize};

use crate::helpers::geometry::Size;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Shortest selectable range, in seconds. Clamped to the media duration.
    pub min_duration:          f64,
    /// Longest selectable range, in seconds. Clamped to the media duration.
    pub max_duration:          f64,
    /// Thumbnail tile size in logical points (width × height).
    pub preview_thumb_size:    Size,
    /// Horizontal inset on each side of the scrub strip, in points.
    pub horizon_inset:         f64,
    /// Inset between the preview container and the crop frame, in points.
    pub crop_inset:            f64,
    /// Gap between the selection window edge and its handle, in points.
    pub handle_gap:            f64,
    /// Width of a handle's hit box, in points.
    pub handle_width:          f64,
    /// Playback-position reports per second while playing.
    pub playback_report_hz:    f64,
    /// Distance from `end` at which `play` restarts from `start`.
    pub loop_epsilon:          f64,
    /// Byte budget of the decoded-thumbnail LRU.
    pub thumbnail_cache_bytes: usize,
    /// Lower bound for the crop preview's maximum zoom.
    pub max_zoom_floor:        f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_duration:          0.5,
            max_duration:          6.0,
            preview_thumb_size:    Size::new(30.0, 40.0),
            horizon_inset:         40.0,
            crop_inset:            20.0,
            handle_gap:            5.0,
            handle_width:          50.0,
            playback_report_hz:    60.0,
            loop_epsilon:          0.01,
            thumbnail_cache_bytes: 64 * 1024 * 1024,
            max_zoom_floor:        5.0,
        }
    }
}

impl EditorConfig {
    /// Interval between playback-position reports, in seconds.
    pub fn report_interval(&self) -> f64 {
        1.0 / self.playback_report_hz.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_screen_constants() {
        let c = EditorConfig::default();
        assert_eq!(c.min_duration, 0.5);
        assert_eq!(c.max_duration, 6.0);
        assert_eq!(c.preview_thumb_size, Size::new(30.0, 40.0));
        assert_eq!(c.horizon_inset, 40.0);
        assert!((c.report_interval() - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn report_interval_never_divides_by_zero() {
        let c = EditorConfig { playback_report_hz: 0.0, ..Default::default() };
        assert_eq!(c.report_interval(), 1.0);
    }
}
