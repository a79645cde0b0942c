// crates/clipcrop-core/src/time_range.rs
//
// TimeRangeModel: the trim selection as seconds. Time values are authoritative;
// every pixel position the scrub strip draws is projected from here on each
// layout pass and never stored back.
//
// Invariants held after construction and after every successful mutation:
//   0 ≤ start < end ≤ duration
//   min_duration ≤ end - start ≤ max_duration
//   min_duration = min(cfg.min_duration, duration)
//   max_duration = min(cfg.max_duration, duration)

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::error::EditError;

/// Immutable copy of the selection carried by timeline events.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRangeSnapshot {
    pub start:        f64,
    pub end:          f64,
    pub duration:     f64,
    pub min_duration: f64,
    pub max_duration: f64,
}

impl TimeRangeSnapshot {
    pub fn span(&self) -> f64 { self.end - self.start }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimeRangeModel {
    duration:          f64,
    start:             f64,
    end:               f64,
    min_duration:      f64,
    max_duration:      f64,
    pixels_per_second: f64,
}

impl TimeRangeModel {
    /// Build the default selection `[0, max_duration]`.
    ///
    /// Panics if `duration` is not a positive finite number: the screen must
    /// never be opened on media the probe rejected.
    ///
    /// ```
    /// use clipcrop_core::{EditorConfig, TimeRangeModel};
    /// let m = TimeRangeModel::new(10.0, &EditorConfig::default());
    /// assert_eq!((m.start(), m.end()), (0.0, 6.0));
    /// assert_eq!((m.min_duration(), m.max_duration()), (0.5, 6.0));
    /// ```
    pub fn new(duration: f64, config: &EditorConfig) -> Self {
        assert!(
            duration.is_finite() && duration > 0.0,
            "TimeRangeModel requires a positive duration, got {duration}"
        );
        let min_duration = config.min_duration.min(duration);
        let max_duration = config.max_duration.min(duration);
        Self {
            duration,
            start: 0.0,
            end: max_duration,
            min_duration,
            max_duration,
            pixels_per_second: 0.0,
        }
    }

    pub fn duration(&self)          -> f64 { self.duration }
    pub fn start(&self)             -> f64 { self.start }
    pub fn end(&self)               -> f64 { self.end }
    pub fn min_duration(&self)      -> f64 { self.min_duration }
    pub fn max_duration(&self)      -> f64 { self.max_duration }
    pub fn pixels_per_second(&self) -> f64 { self.pixels_per_second }
    pub fn span(&self)              -> f64 { self.end - self.start }

    /// Media shorter than the minimum span: no handle can move.
    pub fn is_degenerate(&self) -> bool {
        self.min_duration >= self.max_duration
    }

    /// Recompute the scale for a strip `display_width` points wide with
    /// `inset` points of padding on each side. Returns the new scale.
    pub fn relayout(&mut self, display_width: f64, inset: f64) -> f64 {
        self.pixels_per_second = ((display_width - 2.0 * inset) / self.max_duration).max(0.0);
        self.pixels_per_second
    }

    /// Full scrollable width of the strip at the current scale.
    pub fn content_width(&self) -> f64 {
        self.duration * self.pixels_per_second
    }

    /// Allowed interval for `start` given the current `end`.
    pub fn start_bounds(&self) -> (f64, f64) {
        ((self.end - self.max_duration).max(0.0), self.end - self.min_duration)
    }

    /// Allowed interval for `end` given the current `start`.
    pub fn end_bounds(&self) -> (f64, f64) {
        (self.start + self.min_duration, (self.start + self.max_duration).min(self.duration))
    }

    /// Move the start bound, clamped into `start_bounds()`. Returns the value
    /// actually applied.
    pub fn set_start(&mut self, t: f64) -> Result<f64, EditError> {
        if self.is_degenerate() {
            return Err(EditError::InvalidRange(format!(
                "start is fixed: min {:.3}s ≥ max {:.3}s", self.min_duration, self.max_duration
            )));
        }
        let (lo, hi) = self.start_bounds();
        self.start = t.max(lo).min(hi);
        Ok(self.start)
    }

    /// Move the end bound, clamped into `end_bounds()`.
    ///
    /// ```
    /// use clipcrop_core::{EditorConfig, TimeRangeModel};
    /// let mut m = TimeRangeModel::new(10.0, &EditorConfig::default());
    /// m.set_start(3.0).unwrap();
    /// assert_eq!(m.set_end(8.5), Ok(8.5));
    /// assert_eq!(m.set_end(9.5), Ok(9.0));
    /// ```
    pub fn set_end(&mut self, t: f64) -> Result<f64, EditError> {
        if self.is_degenerate() {
            return Err(EditError::InvalidRange(format!(
                "end is fixed: min {:.3}s ≥ max {:.3}s", self.min_duration, self.max_duration
            )));
        }
        let (lo, hi) = self.end_bounds();
        self.end = t.max(lo).min(hi);
        Ok(self.end)
    }

    /// Slide the whole selection so it begins at `start`, keeping its span.
    /// Clamped so the selection stays inside `[0, duration]`.
    pub fn shift_to(&mut self, start: f64) -> TimeRangeSnapshot {
        let span  = self.span();
        let start = start.max(0.0).min(self.duration - span);
        self.start = start;
        self.end   = (start + span).min(self.duration);
        self.snapshot()
    }

    pub fn time_to_pixel(&self, t: f64) -> f64 {
        t * self.pixels_per_second
    }

    /// Inverse of `time_to_pixel`. Zero before the first layout.
    pub fn pixel_to_time(&self, x: f64) -> f64 {
        if self.pixels_per_second > 0.0 {
            x / self.pixels_per_second
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> TimeRangeSnapshot {
        TimeRangeSnapshot {
            start:        self.start,
            end:          self.end,
            duration:     self.duration,
            min_duration: self.min_duration,
            max_duration: self.max_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(duration: f64) -> TimeRangeModel {
        let mut m = TimeRangeModel::new(duration, &EditorConfig::default());
        m.relayout(375.0, 40.0);
        m
    }

    fn assert_invariants(m: &TimeRangeModel) {
        assert!(m.start() >= 0.0);
        assert!(m.start() < m.end());
        assert!(m.end() <= m.duration() + 1e-9);
        assert!(m.span() >= m.min_duration() - 1e-9);
        assert!(m.span() <= m.max_duration() + 1e-9);
    }

    #[test]
    fn min_max_follow_duration() {
        for d in [0.1, 0.3, 0.5, 0.75, 2.0, 5.99, 6.0, 6.01, 30.0, 3600.0] {
            let m = model(d);
            assert_eq!(m.min_duration(), 0.5_f64.min(d));
            assert_eq!(m.max_duration(), 6.0_f64.min(d));
            assert!(m.min_duration() <= m.max_duration());
            assert_invariants(&m);
        }
    }

    #[test]
    fn pixel_time_round_trip() {
        let m = model(42.0);
        let mut t = 0.0;
        while t <= 42.0 {
            assert!((m.pixel_to_time(m.time_to_pixel(t)) - t).abs() < 1e-9);
            t += 0.37;
        }
    }

    #[test]
    fn relayout_uses_max_duration() {
        let mut m = model(10.0);
        assert!((m.relayout(375.0, 40.0) - 295.0 / 6.0).abs() < 1e-12);
        assert!((m.content_width() - 10.0 * 295.0 / 6.0).abs() < 1e-9);
        // narrower than the insets: scale collapses to zero instead of going negative
        assert_eq!(m.relayout(50.0, 40.0), 0.0);
        assert_eq!(m.pixel_to_time(100.0), 0.0);
    }

    #[test]
    fn start_is_clamped_both_ways() {
        let mut m = model(10.0);
        m.set_end(6.0).unwrap();
        assert_eq!(m.set_start(5.9), Ok(5.5));
        assert_eq!(m.set_start(-3.0), Ok(0.0));
        assert_eq!(m.set_end(9.0), Ok(6.0));
        assert_invariants(&m);
    }

    #[test]
    fn start_lower_bound_respects_max_span() {
        let mut m = model(20.0);
        m.set_start(4.0).unwrap();
        m.set_end(10.0).unwrap();
        assert_eq!(m.set_start(1.0), Ok(4.0));
        assert_invariants(&m);
    }

    #[test]
    fn end_scenario_from_three_seconds() {
        let mut m = model(10.0);
        assert_eq!((m.start(), m.end()), (0.0, 6.0));
        m.set_start(3.0).unwrap();
        assert_eq!(m.set_end(8.5), Ok(8.5));
        assert_eq!(m.set_end(9.5), Ok(9.0));
        assert_eq!(m.set_end(3.1), Ok(3.5));
        assert_invariants(&m);
    }

    #[test]
    fn end_never_passes_duration() {
        let mut m = model(7.0);
        m.set_start(3.0).unwrap();
        assert_eq!(m.set_end(100.0), Ok(7.0));
    }

    #[test]
    fn degenerate_media_refuses_moves() {
        let mut m = model(0.3);
        assert!(m.is_degenerate());
        assert!(matches!(m.set_start(0.1), Err(EditError::InvalidRange(_))));
        assert!(matches!(m.set_end(0.1), Err(EditError::InvalidRange(_))));
        assert_eq!((m.start(), m.end()), (0.0, 0.3));
    }

    #[test]
    fn shift_preserves_span_and_clamps() {
        let mut m = model(10.0);
        m.set_start(1.0).unwrap();
        m.set_end(3.0).unwrap();
        let s = m.shift_to(8.5);
        assert!((s.span() - 2.0).abs() < 1e-9);
        assert_eq!((s.start, s.end), (8.0, 10.0));
        let s = m.shift_to(-1.0);
        assert_eq!((s.start, s.end), (0.0, 2.0));
        assert_invariants(&m);
    }

    #[test]
    #[should_panic]
    fn negative_duration_is_fatal() {
        let _ = TimeRangeModel::new(-1.0, &EditorConfig::default());
    }
}
