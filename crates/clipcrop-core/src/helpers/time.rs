// crates/clipcrop-core/src/helpers/time.rs
//
// Time formatting and rounding helpers used by the scrub strip, the playback
// readout and the frame cache's dedup keys.

/// Playback readout: `MM:SS.t` (tenths of a second).
///
/// ```
/// use clipcrop_core::helpers::time::format_clock;
/// assert_eq!(format_clock(0.0),   "00:00.0");
/// assert_eq!(format_clock(3.46),  "00:03.4");
/// assert_eq!(format_clock(61.25), "01:01.2");
/// ```
pub fn format_clock(s: f64) -> String {
    let s      = s.max(0.0);
    let m      = (s / 60.0) as u32;
    let sc     = (s % 60.0) as u32;
    let tenths = ((s * 10.0) as u64 % 10) as u32;
    format!("{m:02}:{sc:02}.{tenths}")
}

/// Label drawn under a major ruler tick.
///
/// ```
/// use clipcrop_core::helpers::time::ruler_label;
/// assert_eq!(ruler_label(0), "0S");
/// assert_eq!(ruler_label(12), "12S");
/// ```
pub fn ruler_label(whole_secs: u32) -> String {
    format!("{whole_secs}S")
}

/// Compact span shown next to the selection: `4.2s`, `1:07`.
///
/// ```
/// use clipcrop_core::helpers::time::format_span;
/// assert_eq!(format_span(4.24), "4.2s");
/// assert_eq!(format_span(67.0), "1:07");
/// ```
pub fn format_span(secs: f64) -> String {
    if secs >= 60.0 {
        format!("{}:{:02}", secs as u64 / 60, secs as u64 % 60)
    } else {
        format!("{secs:.1}s")
    }
}

/// Millisecond key used to dedupe timestamps that differ only by float noise.
///
/// ```
/// use clipcrop_core::helpers::time::millis_key;
/// assert_eq!(millis_key(0.1 + 0.2), millis_key(0.3));
/// assert_ne!(millis_key(0.300), millis_key(0.301));
/// ```
pub fn millis_key(t: f64) -> i64 {
    (t * 1000.0).round() as i64
}
