// crates/clipcrop-ui/src/helpers/format.rs
//
// Display strings that only make sense on screen. Anything measured in
// seconds goes through clipcrop_core::helpers::time.

use clipcrop_core::helpers::time::format_span;
use clipcrop_core::state::ExportStatus;

/// Shortens `text` to about `max_px` of 12 px proportional text, ending in
/// "…" when something was cut. Width is estimated per character so no
/// `Fonts` access is needed.
pub fn fit_label(text: &str, max_px: f32) -> String {
    const AVG_CHAR_PX: f32 = 7.0;
    let budget = (max_px / AVG_CHAR_PX).max(0.0) as usize;
    if text.chars().count() <= budget {
        return text.to_string();
    }
    match budget {
        0 => String::new(),
        n => text.chars().take(n - 1).chain(std::iter::once('…')).collect(),
    }
}

/// Caption under the strip: `"2.5s selected"` or the mm:ss form past a minute.
pub fn selection_caption(span: f64) -> String {
    format!("{} selected", format_span(span))
}

/// One-line banner for a finished export, `None` while idle or running.
pub fn export_banner(status: &ExportStatus) -> Option<String> {
    match status {
        ExportStatus::Idle | ExportStatus::Running { .. } => None,
        ExportStatus::Done(path) => Some(format!("Saved {}", path.display())),
        ExportStatus::Failed(msg) => Some(msg.clone()),
        ExportStatus::Cancelled   => Some("Export cancelled".into()),
    }
}
